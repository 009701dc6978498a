use std::fmt;

/// Failure reported by a [`Workbook`](crate::workbook::Workbook) backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// The named tab does not exist in the workbook.
    TabNotFound(String),
    /// Transport, auth or storage failure inside the backend.
    Backend(String),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TabNotFound(tab) => write!(f, "worksheet '{tab}' not found"),
            Self::Backend(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SheetError {}

#[derive(Debug)]
pub enum LayoutError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Layout validation error (duplicate tab, unknown master tab, etc.).
    Validation(String),
    /// Column span like `B:U` could not be parsed.
    BadSpan(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "layout parse error: {msg}"),
            Self::Validation(msg) => write!(f, "layout validation error: {msg}"),
            Self::BadSpan(span) => write!(f, "invalid column span '{span}' (expected e.g. \"B:U\")"),
        }
    }
}

impl std::error::Error for LayoutError {}
