use std::collections::HashSet;

use serde::Deserialize;

use crate::error::LayoutError;
use crate::workbook::{column_letter, column_number};

pub const DEFAULT_MASTER_TAB: &str = "Master Reconciliation";

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

/// Which tabs to load from the workbook and which of them is the master table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SheetLayout {
    #[serde(default = "default_master")]
    pub master: String,
    pub tabs: Vec<TabSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TabSpec {
    pub name: String,
    /// Optional column restriction, e.g. `"B:U"`. `None` keeps every column.
    #[serde(default)]
    pub columns: Option<ColumnSpan>,
}

fn default_master() -> String {
    DEFAULT_MASTER_TAB.to_string()
}

impl Default for SheetLayout {
    fn default() -> Self {
        let span = |s: &str| ColumnSpan::parse(s).ok();
        Self {
            master: default_master(),
            tabs: vec![
                TabSpec { name: "01_Expected".into(), columns: span("B:U") },
                TabSpec { name: "02_Payouts".into(), columns: span("B:AE") },
                TabSpec { name: "03_MCFExport".into(), columns: span("C:CE") },
                TabSpec { name: "04_Invoice".into(), columns: span("A:J") },
                // Tracking columns are appended past the original A:W, so the
                // master tab is read in full.
                TabSpec { name: DEFAULT_MASTER_TAB.into(), columns: None },
            ],
        }
    }
}

impl SheetLayout {
    /// Parse and validate a layout from TOML.
    pub fn from_toml(s: &str) -> Result<Self, LayoutError> {
        let layout: Self = toml::from_str(s).map_err(|e| LayoutError::Parse(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.tabs.is_empty() {
            return Err(LayoutError::Validation("layout lists no tabs".into()));
        }
        let mut seen = HashSet::new();
        for tab in &self.tabs {
            if tab.name.trim().is_empty() {
                return Err(LayoutError::Validation("tab name must not be empty".into()));
            }
            if !seen.insert(tab.name.as_str()) {
                return Err(LayoutError::Validation(format!("duplicate tab '{}'", tab.name)));
            }
        }
        if !seen.contains(self.master.as_str()) {
            return Err(LayoutError::Validation(format!(
                "master tab '{}' is not listed in tabs",
                self.master
            )));
        }
        Ok(())
    }

    pub fn master_spec(&self) -> Option<&TabSpec> {
        self.tabs.iter().find(|t| t.name == self.master)
    }
}

// ---------------------------------------------------------------------------
// Column span
// ---------------------------------------------------------------------------

/// Inclusive 1-based column range, written `B:U` in A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ColumnSpan {
    pub first: usize,
    pub last: usize,
}

impl ColumnSpan {
    pub fn parse(s: &str) -> Result<Self, LayoutError> {
        let (a, b) = s.split_once(':').ok_or_else(|| LayoutError::BadSpan(s.to_string()))?;
        let first = column_number(a).ok_or_else(|| LayoutError::BadSpan(s.to_string()))?;
        let last = column_number(b).ok_or_else(|| LayoutError::BadSpan(s.to_string()))?;
        if first > last {
            return Err(LayoutError::BadSpan(s.to_string()));
        }
        Ok(Self { first, last })
    }

    /// Slice a row down to this span. Rows shorter than the span yield what they have.
    pub fn slice<'a>(&self, row: &'a [String]) -> &'a [String] {
        let start = (self.first - 1).min(row.len());
        let end = self.last.min(row.len());
        &row[start..end]
    }

    pub fn width(&self) -> usize {
        self.last - self.first + 1
    }
}

impl TryFrom<String> for ColumnSpan {
    type Error = LayoutError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl std::fmt::Display for ColumnSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", column_letter(self.first), column_letter(self.last))
    }
}
