use mcfdesk_recon::SheetError;

/// Error type for spreadsheet backends.
#[derive(Debug)]
pub enum SheetsError {
    /// Credential payload missing, malformed or rejected
    Credentials(String),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
    /// Named worksheet does not exist
    TabNotFound(String),
    /// Local file I/O error
    Io(String),
}

impl std::fmt::Display for SheetsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsError::Credentials(msg) => write!(f, "Credentials error: {}", msg),
            SheetsError::Network(msg) => write!(f, "Network error: {}", msg),
            SheetsError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            SheetsError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SheetsError::TabNotFound(tab) => write!(f, "worksheet '{}' not found", tab),
            SheetsError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SheetsError {}

impl SheetsError {
    /// Auth-class failures: bad credentials, 401 or 403.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SheetsError::Credentials(_) | SheetsError::Http(401, _) | SheetsError::Http(403, _)
        )
    }
}

impl From<SheetsError> for SheetError {
    fn from(e: SheetsError) -> Self {
        match e {
            SheetsError::TabNotFound(tab) => SheetError::TabNotFound(tab),
            other => SheetError::Backend(other.to_string()),
        }
    }
}
