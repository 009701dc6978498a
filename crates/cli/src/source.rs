//! Workbook selection: a local CSV export or a Google spreadsheet.
//!
//! Flags win over environment variables, which win over settings.json.

use std::path::PathBuf;

use clap::Args;
use mcfdesk_config::credentials::{find_google_credentials, CredentialSource};
use mcfdesk_config::settings::Settings;
use mcfdesk_recon::{SheetLayout, Workbook};
use mcfdesk_sheets::{CsvWorkbook, GoogleCredentials, SheetsClient, SheetsError};

#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Directory of <tab>.csv files; takes precedence over a spreadsheet id
    #[arg(long, value_name = "DIR")]
    pub local: Option<PathBuf>,

    /// Google spreadsheet id (the long token in the sheet URL)
    #[arg(long, env = "MCFDESK_SPREADSHEET_ID", value_name = "ID")]
    pub spreadsheet_id: Option<String>,

    /// Google credential JSON (authorized-user, service-account key or access token)
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Tab layout TOML (defaults to the built-in five-tab layout)
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,
}

#[derive(Debug)]
pub enum SourceError {
    /// Neither a local directory nor a spreadsheet id was given
    NoSource,
    /// Spreadsheet id given but no credentials found
    NoCredentials,
    /// Layout file unreadable or invalid
    Layout(String),
    /// Backend refused to open
    Sheets(SheetsError),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NoSource => write!(f, "no workbook selected"),
            SourceError::NoCredentials => write!(f, "no Google credentials found"),
            SourceError::Layout(msg) => write!(f, "layout: {}", msg),
            SourceError::Sheets(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<SheetsError> for SourceError {
    fn from(e: SheetsError) -> Self {
        SourceError::Sheets(e)
    }
}

/// An opened workbook plus a line describing where it came from.
pub struct OpenedSource {
    pub workbook: Box<dyn Workbook>,
    pub description: String,
}

impl SourceArgs {
    pub fn layout_path(&self, settings: &Settings) -> Option<PathBuf> {
        self.layout.clone().or_else(|| settings.sheets.layout_path.clone())
    }

    /// Read the layout file, or fall back to the built-in layout.
    pub fn load_layout(&self, settings: &Settings) -> Result<SheetLayout, SourceError> {
        let Some(path) = self.layout_path(settings) else {
            return Ok(SheetLayout::default());
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|e| SourceError::Layout(format!("cannot read {}: {}", path.display(), e)))?;
        let layout = SheetLayout::from_toml(&text).map_err(|e| SourceError::Layout(e.to_string()))?;
        log::debug!("layout from {}: {} tab(s)", path.display(), layout.tabs.len());
        Ok(layout)
    }

    pub fn open(&self, settings: &Settings) -> Result<OpenedSource, SourceError> {
        if let Some(dir) = &self.local {
            let wb = CsvWorkbook::open(dir)?;
            return Ok(OpenedSource {
                description: format!("local export {}", dir.display()),
                workbook: Box::new(wb),
            });
        }

        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .or_else(|| settings.sheets.spreadsheet_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or(SourceError::NoSource)?;

        let source = find_google_credentials(self.credentials.as_deref(), &settings.sheets)
            .ok_or(SourceError::NoCredentials)?;
        log::debug!("Google credentials from {}", source.describe());
        let credentials = match &source {
            CredentialSource::File(path) => GoogleCredentials::from_path(path)?,
            other => GoogleCredentials::from_json(other.payload().unwrap_or_default())?,
        };

        let client = SheetsClient::connect(credentials, spreadsheet_id.trim())?;
        let description = format!(
            "spreadsheet '{}' ({} tab(s))",
            client.info().title,
            client.info().tabs.len()
        );
        Ok(OpenedSource { workbook: Box::new(client), description })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_source() {
        let dir = tempfile::tempdir().unwrap();
        let args = SourceArgs { local: Some(dir.path().to_path_buf()), ..Default::default() };
        let opened = args.open(&Settings::default()).unwrap();
        assert!(opened.description.starts_with("local export"));
    }

    #[test]
    fn test_missing_local_dir() {
        let args = SourceArgs { local: Some(PathBuf::from("/nonexistent/mcfdesk")), ..Default::default() };
        assert!(matches!(args.open(&Settings::default()), Err(SourceError::Sheets(SheetsError::Io(_)))));
    }

    #[test]
    fn test_no_source() {
        let mut settings = Settings::default();
        settings.sheets.spreadsheet_id = Some("  ".into());
        assert!(matches!(SourceArgs::default().open(&settings), Err(SourceError::NoSource)));
    }

    #[test]
    fn test_layout_default_and_file() {
        let settings = Settings::default();
        let layout = SourceArgs::default().load_layout(&settings).unwrap();
        assert_eq!(layout, SheetLayout::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        std::fs::write(&path, "master = \"Master\"\n\n[[tabs]]\nname = \"Master\"\n").unwrap();
        let args = SourceArgs { layout: Some(path), ..Default::default() };
        assert_eq!(args.load_layout(&settings).unwrap().master, "Master");
    }

    #[test]
    fn test_bad_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        std::fs::write(&path, "master = \"Nope\"\n\n[[tabs]]\nname = \"Master\"\n").unwrap();
        let args = SourceArgs { layout: Some(path), ..Default::default() };
        assert!(matches!(args.load_layout(&Settings::default()), Err(SourceError::Layout(_))));
    }
}
