//! Workbook backends: the remote Google Sheets API and local CSV exports.
//!
//! Both implement [`mcfdesk_recon::Workbook`]. Blocking reqwest (no Tokio
//! runtime required).

mod auth;
mod client;
mod error;
mod local;

pub use auth::{refresh_access_token, AccessToken, GoogleCredentials, GOOGLE_TOKEN_URL};
pub use client::{quote_tab, ClientOptions, SheetsClient, SpreadsheetInfo, SHEETS_API_BASE};
pub use error::SheetsError;
pub use local::CsvWorkbook;
