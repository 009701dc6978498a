//! Exit codes of the `mcfdesk` binary. Scripts branch on these, so a code
//! keeps its meaning once released.
//!
//! | Code  | Meaning                                         |
//! |-------|-------------------------------------------------|
//! | 0     | Success                                         |
//! | 1     | Unspecified failure                             |
//! | 2     | Bad arguments or settings file                  |
//! | 10-12 | `ai doctor`: disabled, missing key, no client   |
//! | 20-23 | Workbook: none chosen, auth, connect, layout    |
//! | 30-31 | Chat: master tab missing, turn reported errors  |

use mcfdesk_cli::SourceError;
use mcfdesk_sheets::SheetsError;

// =============================================================================
// General
// =============================================================================

pub const EXIT_SUCCESS: u8 = 0;

pub const EXIT_ERROR: u8 = 1;

/// Bad flags, or a --config file that does not parse.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// AI (10-19)
// =============================================================================

/// provider = none. Informational for `ai doctor`.
pub const EXIT_AI_DISABLED: u8 = 10;

pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Provider selected in settings has no client in this build.
pub const EXIT_AI_NOT_IMPLEMENTED: u8 = 12;

// =============================================================================
// Source (20-29)
// =============================================================================

/// Neither --local nor a spreadsheet id was supplied.
pub const EXIT_SOURCE_MISSING: u8 = 20;

/// Credentials missing, malformed, or rejected (401/403).
pub const EXIT_SOURCE_AUTH: u8 = 21;

/// Spreadsheet or directory not found, or network failure after retries.
pub const EXIT_SOURCE_CONNECT: u8 = 22;

/// Layout TOML unreadable or invalid.
pub const EXIT_SOURCE_LAYOUT: u8 = 23;

// =============================================================================
// Chat (30-39)
// =============================================================================

/// The master tab did not load, so nothing can be answered.
pub const EXIT_NO_DATA: u8 = 30;

/// The reply was an error, or at least one sheet write failed.
pub const EXIT_CHAT_ERROR: u8 = 31;

pub fn source_exit_code(err: &SourceError) -> u8 {
    match err {
        SourceError::NoSource => EXIT_SOURCE_MISSING,
        SourceError::NoCredentials => EXIT_SOURCE_AUTH,
        SourceError::Layout(_) => EXIT_SOURCE_LAYOUT,
        SourceError::Sheets(e) if e.is_auth() => EXIT_SOURCE_AUTH,
        SourceError::Sheets(SheetsError::Parse(_)) => EXIT_ERROR,
        SourceError::Sheets(_) => EXIT_SOURCE_CONNECT,
    }
}
