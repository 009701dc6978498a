// Google credential discovery
//
// Checked in order:
// 1. Explicit path (command-line flag)
// 2. MCFDESK_GOOGLE_CREDENTIALS: a file path, or the JSON document itself
// 3. sheets.credentials_path in settings.json
// 4. System keychain (account "google/credentials")

use std::env;
use std::path::{Path, PathBuf};

use crate::secrets::{self, SecretError};
use crate::settings::SheetsSettings;

pub const GOOGLE_CREDENTIALS_ENV: &str = "MCFDESK_GOOGLE_CREDENTIALS";

const KEYCHAIN_ACCOUNT: &str = "google/credentials";

/// Where the credential document was found
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    /// JSON file on disk
    File(PathBuf),
    /// JSON payload from the environment
    Environment(String),
    /// JSON payload from the system keychain
    Keychain(String),
}

impl CredentialSource {
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::File(path) => format!("file {}", path.display()),
            CredentialSource::Environment(_) => format!("environment ({})", GOOGLE_CREDENTIALS_ENV),
            CredentialSource::Keychain(_) => "keychain".to_string(),
        }
    }

    /// The inline payload, if the source is not a file
    pub fn payload(&self) -> Option<&str> {
        match self {
            CredentialSource::File(_) => None,
            CredentialSource::Environment(json) | CredentialSource::Keychain(json) => Some(json),
        }
    }
}

/// Find the Google credential document.
pub fn find_google_credentials(flag: Option<&Path>, settings: &SheetsSettings) -> Option<CredentialSource> {
    let env_value = env::var(GOOGLE_CREDENTIALS_ENV).ok();
    resolve(flag, env_value.as_deref(), settings).or_else(keychain_credentials)
}

fn resolve(flag: Option<&Path>, env_value: Option<&str>, settings: &SheetsSettings) -> Option<CredentialSource> {
    if let Some(path) = flag {
        return Some(CredentialSource::File(path.to_path_buf()));
    }

    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(if value.starts_with('{') {
            CredentialSource::Environment(value.to_string())
        } else {
            CredentialSource::File(PathBuf::from(value))
        });
    }

    settings.credentials_path.clone().map(CredentialSource::File)
}

fn keychain_credentials() -> Option<CredentialSource> {
    secrets::read(KEYCHAIN_ACCOUNT).map(CredentialSource::Keychain)
}

/// Store a credential document in the system keychain
pub fn store_google_credentials(json: &str) -> Result<(), SecretError> {
    secrets::write(KEYCHAIN_ACCOUNT, json)
}
