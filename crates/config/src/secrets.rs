//! System keychain access.
//!
//! Built without the `keychain` feature, every read misses and every write
//! fails with [`SecretError::Unsupported`].

use std::fmt;

/// Keychain service name; accounts are `ai/<provider>` and `google/credentials`.
pub(crate) const SERVICE: &str = "mcfdesk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Built without the `keychain` feature
    Unsupported,
    /// The platform store refused the operation
    Keychain(String),
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretError::Unsupported => write!(f, "keychain support is not enabled in this build"),
            SecretError::Keychain(msg) => write!(f, "keychain: {}", msg),
        }
    }
}

impl std::error::Error for SecretError {}

pub(crate) fn read(account: &str) -> Option<String> {
    #[cfg(feature = "keychain")]
    {
        match keyring::Entry::new(SERVICE, account).and_then(|entry| entry.get_password()) {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                log::debug!("keychain read '{}' failed: {}", account, e);
                None
            }
        }
    }
    #[cfg(not(feature = "keychain"))]
    {
        let _ = account;
        None
    }
}

pub(crate) fn write(account: &str, value: &str) -> Result<(), SecretError> {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(SERVICE, account)
            .and_then(|entry| entry.set_password(value))
            .map_err(|e| SecretError::Keychain(e.to_string()))
    }
    #[cfg(not(feature = "keychain"))]
    {
        let _ = (account, value);
        Err(SecretError::Unsupported)
    }
}

pub(crate) fn remove(account: &str) -> Result<(), SecretError> {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(SERVICE, account)
            .and_then(|entry| entry.delete_credential())
            .map_err(|e| SecretError::Keychain(e.to_string()))
    }
    #[cfg(not(feature = "keychain"))]
    {
        let _ = account;
        Err(SecretError::Unsupported)
    }
}

/// Whether a keychain entry can be opened on this machine.
pub fn available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(SERVICE, "availability-check").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(SecretError::Unsupported.to_string().contains("not enabled"));
        assert_eq!(SecretError::Keychain("locked".into()).to_string(), "keychain: locked");
    }
}
