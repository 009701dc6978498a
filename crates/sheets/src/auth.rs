//! Google credentials and the OAuth token exchanges.
//!
//! Accepts an authorized-user document (as written by
//! `gcloud auth application-default login`), a service-account key, or a
//! bare access token. Service accounts trade an RS256-signed assertion for an
//! access token (the JWT-bearer grant).

use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for a signed assertion; Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub enum GoogleCredentials {
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_uri: String,
    },
    ServiceAccount {
        client_email: String,
        /// PEM-encoded RSA key, checked at parse time
        private_key: String,
        token_uri: String,
    },
    AccessToken(String),
}

#[derive(Deserialize)]
struct RawCredentials {
    #[serde(rename = "type")]
    kind: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    token_uri: Option<String>,
    private_key: Option<String>,
    client_email: Option<String>,
    access_token: Option<String>,
    token: Option<String>,
}

impl GoogleCredentials {
    /// Parse a credential JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, SheetsError> {
        let raw: RawCredentials = serde_json::from_str(payload.trim())
            .map_err(|e| SheetsError::Credentials(format!("invalid credentials JSON: {}", e)))?;

        if raw.kind.as_deref() == Some("service_account") || raw.private_key.is_some() {
            let client_email = raw
                .client_email
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| SheetsError::Credentials("service-account key missing client_email".into()))?;
            let private_key = raw
                .private_key
                .ok_or_else(|| SheetsError::Credentials("service-account key missing private_key".into()))?;
            EncodingKey::from_rsa_pem(private_key.as_bytes())
                .map_err(|e| SheetsError::Credentials(format!("service-account private_key unusable: {}", e)))?;
            return Ok(GoogleCredentials::ServiceAccount {
                client_email,
                private_key,
                token_uri: raw.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            });
        }

        if let Some(refresh_token) = raw.refresh_token {
            let client_id = raw
                .client_id
                .ok_or_else(|| SheetsError::Credentials("authorized-user credential missing client_id".into()))?;
            let client_secret = raw
                .client_secret
                .ok_or_else(|| SheetsError::Credentials("authorized-user credential missing client_secret".into()))?;
            return Ok(GoogleCredentials::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                token_uri: raw.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            });
        }

        match raw.access_token.or(raw.token) {
            Some(token) if !token.trim().is_empty() => Ok(GoogleCredentials::AccessToken(token.trim().to_string())),
            _ => Err(SheetsError::Credentials(
                "expected an authorized-user credential (refresh_token), a service-account key or an access_token"
                    .into(),
            )),
        }
    }

    /// Read and parse a credential file.
    pub fn from_path(path: &Path) -> Result<Self, SheetsError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetsError::Credentials(format!("cannot read credentials file {}: {}", path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(path) {
                let mode = meta.permissions().mode();
                if mode & 0o077 != 0 {
                    log::warn!(
                        "credentials file {} is accessible by others (mode {:o}), consider chmod 600",
                        path.display(),
                        mode & 0o777
                    );
                }
            }
        }

        Self::from_json(&content)
    }

    pub fn can_refresh(&self) -> bool {
        !matches!(self, GoogleCredentials::AccessToken(_))
    }
}

/// Bearer token plus its expiry, when known.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() + EXPIRY_SLACK >= at)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Sign the JWT-bearer assertion for a service account.
fn sign_assertion(client_email: &str, private_key: &str, audience: &str) -> Result<String, SheetsError> {
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| SheetsError::Credentials(format!("service-account private_key unusable: {}", e)))?;
    let iat = chrono::Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: client_email,
        scope: SHEETS_SCOPE,
        aud: audience,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| SheetsError::Credentials(format!("cannot sign service-account assertion: {}", e)))
}

/// Obtain a fresh access token: the refresh-token grant for authorized users,
/// the JWT-bearer grant for service accounts. `token_url` overrides the
/// credential's own `token_uri`.
pub fn refresh_access_token(
    http: &reqwest::blocking::Client,
    creds: &GoogleCredentials,
    token_url: Option<&str>,
) -> Result<AccessToken, SheetsError> {
    let request = match creds {
        GoogleCredentials::AuthorizedUser { client_id, client_secret, refresh_token, token_uri } => {
            let url = token_url.unwrap_or(token_uri.as_str());
            log::debug!("refreshing Google access token via {}", url);
            http.post(url).form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
        }
        GoogleCredentials::ServiceAccount { client_email, private_key, token_uri } => {
            let url = token_url.unwrap_or(token_uri.as_str());
            log::debug!("requesting service-account token for {} via {}", client_email, url);
            let assertion = sign_assertion(client_email, private_key, url)?;
            http.post(url)
                .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        }
        GoogleCredentials::AccessToken(_) => {
            return Err(SheetsError::Credentials("cannot refresh a bare access token".into()));
        }
    };

    let resp = request
        .send()
        .map_err(|e| SheetsError::Network(format!("token request failed: {}", e)))?;

    let status = resp.status().as_u16();
    if status != 200 {
        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
        let msg = body["error_description"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .unwrap_or("unknown error");
        return Err(SheetsError::Credentials(format!("token refresh failed ({}): {}", status, msg)));
    }

    let body: serde_json::Value = resp
        .json()
        .map_err(|e| SheetsError::Parse(format!("token response invalid: {}", e)))?;
    let token = body["access_token"]
        .as_str()
        .ok_or_else(|| SheetsError::Credentials("token response missing access_token".into()))?;
    let expires_at = body["expires_in"]
        .as_u64()
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    Ok(AccessToken { token: token.to_string(), expires_at })
}
