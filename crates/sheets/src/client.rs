//! Google Sheets v4 HTTP client.
//!
//! Blocking reqwest client. Reads whole tabs as display strings and writes one
//! cell per request. Retries 429/5xx/transport failures with exponential
//! backoff and refreshes the access token once on a 401.

use std::cell::RefCell;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use mcfdesk_recon::workbook::column_letter;
use mcfdesk_recon::{Grid, SheetError, Workbook};

use crate::auth::{refresh_access_token, AccessToken, GoogleCredentials};
use crate::error::SheetsError;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const MAX_ATTEMPTS: u32 = 3;
const USER_AGENT: &str = concat!("mcfdesk/", env!("CARGO_PKG_VERSION"));

/// Endpoint and retry overrides.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    /// Overrides the credential's `token_uri`.
    pub token_url: Option<String>,
    /// First retry delay; doubles on each retry.
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: SHEETS_API_BASE.to_string(),
            token_url: None,
            backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Spreadsheet title and worksheet names, fetched on connect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpreadsheetInfo {
    pub title: String,
    pub tabs: Vec<String>,
}

/// Google Sheets API client (blocking).
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    options: ClientOptions,
    spreadsheet_id: String,
    credentials: GoogleCredentials,
    token: RefCell<AccessToken>,
    info: SpreadsheetInfo,
}

/// A1 sheet name, quoted: `'Master Reconciliation'`. Embedded quotes are doubled.
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

impl SheetsClient {
    /// Authenticate and fetch spreadsheet metadata. Fails fast on bad
    /// credentials or an unknown spreadsheet id.
    pub fn connect(credentials: GoogleCredentials, spreadsheet_id: &str) -> Result<Self, SheetsError> {
        Self::connect_with(credentials, spreadsheet_id, ClientOptions::default())
    }

    pub fn connect_with(
        credentials: GoogleCredentials,
        spreadsheet_id: &str,
        options: ClientOptions,
    ) -> Result<Self, SheetsError> {
        let http = build_http(&options)?;
        let token = match &credentials {
            GoogleCredentials::AccessToken(t) => AccessToken { token: t.clone(), expires_at: None },
            GoogleCredentials::AuthorizedUser { .. } | GoogleCredentials::ServiceAccount { .. } => {
                refresh_access_token(&http, &credentials, options.token_url.as_deref())?
            }
        };
        let mut client = Self::unconnected(http, credentials, spreadsheet_id, options, token);
        client.info = client.fetch_info()?;
        log::info!(
            "connected to spreadsheet '{}' ({} tabs)",
            client.info.title,
            client.info.tabs.len()
        );
        Ok(client)
    }

    fn unconnected(
        http: reqwest::blocking::Client,
        credentials: GoogleCredentials,
        spreadsheet_id: &str,
        options: ClientOptions,
        token: AccessToken,
    ) -> Self {
        Self {
            http,
            options,
            spreadsheet_id: spreadsheet_id.to_string(),
            credentials,
            token: RefCell::new(token),
            info: SpreadsheetInfo::default(),
        }
    }

    pub fn info(&self) -> &SpreadsheetInfo {
        &self.info
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn fetch_info(&self) -> Result<SpreadsheetInfo, SheetsError> {
        let url = self.url(&["v4", "spreadsheets", &self.spreadsheet_id])?;
        let body = self.request_json(|http, token| {
            http.get(url.clone())
                .bearer_auth(token)
                .query(&[("fields", "properties.title,sheets.properties.title")])
        })?;

        let title = body["properties"]["title"].as_str().unwrap_or_default().to_string();
        let tabs = body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(SpreadsheetInfo { title, tabs })
    }

    /// Every populated row of `tab` as display strings, header first.
    pub fn get_values(&self, tab: &str) -> Result<Grid, SheetsError> {
        if !self.info.tabs.is_empty() && !self.info.tabs.iter().any(|t| t == tab) {
            return Err(SheetsError::TabNotFound(tab.to_string()));
        }
        let url = self.url(&["v4", "spreadsheets", &self.spreadsheet_id, "values", &quote_tab(tab)])?;
        let body = self
            .request_json(|http, token| {
                http.get(url.clone())
                    .bearer_auth(token)
                    .query(&[("valueRenderOption", "FORMATTED_VALUE"), ("majorDimension", "ROWS")])
            })
            .map_err(|e| match e {
                SheetsError::Http(400, msg) if msg.contains("Unable to parse range") => {
                    SheetsError::TabNotFound(tab.to_string())
                }
                other => other,
            })?;

        let grid: Grid = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        log::debug!("read {} rows from '{}'", grid.len(), tab);
        Ok(grid)
    }

    /// Write one cell (1-based). The value is parsed as if typed by a user.
    pub fn put_cell(&self, tab: &str, row: usize, col: usize, value: &str) -> Result<(), SheetsError> {
        if row == 0 || col == 0 {
            return Err(SheetsError::Parse(format!("invalid cell coordinates ({}, {})", row, col)));
        }
        let range = format!("{}!{}{}", quote_tab(tab), column_letter(col), row);
        let url = self.url(&["v4", "spreadsheets", &self.spreadsheet_id, "values", &range])?;
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });
        self.request_json(|http, token| {
            http.put(url.clone())
                .bearer_auth(token)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&body)
        })?;
        log::debug!("wrote {} on '{}'", range, tab);
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, SheetsError> {
        let mut url = reqwest::Url::parse(&self.options.api_base)
            .map_err(|e| SheetsError::Network(format!("invalid API base {}: {}", self.options.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Network(format!("invalid API base {}", self.options.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn refresh(&self) -> Result<(), SheetsError> {
        let fresh = refresh_access_token(&self.http, &self.credentials, self.options.token_url.as_deref())?;
        *self.token.borrow_mut() = fresh;
        Ok(())
    }

    /// Send with retry + exponential backoff.
    ///
    /// `build_request` is called once per attempt with the current bearer token.
    fn request_json(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client, &str) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, SheetsError> {
        let mut backoff = self.options.backoff;
        let mut refreshed = false;
        let mut attempt = 1u32;

        if self.credentials.can_refresh() && self.token.borrow().is_expired() {
            self.refresh()?;
            refreshed = true;
        }

        loop {
            let token = self.token.borrow().token.clone();
            let wait = match build_request(&self.http, &token).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if (200..300).contains(&status) {
                        let text = resp
                            .text()
                            .map_err(|e| SheetsError::Network(format!("failed to read response body: {}", e)))?;
                        if text.trim().is_empty() {
                            return Ok(serde_json::Value::Null);
                        }
                        return serde_json::from_str(&text).map_err(|e| {
                            SheetsError::Parse(format!("{} (body: {})", e, text.chars().take(200).collect::<String>()))
                        });
                    }

                    // Stale token: refresh once and go again
                    if status == 401 && !refreshed && self.credentials.can_refresh() {
                        log::info!("access token rejected, refreshing");
                        self.refresh()?;
                        refreshed = true;
                        continue;
                    }

                    if status == 429 || status >= 500 {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.trim().parse::<u64>().ok())
                            .map(Duration::from_secs);
                        if attempt >= MAX_ATTEMPTS {
                            let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                            return Err(SheetsError::Http(
                                status,
                                format!("{} after {} attempts", error_message(&body, status), MAX_ATTEMPTS),
                            ));
                        }
                        log::warn!("retry {}/{} (HTTP {})", attempt, MAX_ATTEMPTS - 1, status);
                        retry_after.unwrap_or(backoff)
                    } else {
                        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                        return Err(SheetsError::Http(status, error_message(&body, status)));
                    }
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(SheetsError::Network(format!("{} (after {} attempts)", e, MAX_ATTEMPTS)));
                    }
                    log::warn!("retry {}/{} ({})", attempt, MAX_ATTEMPTS - 1, e);
                    backoff
                }
            };

            thread::sleep(wait);
            backoff *= 2;
            attempt += 1;
        }
    }
}

impl Workbook for SheetsClient {
    fn read_values(&self, tab: &str) -> Result<Grid, SheetError> {
        self.get_values(tab).map_err(SheetError::from)
    }

    fn update_cell(&mut self, tab: &str, row: usize, col: usize, value: &str) -> Result<(), SheetError> {
        self.put_cell(tab, row, col, value).map_err(SheetError::from)
    }
}

fn build_http(options: &ClientOptions) -> Result<reqwest::blocking::Client, SheetsError> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(options.timeout)
        .build()
        .map_err(|e| SheetsError::Network(format!("failed to create HTTP client: {}", e)))
}

/// Google error envelope: `{"error": {"code", "message", "status"}}`.
fn error_message(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error_description"].as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("request failed with status {}", status))
}

fn cell_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn options(server: &MockServer) -> ClientOptions {
        ClientOptions {
            api_base: server.base_url(),
            token_url: Some(server.url("/token")),
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    fn mock_metadata(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/sid");
            then.status(200).json_body(serde_json::json!({
                "properties": { "title": "P&L Recon" },
                "sheets": [
                    { "properties": { "title": "Master Reconciliation" } },
                    { "properties": { "title": "04_Invoice" } }
                ]
            }));
        });
    }

    fn token() -> GoogleCredentials {
        GoogleCredentials::AccessToken("tok".into())
    }

    #[test]
    fn test_quote_tab() {
        assert_eq!(quote_tab("Master Reconciliation"), "'Master Reconciliation'");
        assert_eq!(quote_tab("Ravi's"), "'Ravi''s'");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&serde_json::json!(null)), "");
        assert_eq!(cell_text(&serde_json::json!(1200)), "1200");
        assert_eq!(cell_text(&serde_json::json!(-1200.0)), "-1200");
        assert_eq!(cell_text(&serde_json::json!(12.5)), "12.5");
        assert_eq!(cell_text(&serde_json::json!(true)), "TRUE");
        assert_eq!(cell_text(&serde_json::json!("₹1,200")), "₹1,200");
    }

    #[test]
    fn test_connect_fetches_metadata() {
        let server = MockServer::start();
        mock_metadata(&server);
        let client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        assert_eq!(client.info().title, "P&L Recon");
        assert_eq!(client.info().tabs, vec!["Master Reconciliation", "04_Invoice"]);
    }

    #[test]
    fn test_connect_unknown_spreadsheet() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/nope");
            then.status(404).json_body(serde_json::json!({
                "error": { "code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND" }
            }));
        });
        let err = SheetsClient::connect_with(token(), "nope", options(&server)).err().unwrap();
        assert!(matches!(err, SheetsError::Http(404, ref m) if m.contains("not found")));
    }

    #[test]
    fn test_read_values() {
        let server = MockServer::start();
        mock_metadata(&server);
        let values = server.mock(|when, then| {
            when.method(GET)
                .path_includes("/values/")
                .query_param("valueRenderOption", "FORMATTED_VALUE")
                .header("Authorization", "Bearer tok");
            then.status(200).json_body(serde_json::json!({
                "range": "'Master Reconciliation'!A1:C3",
                "majorDimension": "ROWS",
                "values": [
                    ["MCF Number", "Customer Name", "Net Profit/Loss"],
                    ["MCF-20250428-0588", "Priya", "1,000"],
                    ["MCF-20250428-0589"]
                ]
            }));
        });

        let client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        let grid = client.read_values("Master Reconciliation").unwrap();
        values.assert();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1][2], "1,000");
        assert_eq!(grid[2], vec!["MCF-20250428-0589"]);
    }

    #[test]
    fn test_read_unknown_tab_without_request() {
        let server = MockServer::start();
        mock_metadata(&server);
        let client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        assert_eq!(client.read_values("01_Expected"), Err(SheetError::TabNotFound("01_Expected".into())));
    }

    #[test]
    fn test_update_cell() {
        let server = MockServer::start();
        mock_metadata(&server);
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path_includes("/values/")
                .query_param("valueInputOption", "USER_ENTERED")
                .body_includes("\"values\":[[\"700\"]]")
                .body_includes("!X3");
            then.status(200).json_body(serde_json::json!({ "updatedCells": 1 }));
        });

        let mut client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        client.update_cell("Master Reconciliation", 3, 24, "700").unwrap();
        put.assert();
    }

    #[test]
    fn test_retries_then_gives_up() {
        let server = MockServer::start();
        mock_metadata(&server);
        let failing = server.mock(|when, then| {
            when.method(GET).path_includes("/values/");
            then.status(503).json_body(serde_json::json!({
                "error": { "code": 503, "message": "The service is currently unavailable." }
            }));
        });

        let client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        let err = client.get_values("Master Reconciliation").unwrap_err();
        failing.assert_hits(3);
        assert!(matches!(err, SheetsError::Http(503, ref m) if m.contains("after 3 attempts")));
    }

    #[test]
    fn test_rate_limit_honours_retry_after() {
        let server = MockServer::start();
        mock_metadata(&server);
        let limited = server.mock(|when, then| {
            when.method(PUT).path_includes("/values/");
            then.status(429).header("Retry-After", "0");
        });

        let client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        let err = client.put_cell("Master Reconciliation", 1, 1, "x").unwrap_err();
        limited.assert_hits(3);
        assert!(matches!(err, SheetsError::Http(429, _)));
    }

    #[test]
    fn test_client_error_not_retried() {
        let server = MockServer::start();
        mock_metadata(&server);
        let forbidden = server.mock(|when, then| {
            when.method(GET).path_includes("/values/");
            then.status(403).json_body(serde_json::json!({
                "error": { "code": 403, "message": "The caller does not have permission" }
            }));
        });

        let client = SheetsClient::connect_with(token(), "sid", options(&server)).unwrap();
        let err = client.get_values("04_Invoice").unwrap_err();
        forbidden.assert_hits(1);
        assert!(err.is_auth());
    }

    #[test]
    fn test_token_refresh_on_401() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path_includes("/values/")
                .header("Authorization", "Bearer old_token");
            then.status(401).json_body(serde_json::json!({
                "error": { "code": 401, "message": "Request had invalid authentication credentials." }
            }));
        });
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200).json_body(serde_json::json!({ "access_token": "new_token", "expires_in": 3600 }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path_includes("/values/")
                .header("Authorization", "Bearer new_token");
            then.status(200).json_body(serde_json::json!({ "values": [["MCF Number"], ["MCF-20250428-0588"]] }));
        });

        let creds = GoogleCredentials::AuthorizedUser {
            client_id: "cid".into(),
            client_secret: "sec".into(),
            refresh_token: "rt".into(),
            token_uri: server.url("/token"),
        };
        let opts = options(&server);
        let http = build_http(&opts).unwrap();
        let client = SheetsClient::unconnected(
            http,
            creds,
            "sid",
            opts,
            AccessToken { token: "old_token".into(), expires_at: None },
        );

        let grid = client.get_values("Master Reconciliation").unwrap();
        refresh.assert_hits(1);
        assert_eq!(grid[1][0], "MCF-20250428-0588");
    }

    #[test]
    fn test_connect_with_service_account() {
        let server = MockServer::start();
        let exchange = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .body_includes("jwt-bearer")
                .body_includes("assertion=");
            then.status(200).json_body(serde_json::json!({ "access_token": "sa_token", "expires_in": 3600 }));
        });
        let metadata = server.mock(|when, then| {
            when.method(GET)
                .path("/v4/spreadsheets/sid")
                .header("Authorization", "Bearer sa_token");
            then.status(200).json_body(serde_json::json!({
                "properties": { "title": "P&L Recon" },
                "sheets": [{ "properties": { "title": "Master Reconciliation" } }]
            }));
        });

        let creds = GoogleCredentials::ServiceAccount {
            client_email: "recon-bot@mcf-recon.iam.gserviceaccount.com".into(),
            private_key: include_str!("../tests/fixtures/service_account_key.pem").into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        };
        let client = SheetsClient::connect_with(creds, "sid", options(&server)).unwrap();
        exchange.assert_hits(1);
        metadata.assert();
        assert_eq!(client.info().tabs, vec!["Master Reconciliation"]);
    }

    #[test]
    fn test_invalid_json_with_multibyte_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v4/spreadsheets/sid");
            then.status(200).body(format!("{}₹1,200", "x".repeat(199)));
        });
        let err = SheetsClient::connect_with(token(), "sid", options(&server)).err().unwrap();
        assert!(matches!(err, SheetsError::Parse(ref m) if m.contains("₹")));
    }
}
