// Non-secret settings: ~/.config/mcfdesk/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// AI fallback disabled (default)
    #[default]
    None,
    /// Google Gemini generateContent API
    Gemini,
    /// OpenAI chat completions API
    #[serde(rename = "openai")]
    OpenAI,
    /// Anthropic API (accepted in settings, no client yet)
    Anthropic,
}

impl AIProvider {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AIProvider::None)
    }

    /// Lower-case identifier, also used for key lookup
    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::None => "none",
            AIProvider::Gemini => "gemini",
            AIProvider::OpenAI => "openai",
            AIProvider::Anthropic => "anthropic",
        }
    }

    /// Model used when settings leave `model` empty
    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Gemini => "gemini-1.5-flash-latest",
            AIProvider::OpenAI => "gpt-4o-mini",
            AIProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    pub fn needs_api_key(&self) -> bool {
        self.is_enabled()
    }

    /// Whether this build ships a client for the provider
    pub fn is_implemented(&self) -> bool {
        matches!(self, AIProvider::Gemini | AIProvider::OpenAI)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    pub provider: AIProvider,

    /// Empty selects the provider's default
    pub model: String,

    /// Privacy mode: send aggregates only, no sample records
    pub privacy_mode: bool,

    /// Override for the provider's API base URL
    pub endpoint: Option<String>,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::None,
            model: String::new(),
            privacy_mode: true,
            endpoint: None,
        }
    }
}

impl AISettings {
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }
}

/// Where the workbook comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub spreadsheet_id: Option<String>,

    /// Custom tab layout (TOML); built-in layout when unset
    pub layout_path: Option<PathBuf>,

    /// Google credential JSON file
    pub credentials_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Pause before each reply, milliseconds
    pub delay_ms: u64,

    /// Currency symbol used when rendering amounts
    pub currency: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            currency: "₹".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sheets: SheetsSettings,
    pub ai: AISettings,
    pub chat: ChatSettings,
}

const DEFAULT_FILE: &str = r#"{
    // Workbook source. Credentials may also come from MCFDESK_GOOGLE_CREDENTIALS
    // or the keychain ('mcfdesk auth <FILE>').
    "sheets": {
        "spreadsheet_id": null,
        "layout_path": null,
        "credentials_path": null
    },

    // AI fallback for messages no rule answers: "none", "gemini" or "openai".
    // Keys go in the keychain ('mcfdesk ai set-key <provider>') or
    // MCFDESK_<PROVIDER>_KEY, never here.
    "ai": {
        "provider": "none",
        "model": "",
        "privacy_mode": true
    },

    "chat": {
        "delay_ms": 1000,
        "currency": "₹"
    }
}
"#;

#[derive(Debug)]
pub enum SettingsError {
    Read(PathBuf, String),
    Parse(PathBuf, String),
    Write(PathBuf, String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Read(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            SettingsError::Parse(path, e) => write!(f, "invalid settings in {}: {}", path.display(), e),
            SettingsError::Write(path, e) => write!(f, "cannot write {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for SettingsError {}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mcfdesk")
            .join("settings.json")
    }

    pub fn config_path_display() -> String {
        Self::config_path().display().to_string()
    }

    /// Read the user's settings file, writing a commented one on first run.
    /// A file that fails to load is logged and defaults are used.
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("{}; using default settings", e);
                Self::default()
            });
        }

        match write_file(&path, DEFAULT_FILE) {
            Ok(()) => log::info!("wrote default settings to {}", path.display()),
            Err(e) => log::warn!("{}", e),
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|e| SettingsError::Read(path.to_path_buf(), e.to_string()))?;
        Self::parse(&text).map_err(|e| SettingsError::Parse(path.to_path_buf(), e.to_string()))
    }

    /// JSON, plus whole-line `//` comments.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let json: String = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("//"))
            .flat_map(|line| [line, "\n"])
            .collect();
        serde_json::from_str(&json)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SettingsError::Write(path.to_path_buf(), e.to_string()))?;
        write_file(path, &json)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), SettingsError> {
    let fail = |e: std::io::Error| SettingsError::Write(path.to_path_buf(), e.to_string());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    fs::write(path, contents).map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.chat.delay_ms, 1000);
        assert_eq!(s.chat.currency, "₹");
        assert_eq!(s.ai.provider, AIProvider::None);
        assert!(s.ai.privacy_mode);
        assert!(s.sheets.spreadsheet_id.is_none());
    }

    #[test]
    fn test_effective_model() {
        let mut ai = AISettings { provider: AIProvider::Gemini, ..Default::default() };
        assert_eq!(ai.effective_model(), "gemini-1.5-flash-latest");
        ai.model = "gemini-2.0-flash".into();
        assert_eq!(ai.effective_model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_load_with_comments_and_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n  // source\n  \"sheets\": { \"spreadsheet_id\": \"1AbC\" },\n  \"ai\": { \"provider\": \"openai\" }\n}\n",
        )
        .unwrap();

        let s = Settings::load_from(&path).unwrap();
        assert_eq!(s.sheets.spreadsheet_id.as_deref(), Some("1AbC"));
        assert_eq!(s.ai.provider, AIProvider::OpenAI);
        assert_eq!(s.chat, ChatSettings::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.chat.currency = "$".into();
        s.sheets.layout_path = Some(PathBuf::from("layout.toml"));
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), s);
    }

    #[test]
    fn test_default_file_parses() {
        assert_eq!(Settings::parse(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ \"chat\": { \"delay_ms\": \"soon\" } }").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Parse(..))));
    }
}
