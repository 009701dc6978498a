//! AI provider resolution: which provider answers, with which model, and
//! where its API key came from.
//!
//! Keys are looked up in the system keychain first, then in
//! `MCFDESK_<PROVIDER>_KEY`. settings.json never holds a key.

use std::env;
use std::fmt;

use serde::Serialize;

use crate::secrets::{self, SecretError};
use crate::settings::{AIProvider, AISettings, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Keychain,
    Environment,
    None,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        })
    }
}

/// An API key and where it was found. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub value: String,
    pub source: KeySource,
}

impl ApiKey {
    pub fn new(value: impl Into<String>, source: KeySource) -> Self {
        Self { value: value.into(), source }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey").field("source", &self.source).finish_non_exhaustive()
    }
}

pub fn env_var_name(provider: &str) -> String {
    format!("MCFDESK_{}_KEY", provider.to_uppercase())
}

fn account(provider: &str) -> String {
    format!("ai/{}", provider.to_lowercase())
}

/// Keychain entry for `provider`, else its environment variable.
pub fn find_api_key(provider: &str) -> Option<ApiKey> {
    pick_key(secrets::read(&account(provider)), env::var(env_var_name(provider)).ok())
}

fn pick_key(keychain: Option<String>, environment: Option<String>) -> Option<ApiKey> {
    let present = |v: Option<String>| v.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    present(keychain)
        .map(|v| ApiKey::new(v, KeySource::Keychain))
        .or_else(|| present(environment).map(|v| ApiKey::new(v, KeySource::Environment)))
}

pub fn set_api_key(provider: &str, key: &str) -> Result<(), SecretError> {
    secrets::write(&account(provider), key)?;
    log::info!("stored {} key in keychain", provider);
    Ok(())
}

pub fn delete_api_key(provider: &str) -> Result<(), SecretError> {
    secrets::remove(&account(provider))
}

// ============================================================================
// Resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AIConfigStatus {
    /// provider = none
    Disabled,
    Ready,
    /// Accepted in settings but no client exists yet
    NotImplemented,
    MissingKey,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::NotImplemented => "not_implemented",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        *self == Self::Ready
    }
}

/// Settings plus the key lookup, reduced to what a client needs.
#[derive(Debug, Clone)]
pub struct ResolvedAIConfig {
    pub provider: AIProvider,
    /// Empty when disabled
    pub model: String,
    pub endpoint: Option<String>,
    pub privacy_mode: bool,
    pub api_key: Option<ApiKey>,
    pub status: AIConfigStatus,
}

impl ResolvedAIConfig {
    pub fn from_settings(settings: &AISettings) -> Self {
        let key = if settings.provider.needs_api_key() {
            find_api_key(settings.provider.name())
        } else {
            None
        };
        Self::resolve(settings, key)
    }

    pub fn resolve(settings: &AISettings, key: Option<ApiKey>) -> Self {
        let provider = settings.provider;
        let status = if !provider.is_enabled() {
            AIConfigStatus::Disabled
        } else if key.is_none() {
            AIConfigStatus::MissingKey
        } else if !provider.is_implemented() {
            AIConfigStatus::NotImplemented
        } else {
            AIConfigStatus::Ready
        };
        let enabled = status != AIConfigStatus::Disabled;

        Self {
            provider,
            model: if enabled { settings.effective_model().to_string() } else { String::new() },
            endpoint: settings.endpoint.clone().filter(|e| enabled && !e.trim().is_empty()),
            privacy_mode: settings.privacy_mode,
            api_key: key.filter(|_| enabled),
            status,
        }
    }

    pub fn load() -> Self {
        Self::from_settings(&Settings::load().ai)
    }

    /// Why the assistant cannot be used, if it cannot.
    pub fn blocking_reason(&self) -> Option<String> {
        match self.status {
            AIConfigStatus::Disabled | AIConfigStatus::Ready => None,
            AIConfigStatus::MissingKey => Some(format!(
                "no API key: run 'mcfdesk ai set-key {}' or set {}",
                self.provider_name(),
                env_var_name(self.provider_name())
            )),
            AIConfigStatus::NotImplemented => {
                Some(format!("provider '{}' has no client yet", self.provider_name()))
            }
        }
    }

    pub fn key_source(&self) -> KeySource {
        self.api_key.as_ref().map_or(KeySource::None, |k| k.source)
    }

    /// What the prompt may carry about the data.
    pub fn context_policy(&self) -> &'static str {
        if self.privacy_mode {
            "aggregates_only"
        } else {
            "aggregates_and_samples"
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

// ============================================================================
// ai doctor
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AIDiagnostics {
    pub provider: String,
    pub status: AIConfigStatus,
    pub blocking_reason: Option<String>,
    pub model: String,
    pub key_present: bool,
    pub key_source: KeySource,
    pub keychain_available: bool,
    pub endpoint: Option<String>,
    pub privacy_mode: bool,
    pub context_policy: String,
}

impl AIDiagnostics {
    pub fn from_resolved(config: &ResolvedAIConfig) -> Self {
        Self {
            provider: config.provider_name().to_string(),
            status: config.status,
            blocking_reason: config.blocking_reason(),
            model: config.model.clone(),
            key_present: config.api_key.is_some(),
            key_source: config.key_source(),
            keychain_available: secrets::available(),
            endpoint: config.endpoint.clone(),
            privacy_mode: config.privacy_mode,
            context_policy: config.context_policy().to_string(),
        }
    }
}

impl fmt::Display for AIDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        writeln!(f, "provider   {} ({})", self.provider, self.status.as_str())?;
        if !self.model.is_empty() {
            writeln!(f, "model      {}", self.model)?;
        }
        match self.key_source {
            KeySource::None => writeln!(f, "api key    missing")?,
            source => writeln!(f, "api key    from {}", source)?,
        }
        writeln!(f, "keychain   {}", if self.keychain_available { "available" } else { "unavailable" })?;
        writeln!(f, "endpoint   {}", self.endpoint.as_deref().unwrap_or("provider default"))?;
        writeln!(f, "privacy    {} ({})", on_off(self.privacy_mode), self.context_policy)?;
        if let Some(reason) = &self.blocking_reason {
            writeln!(f, "\n{}", reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: AIProvider) -> AISettings {
        AISettings { provider, ..Default::default() }
    }

    fn env_key(k: &str) -> Option<ApiKey> {
        Some(ApiKey::new(k, KeySource::Environment))
    }

    #[test]
    fn test_names() {
        assert_eq!(env_var_name("gemini"), "MCFDESK_GEMINI_KEY");
        assert_eq!(env_var_name("OpenAI"), "MCFDESK_OPENAI_KEY");
        assert_eq!(account("Gemini"), "ai/gemini");
    }

    #[test]
    fn test_keychain_beats_environment() {
        let key = pick_key(Some("kc".into()), Some("env".into())).unwrap();
        assert_eq!(key, ApiKey::new("kc", KeySource::Keychain));

        let key = pick_key(None, Some(" env-key \n".into())).unwrap();
        assert_eq!(key, ApiKey::new("env-key", KeySource::Environment));

        // Blank values count as missing
        assert_eq!(pick_key(Some("  ".into()), Some(String::new())), None);
    }

    #[test]
    fn test_debug_hides_key() {
        let key = ApiKey::new("sk-secret", KeySource::Keychain);
        assert!(!format!("{:?}", key).contains("sk-secret"));
    }

    #[test]
    fn test_resolve_disabled() {
        let config = ResolvedAIConfig::resolve(&settings(AIProvider::None), env_key("ignored"));
        assert_eq!(config.status, AIConfigStatus::Disabled);
        assert!(config.api_key.is_none());
        assert!(config.model.is_empty());
        assert_eq!(config.blocking_reason(), None);
    }

    #[test]
    fn test_resolve_ready_with_default_model() {
        let config = ResolvedAIConfig::resolve(&settings(AIProvider::Gemini), env_key("g-key"));
        assert!(config.status.is_ready());
        assert_eq!(config.model, "gemini-1.5-flash-latest");
        assert_eq!(config.api_key.as_ref().map(|k| k.value.as_str()), Some("g-key"));
        assert_eq!(config.key_source(), KeySource::Environment);
    }

    #[test]
    fn test_resolve_missing_key() {
        let config = ResolvedAIConfig::resolve(&settings(AIProvider::OpenAI), None);
        assert_eq!(config.status, AIConfigStatus::MissingKey);
        assert!(config.blocking_reason().unwrap().contains("MCFDESK_OPENAI_KEY"));
    }

    #[test]
    fn test_resolve_not_implemented() {
        let config = ResolvedAIConfig::resolve(&settings(AIProvider::Anthropic), env_key("a-key"));
        assert_eq!(config.status, AIConfigStatus::NotImplemented);
        assert!(config.blocking_reason().unwrap().contains("anthropic"));
    }

    #[test]
    fn test_blank_endpoint_ignored() {
        let s = AISettings { provider: AIProvider::OpenAI, endpoint: Some("  ".into()), ..Default::default() };
        assert!(ResolvedAIConfig::resolve(&s, env_key("k")).endpoint.is_none());
    }

    #[test]
    fn test_diagnostics_render() {
        let config = ResolvedAIConfig::resolve(&settings(AIProvider::Gemini), env_key("g"));
        let diag = AIDiagnostics::from_resolved(&config);
        let text = diag.to_string();
        assert!(text.contains("provider   gemini (ready)"));
        assert!(text.contains("api key    from environment"));
        assert!(text.contains("privacy    on (aggregates_only)"));

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["key_source"], "environment");
    }
}
