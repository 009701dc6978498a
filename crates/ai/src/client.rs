// Provider clients for the AI fallback
//
// Blocking HTTP calls to Gemini generateContent and OpenAI chat completions.
// Call from the conversation loop only; nothing here retries.

use std::time::Duration;

use mcfdesk_config::ai::ResolvedAIConfig;
use mcfdesk_config::settings::AIProvider;
use mcfdesk_recon::{DataContext, Reply};
use serde::{Deserialize, Serialize};

use crate::prompt::{build_prompt, build_system_prompt, parse_reply};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub enum AskError {
    /// provider = none
    NotConfigured(String),
    /// Provider accepted in settings but has no client
    NotImplemented(String),
    MissingKey,
    NetworkError(String),
    ApiError { status: u16, message: String },
    /// Body was not the provider's response shape
    ParseError(String),
    /// Completion was not a usable answer or action
    InvalidResponse(String),
}

impl std::fmt::Display for AskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AskError::NotConfigured(msg) => write!(f, "AI fallback off: {}", msg),
            AskError::NotImplemented(msg) => write!(f, "{}", msg),
            AskError::MissingKey => write!(f, "no API key for the AI provider"),
            AskError::NetworkError(msg) => write!(f, "request failed: {}", msg),
            AskError::ApiError { status, message } => write!(f, "provider returned {}: {}", status, message),
            AskError::ParseError(msg) => write!(f, "unreadable provider response: {}", msg),
            AskError::InvalidResponse(msg) => write!(f, "unusable reply: {}", msg),
        }
    }
}

impl std::error::Error for AskError {}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

// ============================================================================
// OpenAI API types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

/// Both providers wrap failures as {"error": {"message": ...}}
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Assistant
// ============================================================================

/// A configured AI provider.
pub struct Assistant {
    config: ResolvedAIConfig,
    api_key: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl Assistant {
    /// Fails when the provider is disabled, has no client, or has no key.
    pub fn new(config: ResolvedAIConfig) -> Result<Self, AskError> {
        let default_base = match config.provider {
            AIProvider::None => return Err(AskError::NotConfigured("AI is disabled".to_string())),
            AIProvider::Gemini => GEMINI_API_BASE,
            AIProvider::OpenAI => OPENAI_API_BASE,
            AIProvider::Anthropic => {
                return Err(AskError::NotImplemented(format!(
                    "{} provider not yet implemented",
                    config.provider.name()
                )));
            }
        };
        let api_key = config.api_key.as_ref().map(|k| k.value.clone()).ok_or(AskError::MissingKey)?;
        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| default_base.to_string())
            .trim_end_matches('/')
            .to_string();

        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AskError::NetworkError(e.to_string()))?;

        Ok(Self { config, api_key, base_url, http })
    }

    /// Point the client at another API base (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask about the loaded data. The completion is validated before it is
    /// returned.
    pub fn ask(&self, ctx: &DataContext, message: &str) -> Result<Reply, AskError> {
        let system_prompt = build_system_prompt();
        let user_prompt = build_prompt(ctx, message, self.config.privacy_mode);
        log::info!(
            "asking {} ({}), privacy mode {}",
            self.provider_name(),
            self.config.model,
            if self.config.privacy_mode { "on" } else { "off" }
        );
        let content = self.complete(&system_prompt, &user_prompt)?;
        log::debug!("AI raw reply: {}", content);
        parse_reply(&content)
    }

    /// Raw completion text for a system and user prompt.
    pub fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AskError> {
        match self.config.provider {
            AIProvider::Gemini => self.call_gemini(system_prompt, user_prompt),
            AIProvider::OpenAI => self.call_openai(system_prompt, user_prompt),
            other => Err(AskError::NotImplemented(format!("{} provider not yet implemented", other.name()))),
        }
    }

    fn call_gemini(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AskError> {
        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system_prompt.to_string() }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: user_prompt.to_string() }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_TOKENS,
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.config.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| AskError::NetworkError(e.to_string()))?;

        let body: GeminiResponse = read_success(response)?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .ok_or_else(|| AskError::InvalidResponse("No candidates in response".to_string()))?;

        if text.trim().is_empty() {
            return Err(AskError::InvalidResponse("Empty completion".to_string()));
        }
        Ok(text)
    }

    fn call_openai(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AskError> {
        let request = OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: Some(OpenAIResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .map_err(|e| AskError::NetworkError(e.to_string()))?;

        let body: OpenAIResponse = read_success(response)?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AskError::InvalidResponse("No choices in response".to_string()))
    }
}

/// Decode a 2xx body, or turn the provider's error body into `ApiError`.
fn read_success<T: serde::de::DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T, AskError> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&error_text) {
            Ok(body) => body.error.message,
            Err(_) => error_text,
        };
        log::warn!("AI request failed with HTTP {}", status.as_u16());
        return Err(AskError::ApiError { status: status.as_u16(), message });
    }

    response.json().map_err(|e| AskError::ParseError(e.to_string()))
}
