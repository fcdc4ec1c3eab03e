use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::gate::CancelToken;
use crate::prompt::Prompt;

const API_KEY_PREFIX: &str = "AIza";
const API_KEY_MIN_LEN: usize = 21;

/// Finish reason reported when output hit the token limit.
pub const FINISH_MAX_TOKENS: &str = "MAX_TOKENS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("API key rejected: {0}")]
    Unauthorized(String),
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request canceled")]
    Canceled,
}

/// What the host should do with its stored credential after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialAction {
    /// Forget the key and prompt for a new one.
    Clear,
    Retain,
}

impl BackendError {
    /// Only a 401 proves the key itself is bad; a 403 may be quota or
    /// permissions.
    pub fn credential_action(&self) -> CredentialAction {
        match self {
            BackendError::Unauthorized(_) | BackendError::MissingCredential => {
                CredentialAction::Clear
            }
            _ => CredentialAction::Retain,
        }
    }

    pub fn from_status(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            401 => BackendError::Unauthorized(message),
            403 => BackendError::Forbidden(message),
            _ => BackendError::Api { code, message },
        }
    }
}

/// An API key that passed the shape check.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (raw.starts_with(API_KEY_PREFIX) && raw.len() >= API_KEY_MIN_LEN)
            .then(|| Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Request body for `generateContent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: WireGenerationConfig,
}

impl GenerateRequest {
    pub fn new(prompt: &Prompt, config: &GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_wire_text(),
                }],
            }],
            generation_config: WireGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub error: Option<ApiErrorBody>,
}

impl GenerateResponse {
    /// Text of the first candidate, or the API error it carries.
    pub fn into_reply(self) -> Result<BackendReply, BackendError> {
        if let Some(error) = self.error {
            return Err(BackendError::from_status(error.code, error.message));
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(BackendReply::default());
        };
        let truncated = candidate.finish_reason.as_deref() == Some(FINISH_MAX_TOKENS);
        let text = candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .unwrap_or_default();
        Ok(BackendReply { text, truncated })
    }
}

/// Free-form text returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendReply {
    pub text: String,
    /// The model stopped at its output length limit.
    pub truncated: bool,
}

impl BackendReply {
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: false,
        }
    }

    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: true,
        }
    }
}

/// Host-provided transport to the generative endpoint.
///
/// Implementations should stop work and return [`BackendError::Canceled`]
/// once `cancel` fires; a reply that arrives anyway is discarded by the
/// request gate.
pub trait GenerativeBackend {
    fn generate(
        &mut self,
        request: &GenerateRequest,
        cancel: &CancelToken,
    ) -> Result<BackendReply, BackendError>;
}
