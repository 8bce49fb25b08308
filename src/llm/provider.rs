use async_trait::async_trait;
use std::env;

use super::{ClaudeProvider, DeepSeekProvider, ANTHROPIC_API_KEY_VAR, DEEPSEEK_API_KEY_VAR};

/// A hosted language model that answers a single-turn prompt
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier sent to the API
    fn model(&self) -> &str;

    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API returned error status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("{0} environment variable not set. Please set your API key first.")]
    MissingApiKey(&'static str),

    #[error("Temperature must be between 0.0 and 1.0, got {0}")]
    InvalidTemperature(f32),
}

/// Which API serves a given model name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Claude,
    DeepSeek,
}

impl ProviderKind {
    /// `deepseek*` models go to DeepSeek, everything else to Anthropic
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("deepseek") {
            Self::DeepSeek
        } else {
            Self::Claude
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Claude => ANTHROPIC_API_KEY_VAR,
            Self::DeepSeek => DEEPSEEK_API_KEY_VAR,
        }
    }
}

/// Create the provider for `model`, reading its API key from the environment
pub fn create_provider(model: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
    let kind = ProviderKind::for_model(model);
    let var = kind.api_key_var();
    let api_key = env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(LlmError::MissingApiKey(var))?;

    Ok(match kind {
        ProviderKind::Claude => Box::new(ClaudeProvider::new(api_key, model.to_string())),
        ProviderKind::DeepSeek => Box::new(DeepSeekProvider::new(api_key, model.to_string())),
    })
}

/// Reject sampling temperatures outside the range both APIs accept
pub(crate) fn check_temperature(temperature: f32) -> Result<(), LlmError> {
    if (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(LlmError::InvalidTemperature(temperature))
    }
}

/// Turn a non-success response into an `ApiError`
pub(crate) async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(LlmError::ApiError {
        status: status.as_u16(),
        body: error_message(&body).unwrap_or(body),
    })
}

/// Both APIs report failures as `{"error": {"message": ...}}`
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
