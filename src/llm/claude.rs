use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::provider::{check_temperature, error_for_status};
use super::types::{ChatMessage, MessagesRequest, MessagesResponse};
use super::{LlmError, LlmProvider};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, ANTHROPIC_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(180)) // 3 min for LLM generation
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        check_temperature(temperature)?;

        let url = format!("{}/v1/messages", self.base_url);
        let req = MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            temperature,
            messages: vec![ChatMessage::user(prompt)],
        };

        debug!("Claude request to {} with {}", url, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;

        let res: MessagesResponse = error_for_status(response).await?.json().await?;
        res.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| LlmError::ParseError("missing content[0].text".into()))
    }
}
