// client.rs - the HTTP embedder
use crate::embedder::{Batcher, EmbeddingModelInfo, EmbeddingRequest, EmbeddingResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Embedding server returned error status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Expected {expected} embeddings, server returned {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("Expected {expected}-dimensional embeddings, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Anything that turns texts into vectors, one vector per text, in order
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &EmbeddingModelInfo;

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single query string
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed(vec![query.to_string()]).await?;
        vectors.pop().ok_or(EmbedError::CountMismatch {
            expected: 1,
            got: 0,
        })
    }
}

pub struct EmbeddingClient {
    http: Client,
    endpoint: String,
    model: EmbeddingModelInfo,
    batcher: Batcher,
}

impl EmbeddingClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_model(endpoint, EmbeddingModelInfo::default())
    }

    pub fn with_model(endpoint: impl Into<String>, model: EmbeddingModelInfo) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            batcher: Batcher::new(model.max_batch),
            model,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let expected = texts.len();
        let req = EmbeddingRequest {
            model: self.model.name.clone(),
            texts,
        };

        let response = self
            .http
            .post(format!("{}/embed", self.endpoint))
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbedError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let res: EmbeddingResponse = response.json().await?;
        if res.embeddings.len() != expected {
            return Err(EmbedError::CountMismatch {
                expected,
                got: res.embeddings.len(),
            });
        }

        if self.model.has_known_dim() {
            if let Some(bad) = res.embeddings.iter().find(|v| v.len() != self.model.dim) {
                return Err(EmbedError::DimensionMismatch {
                    expected: self.model.dim,
                    got: bad.len(),
                });
            }
        }

        Ok(res.embeddings)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    fn model(&self) -> &EmbeddingModelInfo {
        &self.model
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batches = self.batcher.split(&texts);
        debug!(
            "Embedding {} texts in {} batches with {}",
            texts.len(),
            batches.len(),
            self.model.name
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in batches {
            embeddings.extend(self.embed_batch(batch.to_vec()).await?);
        }

        Ok(embeddings)
    }
}
