// Shared fixtures for unit tests
use async_trait::async_trait;
use axum::Router;
use std::sync::Mutex;
use tokio::net::TcpListener;

use crate::embedder::{EmbedError, Embedder, EmbeddingModelInfo};
use crate::llm::{LlmError, LlmProvider};

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{}", addr)
}

/// Letter-frequency embedder: texts sharing letters land close together
pub struct LetterEmbedder {
    model: EmbeddingModelInfo,
}

impl LetterEmbedder {
    pub fn new() -> Self {
        Self::named("letters")
    }

    pub fn named(name: &str) -> Self {
        Self {
            model: EmbeddingModelInfo::new(name, 26, 8),
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut counts = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }

        let norm = counts.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            counts.iter_mut().for_each(|x| *x /= norm);
        }
        counts
    }
}

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model(&self) -> &EmbeddingModelInfo {
        &self.model
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Language model that records prompts and answers with a fixed reply
pub struct RecordingLlm {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    fn model(&self) -> &str {
        "recording"
    }

    async fn complete(
        &self,
        prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}
