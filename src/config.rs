//! Runtime settings.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line flags (applied by the binary). API keys are never read from
//! the file, only from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chunker::{ChunkConfig, ChunkError, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedder::{EmbeddingModelInfo, DEFAULT_EMBEDDING_ENDPOINT};
use crate::llm::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::similarity::DistanceMetric;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "text_collector.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Name of the collection chunks are stored in and queried from
    pub collection_name: String,
    /// SQLite file holding the vector index
    pub db_path: PathBuf,
    /// Maximum characters per chunk
    pub chunk_size: i64,
    /// Characters shared between adjacent chunks
    pub chunk_overlap: i64,
    /// Chunks retrieved per query
    pub num_results: usize,
    pub embedding_model: String,
    pub embedding_endpoint: String,
    pub distance: DistanceMetric,
    /// Language model answering `--ask` (`claude-*` or `deepseek-*`)
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Prompt with `{context}` and `{question}` placeholders
    pub prompt_template: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_name: "text_collection".to_string(),
            db_path: PathBuf::from("text_collector.db"),
            chunk_size: DEFAULT_CHUNK_SIZE as i64,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP as i64,
            num_results: 5,
            embedding_model: EmbeddingModelInfo::default().name,
            embedding_endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            distance: DistanceMetric::default(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt_template: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from `text_collector.toml` in the
    /// working directory if present, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let settings = Self::from_toml_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validated chunking parameters
    pub fn chunk_config(&self) -> Result<ChunkConfig, ChunkError> {
        ChunkConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn embedding_model_info(&self) -> EmbeddingModelInfo {
        EmbeddingModelInfo::from_name(&self.embedding_model)
    }
}
