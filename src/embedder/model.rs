// model.rs - stores metadata about the model you're using
use serde::{Deserialize, Serialize};

/// Sentence-transformer models with a known output size
const KNOWN_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("all-mpnet-base-v2", 768),
    ("multi-qa-MiniLM-L6-cos-v1", 384),
    ("google/embeddinggemma-300m", 768),
];

const DEFAULT_MAX_BATCH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelInfo {
    /// Output dimension, 0 when not known ahead of the first response
    pub dim: usize,
    pub name: String,
    pub max_batch: usize,
}

impl EmbeddingModelInfo {
    pub fn new(name: impl Into<String>, dim: usize, max_batch: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            max_batch,
        }
    }

    /// Look up a model by name, with or without the `sentence-transformers/` prefix.
    /// Unknown models get an unknown dimension.
    pub fn from_name(name: &str) -> Self {
        let short = name.strip_prefix("sentence-transformers/").unwrap_or(name);
        let dim = KNOWN_MODELS
            .iter()
            .find(|(known, _)| *known == short)
            .map(|(_, dim)| *dim)
            .unwrap_or(0);

        Self::new(name, dim, DEFAULT_MAX_BATCH)
    }

    pub fn minilm_l6() -> Self {
        Self::new("all-MiniLM-L6-v2", 384, DEFAULT_MAX_BATCH)
    }

    pub fn has_known_dim(&self) -> bool {
        self.dim > 0
    }
}

impl Default for EmbeddingModelInfo {
    fn default() -> Self {
        Self::minilm_l6()
    }
}
