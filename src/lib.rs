// Public API exports
pub mod chunker;
pub mod config;
pub mod document;
pub mod embedder;
pub mod indexer;
pub mod llm;
pub mod qa;
pub mod render;
pub mod similarity;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use chunker::{chunk_text, ChunkConfig, ChunkError};

pub use config::Settings;

pub use document::{collect_text_files, Document, DocumentChunk};

pub use embedder::{Batcher, EmbedError, Embedder, EmbeddingClient, EmbeddingModelInfo};

pub use indexer::{create_index, query_index, IndexReport};

pub use llm::{create_provider, LlmError, LlmProvider};

pub use qa::{answer_question, format_qa_prompt, Answer};

pub use similarity::DistanceMetric;

pub use store::{Collection, QueryHit, StoreError, VectorStore};
