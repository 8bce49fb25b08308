mod config;
mod error;
mod splitter;


pub use config::ChunkConfig;
pub use error::ChunkError;
pub use splitter::{chunk_text, split};

/// Default maximum characters per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default characters shared between adjacent chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Assumed average word length (with its trailing space) used to turn a
/// character overlap into a word count at paragraph boundaries
pub const CHARS_PER_OVERLAP_WORD: usize = 5;
