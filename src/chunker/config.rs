use super::{ChunkError, CHARS_PER_OVERLAP_WORD, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Validated chunking parameters, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    max_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Validate raw parameters as they arrive from the command line or a
    /// settings file.
    pub fn new(max_size: i64, overlap: i64) -> Result<Self, ChunkError> {
        if max_size <= 0 {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk size must be a positive integer, got {}",
                max_size
            )));
        }
        if overlap < 0 {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk overlap must be a non-negative integer, got {}",
                overlap
            )));
        }
        if overlap >= max_size {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk size ({}) must be larger than chunk overlap ({})",
                max_size, overlap
            )));
        }

        let max_size = usize::try_from(max_size).map_err(|_| {
            ChunkError::InvalidConfig(format!("chunk size {} does not fit in memory", max_size))
        })?;
        let overlap = usize::try_from(overlap).map_err(|_| {
            ChunkError::InvalidConfig(format!("chunk overlap {} does not fit in memory", overlap))
        })?;

        Ok(Self { max_size, overlap })
    }

    /// Maximum characters per chunk
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Characters shared between consecutive chunks
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of two consecutive character windows
    pub fn stride(&self) -> usize {
        self.max_size - self.overlap
    }

    /// Number of trailing words carried into the next chunk at a paragraph break
    pub fn overlap_words(&self) -> usize {
        self.overlap / CHARS_PER_OVERLAP_WORD
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
