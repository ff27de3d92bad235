//! Error taxonomy for the indexing and retrieval core.
//!
//! A message that strips down to nothing is not an error: it simply
//! yields zero chunks, and the corpus walker reports it separately from
//! parse failures.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required header (`Subject:`, `From:` or `To:`) is absent or empty.
    #[error("malformed message: missing or empty `{field}:` header")]
    MalformedMessage { field: &'static str },

    /// The persisted index failed structural or dimensionality validation.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// Cosine similarity is undefined for a zero-norm vector.
    #[error("degenerate vector: {0}")]
    DegenerateVector(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding backend could not produce vectors.
    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    /// A persisted store backend failed for reasons other than corruption.
    #[error("index storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptIndex(message.into())
    }

    pub fn embedder(message: impl Into<String>) -> Self {
        Self::EmbedderUnavailable(message.into())
    }
}
