//! Error types for vector index operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during vector index and embedding operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Failed to connect to or operate on the vector database.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// Failed to generate embeddings.
    #[error("embedding error: {0}")]
    EmbeddingError(String),

    /// Query or record vector does not match the corpus dimension.
    #[error("dimension mismatch in {corpus}: expected {expected}, got {actual}")]
    DimensionMismatch {
        corpus: String,
        expected: usize,
        actual: usize,
    },

    /// Failed to serialize/deserialize data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The expert dataset file does not exist.
    #[error("expert dataset not found at {0:?}")]
    DatasetNotFound(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for vector index operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
