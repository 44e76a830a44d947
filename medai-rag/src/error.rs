//! Error types for the `medai-rag` crate.

use thiserror::Error;

/// Errors that can occur while building, loading, or querying the index.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A vector did not have the dimension the index was built with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension fixed by the index.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// The persisted index and its chunk list disagree, or one of them is missing.
    #[error("Index integrity error: {0}")]
    IntegrityError(String),

    /// The persisted index was built with a different embedding model.
    #[error("Embedding model mismatch: index built with '{stored}', runtime uses '{expected}'")]
    ModelMismatch {
        /// Model identity stored in the index.
        stored: String,
        /// Model identity of the runtime embedding provider.
        expected: String,
    },

    /// Text could not be extracted from a source document.
    #[error("Extraction error ({path}): {message}")]
    ExtractionError {
        /// The source document path.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the offline build orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem failure while reading or writing index artifacts.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Index artifacts could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
