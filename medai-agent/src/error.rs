//! Error types for the `medai-agent` crate.

use medai_rag::RagError;
use thiserror::Error;

/// Errors raised by the assistant's services and data loaders.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The answer generator failed or timed out.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The patient data file could not be read or parsed.
    #[error("Patient data error ({path}): {message}")]
    PatientData {
        /// Path of the patient data file.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The session log could not be written.
    #[error("Session log error: {0}")]
    SessionLog(String),

    /// An error propagated from `medai-rag`.
    #[error(transparent)]
    Rag(#[from] RagError),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for assistant operations.
pub type Result<T> = std::result::Result<T, AgentError>;
