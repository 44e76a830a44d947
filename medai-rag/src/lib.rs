//! Retrieval core of the MedAI assistant.
//!
//! This crate provides:
//! - Boundary-aware, overlap-exact text chunking
//! - The embedding provider seam and an OpenAI-compatible HTTP provider
//! - A flat squared-L2 vector index persisted with its chunk list
//! - A thresholded retriever and the offline index builder

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod retriever;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, RetrievedChunk, SearchHit};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::extract_text;
pub use index::{CHUNKS_FILE, VECTORS_FILE, VectorIndex};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{IndexBuilder, IndexBuilderBuilder};
pub use retriever::Retriever;
