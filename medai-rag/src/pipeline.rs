//! Offline index construction.
//!
//! The [`IndexBuilder`] runs the ingest workflow once, ahead of serving:
//! chunk the source text, embed every chunk in batches, and assemble a
//! [`VectorIndex`] whose rows follow chunk order.
//!
//! # Example
//!
//! ```rust,ignore
//! use medai_rag::{IndexBuilder, RagConfig, RecursiveChunker};
//!
//! let builder = IndexBuilder::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .chunker(Arc::new(RecursiveChunker::new(500, 50)))
//!     .build()?;
//!
//! let index = builder.build_from_file("nephrology.pdf").await?;
//! index.persist("embeddings/index")?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::extract_text;
use crate::index::VectorIndex;

/// Number of chunks sent per embedding request unless overridden.
const DEFAULT_BATCH_SIZE: usize = 32;

/// Builds a [`VectorIndex`] from raw document text.
///
/// Construct one via [`IndexBuilder::builder()`].
pub struct IndexBuilder {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    batch_size: usize,
}

impl IndexBuilder {
    /// Create a new [`IndexBuilderBuilder`].
    pub fn builder() -> IndexBuilderBuilder {
        IndexBuilderBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Chunk, embed, and index `text`.
    ///
    /// # Errors
    ///
    /// - [`RagError::ChunkingError`] if the text produces no chunks
    /// - [`RagError::PipelineError`] if embedding fails
    /// - any error from [`VectorIndex::build`]
    pub async fn build(&self, text: &str) -> Result<VectorIndex> {
        // 1. Chunk the document
        let chunks = self.chunker.split(text);
        if chunks.is_empty() {
            return Err(RagError::ChunkingError("document produced no chunks".to_string()));
        }

        // 2. Embed in batches, preserving chunk order
        let mut embeddings = Vec::with_capacity(chunks.len());
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let batch_embeddings =
                self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                    error!(batch_index, error = %e, "embedding failed during index build");
                    RagError::PipelineError(format!("embedding failed for batch {batch_index}: {e}"))
                })?;
            if batch_embeddings.len() != batch.len() {
                return Err(RagError::PipelineError(format!(
                    "provider returned {} embeddings for {} chunks",
                    batch_embeddings.len(),
                    batch.len()
                )));
            }
            embeddings.extend(batch_embeddings);
        }

        // 3. Assemble the index
        let index = VectorIndex::build(
            self.embedding_provider.model_id(),
            self.embedding_provider.dimensions(),
            embeddings,
            chunks.into_iter().map(|c| c.text).collect(),
        )?;

        info!(
            chunk_count = index.len(),
            dimension = index.dimension(),
            model = %index.model_id(),
            "built index"
        );
        Ok(index)
    }

    /// Extract the text of the document at `path` and [`build`](Self::build) from it.
    pub async fn build_from_file(&self, path: impl AsRef<Path>) -> Result<VectorIndex> {
        let text = extract_text(path).await?;
        self.build(&text).await
    }
}

/// Builder for constructing an [`IndexBuilder`].
///
/// `embedding_provider` is required. The chunker defaults to a
/// [`RecursiveChunker`] sized from the configuration, and the configuration
/// defaults to [`RagConfig::default()`].
#[derive(Default)]
pub struct IndexBuilderBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    batch_size: Option<usize>,
}

impl IndexBuilderBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set how many chunks go into one embedding request.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Build the [`IndexBuilder`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedding provider is missing,
    /// the configuration is invalid, or the batch size is zero.
    pub fn build(self) -> Result<IndexBuilder> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;

        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }

        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(IndexBuilder { config, embedding_provider, chunker, batch_size })
    }
}
