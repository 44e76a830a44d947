//! Question-time retrieval against a loaded [`VectorIndex`].

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::RetrievedChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embeds questions and returns the indexed chunks close enough to answer them.
///
/// # Example
///
/// ```rust,ignore
/// let index = Arc::new(VectorIndex::load("embeddings/index", provider.model_id())?);
/// let retriever = Retriever::new(provider, index, RagConfig::default())?;
/// let relevant = retriever.retrieve("What does the kidney filter?").await?;
/// ```
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    config: RagConfig,
}

impl Retriever {
    /// Pair an embedding provider with the index it must query.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `config` is invalid
    /// - [`RagError::ModelMismatch`] if the index was built with another model
    /// - [`RagError::DimensionMismatch`] if the provider's dimension differs from the index
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        config: RagConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedding_provider.model_id() != index.model_id() {
            return Err(RagError::ModelMismatch {
                stored: index.model_id().to_string(),
                expected: embedding_provider.model_id().to_string(),
            });
        }
        if embedding_provider.dimensions() != index.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedding_provider.dimensions(),
            });
        }
        Ok(Self { embedding_provider, index, config })
    }

    /// Return a reference to the retrieval configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the queried index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Retrieve with the configured `top_k` and `distance_threshold`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_with(question, self.config.top_k, self.config.distance_threshold).await
    }

    /// Embed `question`, take its `k` nearest chunks, and keep those strictly
    /// closer than `distance_threshold`, nearest first.
    ///
    /// An empty result is a normal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the question cannot be embedded
    /// and [`RagError::DimensionMismatch`] if the provider returns a vector of
    /// the wrong length.
    pub async fn retrieve_with(
        &self,
        question: &str,
        k: usize,
        distance_threshold: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let hits = self.index.search(&query_embedding, k)?;
        debug!(distances = ?hits.iter().map(|h| h.distance).collect::<Vec<_>>(), "nearest chunks");

        let relevant: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter(|hit| hit.distance < distance_threshold)
            .filter_map(|hit| {
                self.index.chunk(hit.row).map(|chunk| RetrievedChunk { chunk, distance: hit.distance })
            })
            .collect();

        info!(k, distance_threshold, result_count = relevant.len(), "retrieval completed");
        Ok(relevant)
    }
}
