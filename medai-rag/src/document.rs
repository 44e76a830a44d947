//! Data types for chunks and search results.

use serde::{Deserialize, Serialize};

/// A contiguous window of a source document.
///
/// `index` is the chunk's position in the ordered sequence produced by the
/// chunker, which is also its row in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the document's chunk sequence.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
}

/// A row returned by a nearest-neighbour search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Row position in the index.
    pub row: usize,
    /// Squared Euclidean distance to the query (lower is closer).
    pub distance: f32,
}

/// A [`Chunk`] that passed the retriever's distance threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Squared Euclidean distance to the question embedding.
    pub distance: f32,
}
