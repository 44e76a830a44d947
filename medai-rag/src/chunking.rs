//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] — splits by character count with configurable overlap
//! - [`RecursiveChunker`] — prefers paragraph, line, sentence, then word boundaries
//!
//! Both measure sizes in characters (Unicode scalar values) and guarantee
//! that consecutive chunks share exactly `chunk_overlap` characters, so the
//! original text is recovered by concatenating the first chunk with every
//! later chunk minus its leading overlap.

use crate::document::Chunk;

/// Separators tried by [`RecursiveChunker`], highest priority first.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting document text into overlapping chunks.
pub trait Chunker: Send + Sync {
    /// Split text into ordered chunks.
    ///
    /// Returns an empty `Vec` if the text is empty. No returned chunk is empty.
    fn split(&self, text: &str) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// # Example
///
/// ```rust
/// use medai_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1);
/// let chunks = chunker.split("abcdefghij");
/// assert_eq!(chunks[0].text, "abcd");
/// assert_eq!(chunks[1].text, "defg");
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    ///
    /// Parameters are expected to come from a validated
    /// [`RagConfig`](crate::RagConfig); an overlap that is not smaller than
    /// the chunk size is clamped to `chunk_size - 1`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<Chunk> {
        split_windows(text, self.chunk_size, self.chunk_overlap, &[])
    }
}

/// Splits text on the most natural boundary that fits in each window.
///
/// For every chunk that cannot hold the rest of the text, the end is placed
/// just after the last paragraph break in the window; failing that, the last
/// line break, then sentence end, then space. A boundary is only accepted in
/// the second half of the window, so chunks stay reasonably full. When no
/// boundary qualifies the chunk is cut at exactly `chunk_size` characters.
///
/// # Example
///
/// ```rust
/// use medai_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(500, 50);
/// let chunks = chunker.split("The kidney filters blood.");
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    ///
    /// The same clamping as [`FixedSizeChunker::new`] applies.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<Chunk> {
        split_windows(text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
    }
}

/// Walk the text window by window, ending each window on the best separator.
///
/// Positions are tracked in characters; `bounds[p]` is the byte offset of
/// character `p`, with a trailing entry for `text.len()`.
fn split_windows(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let bounds: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        if char_count - start <= chunk_size {
            chunks.push(Chunk { index: chunks.len(), text: text[bounds[start]..].to_string() });
            break;
        }

        let window_end = start + chunk_size;
        // The next chunk starts `chunk_overlap` before this one ends; the end
        // must stay past that point or the walk would not advance.
        let min_end = start + (chunk_overlap + 1).max(chunk_size / 2);
        let end = find_boundary(text, &bounds, start, window_end, min_end, separators)
            .unwrap_or(window_end);

        chunks.push(Chunk { index: chunks.len(), text: text[bounds[start]..bounds[end]].to_string() });
        start = end - chunk_overlap;
    }

    chunks
}

/// Find the character position just after the highest-priority separator
/// whose last occurrence in `[start, window_end)` ends at or after `min_end`.
fn find_boundary(
    text: &str,
    bounds: &[usize],
    start: usize,
    window_end: usize,
    min_end: usize,
    separators: &[&str],
) -> Option<usize> {
    let window = &text[bounds[start]..bounds[window_end]];

    separators.iter().find_map(|separator| {
        let found = window.rfind(separator)?;
        let end_byte = bounds[start] + found + separator.len();
        // Separators are ASCII, so the end is always on a character boundary.
        let end = bounds.binary_search(&end_byte).ok()?;
        (end >= min_end).then_some(end)
    })
}
