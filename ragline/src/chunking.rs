//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`] breaks at the nearest paragraph, line, sentence or
//!   word boundary inside each window, falling back to a hard cut
//! - [`FixedSizeChunker`] always hard-cuts at the window end
//!
//! Both measure sizes in characters (Unicode scalar values), never split a
//! code point, and start each chunk `chunk_overlap` characters before the end
//! of the previous one. Concatenating the chunks of a document while dropping
//! the first `chunk_overlap` characters of every chunk after the first
//! reproduces the document text exactly.

use tracing::debug;

use crate::config::validate_chunking;
use crate::document::{Chunk, Document, SOURCE_URI_KEY};
use crate::error::Result;

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split every document with a [`RecursiveChunker`], preserving document order.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if
/// `chunk_size == 0` or `chunk_overlap >= chunk_size`.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let chunker = RecursiveChunker::new(chunk_size, chunk_overlap)?;
    let chunks: Vec<Chunk> = documents.iter().flat_map(|doc| chunker.chunk(doc)).collect();
    debug!(document_count = documents.len(), chunk_count = chunks.len(), "split documents");
    Ok(chunks)
}

/// Splits text into windows of at most `chunk_size` characters, preferring to
/// end each window on a natural boundary.
///
/// Boundaries are tried in priority order: paragraph (`\n\n`), line (`\n`),
/// sentence (`.`, `!` or `?` followed by whitespace), then word (whitespace).
/// Within a class the latest boundary wins. Boundaries in the second half of
/// the window are preferred, so a stray early paragraph break does not produce
/// a sliver chunk; earlier boundaries are only used when the second half has
/// none. A chunk is hard-cut only when its window holds no boundary past the
/// overlap. The separator stays attached to the preceding chunk.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk
/// inherits the parent document's metadata plus `chunk_index` and
/// `start_offset` fields, and `source_uri` when the document has one.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
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
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if
    /// `chunk_size == 0` or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split_windows(document, self.chunk_size, self.chunk_overlap, true)
    }
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if
    /// `chunk_size == 0` or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split_windows(document, self.chunk_size, self.chunk_overlap, false)
    }
}

/// Boundary classes, highest priority first.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] =
    [Boundary::Paragraph, Boundary::Line, Boundary::Sentence, Boundary::Word];

impl Boundary {
    /// Whether a chunk may end right before character index `end`.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = chars[end - 1];
        match self {
            Self::Paragraph => last == '\n' && end >= 2 && chars[end - 2] == '\n',
            Self::Line => last == '\n',
            Self::Sentence => {
                last.is_whitespace() && end >= 2 && matches!(chars[end - 2], '.' | '!' | '?')
            }
            Self::Word => last.is_whitespace(),
        }
    }
}

/// The latest boundary of the highest-priority class in `[lo, hi]`.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    BOUNDARIES
        .into_iter()
        .find_map(|boundary| (lo..=hi).rev().find(|&end| boundary.ends_at(chars, end)))
}

/// Character ranges `[start, end)` of every chunk of `chars`.
fn window_ranges(
    chars: &[char],
    chunk_size: usize,
    chunk_overlap: usize,
    prefer_boundaries: bool,
) -> Vec<(usize, usize)> {
    let total = chars.len();
    let mut ranges = Vec::new();
    let mut start = 0;

    while total - start > chunk_size {
        let hi = start + chunk_size;
        let end = if prefer_boundaries {
            // Past the overlap so the next chunk starts after this one.
            let floor = start + chunk_overlap + 1;
            let lo = floor.max(start + chunk_size / 2);
            find_break(chars, lo, hi).or_else(|| find_break(chars, floor, hi)).unwrap_or(hi)
        } else {
            hi
        };
        ranges.push((start, end));
        start = end - chunk_overlap;
    }

    if start < total {
        ranges.push((start, total));
    }
    ranges
}

fn split_windows(
    document: &Document,
    chunk_size: usize,
    chunk_overlap: usize,
    prefer_boundaries: bool,
) -> Vec<Chunk> {
    if document.text.is_empty() {
        return Vec::new();
    }

    let text = &document.text;
    let chars: Vec<char> = text.chars().collect();
    // Byte offset of every character, plus the end of the text.
    let byte_offsets: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();

    window_ranges(&chars, chunk_size, chunk_overlap, prefer_boundaries)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (start, end))| {
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), chunk_index.to_string());
            metadata.insert("start_offset".to_string(), start.to_string());
            if let Some(uri) = &document.source_uri {
                metadata.insert(SOURCE_URI_KEY.to_string(), uri.clone());
            }
            Chunk {
                id: format!("{}_{chunk_index}", document.id),
                text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let doc = Document::new("doc", "hello world");
        let chunks = RecursiveChunker::new(100, 10).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["hello world"]);
        assert_eq!(chunks[0].id, "doc_0");
        assert_eq!(chunks[0].metadata["chunk_index"], "0");
        assert_eq!(chunks[0].metadata["start_offset"], "0");
        assert_eq!(chunks[0].metadata["source"], "doc");
    }

    #[test]
    fn breaks_on_word_boundary_with_single_char_overlap() {
        let doc = Document::new("doc", "A B C D");
        let chunks = RecursiveChunker::new(4, 1).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["A B ", " C D"]);
    }

    #[test]
    fn prefers_paragraph_over_word_boundary() {
        let text = "first para here.\n\nsecond para goes on for a while";
        let doc = Document::new("doc", text);
        let chunks = RecursiveChunker::new(30, 0).unwrap().chunk(&doc);
        assert_eq!(chunks[0].text, "first para here.\n\n");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 30));
    }

    #[test]
    fn prefers_sentence_over_word_boundary() {
        let text = "One two three. Four five six seven";
        let doc = Document::new("doc", text);
        let chunks = RecursiveChunker::new(20, 0).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["One two three. ", "Four five six seven"]);
    }

    #[test]
    fn early_word_boundary_beats_mid_token_cut() {
        let doc = Document::new("doc", "ab cdefghijklm");
        let chunks = RecursiveChunker::new(10, 0).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["ab ", "cdefghijkl", "m"]);
    }

    #[test]
    fn early_boundary_must_clear_the_overlap() {
        // The only space sits inside the overlap, so the window is hard-cut.
        let doc = Document::new("doc", "a bcdefghijklmn");
        let chunks = RecursiveChunker::new(8, 2).unwrap().chunk(&doc);
        assert_eq!(chunks[0].text, "a bcdefg");
    }

    #[test]
    fn hard_cuts_text_without_boundaries() {
        let doc = Document::new("doc", "abcdefghij");
        let chunks = RecursiveChunker::new(4, 1).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn fixed_size_ignores_boundaries() {
        let doc = Document::new("doc", "ab cd ef gh");
        let chunks = FixedSizeChunker::new(5, 0).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["ab cd", " ef g", "h"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let doc = Document::new("doc", "ééééé ééééé");
        let chunks = RecursiveChunker::new(6, 0).unwrap().chunk(&doc);
        assert_eq!(texts(&chunks), vec!["ééééé ", "ééééé"]);
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let doc = Document::new("doc", "");
        assert!(RecursiveChunker::new(10, 2).unwrap().chunk(&doc).is_empty());
        assert!(split_documents(&[doc], 10, 2).unwrap().is_empty());
    }

    #[test]
    fn invalid_parameters_are_config_errors() {
        assert!(matches!(RecursiveChunker::new(0, 0), Err(RagError::ConfigError(_))));
        assert!(matches!(FixedSizeChunker::new(10, 10), Err(RagError::ConfigError(_))));
        assert!(matches!(split_documents(&[], 5, 7), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn split_documents_keeps_lineage() {
        let docs = vec![
            Document::new("a.rs", "fn main() {}").with_metadata("lang", "rust"),
            Document::new("b.md", "# Title"),
        ];
        let chunks = split_documents(&docs, 100, 10).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].document_id, "a.rs");
        assert_eq!(chunks[0].metadata["lang"], "rust");
        assert_eq!(chunks[1].document_id, "b.md");
        assert!(!chunks[1].metadata.contains_key(SOURCE_URI_KEY));
    }

    #[test]
    fn source_uri_is_carried_into_chunk_metadata() {
        let doc = Document::new("src/lib.rs", "pub mod pay;

pub mod ledger;")
            .with_source_uri("file:///repo/src/lib.rs");
        let chunks = RecursiveChunker::new(16, 2).unwrap().chunk(&doc);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.metadata[SOURCE_URI_KEY], "file:///repo/src/lib.rs");
        }
    }
}
