//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key under which loaders record a document's stable source identifier.
pub const SOURCE_KEY: &str = "source";

/// Chunk metadata key holding the parent document's [`Document::source_uri`].
pub const SOURCE_URI_KEY: &str = "source_uri";

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable identifier for the document, typically a URL or file path.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document whose `source` metadata entry is its `id`.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let metadata = HashMap::from([(SOURCE_KEY.to_string(), id.clone())]);
        Self { id, text: text.into(), metadata, source_uri: None }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the URI of the original source.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A bounded-size segment of a [`Document`], the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A [`Chunk`] paired with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// The embedded chunk.
    pub chunk: Chunk,
    /// The vector embedding for this chunk's text.
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    /// The dimensionality of the embedding.
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A retrieved [`EmbeddedChunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved entry.
    pub entry: EmbeddedChunk,
    /// The cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// The two named slots a prompt template fills.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptPayload {
    /// Retrieved chunk texts joined in ranked order.
    pub context: String,
    /// The user's question.
    pub question: String,
}
