//! Top-k retrieval over a frozen [`VectorIndex`].

use std::sync::Arc;

use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embeds query text and returns the `top_k` nearest chunks.
///
/// The embedder must be the one (or equivalent to the one) the index was
/// built with.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::Retriever;
///
/// let retriever = Retriever::new(index, embedder, 4)?;
/// let chunks = retriever.retrieve("How is platform pay set up?").await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("entries", &self.index.len())
            .field("embedder", &self.embedder.name())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl Retriever {
    /// Create a retriever with a fixed `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k == 0`.
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        Ok(Self { index, embedder, top_k })
    }

    /// The number of results requested per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve ranked results with their similarity scores.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingError`] or [`RagError::Timeout`] from the embedder
    /// - [`RagError::DimensionMismatch`] if the query embedding does not match
    ///   the index dimension
    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(query).await?;
        match self.index.dimension() {
            Some(expected) if vector.len() != expected => {
                return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
            }
            _ => {}
        }
        let results = self.index.query(&vector, self.top_k)?;
        debug!(result_count = results.len(), top_k = self.top_k, "retrieved chunks");
        Ok(results)
    }

    /// Retrieve ranked chunks, most similar first.
    ///
    /// # Errors
    ///
    /// See [`retrieve_scored`](Retriever::retrieve_scored).
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        let results = self.retrieve_scored(query).await?;
        Ok(results.into_iter().map(|r| r.entry.chunk).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::split_documents;
    use crate::document::Document;
    use crate::index::VectorIndexBuilder;
    use crate::mock::MockEmbeddingProvider;

    async fn index_of(texts: &[&str], embedder: &MockEmbeddingProvider) -> Arc<VectorIndex> {
        let docs: Vec<Document> =
            texts.iter().enumerate().map(|(i, t)| Document::new(format!("d{i}"), *t)).collect();
        let chunks = split_documents(&docs, 100, 0).unwrap();
        let mut builder = VectorIndexBuilder::new();
        builder.add_batch(chunks, embedder).await.unwrap();
        Arc::new(builder.build())
    }

    #[tokio::test]
    async fn returns_chunks_in_ranked_order() {
        let embedder = MockEmbeddingProvider::new(64);
        let index =
            index_of(&["rust ownership", "python scripting", "rust borrow"], &embedder).await;
        let retriever = Retriever::new(index, Arc::new(embedder), 2).unwrap();
        let chunks = retriever.retrieve("rust ownership").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "rust ownership");
        assert_eq!(chunks[1].text, "rust borrow");
    }

    #[tokio::test]
    async fn rejects_query_embedding_of_other_dimension() {
        let index = index_of(&["alpha"], &MockEmbeddingProvider::new(8)).await;
        let retriever = Retriever::new(index, Arc::new(MockEmbeddingProvider::new(16)), 1).unwrap();
        let err = retriever.retrieve("alpha").await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 8, actual: 16 }));
    }

    #[tokio::test]
    async fn empty_index_retrieves_nothing() {
        let retriever = Retriever::new(
            Arc::new(VectorIndex::default()),
            Arc::new(MockEmbeddingProvider::new(8)),
            3,
        )
        .unwrap();
        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let index = Arc::new(VectorIndex::default());
        let result = Retriever::new(index, Arc::new(MockEmbeddingProvider::new(8)), 0);
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }
}
