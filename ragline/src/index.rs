//! In-memory vector index using cosine similarity.
//!
//! The index lifecycle is split in two:
//!
//! - [`VectorIndexBuilder`] is the mutable side. [`add_batch`](VectorIndexBuilder::add_batch)
//!   embeds chunks with bounded concurrency and appends them in chunk order.
//! - [`VectorIndex`] is the frozen result. It is never mutated, so any number
//!   of readers can query it without locking.
//!
//! [`SharedVectorIndex`] publishes successive frozen indexes behind an `Arc`.
//! Readers take a snapshot; writers are serialized and swap in a complete new
//! index, so a reader sees either the old or the new state, never a partially
//! written entry.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::document::{Chunk, EmbeddedChunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors.
///
/// Accumulates in `f64` and clamps to `[-1, 1]`. Returns 0.0 if either
/// vector has zero magnitude or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0) as f32
}

/// How chunks are sent to the embedding provider during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Chunk texts per `embed_batch` request.
    pub batch_size: usize,
    /// Maximum requests in flight.
    pub concurrency: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { batch_size: 16, concurrency: 4 }
    }
}

/// An immutable collection of embedded chunks supporting top-k search.
///
/// Entries are addressed by their insertion position. All vectors share one
/// dimension, fixed by the first inserted vector.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<EmbeddedChunk>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The vector dimension, or `None` for an empty index.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// The entry inserted at position `id`.
    pub fn get(&self, id: usize) -> Option<&EmbeddedChunk> {
        self.entries.get(id)
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[EmbeddedChunk] {
        &self.entries
    }

    /// Search for the `k` entries most similar to `vector`.
    ///
    /// Returns at most `k` results ordered by descending cosine similarity;
    /// equal scores keep insertion order. An empty index returns an empty
    /// `Vec`.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `k == 0`
    /// - [`RagError::DimensionMismatch`] if `vector` does not match the index dimension
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if vector.len() != dimension {
            return Err(RagError::DimensionMismatch { expected: dimension, actual: vector.len() });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, entry)| (id, cosine_similarity(&entry.vector, vector)))
            .collect();

        // Stable sort keeps earlier insertions ahead on ties.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, score)| SearchResult { entry: self.entries[id].clone(), score })
            .collect())
    }
}

/// The mutable side of a [`VectorIndex`].
///
/// # Example
///
/// ```rust,ignore
/// use ragline::VectorIndexBuilder;
///
/// let mut builder = VectorIndexBuilder::new();
/// builder.add_batch(chunks, embedder.as_ref()).await?;
/// let index = builder.build();
/// let results = index.query(&query_vector, 4)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct VectorIndexBuilder {
    index: VectorIndex,
    options: BuildOptions,
}

impl VectorIndexBuilder {
    /// Create a builder for an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder that appends to a copy of `index`.
    pub fn from_index(index: &VectorIndex) -> Self {
        Self { index: index.clone(), options: BuildOptions::default() }
    }

    /// Set batching and concurrency for embedding requests.
    ///
    /// Zero values are raised to one.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = BuildOptions {
            batch_size: options.batch_size.max(1),
            concurrency: options.concurrency.max(1),
        };
        self
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no entries have been added.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embed `chunks` and append them in their original order.
    ///
    /// Requests run with at most [`BuildOptions::concurrency`] in flight;
    /// results are collected in input order regardless of completion order.
    /// On any failure the builder is left unchanged and the remaining
    /// in-flight requests are dropped.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingError`] if the provider fails, returns the wrong
    ///   number of vectors, or returns an empty vector
    /// - [`RagError::DimensionMismatch`] if a vector's dimension differs from
    ///   the index dimension
    pub async fn add_batch(
        &mut self,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let BuildOptions { batch_size, concurrency } = self.options;

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
            .map(|batch| async move {
                let vectors = embedder.embed_batch(batch).await?;
                if vectors.len() != batch.len() {
                    return Err(RagError::EmbeddingError {
                        provider: embedder.name().to_string(),
                        message: format!(
                            "expected {} embeddings, got {}",
                            batch.len(),
                            vectors.len()
                        ),
                    });
                }
                debug!(batch_size = batch.len(), "embedded batch");
                Ok::<_, RagError>(vectors)
            })
            .buffered(concurrency)
            .try_collect()
            .await?;

        let mut dimension = self.index.dimension;
        let mut staged = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(batches.into_iter().flatten()) {
            if vector.is_empty() {
                return Err(RagError::EmbeddingError {
                    provider: embedder.name().to_string(),
                    message: format!("empty embedding for chunk '{}'", chunk.id),
                });
            }
            let expected = *dimension.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
            }
            staged.push(EmbeddedChunk { chunk, vector });
        }

        let chunk_count = staged.len();
        self.index.dimension = dimension;
        self.index.entries.extend(staged);
        info!(chunk_count, total = self.index.len(), ?dimension, "added batch to index");
        Ok(())
    }

    /// Freeze the builder into an immutable [`VectorIndex`].
    pub fn build(self) -> VectorIndex {
        self.index
    }
}

/// A published [`VectorIndex`] that can be replaced or extended while readers
/// keep querying.
#[derive(Debug, Default)]
pub struct SharedVectorIndex {
    current: RwLock<Option<Arc<VectorIndex>>>,
    writer: Mutex<()>,
}

impl SharedVectorIndex {
    /// Create a cell with no published index.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published index, if any.
    pub async fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.current.read().await.clone()
    }

    /// Replace the published index.
    pub async fn publish(&self, index: VectorIndex) {
        let _writer = self.writer.lock().await;
        *self.current.write().await = Some(Arc::new(index));
    }

    /// Embed `chunks` and publish a new index extending the current one.
    ///
    /// Appends are serialized. On failure the published index is untouched.
    /// Returns the number of entries in the newly published index.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`VectorIndexBuilder::add_batch`].
    pub async fn append(
        &self,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        options: BuildOptions,
    ) -> Result<usize> {
        let _writer = self.writer.lock().await;
        let base = self.current.read().await.clone().unwrap_or_default();
        let mut builder = VectorIndexBuilder::from_index(&base).with_options(options);
        builder.add_batch(chunks, embedder).await?;
        let index = builder.build();
        let len = index.len();
        *self.current.write().await = Some(Arc::new(index));
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Embeds known texts to fixed vectors; unknown texts fail.
    struct LookupEmbedder {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl LookupEmbedder {
        fn new(pairs: Vec<(&str, Vec<f32>)>) -> Self {
            let vectors = pairs.into_iter().map(|(t, v)| (t.to_string(), v)).collect();
            Self { vectors }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LookupEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // Later texts finish first, so out-of-order completion is exercised.
            let delay = 50u64.saturating_sub(text.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.vectors.get(text).cloned().ok_or_else(|| RagError::EmbeddingError {
                provider: "lookup".into(),
                message: format!("unknown text '{text}'"),
            })
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            id: text.to_string(),
            text: text.to_string(),
            metadata: HashMap::new(),
            document_id: "doc".to_string(),
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().map(|t| chunk(t)).collect()
    }

    async fn build(pairs: Vec<(&str, Vec<f32>)>) -> VectorIndex {
        let texts: Vec<&str> = pairs.iter().map(|(t, _)| *t).collect();
        let embedder = LookupEmbedder::new(pairs);
        let mut builder =
            VectorIndexBuilder::new().with_options(BuildOptions { batch_size: 1, concurrency: 3 });
        builder.add_batch(chunks(&texts), &embedder).await.unwrap();
        builder.build()
    }

    #[test]
    fn cosine_of_parallel_orthogonal_and_opposite() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_chunk_order_under_concurrency() {
        let index =
            build(vec![("a", vec![1.0, 0.0]), ("bb", vec![0.0, 1.0]), ("ccc", vec![1.0, 1.0])])
                .await;
        let ids: Vec<&str> = index.entries().iter().map(|e| e.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "bb", "ccc"]);
        assert_eq!(index.dimension(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn query_ranks_by_descending_similarity() {
        let index =
            build(vec![("x", vec![1.0, 0.0]), ("y", vec![0.0, 1.0]), ("xy", vec![1.0, 1.0])])
                .await;
        let results = index.query(&[1.0, 0.1], 3).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.entry.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy", "y"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test(start_paused = true)]
    async fn ties_keep_insertion_order() {
        let index = build(vec![("first", vec![1.0, 0.0]), ("second", vec![2.0, 0.0])]).await;
        let results = index.query(&[3.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.chunk.id, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn query_validates_k_and_dimension() {
        let index = build(vec![("x", vec![1.0, 0.0])]).await;
        assert!(matches!(index.query(&[1.0, 0.0], 0), Err(RagError::ConfigError(_))));
        assert!(matches!(
            index.query(&[1.0, 0.0, 0.0], 1),
            Err(RagError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = VectorIndex::default();
        assert!(index.query(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_batch_leaves_builder_unchanged() {
        let embedder = LookupEmbedder::new(vec![("known", vec![1.0, 0.0])]);
        let mut builder = VectorIndexBuilder::new();
        builder.add_batch(chunks(&["known"]), &embedder).await.unwrap();
        let err = builder.add_batch(chunks(&["known", "missing"]), &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
        assert_eq!(builder.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_dimensions_are_rejected() {
        let embedder =
            LookupEmbedder::new(vec![("two", vec![1.0, 0.0]), ("three", vec![1.0, 0.0, 0.0])]);
        let mut builder = VectorIndexBuilder::new();
        let err = builder.add_batch(chunks(&["two", "three"]), &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(builder.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_are_unaffected_by_appends() {
        let embedder = LookupEmbedder::new(vec![("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);
        let shared = SharedVectorIndex::new();
        assert!(shared.snapshot().await.is_none());

        let len = shared.append(chunks(&["a"]), &embedder, BuildOptions::default()).await.unwrap();
        assert_eq!(len, 1);
        let before = shared.snapshot().await.unwrap();

        let len = shared.append(chunks(&["b"]), &embedder, BuildOptions::default()).await.unwrap();
        assert_eq!(len, 2);
        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_append_keeps_published_index() {
        let embedder = LookupEmbedder::new(vec![("a", vec![1.0, 0.0])]);
        let shared = SharedVectorIndex::new();
        shared.append(chunks(&["a"]), &embedder, BuildOptions::default()).await.unwrap();
        let result = shared.append(chunks(&["nope"]), &embedder, BuildOptions::default()).await;
        assert!(result.is_err());
        assert_eq!(shared.snapshot().await.unwrap().len(), 1);
    }
}
