//! Caching of loader output.
//!
//! A [`CachedLoader`] consults a [`DocumentCache`] before invoking the wrapped
//! loader. Only presence is checked: a cached entry is served as-is, with no
//! expiry or content validation. Cache failures are logged and never fail a
//! load.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::Result;
use crate::loader::DocumentLoader;

/// Derive a stable cache key from a source URL (or path) and optional branch.
///
/// Each part is hashed with a length prefix and the branch with a presence
/// tag, so no two distinct `(source, branch)` pairs share an input.
pub fn cache_key(source: &str, branch: Option<&str>) -> String {
    fn update_part(hasher: &mut Sha256, part: &str) {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }

    let mut hasher = Sha256::new();
    update_part(&mut hasher, source);
    match branch {
        Some(branch) => {
            hasher.update([1u8]);
            update_part(&mut hasher, branch);
        }
        None => hasher.update([0u8]),
    }
    format!("{:x}", hasher.finalize())
}

/// Key-value persistence for previously loaded documents.
#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// Return the documents stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<Document>>>;

    /// Store `documents` under `key`, replacing any previous entry.
    async fn put(&self, key: &str, documents: &[Document]) -> Result<()>;
}

/// A [`DocumentCache`] held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct InMemoryDocumentCache {
    entries: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentCache for InMemoryDocumentCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<Document>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, documents: &[Document]) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), documents.to_vec());
        Ok(())
    }
}

/// A loader that serves cached documents when present and fills the cache
/// after a fresh load.
pub struct CachedLoader {
    inner: Arc<dyn DocumentLoader>,
    cache: Arc<dyn DocumentCache>,
    key: String,
}

impl CachedLoader {
    /// Wrap `inner`, caching its output under `key`.
    pub fn new(
        inner: Arc<dyn DocumentLoader>,
        cache: Arc<dyn DocumentCache>,
        key: impl Into<String>,
    ) -> Self {
        Self { inner, cache, key: key.into() }
    }

    /// The cache key in use.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl DocumentLoader for CachedLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        match self.cache.get(&self.key).await {
            Ok(Some(documents)) => {
                debug!(key = %self.key, document_count = documents.len(), "cache hit");
                return Ok(documents);
            }
            Ok(None) => debug!(key = %self.key, "cache miss"),
            Err(e) => warn!(key = %self.key, error = %e, "cache read failed, loading fresh"),
        }

        let documents = self.inner.load().await?;
        if let Err(e) = self.cache.put(&self.key, &documents).await {
            warn!(key = %self.key, error = %e, "cache write failed");
        }
        info!(loader = self.inner.name(), document_count = documents.len(), "loaded documents");
        Ok(documents)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
