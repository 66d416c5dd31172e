//! Document loader trait and an in-memory loader.
//!
//! Real loaders (web page scrapers, repository crawlers) live outside this
//! crate; they only need to produce [`Document`]s with a stable `id` and a
//! `source` metadata entry.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// A source of raw documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every document from the source.
    ///
    /// Implementations report network, auth and not-found failures as
    /// [`RagError::LoaderError`](crate::RagError::LoaderError).
    async fn load(&self) -> Result<Vec<Document>>;

    /// A short loader name used in logs and errors.
    fn name(&self) -> &str {
        "loader"
    }
}

/// A loader that returns a fixed set of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    documents: Vec<Document>,
}

impl StaticLoader {
    /// Create a loader over `documents`.
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentLoader for StaticLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
