//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] runs two phases:
//!
//! 1. **Index build** (once, offline): loaders → chunker → embed → publish.
//!    A failure at any step aborts the build and nothing is published.
//! 2. **Query** (per call, online): retrieve → assemble prompt → generate.
//!    Queries are independent of each other and never modify the index.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragline::{RagPipeline, RagConfig, StaticLoader};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generator(Arc::new(my_generator))
//!     .loader(Arc::new(StaticLoader::new(documents)))
//!     .build()?;
//!
//! pipeline.build_index().await?;
//! let answer = pipeline.query("How is platform pay set up?").await?;
//! ```

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::chunking::split_documents;
use crate::config::RagConfig;
use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::index::{BuildOptions, SharedVectorIndex, VectorIndex, VectorIndexBuilder};
use crate::loader::DocumentLoader;
use crate::prompt::PromptAssembler;
use crate::retriever::Retriever;
use crate::retry::{RetryingEmbedder, RetryingGenerator, with_retry};
use crate::template::{InMemoryTemplateRegistry, TemplateRegistry};

/// The RAG pipeline orchestrator.
///
/// Embedding and generation backends are wrapped with the configured
/// [`RetryPolicy`](crate::RetryPolicy), so every remote call has a deadline
/// and transient failures are retried with backoff. Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    templates: Arc<dyn TemplateRegistry>,
    loaders: Vec<Arc<dyn DocumentLoader>>,
    index: SharedVectorIndex,
    assembler: OnceCell<PromptAssembler>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the (retrying) embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// The currently published index, if one has been built.
    pub async fn index(&self) -> Option<Arc<VectorIndex>> {
        self.index.snapshot().await
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            batch_size: self.config.embed_batch_size,
            concurrency: self.config.embed_concurrency,
        }
    }

    /// Load documents from every configured loader, in loader order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no loader is configured, or the
    /// loader's error once retries are exhausted.
    pub async fn load_documents(&self) -> Result<Vec<Document>> {
        if self.loaders.is_empty() {
            return Err(RagError::ConfigError("at least one loader is required".to_string()));
        }
        let policy = self.config.retry_policy();
        let mut documents = Vec::new();
        for loader in &self.loaders {
            let loaded = with_retry("load", &policy, || loader.load()).await.map_err(|e| {
                error!(loader = loader.name(), error = %e, "document load failed");
                e
            })?;
            info!(loader = loader.name(), document_count = loaded.len(), "loaded documents");
            documents.extend(loaded);
        }
        Ok(documents)
    }

    /// Run the index build phase: load, chunk, embed, publish.
    ///
    /// Returns the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// Any loader, chunking or embedding error aborts the build; the
    /// previously published index (if any) stays in place.
    pub async fn build_index(&self) -> Result<usize> {
        let documents = self.load_documents().await?;
        self.index_documents(&documents).await
    }

    /// Chunk, embed and publish `documents` as a fresh index, replacing any
    /// previously published one.
    ///
    /// Returns the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// Returns the first chunking or embedding error; nothing is published.
    pub async fn index_documents(&self, documents: &[Document]) -> Result<usize> {
        let chunks =
            split_documents(documents, self.config.chunk_size, self.config.chunk_overlap)?;
        let chunk_count = chunks.len();

        let mut builder = VectorIndexBuilder::new().with_options(self.build_options());
        builder.add_batch(chunks, self.embedding_provider.as_ref()).await.map_err(|e| {
            error!(chunk_count, error = %e, "index build failed");
            e
        })?;

        self.index.publish(builder.build()).await;
        info!(document_count = documents.len(), chunk_count, "index built");
        Ok(chunk_count)
    }

    /// Chunk and embed `documents`, then publish them appended to the
    /// current index. Concurrent queries keep using the index they started
    /// with.
    ///
    /// Returns the total number of entries in the new index.
    ///
    /// # Errors
    ///
    /// Returns the first chunking or embedding error; the published index is
    /// left untouched.
    pub async fn append_documents(&self, documents: &[Document]) -> Result<usize> {
        let chunks =
            split_documents(documents, self.config.chunk_size, self.config.chunk_overlap)?;
        let added = chunks.len();
        let total = self
            .index
            .append(chunks, self.embedding_provider.as_ref(), self.build_options())
            .await
            .map_err(|e| {
                error!(chunk_count = added, error = %e, "index append failed");
                e
            })?;
        info!(document_count = documents.len(), added, total, "appended to index");
        Ok(total)
    }

    /// A [`Retriever`] over the currently published index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if no index has been built.
    pub async fn retriever(&self) -> Result<Retriever> {
        let index = self
            .index
            .snapshot()
            .await
            .ok_or_else(|| RagError::PipelineError("index has not been built".to_string()))?;
        Retriever::new(index, self.embedding_provider.clone(), self.config.top_k)
    }

    /// Retrieve the `top_k` chunks for `question` with their scores.
    ///
    /// # Errors
    ///
    /// See [`Retriever::retrieve_scored`] and [`RagPipeline::retriever`].
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        self.retriever().await?.retrieve_scored(question).await
    }

    async fn assembler(&self) -> Result<&PromptAssembler> {
        self.assembler
            .get_or_try_init(|| async {
                let template = self.templates.fetch(&self.config.template_name).await?;
                Ok::<_, RagError>(PromptAssembler::new(template))
            })
            .await
    }

    /// Answer `question`: retrieve → assemble prompt → generate.
    ///
    /// # Errors
    ///
    /// Returns retrieval, template or generation errors. A failed query
    /// never affects the index or later queries.
    pub async fn query(&self, question: &str) -> Result<String> {
        let retriever = self.retriever().await?;
        let chunks = retriever.retrieve(question).await.map_err(|e| {
            error!(error = %e, "retrieval failed");
            e
        })?;

        let prompt = self.assembler().await?.assemble(&chunks, question);
        let answer =
            self.generator.generate(&prompt, &self.config.generation).await.map_err(|e| {
                error!(generator = self.generator.name(), error = %e, "generation failed");
                e
            })?;

        info!(
            context_chunks = chunks.len(),
            prompt_len = prompt.len(),
            answer_len = answer.len(),
            "query completed"
        );
        Ok(answer)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `generator` are required. Loaders are
/// only needed for [`RagPipeline::build_index`]; the template registry
/// defaults to [`InMemoryTemplateRegistry::with_defaults`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .generator(Arc::new(generator))
///     .template_registry(Arc::new(registry))  // optional
///     .loader(Arc::new(loader))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn Generator>>,
    templates: Option<Arc<dyn TemplateRegistry>>,
    loaders: Vec<Arc<dyn DocumentLoader>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the generation backend.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the registry the prompt template is fetched from.
    pub fn template_registry(mut self, templates: Arc<dyn TemplateRegistry>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Add a document loader. Loaders run in the order they were added.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let templates = self
            .templates
            .unwrap_or_else(|| Arc::new(InMemoryTemplateRegistry::with_defaults()));

        let policy = config.retry_policy();
        Ok(RagPipeline {
            embedding_provider: Arc::new(RetryingEmbedder::new(embedding_provider, policy)),
            generator: Arc::new(RetryingGenerator::new(generator, policy)),
            templates,
            loaders: self.loaders,
            index: SharedVectorIndex::new(),
            assembler: OnceCell::new(),
            config,
        })
    }
}
