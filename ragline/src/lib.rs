//! # ragline
//!
//! Retrieval-augmented question answering: split documents into overlapping
//! chunks, embed them into an in-memory vector index, retrieve the chunks most
//! similar to a question, and ask a language model to answer from them.
//!
//! ## Overview
//!
//! - [`RecursiveChunker`] / [`split_documents`] - boundary-aware chunking
//! - [`VectorIndex`] - immutable cosine-similarity index, built with [`VectorIndexBuilder`]
//! - [`Retriever`] - embeds a question and returns the `top_k` nearest chunks
//! - [`PromptAssembler`] - fills a `{context}` / `{question}` template
//! - [`Generator`] - the language-model seam, wrapped with deadlines and retries
//! - [`RagPipeline`] - orchestrates the index build and query phases
//!
//! Backends are pluggable through the [`EmbeddingProvider`], [`Generator`],
//! [`DocumentLoader`] and [`TemplateRegistry`] traits. Deterministic mocks
//! ([`MockEmbeddingProvider`], [`MockGenerator`]) are always available; the
//! OpenAI backends live behind the `openai` feature.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragline::{
//!     Document, MockEmbeddingProvider, MockGenerator, RagConfig, RagPipeline, StaticLoader,
//! };
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().chunk_size(200).chunk_overlap(20).top_k(2).build()?)
//!     .embedding_provider(Arc::new(MockEmbeddingProvider::new(64)))
//!     .generator(Arc::new(MockGenerator::new()))
//!     .loader(Arc::new(StaticLoader::new(vec![Document::new("doc", "Rust has ownership.")])))
//!     .build()?;
//!
//! pipeline.build_index().await?;
//! let answer = pipeline.query("What does Rust have?").await?;
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | `OpenAIEmbeddingProvider` and `OpenAIGenerator` via `reqwest` |
//! | `full` | All backends |

pub mod cache;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod loader;
pub mod mock;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod retry;
pub mod template;

#[cfg(feature = "openai")]
pub mod openai;

pub use cache::{CachedLoader, DocumentCache, InMemoryDocumentCache, cache_key};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split_documents};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Chunk, Document, EmbeddedChunk, PromptPayload, SOURCE_KEY, SOURCE_URI_KEY, SearchResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{DEFAULT_GENERATION_MODEL, GenerationOptions, Generator};
pub use index::{
    BuildOptions, SharedVectorIndex, VectorIndex, VectorIndexBuilder, cosine_similarity,
};
pub use loader::{DocumentLoader, StaticLoader};
pub use mock::{MockEmbeddingProvider, MockGenerator};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::{CONTEXT_SEPARATOR, PromptAssembler, assemble_prompt, format_chunks};
pub use retriever::Retriever;
pub use retry::{RetryPolicy, RetryingEmbedder, RetryingGenerator, with_retry};
pub use template::{InMemoryTemplateRegistry, PromptTemplate, RAG_PROMPT_NAME, TemplateRegistry};

#[cfg(feature = "openai")]
pub use openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
