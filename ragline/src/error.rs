//! Error types for the `ragline` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error (chunk size, overlap, `top_k`, ...).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A document loader failed to produce documents.
    #[error("Loader error ({loader}): {message}")]
    LoaderError {
        /// The loader that produced the error.
        loader: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation backend failed to produce an answer.
    #[error("Generation error ({generator}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        generator: String,
        /// A description of the failure.
        message: String,
    },

    /// A remote call did not complete within its deadline.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// A vector did not have the dimension the index was built with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension fixed by the index.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// A prompt template is malformed or lacks a required slot.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// A named template does not exist in the registry.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The document cache failed to read or write an entry.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// An error in the RAG pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Whether the error comes from a remote dependency and may succeed on retry.
    ///
    /// Configuration, template and data-integrity errors are caller bugs and
    /// are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LoaderError { .. }
                | Self::EmbeddingError { .. }
                | Self::GenerationError { .. }
                | Self::Timeout { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
