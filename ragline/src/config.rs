//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::generation::GenerationOptions;
use crate::retry::RetryPolicy;
use crate::template::RAG_PROMPT_NAME;

/// Configuration parameters for the RAG pipeline.
///
/// Deserializes with defaults for missing fields, so a partial TOML or JSON
/// document is enough. Call [`validate`](RagConfig::validate) (or use the
/// builder) before handing a deserialized config to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Number of chunk texts sent per embedding request during index build.
    pub embed_batch_size: usize,
    /// Maximum number of embedding requests in flight during index build.
    pub embed_concurrency: usize,
    /// Name of the prompt template fetched from the template registry.
    pub template_name: String,
    /// Model and sampling options for the generation backend.
    pub generation: GenerationOptions,
    /// Maximum retries for transient remote failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Deadline for a single remote call, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            embed_batch_size: 16,
            embed_concurrency: 4,
            template_name: RAG_PROMPT_NAME.to_string(),
            generation: GenerationOptions::default(),
            max_retries: 3,
            retry_backoff_ms: 500,
            request_timeout_ms: 30_000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The retry policy applied to loader, embedding and generation calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.retry_backoff_ms),
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embed_batch_size == 0` or `embed_concurrency == 0`
    /// - `request_timeout_ms == 0`
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::ConfigError(
                "embed_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(RagError::ConfigError(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a chunk size / overlap pair.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set how many chunk texts go into one embedding request.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the maximum number of concurrent embedding requests.
    pub fn embed_concurrency(mut self, limit: usize) -> Self {
        self.config.embed_concurrency = limit;
        self
    }

    /// Set the registry name of the prompt template.
    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.config.template_name = name.into();
        self
    }

    /// Set the generation model and temperature.
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    /// Set the maximum number of retries for transient failures.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the base backoff delay.
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the per-call deadline for remote operations.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] under the conditions listed on
    /// [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.template_name, "rlm/rag-prompt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn rejects_zero_chunk_size_and_top_k() {
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().embed_concurrency(0).build().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RagConfig =
            serde_json::from_str(r#"{"chunk_size": 300, "chunk_overlap": 30}"#).unwrap();
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
    }

    #[test]
    fn retry_policy_uses_millisecond_fields() {
        let config = RagConfig::builder()
            .max_retries(2)
            .retry_backoff(Duration::from_millis(10))
            .request_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_backoff, Duration::from_millis(10));
        assert_eq!(policy.timeout, Duration::from_secs(5));
    }

    #[test]
    fn oversized_durations_saturate() {
        let config = RagConfig::builder()
            .retry_backoff(Duration::MAX)
            .request_timeout(Duration::MAX)
            .build()
            .unwrap();
        assert_eq!(config.retry_backoff_ms, u64::MAX);
        assert_eq!(config.request_timeout_ms, u64::MAX);
    }
}
