//! Deadlines and bounded retries for remote calls.
//!
//! Every attempt runs under [`tokio::time::timeout`]; an elapsed deadline drops
//! the in-flight future (cancelling the underlying request) and counts as a
//! transient [`RagError::Timeout`]. Transient failures are retried with
//! exponential backoff until [`RetryPolicy::max_retries`] is exhausted, after
//! which the last error is returned unchanged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationOptions, Generator};

/// Deadline and retry settings for one class of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub base_backoff: Duration,
    /// Deadline for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry(timeout: Duration) -> Self {
        Self { max_retries: 0, base_backoff: Duration::ZERO, timeout }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Run `f` under the policy's deadline, retrying transient failures.
///
/// # Errors
///
/// Returns the first fatal error (see [`RagError::is_transient`]) or the last
/// transient error once retries are exhausted.
pub async fn with_retry<T, F, Fut>(operation: &str, policy: &RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, f()).await {
            Ok(result) => result,
            Err(_) => {
                Err(RagError::Timeout { operation: operation.to_string(), after: policy.timeout })
            }
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// An [`EmbeddingProvider`] that applies a [`RetryPolicy`] to every call.
pub struct RetryingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        with_retry("embed", &self.policy, || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        with_retry("embed_batch", &self.policy, || self.inner.embed_batch(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// A [`Generator`] that applies a [`RetryPolicy`] to every call.
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    policy: RetryPolicy,
}

impl RetryingGenerator {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn Generator>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Generator for RetryingGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        with_retry("generate", &self.policy, || self.inner.generate(prompt, options)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
