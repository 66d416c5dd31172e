//! Deterministic in-process backends for tests and demos.
//!
//! Neither type talks to a network service, so pipelines built from them run
//! with zero API keys.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::{GenerationOptions, Generator};

/// Bag-of-words embeddings: every lowercase alphanumeric token is hashed
/// (FNV-1a) into one of `dimensions` buckets, then the vector is L2-normalized.
///
/// Texts sharing words get positive cosine similarity; texts with disjoint
/// vocabularies score 0 unless their tokens collide in a bucket.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` entries.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let bucket = (fnv1a(token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A generator that records every prompt and answers with a canned response,
/// or echoes the prompt when no response is set.
#[derive(Debug, Default)]
pub struct MockGenerator {
    response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// A generator that echoes its prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that always answers `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self { response: Some(response.into()), prompts: Mutex::default() }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self.response.clone().unwrap_or_else(|| prompt.to_string()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
