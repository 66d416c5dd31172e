//! Generation backend trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The default chat model used for answers.
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-3.5-turbo";

/// Model selection and sampling options passed to a [`Generator`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationOptions {
    /// Backend model identifier.
    pub model: String,
    /// Sampling temperature; 0 keeps answers as deterministic as the backend allows.
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { model: DEFAULT_GENERATION_MODEL.to_string(), temperature: 0.0 }
    }
}

impl GenerationOptions {
    /// Options for `model` at temperature 0.
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), ..Self::default() }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A backend that turns a fully assembled prompt into plain text.
///
/// Implementations report failures as
/// [`RagError::GenerationError`](crate::RagError::GenerationError).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// A short generator name used in logs and errors.
    fn name(&self) -> &str {
        "generator"
    }
}
