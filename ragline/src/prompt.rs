//! Merging retrieved context with the user's question.

use crate::document::{Chunk, PromptPayload};
use crate::error::Result;
use crate::template::PromptTemplate;

/// Separator placed between chunk texts in the `context` slot.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Join chunk texts in the given (ranked) order.
pub fn format_chunks(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Parse `template` and fill it with `chunks` and `question`.
///
/// # Errors
///
/// Returns [`RagError::TemplateError`](crate::RagError::TemplateError) if the
/// template is malformed or lacks a required slot.
pub fn assemble_prompt(chunks: &[Chunk], question: &str, template: &str) -> Result<String> {
    let template = PromptTemplate::new("inline", template)?;
    Ok(PromptAssembler::new(template).assemble(chunks, question))
}

/// Renders ranked chunks and a question through a fixed template.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: PromptTemplate,
}

impl PromptAssembler {
    /// Create an assembler for an already validated template.
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// The template this assembler renders.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Build the slot values without rendering.
    pub fn payload(&self, chunks: &[Chunk], question: &str) -> PromptPayload {
        PromptPayload { context: format_chunks(chunks), question: question.to_string() }
    }

    /// Render the final prompt. Chunk order is preserved, never re-sorted.
    pub fn assemble(&self, chunks: &[Chunk], question: &str) -> String {
        self.template.render(&self.payload(chunks, question))
    }
}
