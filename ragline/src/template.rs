//! Two-slot prompt templates and the registry they are fetched from.
//!
//! A template is plain text with exactly two kinds of placeholders,
//! `{context}` and `{question}`, each of which must appear at least once.
//! `{{` and `}}` produce literal braces.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::PromptPayload;
use crate::error::{RagError, Result};

/// Registry name of the built-in question-answering template.
pub const RAG_PROMPT_NAME: &str = "rlm/rag-prompt";

const RAG_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\
Question: {question} \n\
Context: {context} \n\
Answer:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Context,
    Question,
}

impl Slot {
    fn parse(name: &str) -> Result<Self> {
        match name.trim() {
            "context" => Ok(Self::Context),
            "question" => Ok(Self::Question),
            other => Err(RagError::TemplateError(format!("unknown slot '{{{other}}}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A validated prompt template.
#[derive(Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    text: String,
    segments: Vec<Segment>,
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptTemplate").field("name", &self.name).finish_non_exhaustive()
    }
}

impl PromptTemplate {
    /// Parse and validate a template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::TemplateError`] if a brace is unbalanced, a slot
    /// other than `context` or `question` is used, or either required slot
    /// is missing.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let text = text.into();
        let segments = parse_segments(&text)?;
        for (slot, label) in [(Slot::Context, "context"), (Slot::Question, "question")] {
            if !segments.contains(&Segment::Slot(slot)) {
                return Err(RagError::TemplateError(format!(
                    "template '{name}' is missing required slot '{{{label}}}'"
                )));
            }
        }
        Ok(Self { name, text, segments })
    }

    /// The built-in `rlm/rag-prompt` question-answering template.
    pub fn rag_default() -> Self {
        Self {
            name: RAG_PROMPT_NAME.to_string(),
            text: RAG_PROMPT.to_string(),
            segments: parse_segments(RAG_PROMPT).unwrap_or_default(),
        }
    }

    /// The template's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Fill both slots in a single pass; slot values are inserted verbatim
    /// and never re-scanned for placeholders.
    pub fn render(&self, payload: &PromptPayload) -> String {
        let mut out = String::with_capacity(
            self.text.len() + payload.context.len() + payload.question.len(),
        );
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(Slot::Context) => out.push_str(&payload.context),
                Segment::Slot(Slot::Question) => out.push_str(&payload.question),
            }
        }
        out
    }
}

fn parse_segments(text: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(RagError::TemplateError(
                                "unclosed '{' in template".to_string(),
                            ));
                        }
                        Some(c) => name.push(c),
                    }
                }
                let slot = Slot::parse(&name)?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(slot));
            }
            '}' => {
                return Err(RagError::TemplateError("unmatched '}' in template".to_string()));
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// A source of named, versioned prompt templates.
#[async_trait]
pub trait TemplateRegistry: Send + Sync {
    /// Fetch the template registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::TemplateNotFound`] if no template has that name.
    async fn fetch(&self, name: &str) -> Result<PromptTemplate>;
}

/// A [`TemplateRegistry`] held in memory.
///
/// # Example
///
/// ```rust,ignore
/// use ragline::{InMemoryTemplateRegistry, PromptTemplate, TemplateRegistry};
///
/// let registry = InMemoryTemplateRegistry::with_defaults();
/// registry.register(PromptTemplate::new("terse", "{context}\nQ: {question}\nA:")?).await;
/// let template = registry.fetch("terse").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTemplateRegistry {
    templates: RwLock<HashMap<String, PromptTemplate>>,
}

impl InMemoryTemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `rlm/rag-prompt` template.
    pub fn with_defaults() -> Self {
        let template = PromptTemplate::rag_default();
        let templates = HashMap::from([(template.name().to_string(), template)]);
        Self { templates: RwLock::new(templates) }
    }

    /// Add or replace a template under its own name.
    pub async fn register(&self, template: PromptTemplate) {
        self.templates.write().await.insert(template.name().to_string(), template);
    }
}

#[async_trait]
impl TemplateRegistry for InMemoryTemplateRegistry {
    async fn fetch(&self, name: &str) -> Result<PromptTemplate> {
        self.templates
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RagError::TemplateNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(context: &str, question: &str) -> PromptPayload {
        PromptPayload { context: context.to_string(), question: question.to_string() }
    }

    #[test]
    fn renders_both_slots() {
        let template = PromptTemplate::new("t", "C: {context}\nQ: {question}").unwrap();
        assert_eq!(template.render(&payload("ctx", "why?")), "C: ctx\nQ: why?");
    }

    #[test]
    fn slot_values_are_not_rescanned() {
        let template = PromptTemplate::new("t", "{context}|{question}").unwrap();
        assert_eq!(template.render(&payload("{question}", "q")), "{question}|q");
    }

    #[test]
    fn double_braces_are_literal() {
        let template = PromptTemplate::new("t", "{{json}} {context} {question}").unwrap();
        assert_eq!(template.render(&payload("c", "q")), "{json} c q");
    }

    #[test]
    fn missing_slot_is_rejected() {
        let err = PromptTemplate::new("t", "Context only: {context}").unwrap_err();
        assert!(matches!(err, RagError::TemplateError(msg) if msg.contains("question")));
    }

    #[test]
    fn unknown_and_unbalanced_slots_are_rejected() {
        assert!(PromptTemplate::new("t", "{context} {question} {history}").is_err());
        assert!(PromptTemplate::new("t", "{context} {question").is_err());
        assert!(PromptTemplate::new("t", "{context} question}").is_err());
    }

    #[test]
    fn built_in_template_is_valid() {
        let template = PromptTemplate::rag_default();
        let reparsed = PromptTemplate::new(RAG_PROMPT_NAME, template.text()).unwrap();
        assert_eq!(template, reparsed);
        let prompt = template.render(&payload("the sky is blue", "What colour is the sky?"));
        assert!(prompt.contains("Question: What colour is the sky? \nContext: the sky is blue"));
    }

    #[tokio::test]
    async fn registry_fetches_registered_templates() {
        let registry = InMemoryTemplateRegistry::with_defaults();
        assert_eq!(registry.fetch(RAG_PROMPT_NAME).await.unwrap().name(), RAG_PROMPT_NAME);

        registry.register(PromptTemplate::new("terse", "{context}\n{question}").unwrap()).await;
        assert_eq!(registry.fetch("terse").await.unwrap().text(), "{context}\n{question}");

        let err = registry.fetch("missing").await.unwrap_err();
        assert!(matches!(err, RagError::TemplateNotFound(name) if name == "missing"));
    }
}
