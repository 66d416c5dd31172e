//! # RAG Quickstart
//!
//! Builds an index over a handful of in-memory documents, then answers a few
//! questions.
//!
//! Uses `MockEmbeddingProvider` (bag-of-words hashing) and an echoing
//! `MockGenerator`, so it runs with **zero API keys**. The "answer" printed
//! for each question is the prompt the language model would have received.
//!
//! Run: `cargo run -p ragline-demos --bin rag_quickstart`

use std::sync::Arc;

use ragline::{
    Document, MockEmbeddingProvider, MockGenerator, RagConfig, RagPipeline, StaticLoader,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    // -- 1. Configure the pipeline ----------------------------------------
    // Small chunks so the demo documents split into several pieces; top_k=2
    // puts the two best chunks into each prompt.
    let config = RagConfig::builder().chunk_size(160).chunk_overlap(30).top_k(2).build()?;

    // -- 2. Sample corpus -------------------------------------------------
    let documents = vec![
        Document::new(
            "rust.md",
            "Rust is a systems programming language focused on safety, speed, and \
             concurrency. It achieves memory safety without a garbage collector through \
             its ownership system.\n\nThe borrow checker enforces ownership rules at \
             compile time.",
        )
        .with_metadata("topic", "rust"),
        Document::new(
            "python.md",
            "Python is a high-level, interpreted programming language known for its \
             readability. It is widely used for scripting, data science, and automation.",
        )
        .with_metadata("topic", "python"),
        Document::new(
            "rag.md",
            "Retrieval-augmented generation combines a retrieval system with a language \
             model. Documents are chunked, embedded, and indexed. At query time the most \
             relevant chunks are retrieved and given to the model as context.",
        )
        .with_metadata("topic", "rag"),
    ];

    // -- 3. Build the pipeline and the index ------------------------------
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(64)))
        .generator(Arc::new(MockGenerator::new()))
        .loader(Arc::new(StaticLoader::new(documents)))
        .build()?;

    let chunk_count = pipeline.build_index().await?;
    println!("Indexed {chunk_count} chunk(s)");

    // -- 4. Ask questions -------------------------------------------------
    let questions = [
        "How does Rust achieve memory safety with ownership?",
        "Which language is used for scripting?",
        "How are relevant chunks retrieved at query time?",
    ];

    for question in questions {
        println!("\n==========================================================");
        println!("Question: {question}");
        for (i, result) in pipeline.retrieve(question).await?.iter().enumerate() {
            let chunk = &result.entry.chunk;
            let preview: String = chunk.text.chars().take(60).collect();
            println!("  {}. [score={:.4}] {} | {preview}", i + 1, result.score, chunk.id);
        }
        println!("----------------------------------------------------------");
        println!("{}", pipeline.query(question).await?);
    }

    Ok(())
}
