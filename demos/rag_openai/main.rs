//! # RAG over local files with OpenAI
//!
//! Indexes every file passed on the command line with OpenAI embeddings,
//! then answers a question with `gpt-3.5-turbo` using the retrieved chunks.
//! Loaded files are cached in memory under a SHA-256 key of the path list;
//! the demo reloads once after the build to show the cache serving the
//! documents without touching the filesystem again.
//!
//! Requires `OPENAI_API_KEY` (a `.env` file is honoured).
//!
//! Run:
//!
//! ```bash
//! cargo run -p ragline-demos --bin rag_openai --features openai -- \
//!     src/*.rs -- "How is X set up?"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use ragline::{
    CachedLoader, Document, DocumentLoader, GenerationOptions, InMemoryDocumentCache,
    OpenAIEmbeddingProvider, OpenAIGenerator, RagConfig, RagError, RagPipeline, SOURCE_URI_KEY,
    cache_key,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_QUESTION: &str = "How is platform pay setup in this repository?";

/// Loads each path as one document, skipping files that are not UTF-8.
///
/// Documents are keyed by the path as given and carry a `file://` URI of the
/// canonical path.
struct FileLoader {
    paths: Vec<PathBuf>,
    reads: AtomicUsize,
}

#[async_trait]
impl DocumentLoader for FileLoader {
    async fn load(&self) -> ragline::Result<Vec<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut documents = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let bytes = tokio::fs::read(path).await.map_err(|e| RagError::LoaderError {
                loader: "files".into(),
                message: format!("{}: {e}", path.display()),
            })?;
            match String::from_utf8(bytes) {
                Ok(text) => {
                    let absolute = tokio::fs::canonicalize(path).await.unwrap_or(path.clone());
                    documents.push(
                        Document::new(path.display().to_string(), text)
                            .with_source_uri(format!("file://{}", absolute.display())),
                    );
                }
                Err(_) => tracing::warn!(path = %path.display(), "skipping non-UTF-8 file"),
            }
        }
        Ok(documents)
    }

    fn name(&self) -> &str {
        "files"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Arguments: files, optionally followed by `--` and the question.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (files, question) = match args.iter().position(|a| a == "--") {
        Some(split) => (&args[..split], args[split + 1..].join(" ")),
        None => (&args[..], DEFAULT_QUESTION.to_string()),
    };
    anyhow::ensure!(!files.is_empty(), "pass at least one file to index");

    let files = Arc::new(FileLoader {
        paths: files.iter().map(PathBuf::from).collect(),
        reads: AtomicUsize::new(0),
    });
    let listing: Vec<String> = files.paths.iter().map(|p| p.display().to_string()).collect();
    let key = cache_key(&listing.join("\n"), None);
    let loader = CachedLoader::new(files.clone(), Arc::new(InMemoryDocumentCache::new()), key);

    let config = RagConfig::builder()
        .generation(GenerationOptions::new("gpt-3.5-turbo").with_temperature(0.1))
        .build()?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_env()?))
        .generator(Arc::new(OpenAIGenerator::from_env()?))
        .loader(Arc::new(loader))
        .build()?;

    let chunk_count = pipeline.build_index().await.context("index build failed")?;
    info!(chunk_count, "index ready");

    // Second load is a cache hit: the filesystem is read only once.
    let reloaded = pipeline.load_documents().await?;
    info!(
        document_count = reloaded.len(),
        file_reads = files.reads.load(Ordering::SeqCst),
        "reloaded documents from cache"
    );

    let sources = pipeline.retrieve(&question).await?;

    let answer = pipeline.query(&question).await.context("query failed")?;
    println!("----------------------------------------------------------");
    println!("{question}");
    println!();
    println!("{answer}");
    println!();
    println!("Sources:");
    for result in &sources {
        let chunk = &result.entry.chunk;
        let uri = chunk.metadata.get(SOURCE_URI_KEY).unwrap_or(&chunk.document_id);
        println!("  [score={:.4}] {uri}", result.score);
    }
    Ok(())
}
