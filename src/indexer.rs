//! Indexing pass orchestration.
//!
//! Coordinates the full build: corpus walk → chunking → batched
//! embedding → store. Every build is a full rebuild; the previous index
//! is replaced only once the new one is complete.

use anyhow::{Context, Result};
use tracing::info;

use mailrag_core::embedding::{embed_chunks, Embedder};
use mailrag_core::error::Error;
use mailrag_core::models::Index;
use mailrag_core::store::IndexStore;

use crate::config::Config;
use crate::corpus::{Corpus, CorpusWalker};
use crate::embedding::create_embedder;
use crate::store::open_store;

/// Summary of one indexing pass.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub files_seen: usize,
    pub files_chunked: usize,
    /// Files that parsed but held nothing beyond salutations and signature.
    pub empty_files: Vec<String>,
    /// Files that failed to read or parse, with the reason.
    pub skipped_files: Vec<(String, String)>,
    pub chunks: usize,
    pub dims: Option<usize>,
    pub model_name: String,
}

impl IndexReport {
    fn from_corpus(corpus: &Corpus) -> Self {
        Self {
            files_seen: corpus.files.len(),
            files_chunked: corpus.files_chunked(),
            empty_files: corpus.empty_files().into_iter().map(String::from).collect(),
            skipped_files: corpus
                .failed_files()
                .into_iter()
                .map(|(f, r)| (f.to_string(), r.to_string()))
                .collect(),
            chunks: corpus.chunks.len(),
            dims: None,
            model_name: String::new(),
        }
    }
}

/// Walk the corpus, embed every chunk, and save the index.
///
/// An empty corpus produces a valid index with zero chunks.
///
/// # Errors
///
/// Fails on a malformed file (under the default abort policy), an
/// unavailable embedder, vectors whose length disagrees with the
/// embedder's declared dimensionality, or a store failure.
pub async fn build_index(
    config: &Config,
    embedder: &dyn Embedder,
    store: &dyn IndexStore,
) -> Result<IndexReport> {
    let walker = CorpusWalker::from_config(config);
    let mut corpus = walker.walk()?;
    let mut report = IndexReport::from_corpus(&corpus);

    let dims = embed_chunks(embedder, &mut corpus.chunks, config.embedding.batch_size)
        .await
        .with_context(|| format!("Embedding with '{}' failed", embedder.model_name()))?;

    if let Some(actual) = dims {
        let declared = embedder.dims();
        if declared != 0 && declared != actual {
            return Err(Error::DimensionMismatch {
                expected: declared,
                actual,
            })
            .with_context(|| {
                format!(
                    "Model '{}' returned vectors of unexpected length",
                    embedder.model_name()
                )
            });
        }
    }

    let index = Index::new(embedder.model_name(), corpus.chunks);
    store.save(&index).await.context("Failed to save index")?;

    report.dims = dims;
    report.model_name = index.model_name.clone();
    info!(
        chunks = report.chunks,
        files = report.files_seen,
        model = %report.model_name,
        "index built"
    );
    Ok(report)
}

/// `mailrag index [--dry-run]`.
pub async fn run_index(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        let corpus = CorpusWalker::from_config(config).walk()?;
        let report = IndexReport::from_corpus(&corpus);
        println!("index (dry-run)");
        print_walk_summary(&report);
        println!("  max words per chunk: {}", config.chunking.max_words);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        return Err(Error::embedder(
            "embedding provider is disabled; set [embedding] provider to build an index",
        ))
        .context("Cannot build index");
    }

    let embedder = create_embedder(&config.embedding)?;
    let store = open_store(&config.index);
    let report = build_index(config, embedder.as_ref(), store.as_ref()).await?;

    println!("index");
    print_walk_summary(&report);
    println!("  model: {}", report.model_name);
    match report.dims {
        Some(dims) => println!("  dims: {}", dims),
        None => println!("  dims: n/a (no chunks)"),
    }
    println!("  written to: {}", config.index.path.display());
    println!("ok");
    Ok(())
}

fn print_walk_summary(report: &IndexReport) {
    println!("  files found: {}", report.files_seen);
    println!("  files chunked: {}", report.files_chunked);
    println!("  chunks: {}", report.chunks);
    if !report.empty_files.is_empty() {
        println!("  empty messages: {}", report.empty_files.len());
        for file in &report.empty_files {
            println!("    {}", file);
        }
    }
    if !report.skipped_files.is_empty() {
        println!("  skipped (malformed): {}", report.skipped_files.len());
        for (file, reason) in &report.skipped_files {
            println!("    {}: {}", file, reason);
        }
    }
}
