//! Query pass: load the index, embed the question, retrieve, answer.
//!
//! The index is only meaningful for the model that built it, so every
//! query first checks that the configured embedder reports the same
//! `model_name` as the stored index and that the query vector has the
//! stored dimensionality.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use mailrag_core::embedding::Embedder;
use mailrag_core::models::{Index, RetrievalResult};
use mailrag_core::retrieve::Retriever;
use mailrag_core::store::IndexStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::{create_generator, Generator};
use crate::store::open_store;

/// Answer plus the ranked chunks it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub results: Vec<RetrievalResult>,
}

/// Fail unless `embedder` produced (or can reproduce) the vectors in `index`.
pub fn check_model(index: &Index, embedder: &dyn Embedder) -> Result<()> {
    if index.model_name != embedder.model_name() {
        warn!(
            index_model = %index.model_name,
            configured_model = %embedder.model_name(),
            "embedding model mismatch"
        );
        bail!(
            "Index was built with model '{}' but the configured embedder is '{}'. \
             Rebuild the index with `mailrag index` or change [embedding] model.",
            index.model_name,
            embedder.model_name()
        );
    }
    Ok(())
}

/// Rank the chunks of `index` against `question`.
pub async fn search_index(
    index: &Index,
    embedder: &dyn Embedder,
    question: &str,
    k: usize,
) -> Result<Vec<RetrievalResult>> {
    let question = question.trim();
    if question.is_empty() {
        bail!("Question must not be empty");
    }
    check_model(index, embedder)?;

    let query = embedder
        .embed(question)
        .await
        .context("Failed to embed the question")?;
    let results = Retriever::new(index).top_k(&query, k)?;

    info!(k, hits = results.len(), "retrieval complete");
    Ok(results)
}

/// Full query pass against a stored index.
///
/// The generator receives exactly the retrieved texts, in rank order,
/// plus the question as given.
pub async fn answer_question(
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    store: &dyn IndexStore,
    question: &str,
    k: usize,
) -> Result<QueryOutcome> {
    let index = load_index(store).await?;
    let results = search_index(&index, embedder, question, k).await?;

    let context: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
    let answer = generator
        .generate(&context, question.trim())
        .await
        .context("Answer generation failed")?;

    Ok(QueryOutcome { answer, results })
}

async fn load_index(store: &dyn IndexStore) -> Result<Index> {
    let index = store
        .load()
        .await
        .context("Failed to load index (run `mailrag index` first)")?;
    info!(model = %index.model_name, chunks = index.len(), "index loaded");
    Ok(index)
}

/// `mailrag query "<question>"`.
pub async fn run_query(
    config: &Config,
    question: &str,
    k: Option<usize>,
    show_context: bool,
) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.top_k);
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.generation)?;
    let store = open_store(&config.index);

    let outcome = answer_question(
        embedder.as_ref(),
        generator.as_ref(),
        store.as_ref(),
        question,
        k,
    )
    .await?;

    if show_context {
        println!("--- CONTEXT ---");
        for (rank, hit) in outcome.results.iter().enumerate() {
            println!();
            println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.source_file);
            println!("{}", hit.text.trim_end());
        }
        println!();
    }

    println!("--- ANSWER ---");
    println!();
    println!("{}", outcome.answer);
    println!();
    println!("--- SOURCES ---");
    for (rank, hit) in outcome.results.iter().enumerate() {
        println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.source_file);
    }
    Ok(())
}

/// `mailrag search "<question>"`: retrieval only.
pub async fn run_search(config: &Config, question: &str, k: Option<usize>, json: bool) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.top_k);
    let embedder = create_embedder(&config.embedding)?;
    let store = open_store(&config.index);

    let index = load_index(store.as_ref()).await?;
    let results = search_index(&index, embedder.as_ref(), question, k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (rank, hit) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.source_file);
        for line in hit.text.trim_end().lines() {
            println!("    {}", line);
        }
        println!();
    }
    Ok(())
}

/// `mailrag stats`: describe the stored index.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = open_store(&config.index);
    let index = load_index(store.as_ref()).await?;

    let size = std::fs::metadata(&config.index.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let sources = index.source_files();

    println!("mailrag index");
    println!("=============");
    println!();
    println!("  Index:        {}", config.index.path.display());
    println!("  Size:         {}", format_bytes(size));
    println!("  Model:        {}", index.model_name);
    match index.dims() {
        Some(dims) => println!("  Dimensions:   {}", dims),
        None => println!("  Dimensions:   n/a"),
    }
    println!("  Chunks:       {}", index.len());
    println!("  Source files: {}", sources.len());
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
