//! Cosine-similarity top-K retrieval.
//!
//! Scores every chunk against the query vector, sorts by descending
//! score, and keeps the first `k`. The sort is stable, so chunks with
//! exactly equal scores keep their corpus order.
//!
//! A linear scan is adequate at mailbox scale. A heap-based partial
//! selection could replace the full sort behind the same signature.

use std::cmp::Ordering;

use crate::embedding::{cosine_similarity, l2_norm};
use crate::error::{Error, Result};
use crate::models::{Chunk, Index, RetrievalResult};

/// Rank `chunks` against `query` and return at most `k` results.
///
/// - `k == 0` returns an empty list.
/// - `k` larger than the corpus returns the whole corpus, ranked.
///
/// # Errors
///
/// - [`Error::DegenerateVector`] if the query or any chunk embedding has
///   zero norm.
/// - [`Error::DimensionMismatch`] if a chunk's embedding length differs
///   from the query's.
/// - [`Error::CorruptIndex`] if a chunk has no embedding.
///
/// Errors abort this query only; `chunks` is never modified.
pub fn retrieve(query: &[f32], chunks: &[Chunk], k: usize) -> Result<Vec<RetrievalResult>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    if l2_norm(query) == 0.0 {
        return Err(Error::DegenerateVector("query vector has zero norm".into()));
    }

    let mut scored: Vec<(f32, &Chunk)> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let embedding = chunk.embedding.as_deref().ok_or_else(|| {
            Error::corrupt(format!(
                "chunk {}#{} has no embedding",
                chunk.source_file, chunk.chunk_id
            ))
        })?;

        let score = cosine_similarity(query, embedding).map_err(|e| match e {
            Error::DegenerateVector(_) => Error::DegenerateVector(format!(
                "embedding of chunk {}#{} has zero norm",
                chunk.source_file, chunk.chunk_id
            )),
            other => other,
        })?;
        scored.push((score, chunk));
    }

    scored.sort_by(|a, b| descending(a.0, b.0));
    scored.truncate(k);

    Ok(scored
        .into_iter()
        .map(|(score, chunk)| RetrievalResult {
            score,
            text: chunk.text.clone(),
            source_file: chunk.source_file.clone(),
        })
        .collect())
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

/// Read-only query view over a loaded [`Index`].
///
/// Safe to share across threads: retrieval never mutates the index.
#[derive(Debug, Clone, Copy)]
pub struct Retriever<'a> {
    index: &'a Index,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self { index }
    }

    /// Top-`k` chunks for `query`.
    ///
    /// The query dimensionality is checked against the index up front so
    /// a wrong-model query fails with a clear error.
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if let Some(dims) = self.index.dims() {
            if dims != query.len() {
                return Err(Error::DimensionMismatch {
                    expected: dims,
                    actual: query.len(),
                });
            }
        }
        retrieve(query, &self.index.chunks, k)
    }
}
