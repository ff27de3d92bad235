//! Core data models used throughout mailrag.
//!
//! These types represent the messages, chunks, indexes, and retrieval
//! results that flow through the indexing and query passes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Marker separating a chunk's header block from its content block.
pub const CONTENT_MARKER: &str = "\nContent:\n";

/// One parsed source message. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub sender: String,
    pub receiver: String,
    pub body: String,
}

/// A retrievable unit of message text.
///
/// `text` is a header block (subject, sender, receiver) followed by a
/// content block of whole sentences. `embedding` is `None` until the
/// indexing pass assigns a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based sequence number within the source message.
    pub chunk_id: usize,
    pub text: String,
    /// Identifier of the originating message file.
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// The packed sentences, without the header block.
    pub fn content(&self) -> &str {
        match self.text.find(CONTENT_MARKER) {
            Some(pos) => self.text[pos + CONTENT_MARKER.len()..].trim_end_matches('\n'),
            None => self.text.as_str(),
        }
    }

    /// Word count of the content block only.
    pub fn content_word_count(&self) -> usize {
        self.content().split_whitespace().count()
    }
}

/// The persisted corpus: the embedding model identifier plus every chunk
/// with its vector.
///
/// Built once by the indexing pass and treated as read-only afterwards.
/// A different embedding model means a full rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub model_name: String,
    pub chunks: Vec<Chunk>,
}

impl Index {
    pub fn new(model_name: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            model_name: model_name.into(),
            chunks,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality of the stored vectors, or `None` for an empty index.
    pub fn dims(&self) -> Option<usize> {
        self.chunks
            .first()
            .and_then(|c| c.embedding.as_ref())
            .map(Vec::len)
    }

    /// Distinct source files, sorted.
    pub fn source_files(&self) -> BTreeSet<&str> {
        self.chunks.iter().map(|c| c.source_file.as_str()).collect()
    }

    /// Check the structural invariants every loaded index must satisfy.
    ///
    /// - `model_name` is non-empty.
    /// - Every chunk carries an embedding.
    /// - All embeddings share one non-zero dimensionality.
    /// - Every vector component is finite.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(Error::corrupt("missing model name"));
        }

        let mut expected: Option<usize> = None;
        for (position, chunk) in self.chunks.iter().enumerate() {
            let embedding = chunk.embedding.as_ref().ok_or_else(|| {
                Error::corrupt(format!(
                    "chunk {} ({}#{}) has no embedding",
                    position, chunk.source_file, chunk.chunk_id
                ))
            })?;

            if embedding.is_empty() {
                return Err(Error::corrupt(format!(
                    "chunk {} ({}#{}) has an empty embedding",
                    position, chunk.source_file, chunk.chunk_id
                )));
            }

            match expected {
                None => expected = Some(embedding.len()),
                Some(dims) if dims != embedding.len() => {
                    return Err(Error::corrupt(format!(
                        "chunk {} ({}#{}) has {} dimensions, expected {}",
                        position,
                        chunk.source_file,
                        chunk.chunk_id,
                        embedding.len(),
                        dims
                    )));
                }
                Some(_) => {}
            }

            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(Error::corrupt(format!(
                    "chunk {} ({}#{}) has a non-finite vector component",
                    position, chunk.source_file, chunk.chunk_id
                )));
            }
        }

        Ok(())
    }
}

/// One ranked hit for a query. Produced fresh per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
    pub text: String,
    pub source_file: String,
}
