//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! the batched [`embed_chunks`] driver used by the indexing pass, and pure
//! helpers for similarity computation and BLOB encoding.
//!
//! Concrete backends (OpenAI, Ollama, fastembed) live in the `mailrag`
//! app crate.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Chunk;

/// Maps text to fixed-length vectors.
///
/// For a fixed [`model_name`](Embedder::model_name) the output must be
/// deterministic and every vector must have the same dimensionality.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded alongside the vectors it produced.
    fn model_name(&self) -> &str;

    /// Expected vector dimensionality (`0` when unknown until first call).
    fn dims(&self) -> usize;

    /// Embed a batch of texts. Output order matches input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(Error::embedder(format!(
                "expected 1 vector, got {}",
                vectors.len()
            )));
        }
        vectors
            .pop()
            .ok_or_else(|| Error::embedder("empty embedding response"))
    }
}

/// Assign an embedding to every chunk, `batch_size` texts per call.
///
/// Returns the dimensionality of the produced vectors (`None` when there
/// were no chunks).
///
/// # Errors
///
/// - [`Error::EmbedderUnavailable`] if the backend fails or returns a
///   different number of vectors than texts sent.
/// - [`Error::DimensionMismatch`] if vectors disagree in length.
pub async fn embed_chunks<E>(
    embedder: &E,
    chunks: &mut [Chunk],
    batch_size: usize,
) -> Result<Option<usize>>
where
    E: Embedder + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut dims: Option<usize> = None;

    for (batch_no, batch) in chunks.chunks_mut(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_many(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(Error::embedder(format!(
                "batch {}: sent {} texts, received {} vectors",
                batch_no,
                batch.len(),
                vectors.len()
            )));
        }

        for (chunk, vector) in batch.iter_mut().zip(vectors) {
            if vector.is_empty() {
                return Err(Error::embedder("backend returned an empty vector"));
            }
            let expected = *dims.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            chunk.embedding = Some(vector);
        }

        debug!(batch = batch_no, size = texts.len(), "embedded batch");
    }

    Ok(dims)
}

/// Compute cosine similarity between two vectors.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
///
/// Accumulates in `f64` and clamps the result to `[-1.0, 1.0]`.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] when the lengths differ.
/// - [`Error::DegenerateVector`] when either vector has zero norm
///   (including empty vectors).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 {
        return Err(Error::DegenerateVector("first vector has zero norm".into()));
    }
    if norm_b == 0.0 {
        return Err(Error::DegenerateVector("second vector has zero norm".into()));
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !sim.is_finite() {
        return Err(Error::DegenerateVector(
            "similarity is not a finite number".into(),
        ));
    }

    Ok(sim.clamp(-1.0, 1.0) as f32)
}

/// Euclidean norm, accumulated in `f64`.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use mailrag_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob).unwrap(), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// # Errors
///
/// [`Error::CorruptIndex`] if the length is not a multiple of 4.
pub fn blob_to_vec(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::corrupt(format!(
            "embedding blob of {} bytes is not a whole number of f32 values",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
