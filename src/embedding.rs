//! Embedding providers.
//!
//! Concrete implementations of the [`Embedder`] trait:
//! - **[`DisabledEmbedder`]**: always fails; used when embeddings are not configured.
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`LocalEmbedder`]**: runs models in-process via fastembed; no network calls after model download.
//!
//! Use [`create_embedder`] to build the one named by the configuration:
//!
//! ```rust
//! # use mailrag::config::EmbeddingConfig;
//! # use mailrag::embedding::create_embedder;
//! # use mailrag_core::embedding::Embedder;
//! let config = EmbeddingConfig {
//!     provider: "disabled".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```
//!
//! Remote failures that survive the retry policy in [`crate::http`]
//! surface as [`Error::EmbedderUnavailable`].

use anyhow::{bail, Result};
use async_trait::async_trait;

use mailrag_core::embedding::Embedder;
use mailrag_core::error::{Error, Result as CoreResult};

use crate::config::EmbeddingConfig;
use crate::http::{post_json_with_retry, JsonRequest};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

// ============ Disabled ============

/// An embedder that refuses every request.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_many(&self, _texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        Err(Error::embedder(
            "embedding provider is disabled; set [embedding] provider in the config",
        ))
    }
}

// ============ OpenAI ============

/// Embeddings via `POST /v1/embeddings`.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl OpenAiEmbedder {
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            api_key,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_many(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(JsonRequest {
            service: "OpenAI",
            url: OPENAI_EMBEDDINGS_URL,
            bearer: Some(&self.api_key),
            body: &body,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        })
        .await
        .map_err(unavailable)?;

        parse_openai_response(&json).map_err(unavailable)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);

        indexed.push((index, json_to_vector(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Embeddings via a local Ollama instance's `POST /api/embed`.
///
/// Requires Ollama to be running with an embedding model pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            dims,
            url,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_many(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let endpoint = format!("{}/api/embed", self.url.trim_end_matches('/'));
        let json = post_json_with_retry(JsonRequest {
            service: "Ollama",
            url: &endpoint,
            bearer: None,
            body: &body,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        })
        .await
        .map_err(unavailable)?;

        parse_ollama_response(&json).map_err(unavailable)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            let values = embedding.as_array().ok_or_else(|| {
                anyhow::anyhow!("Invalid Ollama response: embedding is not an array")
            })?;
            json_to_vector(values)
        })
        .collect()
}

fn json_to_vector(values: &[serde_json::Value]) -> Result<Vec<f32>> {
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|x| x as f32)
                .ok_or_else(|| anyhow::anyhow!("Invalid embedding value: {}", v))
        })
        .collect()
}

fn unavailable(e: anyhow::Error) -> Error {
    Error::embedder(format!("{:#}", e))
}

// ============ Local (fastembed) ============

/// Default local model; the same sentence-transformers model the index
/// format was designed around.
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

/// Vector dimensionality of a known local model.
pub fn local_model_dims(name: &str) -> Option<usize> {
    match canonical_local_model(name) {
        "all-minilm-l6-v2" | "bge-small-en-v1.5" | "multilingual-e5-small" => Some(384),
        "bge-base-en-v1.5"
        | "nomic-embed-text-v1"
        | "nomic-embed-text-v1.5"
        | "multilingual-e5-base" => Some(768),
        "bge-large-en-v1.5" | "multilingual-e5-large" => Some(1024),
        _ => None,
    }
}

/// Map the Hugging Face repository name onto the short identifier.
fn canonical_local_model(name: &str) -> &str {
    match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => "all-minilm-l6-v2",
        other => other,
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::{Arc, Mutex};

    /// In-process embedder backed by fastembed.
    ///
    /// The model is downloaded from Hugging Face on first use and cached;
    /// afterwards embedding runs entirely offline. The loaded model is
    /// kept for the lifetime of the embedder.
    pub struct LocalEmbedder {
        model_name: String,
        dims: usize,
        batch_size: usize,
        fastembed_model: EmbeddingModel,
        model: Arc<Mutex<Option<TextEmbedding>>>,
    }

    impl LocalEmbedder {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
            let fastembed_model = to_fastembed_model(&model_name)?;
            let dims = match config.dims.or_else(|| local_model_dims(&model_name)) {
                Some(dims) => dims,
                None => bail!("embedding.dims required for local model '{}'", model_name),
            };

            Ok(Self {
                model_name,
                dims,
                batch_size: config.batch_size,
                fastembed_model,
                model: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn to_fastembed_model(name: &str) -> Result<EmbeddingModel> {
        match canonical_local_model(name) {
            "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
            "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
            "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
            "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
            "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 nomic-embed-text-v1, nomic-embed-text-v1.5, \
                 multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
                other
            ),
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }
        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed_many(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let texts = texts.to_vec();
            let slot = Arc::clone(&self.model);
            let fastembed_model = self.fastembed_model.clone();
            let batch_size = self.batch_size;

            tokio::task::spawn_blocking(move || {
                let mut guard = slot
                    .lock()
                    .map_err(|_| Error::embedder("local embedding model lock poisoned"))?;
                if guard.is_none() {
                    let loaded = TextEmbedding::try_new(
                        InitOptions::new(fastembed_model).with_show_download_progress(true),
                    )
                    .map_err(|e| {
                        Error::embedder(format!(
                            "failed to initialize local embedding model: {}",
                            e
                        ))
                    })?;
                    *guard = Some(loaded);
                }
                let model = guard
                    .as_mut()
                    .ok_or_else(|| Error::embedder("local embedding model not loaded"))?;
                model
                    .embed(texts, Some(batch_size))
                    .map_err(|e| Error::embedder(format!("local embedding failed: {}", e)))
            })
            .await
            .map_err(|e| Error::embedder(format!("embedding task failed: {}", e)))?
        }
    }
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Embedder |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAiEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings`) |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the embedder
/// cannot be initialized (missing config, API key, or feature flag).
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
