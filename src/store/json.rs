//! JSON index file.
//!
//! ```json
//! {
//!   "version": 1,
//!   "model_name": "all-minilm-l6-v2",
//!   "dims": 384,
//!   "chunks": [
//!     { "chunk_id": 0, "text": "Subject: ...", "source_file": "a.txt", "embedding": [0.01, ...] }
//!   ]
//! }
//! ```
//!
//! `serde_json` writes `f32` values in their shortest round-trip form, so
//! vectors load back bit-for-bit. Saves go to a sibling temp file that is
//! renamed over the target, so a crash never leaves a half-written index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use mailrag_core::error::{Error, Result};
use mailrag_core::models::{Chunk, Index};
use mailrag_core::store::IndexStore;

use super::INDEX_FORMAT_VERSION;

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    model_name: &'a str,
    dims: Option<usize>,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    model_name: String,
    #[serde(default)]
    dims: Option<usize>,
    chunks: Vec<Chunk>,
}

pub struct JsonIndexStore {
    path: PathBuf,
}

impl JsonIndexStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "index.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl IndexStore for JsonIndexStore {
    async fn save(&self, index: &Index) -> Result<()> {
        index.validate()?;

        let document = IndexFileRef {
            version: INDEX_FORMAT_VERSION,
            model_name: &index.model_name,
            dims: index.dims(),
            chunks: &index.chunks,
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| Error::Storage(format!("failed to serialize index: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        info!(path = %self.path.display(), chunks = index.len(), "saved JSON index");
        Ok(())
    }

    async fn load(&self) -> Result<Index> {
        let bytes = tokio::fs::read(&self.path).await?;
        let index = parse_index(&bytes)?;
        info!(path = %self.path.display(), chunks = index.len(), "loaded JSON index");
        Ok(index)
    }
}

/// Parse and validate a JSON index document.
pub fn parse_index(bytes: &[u8]) -> Result<Index> {
    let file: IndexFile = serde_json::from_slice(bytes)
        .map_err(|e| Error::corrupt(format!("unreadable index file: {}", e)))?;

    if file.version != INDEX_FORMAT_VERSION {
        return Err(Error::corrupt(format!(
            "unsupported index version {} (expected {})",
            file.version, INDEX_FORMAT_VERSION
        )));
    }

    let index = Index::new(file.model_name, file.chunks);
    index.validate()?;

    if let (Some(declared), Some(actual)) = (file.dims, index.dims()) {
        if declared != actual {
            return Err(Error::corrupt(format!(
                "index declares {} dimensions but vectors have {}",
                declared, actual
            )));
        }
    }

    Ok(index)
}
