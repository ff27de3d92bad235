//! Storage abstraction for mailrag indexes.
//!
//! The [`IndexStore`] trait persists and loads a complete [`Index`]:
//! the embedding model identifier plus every chunk with its vector.
//! There are no incremental operations; an index is always written and
//! read as a whole.
//!
//! Implementations must round-trip every chunk field exactly, including
//! vector values, and must run [`Index::validate`] on load so that a
//! damaged artifact surfaces as
//! [`Error::CorruptIndex`](crate::error::Error::CorruptIndex).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Index;

/// Abstract persistence backend for a built index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`save`](IndexStore::save) | Replace the stored index with `index` |
/// | [`load`](IndexStore::load) | Read back and validate the stored index |
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Persist `index`, replacing anything previously stored.
    async fn save(&self, index: &Index) -> Result<()>;

    /// Load the stored index.
    async fn load(&self) -> Result<Index>;
}
