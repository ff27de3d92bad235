//! Persisted index stores.
//!
//! Two on-disk formats implement the core
//! [`IndexStore`](mailrag_core::store::IndexStore) trait:
//!
//! | Format | Store | File |
//! |--------|-------|------|
//! | `json` | [`JsonIndexStore`] | one pretty-printed JSON document |
//! | `sqlite` | [`SqliteIndexStore`] | one SQLite database |
//!
//! Both replace the whole index on save and validate on load.

pub mod json;
pub mod sqlite;

pub use json::JsonIndexStore;
pub use sqlite::SqliteIndexStore;

use mailrag_core::store::IndexStore;

use crate::config::{IndexConfig, IndexFormat};

/// Version written into persisted indexes and checked on load.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Open the store selected by `index.format`.
///
/// Opening is lazy: nothing touches the filesystem until `save` or `load`.
pub fn open_store(config: &IndexConfig) -> Box<dyn IndexStore> {
    match config.format {
        IndexFormat::Json => Box::new(JsonIndexStore::new(&config.path)),
        IndexFormat::Sqlite => Box::new(SqliteIndexStore::new(&config.path)),
    }
}
