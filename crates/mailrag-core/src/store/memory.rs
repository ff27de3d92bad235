//! In-memory [`IndexStore`] implementation for testing and embedding.
//!
//! Holds a clone of the last saved index behind `std::sync::RwLock`.

use std::io;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Index;

use super::IndexStore;

#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    index: RwLock<Option<Index>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn save(&self, index: &Index) -> Result<()> {
        index.validate()?;
        let mut slot = self.index.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(index.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Index> {
        let slot = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let index = slot.clone().ok_or_else(|| {
            Error::Io(io::Error::new(io::ErrorKind::NotFound, "no index has been saved"))
        })?;
        index.validate()?;
        Ok(index)
    }
}
