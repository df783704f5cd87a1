//! Error taxonomy for memory operations.

use thiserror::Error;

use crate::memory::types::CollectionKind;
use crate::store::StoreError;

/// Failure of a memory operation. Nothing here is retried internally; every
/// mutating operation is keyed by id, so callers may retry safely.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Missing or malformed caller input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The embedding backend failed to load or produced no usable vector.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The target point does not exist in the chosen collection.
    #[error("memory {id} not found in {collection} collection")]
    NotFound { id: String, collection: CollectionKind },

    /// Network or server failure from the vector store.
    #[error("vector store error: {0}")]
    Store(#[from] StoreError),
}

impl MemoryError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
