//! Keyed record persistence.
//!
//! Records are JSON documents addressed by `(collection, id)`. Records refer
//! to each other by opaque id and are resolved lazily, so no operation needs
//! a cross-record transaction.
//!
//! - `MemoryStore`: RwLock'd maps, used by tests and embedders
//! - `JsonDirStore`: one JSON file per record under `<root>/<collection>/`
//! - `Ledger`: typed facade the engines talk to
//!
//! Listing never fails on a malformed record. Unreadable or mis-shaped
//! records are skipped and counted in [`Listing::skipped`].

pub mod json_dir;
pub mod ledger;
pub mod memory;

pub use json_dir::JsonDirStore;
pub use ledger::Ledger;
pub use memory::MemoryStore;

use serde::Serialize;

/// Error type for record store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error in {collection}/{id}: {reason}")]
    Deserialization {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Records from a collection plus the number that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Listing<T> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Untyped keyed persistence.
pub trait RecordStore: Send + Sync {
    /// Insert or overwrite a record.
    fn put(&self, collection: &str, id: &str, value: &serde_json::Value) -> StoreResult<()>;

    /// Fetch one record, `None` if absent.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<serde_json::Value>>;

    /// Every readable record in a collection, ordered by id.
    fn list(&self, collection: &str) -> StoreResult<Listing<serde_json::Value>>;
}
