//! Document storage.
//!
//! Records are handed out behind a per-document async mutex. Whoever holds
//! the guard owns the record's mutable state, so a reconcile and the catch-up
//! computed from it happen under one acquisition.

mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use quire_engine::DocumentRecord;
use tokio::sync::Mutex;

/// A record shared between requests.
pub type SharedRecord = Arc<Mutex<DocumentRecord>>;

/// Keeps one record per document id.
pub trait DocumentStore: Send + Sync {
    /// Look up a document. Never creates one.
    fn get(&self, id: &str) -> Option<SharedRecord>;

    /// Create a document with a fresh id and the initial content.
    fn create(&self) -> SharedRecord;

    /// Number of stored documents.
    fn document_count(&self) -> usize;
}
