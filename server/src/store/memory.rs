//! In-memory document store.

use std::sync::Arc;

use dashmap::DashMap;
use quire_engine::{DocumentId, DocumentRecord};
use tokio::sync::Mutex;

use super::{DocumentStore, SharedRecord};

/// Documents kept in a concurrent map for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<DocumentId, SharedRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Create an empty store wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &str) -> Option<SharedRecord> {
        self.documents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn create(&self) -> SharedRecord {
        let id = uuid::Uuid::new_v4().to_string();
        let record = Arc::new(Mutex::new(DocumentRecord::new(id.clone())));

        self.documents.insert(id.clone(), Arc::clone(&record));
        tracing::info!(document_id = %id, "Document created");

        record
    }

    fn document_count(&self) -> usize {
        self.documents.len()
    }
}
