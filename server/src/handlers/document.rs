//! Fetch handler - hands a site a document to edit.

use quire_engine::DocumentRecord;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::store::DocumentStore;

/// Response for fetch-or-create.
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub site: Site,
}

/// A newly joined site and the document it starts from.
#[derive(Debug, Serialize)]
pub struct Site {
    /// Freshly minted site identity
    pub id: String,
    /// Snapshot of the document record
    pub document: DocumentRecord,
}

/// Fetch an existing document, or create one when no id is given.
///
/// Every call mints a new site identity.
pub async fn handle_fetch(store: &dyn DocumentStore, id: Option<&str>) -> Result<FetchResponse> {
    let shared = match id {
        Some(id) => store
            .get(id)
            .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?,
        None => store.create(),
    };
    let document = shared.lock().await.clone();

    let site_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        document_id = %document.id(),
        site_id = %site_id,
        execution_order = document.execution_order(),
        "Site joined document"
    );

    Ok(FetchResponse {
        site: Site {
            id: site_id,
            document,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use quire_engine::INITIAL_CONTENT;

    #[tokio::test]
    async fn test_fetch_without_id_creates_document() {
        let store = MemoryStore::new();

        let response = handle_fetch(&store, None).await.unwrap();

        assert_eq!(store.document_count(), 1);
        assert_eq!(response.site.document.content(), INITIAL_CONTENT);
        assert!(store.get(response.site.document.id()).is_some());
    }

    #[tokio::test]
    async fn test_fetch_existing_document() {
        let store = MemoryStore::new();
        let created = handle_fetch(&store, None).await.unwrap();
        let id = created.site.document.id().clone();

        let fetched = handle_fetch(&store, Some(&id)).await.unwrap();

        assert_eq!(store.document_count(), 1);
        assert_eq!(fetched.site.document.id(), &id);
        assert_ne!(fetched.site.id, created.site.id);
    }

    #[tokio::test]
    async fn test_fetch_unknown_document() {
        let store = MemoryStore::new();

        let err = handle_fetch(&store, Some("missing")).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_response_format() {
        let store = MemoryStore::new();
        let response = handle_fetch(&store, None).await.unwrap();

        let json = serde_json::to_value(&response).unwrap();
        let document = &json["site"]["document"];
        assert!(json["site"]["id"].is_string());
        assert_eq!(document["content"], INITIAL_CONTENT);
        assert_eq!(document["operationLog"], serde_json::json!([]));
        assert_eq!(document["executionOrder"], 0);
        assert!(document["causalContext"].is_null());
    }
}
