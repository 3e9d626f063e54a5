//! Update handler - reconciles submitted operations and catches the site up.

use quire_engine::{reconcile, updates_since, DocumentId, Error as EngineError, Operation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::store::DocumentStore;

/// Request body for an update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Last execution order the site has integrated
    #[serde(default)]
    pub exec_order: i64,
    /// Operations to reconcile, in submission order
    #[serde(default)]
    pub updates: Vec<Operation>,
}

/// Response for an update or catch-up request.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    /// Committed operations the site has not integrated, in execution order
    pub updates: Vec<Operation>,
}

/// What an update did to the document.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// Reply for the submitting site
    pub result: Result<UpdateResponse>,
    /// Operations committed by this request, for notifying other sites.
    /// A batch rejected as corrupted keeps the prefix it committed, so this
    /// can be non-empty even when `result` is an error.
    pub committed: Vec<Operation>,
}

impl UpdateOutcome {
    fn rejected(err: impl Into<AppError>) -> Self {
        Self {
            result: Err(err.into()),
            committed: Vec::new(),
        }
    }
}

/// Query parameters for catch-up.
#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    #[serde(default)]
    pub since: i64,
}

/// Process an update request for a document.
///
/// The record stays locked from reconciliation until the catch-up has been
/// computed, so the response reflects exactly this request's commits plus
/// everything before them.
pub async fn handle_update(
    store: &dyn DocumentStore,
    max_batch_size: usize,
    document_id: &str,
    request: UpdateRequest,
) -> UpdateOutcome {
    if request.updates.len() > max_batch_size {
        return UpdateOutcome::rejected(AppError::BadRequest(format!(
            "Batch of {} operations exceeds the limit of {}",
            request.updates.len(),
            max_batch_size
        )));
    }

    let Some(shared) = store.get(document_id) else {
        return UpdateOutcome::rejected(EngineError::DocumentNotFound(DocumentId::from(
            document_id,
        )));
    };
    let mut record = shared.lock().await;

    let submitted = request.updates.len();
    let before = record.execution_order() as i64;
    let result = match reconcile(&mut record, request.updates) {
        Ok(outcome) => {
            if outcome.duplicates > 0 {
                tracing::debug!(
                    document_id = %document_id,
                    duplicates = outcome.duplicates,
                    "Skipped operations already incorporated"
                );
            }
            tracing::info!(
                document_id = %document_id,
                submitted,
                applied = outcome.applied(),
                duplicates = outcome.duplicates,
                execution_order = record.execution_order(),
                "Reconciled update batch"
            );
            Ok(UpdateResponse {
                updates: updates_since(&record, request.exec_order),
            })
        }
        Err(err) => Err(err.into()),
    };

    UpdateOutcome {
        result,
        committed: updates_since(&record, before),
    }
}

/// Catch a site up without submitting anything.
pub async fn handle_updates_since(
    store: &dyn DocumentStore,
    document_id: &str,
    query: UpdatesQuery,
) -> Result<UpdateResponse> {
    let shared = store
        .get(document_id)
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;
    let record = shared.lock().await;

    Ok(UpdateResponse {
        updates: updates_since(&record, query.since),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use quire_engine::{TextOperation, INITIAL_CONTENT};
    use std::sync::Arc;

    async fn new_document(store: &MemoryStore) -> String {
        store.create().lock().await.id().clone()
    }

    fn append(site: &str, seq: u64, parent: u64, base_len: usize, text: &str) -> Operation {
        Operation::new(
            site,
            seq,
            parent,
            TextOperation::insert_at(base_len, base_len, text).unwrap(),
        )
    }

    fn request(exec_order: i64, updates: Vec<Operation>) -> UpdateRequest {
        UpdateRequest {
            exec_order,
            updates,
        }
    }

    #[tokio::test]
    async fn test_update_commits_and_returns_catch_up() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;

        let outcome = handle_update(&store, 10, &id, request(0, vec![append("s1", 1, 0, 11, "!")])).await;

        let response = outcome.result.unwrap();
        assert_eq!(response.updates.len(), 1);
        assert_eq!(response.updates[0].exec_order, Some(1));
        assert_eq!(outcome.committed.len(), 1);
        let record = store.get(&id).unwrap();
        assert_eq!(record.lock().await.content(), "Hello World!");
    }

    #[tokio::test]
    async fn test_update_returns_other_sites_operations() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;
        handle_update(&store, 10, &id, request(0, vec![append("s1", 1, 0, 11, "!")]))
            .await
            .result
            .unwrap();

        let outcome = handle_update(&store, 10, &id, request(0, vec![append("s2", 1, 0, 11, "?")])).await;

        let response = outcome.result.unwrap();
        let sites: Vec<_> = response.updates.iter().map(|op| op.site.as_str()).collect();
        assert_eq!(sites, vec!["s1", "s2"]);
        assert_eq!(outcome.committed.len(), 1);
        assert_eq!(outcome.committed[0].site, "s2");
    }

    #[tokio::test]
    async fn test_resubmission_commits_nothing() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;
        let op = append("s1", 1, 0, 11, "!");
        handle_update(&store, 10, &id, request(0, vec![op.clone()]))
            .await
            .result
            .unwrap();

        let outcome = handle_update(&store, 10, &id, request(1, vec![op])).await;

        assert!(outcome.result.unwrap().updates.is_empty());
        assert!(outcome.committed.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_document() {
        let store = MemoryStore::new();

        let err = handle_update(&store, 10, "missing", request(0, vec![]))
            .await
            .result
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Engine(EngineError::DocumentNotFound(ref id)) if id == "missing"
        ));
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupted_batch_is_rejected() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;

        let outcome = handle_update(&store, 10, &id, request(0, vec![append("s1", 2, 0, 11, "!")])).await;

        assert!(matches!(
            outcome.result,
            Err(AppError::Engine(EngineError::CorruptedOperation { index: 0, .. }))
        ));
        assert!(outcome.committed.is_empty());
        let record = store.get(&id).unwrap();
        assert_eq!(record.lock().await.execution_order(), 0);
    }

    #[tokio::test]
    async fn test_corrupted_batch_reports_committed_prefix() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;
        let ops = vec![append("s1", 1, 0, 11, "!"), append("s1", 3, 0, 12, "?")];

        let outcome = handle_update(&store, 10, &id, request(0, ops)).await;

        assert!(matches!(
            outcome.result,
            Err(AppError::Engine(EngineError::CorruptedOperation {
                index: 1,
                committed: 1,
                ..
            }))
        ));
        assert_eq!(outcome.committed.len(), 1);
        assert_eq!(outcome.committed[0].seq, 1);
        assert_eq!(outcome.committed[0].exec_order, Some(1));
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;
        let ops = (1..=3).map(|seq| append("s1", seq, 0, 10 + seq as usize, "x")).collect();

        let err = handle_update(&store, 2, &id, request(0, ops))
            .await
            .result
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        let record = store.get(&id).unwrap();
        assert!(record.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_updates_since() {
        let store = MemoryStore::new();
        let id = new_document(&store).await;
        let ops = vec![append("s1", 1, 0, 11, "!"), append("s1", 2, 0, 12, "?")];
        handle_update(&store, 10, &id, request(0, ops))
            .await
            .result
            .unwrap();

        let response = handle_updates_since(&store, &id, UpdatesQuery { since: 1 })
            .await
            .unwrap();
        assert_eq!(response.updates.len(), 1);
        assert_eq!(response.updates[0].seq, 2);

        let err = handle_updates_since(&store, "missing", UpdatesQuery { since: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Submit one append per site concurrently, all written against order 0.
    fn submit_concurrently(
        store: &Arc<MemoryStore>,
        id: &str,
        sites: std::ops::Range<usize>,
    ) -> Vec<tokio::task::JoinHandle<UpdateOutcome>> {
        sites
            .map(|i| {
                let store = Arc::clone(store);
                let id = id.to_string();
                tokio::spawn(async move {
                    let op = append(&format!("site-{}", i), 1, 0, 11, "x");
                    handle_update(store.as_ref(), 10, &id, request(0, vec![op])).await
                })
            })
            .collect()
    }

    async fn assert_gapless(store: &MemoryStore, id: &str, expected: u64) {
        let shared = store.get(id).unwrap();
        let record = shared.lock().await;

        record.verify(INITIAL_CONTENT).unwrap();
        let orders: Vec<_> = record
            .operation_log()
            .iter()
            .map(|op| op.exec_order.unwrap())
            .collect();
        assert_eq!(orders, (1..=expected).collect::<Vec<_>>());
        assert_eq!(record.content().chars().count(), 11 + expected as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_get_distinct_execution_orders() {
        let store = MemoryStore::new_shared();
        let id = new_document(&store).await;

        let mut own_orders = Vec::new();
        for (i, handle) in submit_concurrently(&store, &id, 0..16).into_iter().enumerate() {
            let outcome = handle.await.unwrap();
            let response = outcome.result.unwrap();

            // Catch-up ends with the site's own commit
            let last = response.updates.last().unwrap();
            assert_eq!(last.site, format!("site-{}", i));
            assert_eq!(response.updates.len() as u64, last.exec_order.unwrap());
            assert_eq!(outcome.committed.len(), 1);
            own_orders.push(last.exec_order.unwrap());
        }

        own_orders.sort_unstable();
        assert_eq!(own_orders, (1..=16).collect::<Vec<_>>());
        assert_gapless(&store, &id, 16).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_across_documents() {
        let store = MemoryStore::new_shared();
        let first = new_document(&store).await;
        let second = new_document(&store).await;

        let mut handles = submit_concurrently(&store, &first, 0..8);
        handles.extend(submit_concurrently(&store, &second, 0..8));
        for handle in handles {
            handle.await.unwrap().result.unwrap();
        }

        assert_gapless(&store, &first, 8).await;
        assert_gapless(&store, &second, 8).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_locked_document_does_not_block_others() {
        let store = MemoryStore::new_shared();
        let busy = new_document(&store).await;
        let idle = new_document(&store).await;

        let shared = store.get(&busy).unwrap();
        let _guard = shared.lock().await;

        let op = append("s1", 1, 0, 11, "!");
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            handle_update(store.as_ref(), 10, &idle, request(0, vec![op])),
        )
        .await
        .expect("update on an unlocked document should not wait");

        assert_eq!(outcome.committed.len(), 1);
    }

    #[test]
    fn test_update_request_deserialization() {
        let json = r#"{
            "execOrder": 2,
            "updates": [{"site": "s1", "seq": 3, "parent": 2, "edit": [-1, 12]}]
        }"#;
        let request: UpdateRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.exec_order, 2);
        assert_eq!(request.updates[0].edit.base_len(), 13);
        assert_eq!(request.updates[0].edit.target_len(), 12);

        let empty: UpdateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.exec_order, 0);
        assert!(empty.updates.is_empty());
    }
}
