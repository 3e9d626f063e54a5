//! Document endpoint routes.

use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::handlers::{
    handle_fetch, handle_update, handle_updates_since, handle_websocket_connection,
    notify_committed, FetchResponse, UpdateRequest, UpdateResponse, UpdatesQuery,
};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/document", get(create_handler))
        .route("/document/{id}", get(fetch_handler))
        .route("/document/{id}/update", post(update_handler))
        .route("/document/{id}/updates", get(updates_handler))
        .route("/document/{id}/ws", get(websocket_handler))
}

/// GET /document - Create a document and join it.
async fn create_handler(State(state): State<AppState>) -> Result<Json<FetchResponse>> {
    let response = handle_fetch(state.store.as_ref(), None).await?;
    Ok(Json(response))
}

/// GET /document/{id} - Join an existing document.
async fn fetch_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FetchResponse>> {
    let response = handle_fetch(state.store.as_ref(), Some(&id)).await?;
    Ok(Json(response))
}

/// POST /document/{id}/update - Submit operations and catch up.
async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    let outcome = handle_update(
        state.store.as_ref(),
        state.config.max_batch_size,
        &id,
        request,
    )
    .await;

    notify_committed(&state.conn_manager, &id, None, outcome.committed);
    Ok(Json(outcome.result?))
}

/// GET /document/{id}/updates?since=k - Catch up without submitting.
async fn updates_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UpdatesQuery>,
) -> Result<Json<UpdateResponse>> {
    let response = handle_updates_since(state.store.as_ref(), &id, query).await?;
    Ok(Json(response))
}

/// GET /document/{id}/ws - Attach a WebSocket to a document.
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    if state.store.get(&id).is_none() {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, state, id)))
}
