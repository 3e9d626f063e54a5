//! WebSocket handler for real-time collaboration.
//!
//! A socket is attached to one document. Updates submitted over it go through
//! the same reconciliation as the HTTP endpoint, and every commit is pushed to
//! the document's other sockets.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use quire_engine::{DocumentId, Operation};
use tokio::sync::mpsc;

use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};
use crate::AppState;

use super::{handle_update, UpdateRequest};

/// Handle an established WebSocket connection.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task to forward outgoing messages
/// 3. Processes incoming messages in a loop
/// 4. Cleans up on disconnect
pub async fn handle_websocket_connection(
    socket: WebSocket,
    state: AppState,
    document_id: DocumentId,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = state.conn_manager.register(document_id.clone(), tx);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response = process_message(&text, &state, &document_id, &conn_id).await;
                state.conn_manager.send_to(&conn_id, response);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
                state.conn_manager.send_to(
                    &conn_id,
                    ServerMessage::error("Binary messages not supported", None),
                );
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    state.conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        document_id = %document_id,
        active_connections = state.conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Process a client message and return the reply for its sender.
pub async fn process_message(
    text: &str,
    state: &AppState,
    document_id: &str,
    conn_id: &str,
) -> ServerMessage {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return ServerMessage::error(format!("Invalid message format: {}", e), None);
        }
    };

    match client_msg {
        ClientMessage::Update {
            exec_order,
            updates,
            request_id,
        } => {
            let request = UpdateRequest {
                exec_order,
                updates,
            };

            let outcome = handle_update(
                state.store.as_ref(),
                state.config.max_batch_size,
                document_id,
                request,
            )
            .await;

            notify_committed(
                &state.conn_manager,
                document_id,
                Some(conn_id),
                outcome.committed,
            );
            match outcome.result {
                Ok(response) => ServerMessage::UpdateResponse {
                    updates: response.updates,
                    request_id,
                },
                Err(e) => ServerMessage::error(e.message(), request_id),
            }
        }

        ClientMessage::Ping => ServerMessage::Pong,
    }
}

/// Push freshly committed operations to a document's other connections.
///
/// Called for failed batches too, since a corrupted batch keeps the prefix
/// committed before it.
pub fn notify_committed(
    conn_manager: &ConnectionManager,
    document_id: &str,
    except: Option<&str>,
    committed: Vec<Operation>,
) {
    if committed.is_empty() {
        return;
    }

    let count = committed.len();
    let sent = conn_manager.broadcast_except(
        document_id,
        except,
        ServerMessage::ops_available(document_id, committed),
    );
    tracing::debug!(
        document_id = %document_id,
        sent_to = sent,
        committed = count,
        "Broadcast committed operations to connected sites"
    );
}
