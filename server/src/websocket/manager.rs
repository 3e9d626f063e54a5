//! WebSocket connection manager.
//!
//! Tracks active WebSocket connections per document and fans out commit
//! notifications to the sites editing the same document.

use std::sync::Arc;

use dashmap::DashMap;
use quire_engine::DocumentId;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Document the connection is attached to
    pub document_id: DocumentId,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Index of connection IDs by document.
    by_document: DashMap<DocumentId, Vec<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            by_document: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection to a document.
    ///
    /// Returns the connection ID.
    pub fn register(&self, document_id: DocumentId, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.by_document
            .entry(document_id.clone())
            .or_default()
            .push(conn_id.clone());

        tracing::info!(conn_id = %conn_id, document_id = %document_id, "WebSocket connection registered");

        self.connections.insert(
            conn_id.clone(),
            Connection {
                document_id,
                sender,
            },
        );

        conn_id
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            if let Some(mut conn_ids) = self.by_document.get_mut(&conn.document_id) {
                conn_ids.retain(|id| id != conn_id);
                if conn_ids.is_empty() {
                    drop(conn_ids);
                    self.by_document.remove(&conn.document_id);
                }
            }

            tracing::info!(conn_id = %conn_id, document_id = %conn.document_id, "WebSocket connection unregistered");
        }
    }

    /// Send a message to every connection of a document except `except`.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_except(
        &self,
        document_id: &str,
        except: Option<&str>,
        message: ServerMessage,
    ) -> usize {
        // Snapshot the ids so no index shard is held while sending
        let conn_ids = match self.by_document.get(document_id) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        let mut sent_count = 0;
        for conn_id in conn_ids.iter().filter(|id| Some(id.as_str()) != except) {
            if self.send_to(conn_id, message.clone()) {
                sent_count += 1;
            }
        }

        tracing::debug!(
            document_id = %document_id,
            recipients = sent_count,
            "Broadcast message to connections"
        );

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of documents with at least one connection.
    pub fn document_count(&self) -> usize {
        self.by_document.len()
    }
}
