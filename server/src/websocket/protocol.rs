//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.
//! Operations keep their own camelCase document format.

use quire_engine::{DocumentId, Operation};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit a batch of operations and catch up.
    Update {
        /// Last execution order the client has integrated
        #[serde(default)]
        exec_order: i64,
        /// Operations to reconcile, in submission order
        #[serde(default)]
        updates: Vec<Operation>,
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to an update request.
    UpdateResponse {
        /// Every operation committed after the client's execution order
        updates: Vec<Operation>,
        /// Request ID from the original request
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Push notification when new operations were committed.
    /// Sent to the document's other connections.
    OpsAvailable {
        document_id: DocumentId,
        /// Newly committed operations, in execution order
        updates: Vec<Operation>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }

    /// Create an ops_available push notification.
    pub fn ops_available(document_id: impl Into<DocumentId>, updates: Vec<Operation>) -> Self {
        ServerMessage::OpsAvailable {
            document_id: document_id.into(),
            updates,
        }
    }
}
