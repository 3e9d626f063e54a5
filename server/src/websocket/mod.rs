//! WebSocket support for real-time collaboration.
//!
//! Clients attach to one document, submit updates over the socket and are
//! notified when other sites commit operations to the same document.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
