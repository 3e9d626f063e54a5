//! Request handlers for document collaboration.

mod document;
mod update;
mod websocket;

pub use document::*;
pub use update::*;
pub use websocket::*;
