//! # Quire Engine
//!
//! A deterministic reconciliation engine for collaboratively edited text.
//!
//! Many sites edit the same document at once. Each submits the edits it made
//! locally; this crate decides, on the server, whether each edit fits the
//! document's history, whether it was already incorporated, and how to fold
//! it into the text. The same history always produces the same document.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of storage, network, or platform
//! - **Deterministic**: Same history always produces the same content
//! - **Server-assigned order**: Sites never choose an operation's final
//!   position in the history
//!
//! ## Core Concepts
//!
//! ### Documents
//!
//! A [`DocumentRecord`] holds the current text, the log of every committed
//! [`Operation`], the execution order of the last commit and a
//! [`CausalContext`] describing what has been incorporated.
//!
//! ### Operations
//!
//! An [`Operation`] carries a [`TextOperation`] written by a site against the
//! document at some execution order (its `parent`). Operations are
//! identified by `(site, seq)`, which makes resubmission harmless.
//!
//! ### Transformation
//!
//! A [`Session`] rebases an incoming edit onto the edits committed since its
//! parent, using operational transformation over text.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] applies a batch of operations in order:
//! - inapplicable operations stop the batch ([`Error::CorruptedOperation`])
//! - duplicates are skipped silently
//! - everything else is committed with the next execution order
//!
//! [`updates_since`] answers what a site is missing.
//!
//! ## Quick Start
//!
//! ```rust
//! use quire_engine::{reconcile, updates_since, DocumentRecord, Operation, TextOperation};
//!
//! // 1. A fresh document
//! let mut record = DocumentRecord::new("doc-1");
//! assert_eq!(record.content(), "Hello World");
//!
//! // 2. A site appends "!" to the version it saw (execution order 0)
//! let edit = TextOperation::insert_at(11, 11, "!").unwrap();
//! let op = Operation::new("site-1", 1, 0, edit);
//!
//! // 3. Reconcile it into the document
//! let outcome = reconcile(&mut record, vec![op]).unwrap();
//! assert_eq!(outcome.committed, vec![1]);
//! assert_eq!(record.content(), "Hello World!");
//!
//! // 4. Catch up a site that has seen nothing
//! let missing = updates_since(&record, 0);
//! assert_eq!(missing.len(), 1);
//! assert_eq!(missing[0].exec_order, Some(1));
//! ```

pub mod catchup;
pub mod context;
pub mod error;
pub mod operation;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod text;

// Re-export main types at crate root
pub use catchup::updates_since;
pub use context::{can_apply, seen, CausalContext, SiteCursor};
pub use error::Error;
pub use operation::{Operation, OperationId};
pub use reconcile::{reconcile, ReconcileOutcome, Reconciler};
pub use record::{DocumentRecord, INITIAL_CONTENT};
pub use session::{Session, Transformed};
pub use text::{exec, Component, TextOperation};

/// Type aliases for clarity
pub type DocumentId = String;
pub type SiteId = String;
pub type ExecOrder = u64;
pub type Seq = u64;
