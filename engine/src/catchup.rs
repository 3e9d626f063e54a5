//! Catch-up - what a site is missing.
//!
//! The server keeps no per-site cursor. Every request carries the execution
//! order the site last observed, and the answer is every committed operation
//! past it.

use crate::{DocumentRecord, Operation};

/// Operations of the record committed after `exec_order`, in log order.
///
/// Negative or out-of-range values are accepted: anything below 1 returns the
/// whole log, anything at or past the record's execution order returns
/// nothing.
pub fn updates_since(record: &DocumentRecord, exec_order: i64) -> Vec<Operation> {
    record
        .operation_log()
        .iter()
        .filter(|op| op.exec_order.is_some_and(|order| order as i64 > exec_order))
        .cloned()
        .collect()
}
