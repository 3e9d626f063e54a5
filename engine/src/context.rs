//! Causal context - what a document has already incorporated.
//!
//! The context keeps one cursor per site: the last sequence number committed
//! from that site, the execution order it was committed at, and the parent it
//! was written against. This is enough to answer the two questions asked of
//! every incoming operation:
//!
//! - [`can_apply`]: is the operation consistent with the history, so that it
//!   can be transformed into the document without corrupting it?
//! - [`seen`]: has the operation already been committed?

use crate::{ExecOrder, Operation, Seq, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-site commit cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCursor {
    /// Sequence number of the site's last committed operation
    pub seq: Seq,
    /// Execution order that operation was committed at
    pub exec_order: ExecOrder,
    /// Parent that operation was written against
    pub parent: ExecOrder,
}

/// State describing everything a document has incorporated.
///
/// Uses BTreeMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalContext {
    /// Execution order of the last committed operation
    pub exec_order: ExecOrder,
    /// Cursors by site
    pub sites: BTreeMap<SiteId, SiteCursor>,
}

impl CausalContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cursor of a site, if it has committed anything.
    pub fn cursor(&self, site: &str) -> Option<&SiteCursor> {
        self.sites.get(site)
    }

    /// Last sequence number committed from a site (0 if none).
    pub fn last_seq(&self, site: &str) -> Seq {
        self.cursor(site).map_or(0, |cursor| cursor.seq)
    }

    /// Advance the context past a committed operation.
    pub(crate) fn record(&mut self, op: &Operation, exec_order: ExecOrder) {
        self.exec_order = exec_order;
        self.sites.insert(
            op.site.clone(),
            SiteCursor {
                seq: op.seq,
                exec_order,
                parent: op.parent,
            },
        );
    }
}

/// Check whether an operation is consistent with a context.
///
/// Already committed operations pass as long as they are well-formed; it is
/// [`seen`] that filters them out. A new operation must be the next in its
/// site's sequence, and must either continue the chain of operations the
/// site wrote against the same parent, or be written against a parent that
/// already includes the site's last commit.
pub fn can_apply(op: &Operation, context: Option<&CausalContext>) -> bool {
    let exec_order = context.map_or(0, |ctx| ctx.exec_order);
    if op.seq == 0 || op.parent > exec_order {
        return false;
    }

    let cursor = context.and_then(|ctx| ctx.cursor(&op.site));
    let last_seq = cursor.map_or(0, |c| c.seq);
    if op.seq <= last_seq {
        return true;
    }
    if op.seq != last_seq + 1 {
        return false;
    }

    match cursor {
        None => true,
        Some(c) => op.parent == c.parent || op.parent >= c.exec_order,
    }
}

/// Check whether an operation has already been incorporated.
pub fn seen(op: &Operation, context: Option<&CausalContext>) -> bool {
    context.is_some_and(|ctx| op.seq <= ctx.last_seq(&op.site))
}
