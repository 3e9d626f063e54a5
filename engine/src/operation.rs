//! Operations submitted by sites.
//!
//! An operation is identified causally by `(site, seq)`: every site numbers
//! its operations 1, 2, 3, ... in the order it generated them. The `parent`
//! is the last server execution order the site had integrated, which fixes
//! the document state the edit was written against.

use crate::{ExecOrder, Seq, SiteId, TextOperation};
use serde::{Deserialize, Serialize};

/// Causal identity of an operation.
pub type OperationId = (SiteId, Seq);

/// A single edit submitted by a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Site that generated the operation
    pub site: SiteId,
    /// Per-site sequence number, starting at 1
    pub seq: Seq,
    /// Last execution order the site had integrated
    pub parent: ExecOrder,
    /// The edit as written by the site
    pub edit: TextOperation,
    /// Position in the document history, assigned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_order: Option<ExecOrder>,
    /// The edit as folded into the document, assigned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<TextOperation>,
}

impl Operation {
    /// Create a new, not yet committed operation.
    pub fn new(
        site: impl Into<SiteId>,
        seq: Seq,
        parent: ExecOrder,
        edit: TextOperation,
    ) -> Self {
        Self {
            site: site.into(),
            seq,
            parent,
            edit,
            exec_order: None,
            applied: None,
        }
    }

    /// Get the causal identity of this operation.
    pub fn id(&self) -> OperationId {
        (self.site.clone(), self.seq)
    }

    /// The edit to replay when folding the history into content.
    pub fn committed_edit(&self) -> Option<&TextOperation> {
        self.applied.as_ref()
    }
}
