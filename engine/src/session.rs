//! Transform session - rebases incoming edits onto the committed history.
//!
//! The server keeps a single, totally ordered history. A site writes each
//! edit against the document at its `parent` plus its own earlier edits with
//! the same parent. To fold such an edit into the document it must be
//! transformed against every edit committed from other sites since that
//! parent which the site has not seen.
//!
//! # Algorithm
//!
//! For every site the session keeps a *bridge*: the concurrent edits from
//! other sites, expressed in the frame of the site's current chain.
//!
//! 1. An edit continuing a chain (same parent) uses the site's bridge
//! 2. An edit starting a new chain gets a fresh bridge built from the
//!    history after its parent
//! 3. The edit is transformed against the bridge one entry at a time; the
//!    bridge entries are transformed against the edit in the same step, so
//!    the bridge stays valid for the next edit of the chain
//! 4. The transformed edit is committed and appended to the bridges of all
//!    other sites
//!
//! Committed edits win ties: when a site inserts at the same position as a
//! concurrent commit, the committed text comes first.

use crate::{error::Result, CausalContext, Error, ExecOrder, Operation, SiteId, TextOperation};
use std::collections::HashMap;

/// A committed edit in the document frame.
#[derive(Debug, Clone)]
struct Commit {
    site: SiteId,
    edit: TextOperation,
}

/// Concurrent edits a site's chain has not absorbed yet.
#[derive(Debug, Clone)]
struct Bridge {
    parent: ExecOrder,
    concurrent: Vec<TextOperation>,
}

/// Result of running an operation through the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// Execution order the operation was committed at
    pub exec_order: ExecOrder,
    /// Edit to execute against the current content
    pub to_exec: TextOperation,
}

/// The transform state of one document.
#[derive(Debug, Clone, Default)]
pub struct Session {
    context: CausalContext,
    committed: Vec<Commit>,
    bridges: HashMap<SiteId, Bridge>,
}

impl Session {
    /// Create a session positioned at a document's current state.
    ///
    /// The history itself is not known yet; feed it with [`Session::update_all`].
    pub fn new(exec_order: ExecOrder, context: Option<CausalContext>) -> Self {
        let mut context = context.unwrap_or_default();
        context.exec_order = context.exec_order.max(exec_order);
        Self {
            context,
            committed: Vec::new(),
            bridges: HashMap::new(),
        }
    }

    /// Rebuild the session from an operation history, in log order.
    ///
    /// Entries the context already covers only rebuild transform state.
    pub fn update_all<'a>(
        &mut self,
        history: impl IntoIterator<Item = &'a Operation>,
    ) -> Result<()> {
        for op in history {
            let transformed = self.update(op)?;
            if let Some(applied) = op.committed_edit() {
                if *applied != transformed.to_exec {
                    return Err(Error::InconsistentRecord(format!(
                        "replay of operation {} diverged from its committed edit",
                        transformed.exec_order
                    )));
                }
            }
        }
        Ok(())
    }

    /// Transform an operation into the document frame and commit it.
    ///
    /// The session is left untouched when this fails.
    pub fn update(&mut self, op: &Operation) -> Result<Transformed> {
        let mut concurrent = match self.bridges.get(&op.site) {
            Some(bridge) if bridge.parent == op.parent => bridge.concurrent.clone(),
            _ => self.concurrent_since(op)?,
        };

        let mut edit = op.edit.clone();
        for entry in concurrent.iter_mut() {
            let (entry_prime, edit_prime) = TextOperation::transform(entry, &edit)?;
            *entry = entry_prime;
            edit = edit_prime;
        }

        for (site, bridge) in self.bridges.iter_mut() {
            if *site != op.site {
                bridge.concurrent.push(edit.clone());
            }
        }
        self.bridges.insert(
            op.site.clone(),
            Bridge {
                parent: op.parent,
                concurrent,
            },
        );
        self.committed.push(Commit {
            site: op.site.clone(),
            edit: edit.clone(),
        });

        let exec_order = self.committed.len() as ExecOrder;
        if exec_order > self.context.exec_order {
            self.context.record(op, exec_order);
        }

        Ok(Transformed {
            exec_order,
            to_exec: edit,
        })
    }

    /// Current causal context.
    pub fn context(&self) -> &CausalContext {
        &self.context
    }

    /// Execution order of the last committed operation.
    pub fn exec_order(&self) -> ExecOrder {
        self.context.exec_order
    }

    /// Edits committed from other sites after the operation's parent.
    fn concurrent_since(&self, op: &Operation) -> Result<Vec<TextOperation>> {
        let start = usize::try_from(op.parent)
            .ok()
            .filter(|start| *start <= self.committed.len())
            .ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "parent {} is past the history ({} operations)",
                    op.parent,
                    self.committed.len()
                ))
            })?;

        let mut concurrent = Vec::new();
        for commit in &self.committed[start..] {
            if commit.site == op.site {
                return Err(Error::InvalidOperation(format!(
                    "parent {} does not include the site's own earlier commits",
                    op.parent
                )));
            }
            concurrent.push(commit.edit.clone());
        }
        Ok(concurrent)
    }
}
