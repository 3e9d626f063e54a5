//! Reconciliation of incoming operations into a document record.
//!
//! This is the core of consistency. Given a record and a batch of operations
//! from one request, this module folds as many of them into the record as
//! can be validly applied, in the order supplied.
//!
//! # Algorithm
//!
//! 1. Open a transform session at the record's state and replay its log
//! 2. For each operation, in batch order:
//!    - inapplicable: stop, the rest of the batch is rejected
//!    - already seen: skip silently
//!    - otherwise: assign the next execution order, transform, execute,
//!      commit
//! 3. Return what happened
//!
//! Commits made before a rejected operation are kept. Later operations of a
//! batch may have been derived from the rejected one, so they are dropped
//! rather than skipped over.

use crate::{
    context::{can_apply, seen},
    error::Result,
    text::exec,
    DocumentRecord, Error, ExecOrder, Operation, Session,
};

/// Result of reconciling a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Execution orders committed by this batch, in order
    pub committed: Vec<ExecOrder>,
    /// Number of operations skipped as already seen
    pub duplicates: usize,
}

impl ReconcileOutcome {
    /// Number of operations committed by this batch.
    pub fn applied(&self) -> usize {
        self.committed.len()
    }
}

/// The reconciler applies a batch of operations to one record.
pub struct Reconciler<'a> {
    record: &'a mut DocumentRecord,
    session: Session,
    outcome: ReconcileOutcome,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler, replaying the record's history.
    pub fn new(record: &'a mut DocumentRecord) -> Result<Self> {
        let mut session = Session::new(
            record.execution_order(),
            record.causal_context().cloned(),
        );
        session.update_all(record.operation_log())?;

        Ok(Self {
            record,
            session,
            outcome: ReconcileOutcome::default(),
        })
    }

    /// Reconcile a batch of operations into the record.
    ///
    /// Fails with [`Error::CorruptedOperation`] at the first operation that
    /// cannot be applied; everything committed before it stays committed.
    pub fn reconcile(
        mut self,
        operations: impl IntoIterator<Item = Operation>,
    ) -> Result<ReconcileOutcome> {
        for (index, op) in operations.into_iter().enumerate() {
            self.apply(index, op)?;
        }
        Ok(self.outcome)
    }

    fn apply(&mut self, index: usize, mut op: Operation) -> Result<()> {
        let context = self.record.causal_context();
        if !can_apply(&op, context) {
            return Err(self.corrupted(index, &op, "operation does not fit the history"));
        }
        if seen(&op, context) {
            self.outcome.duplicates += 1;
            return Ok(());
        }

        let exec_order = self.record.len() as ExecOrder + 1;
        op.exec_order = Some(exec_order);

        let transformed = self
            .session
            .update(&op)
            .map_err(|e| self.corrupted(index, &op, e.to_string()))?;
        let content = exec(self.record.content(), &transformed.to_exec)
            .map_err(|e| self.corrupted(index, &op, e.to_string()))?;
        debug_assert_eq!(transformed.exec_order, exec_order);

        op.applied = Some(transformed.to_exec);
        self.record.commit(op, content, self.session.context().clone());
        self.outcome.committed.push(exec_order);
        Ok(())
    }

    fn corrupted(&self, index: usize, op: &Operation, reason: impl Into<String>) -> Error {
        Error::CorruptedOperation {
            index,
            site: op.site.clone(),
            seq: op.seq,
            committed: self.outcome.committed.len(),
            reason: reason.into(),
        }
    }
}

/// Reconcile a batch of operations into a record.
pub fn reconcile(
    record: &mut DocumentRecord,
    operations: impl IntoIterator<Item = Operation>,
) -> Result<ReconcileOutcome> {
    Reconciler::new(record)?.reconcile(operations)
}
