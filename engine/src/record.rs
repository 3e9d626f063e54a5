//! The document record - ground truth for one collaboratively edited document.

use crate::{error::Result, text::exec, CausalContext, DocumentId, Error, ExecOrder, Operation};
use serde::{Deserialize, Serialize};

/// Content of a freshly created document.
pub const INITIAL_CONTENT: &str = "Hello World";

/// A collaboratively edited text document.
///
/// Fields are only mutated by the [`Reconciler`](crate::Reconciler); the
/// rest of the world reads them through accessors or a serialized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Unique identifier, used as the store key
    id: DocumentId,
    /// Current text
    content: String,
    /// Every committed operation, in execution order
    operation_log: Vec<Operation>,
    /// Execution order of the last committed operation
    execution_order: ExecOrder,
    /// Transform engine state, null until the first commit
    causal_context: Option<CausalContext>,
}

impl DocumentRecord {
    /// Create a record holding the initial content.
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self::with_content(id, INITIAL_CONTENT)
    }

    /// Create a record holding the given content.
    pub fn with_content(id: impl Into<DocumentId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            operation_log: Vec::new(),
            execution_order: 0,
            causal_context: None,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn operation_log(&self) -> &[Operation] {
        &self.operation_log
    }

    pub fn execution_order(&self) -> ExecOrder {
        self.execution_order
    }

    pub fn causal_context(&self) -> Option<&CausalContext> {
        self.causal_context.as_ref()
    }

    /// Number of committed operations.
    pub fn len(&self) -> usize {
        self.operation_log.len()
    }

    /// Check if nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.operation_log.is_empty()
    }

    /// Commit an operation whose edit has already been executed.
    ///
    /// All fallible work happens before this call, so a commit either lands
    /// completely or not at all.
    pub(crate) fn commit(&mut self, op: Operation, content: String, context: CausalContext) {
        self.content = content;
        self.execution_order = context.exec_order;
        self.causal_context = Some(context);
        self.operation_log.push(op);
    }

    /// Check the record's invariants against its initial content.
    ///
    /// - the log length equals the execution order
    /// - execution orders are exactly 1..=N in log order
    /// - the context covers exactly the log
    /// - the content is the fold of every committed edit
    pub fn verify(&self, initial: &str) -> Result<()> {
        let len = self.operation_log.len() as ExecOrder;
        if len != self.execution_order {
            return Err(Error::InconsistentRecord(format!(
                "log holds {} operations but execution order is {}",
                len, self.execution_order
            )));
        }

        let context_order = self.causal_context.as_ref().map_or(0, |ctx| ctx.exec_order);
        if context_order != self.execution_order {
            return Err(Error::InconsistentRecord(format!(
                "context is at {} but execution order is {}",
                context_order, self.execution_order
            )));
        }

        let mut content = initial.to_string();
        for (i, op) in self.operation_log.iter().enumerate() {
            let expected = i as ExecOrder + 1;
            if op.exec_order != Some(expected) {
                return Err(Error::InconsistentRecord(format!(
                    "entry {} has execution order {:?}",
                    expected, op.exec_order
                )));
            }
            let edit = op.committed_edit().ok_or_else(|| {
                Error::InconsistentRecord(format!("entry {} has no committed edit", expected))
            })?;
            content = exec(&content, edit)?;
        }

        if content != self.content {
            return Err(Error::InconsistentRecord(
                "content differs from the fold of the log".to_string(),
            ));
        }
        Ok(())
    }
}
