//! Effects produced by computing an action, and how they reach the workspace.

use crate::cancellation::ensure_not_cancelled;
use crate::{ActionResult, Commit, ProgressTracker};
use async_trait::async_trait;
use quickfix_workspace::{DocumentId, NotificationSeverity, Solution, Workspace};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// "Replace the workspace's snapshot with this one"
#[derive(Debug, Clone)]
pub struct ApplyChangesOperation {
    changed_solution: Solution,
}

impl ApplyChangesOperation {
    pub fn new(changed_solution: Solution) -> Self {
        Self { changed_solution }
    }

    pub fn changed_solution(&self) -> &Solution {
        &self.changed_solution
    }

    pub fn to_commit(&self, base: &Solution, description: impl Into<String>) -> ActionResult<Commit> {
        Commit::new(base.clone(), self.changed_solution.clone(), description)
    }
}

/// Side effect supplied by a custom action
#[async_trait]
pub trait CustomOperation: Send + Sync + fmt::Debug {
    /// Returns `false` when the effect could not be applied.
    async fn try_apply(
        &self,
        workspace: &Workspace,
        original: &Solution,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<bool>;
}

#[derive(Debug, Clone)]
pub enum CodeActionOperation {
    ApplyChanges(ApplyChangesOperation),
    Navigate {
        document_id: DocumentId,
        position: usize,
    },
    Notify {
        message: String,
        title: String,
        severity: NotificationSeverity,
    },
    Custom(Arc<dyn CustomOperation>),
}

impl CodeActionOperation {
    pub fn apply_changes(changed_solution: Solution) -> Self {
        CodeActionOperation::ApplyChanges(ApplyChangesOperation::new(changed_solution))
    }

    /// The new snapshot, for snapshot-changing effects only.
    pub fn changed_solution(&self) -> Option<&Solution> {
        match self {
            CodeActionOperation::ApplyChanges(op) => Some(op.changed_solution()),
            _ => None,
        }
    }

    pub fn is_apply_changes(&self) -> bool {
        matches!(self, CodeActionOperation::ApplyChanges(_))
    }

    /// Apply this effect against the live workspace.
    ///
    /// `original` is the snapshot snapshot-changing effects were computed from.
    pub async fn try_apply(
        &self,
        workspace: &Workspace,
        original: &Solution,
        description: &str,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<bool> {
        match self {
            CodeActionOperation::ApplyChanges(op) => {
                let outcome = op
                    .to_commit(original, description)?
                    .execute(workspace, cancel)
                    .await?;
                Ok(outcome.is_applied())
            }
            CodeActionOperation::Navigate {
                document_id,
                position,
            } => {
                let current = workspace.current_snapshot();
                match current.document(*document_id) {
                    Some(document) if *position <= document.len() => Ok(workspace
                        .services()
                        .navigation
                        .try_navigate(*document_id, *position)),
                    Some(document) => {
                        debug!(position, len = document.len(), "Navigation target out of range");
                        Ok(false)
                    }
                    None => {
                        debug!(document = ?document_id, "Navigation target missing");
                        Ok(false)
                    }
                }
            }
            CodeActionOperation::Notify {
                message,
                title,
                severity,
            } => {
                workspace
                    .services()
                    .notifications
                    .send_notification(message, title, *severity);
                Ok(true)
            }
            CodeActionOperation::Custom(op) => op.try_apply(workspace, original, progress, cancel).await,
        }
    }
}

/// Apply `operations` in order, stopping at the first one that fails.
///
/// After a snapshot commit succeeds, later snapshot changes in the same list
/// are committed against that snapshot instead of `original`.
#[instrument(skip_all, fields(operations = operations.len(), %description))]
pub async fn apply_operations(
    workspace: &Workspace,
    original: &Solution,
    operations: &[CodeActionOperation],
    description: &str,
    progress: &ProgressTracker,
    cancel: &CancellationToken,
) -> ActionResult<bool> {
    progress.add_items(operations.len());

    let mut base = original.clone();
    for (index, operation) in operations.iter().enumerate() {
        ensure_not_cancelled(cancel)?;

        let applied = operation
            .try_apply(workspace, &base, description, progress, cancel)
            .await?;
        progress.item_completed();

        if !applied {
            debug!(index, "Operation not applied; skipping the rest");
            return Ok(false);
        }
        if let Some(changed) = operation.changed_solution() {
            base = changed.clone();
        }
    }

    Ok(true)
}
