//! # Commit Protocol
//!
//! A `Commit` moves the live workspace from the snapshot an edit was computed
//! against (the base) to the snapshot the edit produced (the target).
//!
//! ## Optimistic concurrency
//!
//! ```text
//! compute:  base S0 ──edit──▶ target S1
//! commit:   workspace at S0?  yes → swap to S1, Applied
//!                             no  → leave as is, notify, Conflict
//! ```
//!
//! There is no lock and no merge. A conflict is an expected outcome, not an
//! error; the caller decides whether to recompute against the new snapshot.

use crate::cancellation::ensure_not_cancelled;
use crate::{ActionError, ActionResult};
use quickfix_workspace::{NotificationSeverity, SnapshotId, Solution, Workspace};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct Commit {
    base: Solution,
    target: Solution,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied { snapshot: SnapshotId },
    Conflict { current: SnapshotId, message: String },
}

impl CommitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommitOutcome::Applied { .. })
    }
}

impl Commit {
    /// Fails with `UnrelatedSnapshots` unless `target` was derived from `base`.
    pub fn new(base: Solution, target: Solution, description: impl Into<String>) -> ActionResult<Self> {
        if !target.descends_from(&base) {
            return Err(ActionError::UnrelatedSnapshots {
                base: base.id(),
                target: target.id(),
            });
        }

        Ok(Self {
            base,
            target,
            description: description.into(),
        })
    }

    pub fn base(&self) -> &Solution {
        &self.base
    }

    pub fn target(&self) -> &Solution {
        &self.target
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Swap the workspace to the target if it is still at the base.
    ///
    /// On conflict the workspace is left untouched and an error-severity
    /// notification titled with the description goes to the host.
    #[instrument(skip_all, fields(base = %self.base.id(), target = %self.target.id()))]
    pub async fn execute(
        &self,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> ActionResult<CommitOutcome> {
        ensure_not_cancelled(cancel)?;

        if workspace.apply_if_base(&self.base, self.target.clone()) {
            info!(description = %self.description, "Commit applied");
            return Ok(CommitOutcome::Applied {
                snapshot: self.target.id(),
            });
        }

        let current = workspace.current_snapshot_id();
        let message = format!(
            "'{}' was not applied because the workspace changed after it was computed (expected snapshot {}, found {}).",
            self.description,
            self.base.id(),
            current
        );
        warn!(%current, description = %self.description, "Commit conflict");
        workspace.services().notifications.send_notification(
            &message,
            &self.description,
            NotificationSeverity::Error,
        );

        Ok(CommitOutcome::Conflict { current, message })
    }
}
