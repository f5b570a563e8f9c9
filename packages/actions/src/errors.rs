//! Error types for the code action engine

use quickfix_workspace::{SnapshotId, WorkspaceError};
use thiserror::Error;

pub type ActionResult<T> = Result<T, ActionError>;

#[derive(Error, Debug)]
pub enum ActionError {
    /// Bad construction input. Always a producer bug.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },

    /// The action was asked for something its variant cannot produce.
    #[error("Operation not supported by {0}")]
    NotSupported(&'static str),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Failed to compute changes: {0}")]
    Compute(#[source] anyhow::Error),

    #[error("Snapshot {target} does not descend from base {base}")]
    UnrelatedSnapshots { base: SnapshotId, target: SnapshotId },

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Wrap a producer failure.
    pub fn compute(error: impl Into<anyhow::Error>) -> Self {
        ActionError::Compute(error.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActionError::Cancelled)
    }
}
