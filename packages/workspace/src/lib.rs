//! # Quickfix Workspace
//!
//! Immutable snapshot graph consumed by the code action engine.
//!
//! ```text
//! Workspace ──current──▶ Solution (snapshot) ──▶ Project ──▶ Document
//!                           │
//!                           └─ lineage: parent snapshot ▶ ... ▶ root
//! ```
//!
//! - Snapshots are never mutated; every edit forks a child that shares
//!   unchanged projects and documents with its parent.
//! - Snapshots compare by lineage identity only.
//! - The live `Workspace` moves between snapshots through a single
//!   compare-and-swap primitive, `apply_if_base`.

mod changes;
mod document;
mod error;
mod ids;
mod services;
mod solution;
mod text;
mod workspace;

pub use changes::{DocumentChange, ProjectChanges, SolutionChanges};
pub use document::{Annotation, AnnotationKind, Document};
pub use error::WorkspaceError;
pub use ids::{DocumentId, ProjectId, SnapshotId};
pub use services::{
    AcceptingNavigationService, HostServices, LoggingNotificationService, NavigationService,
    Notification, NotificationService, NotificationSeverity, RecordingNotificationService,
};
pub use solution::{Project, Solution};
pub use text::{apply_text_changes, diff_hunks, diff_text, TextChange, TextRange};
pub use workspace::{Workspace, WorkspaceEvent};
