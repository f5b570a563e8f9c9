//! # Quickfix Actions
//!
//! Engine that computes, previews and commits code actions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ producer: analyzer / refactoring            │
//! │  - builds a CodeAction around a closure     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ actions: deferred computation               │
//! │  - get_operations / get_preview_operations  │
//! │  - cleanup pipeline on changed documents    │
//! │  - fix all: select by key, merge            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: compare-and-swap commit          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Lazy**: nothing is computed until effects are requested
//! 2. **Side-effect free until commit**: preview and apply share computation
//! 3. **Optimistic commit**: a stale edit is reported, never merged
//! 4. **Cancellable**: every suspension point observes the token
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quickfix_actions::{apply_operations, CodeAction, ComputeContext, ProgressTracker};
//! use tokio_util::sync::CancellationToken;
//!
//! let base = workspace.current_snapshot();
//! let document = base.get_required_document(id)?.clone();
//!
//! let action = CodeAction::document("Use simple 'using' statement", move |_cancel| {
//!     let document = document.clone();
//!     async move { Ok(document.replace_text("using(var a=b){}", "using var a=b;")) }
//! })?;
//!
//! let cancel = CancellationToken::new();
//! let progress = ProgressTracker::new();
//! let operations = action
//!     .get_operations(&ComputeContext::new(base.clone()), &progress, &cancel)
//!     .await?;
//!
//! apply_operations(&workspace, &base, &operations, action.title(), &progress, &cancel).await?;
//! ```

mod action;
mod cancellation;
mod commit;
mod compute;
mod config;
mod errors;
mod fix_all;
mod identity;
mod operation;
mod passes;
mod pipeline;
mod presentation;
mod progress;

pub use action::{CodeAction, CodeActionPriority, CustomCodeAction, REQUIRES_NON_DOCUMENT_CHANGE};
pub use commit::{Commit, CommitOutcome};
pub use compute::ComputeContext;
pub use config::{
    AddImportOptions, CleanupOptions, EngineConfig, FormattingOptions, SimplifierOptions,
    DEFAULT_CONFIG_NAME,
};
pub use errors::{ActionError, ActionResult};
pub use fix_all::{FixAllContext, FixAllScope};
pub use identity::TelemetryId;
pub use operation::{apply_operations, ApplyChangesOperation, CodeActionOperation, CustomOperation};
pub use passes::{CaseCorrector, Formatter, ImportAdder, Simplifier};
pub use pipeline::{CleanupPass, CodeCleanup};
pub use presentation::{dedupe_equivalent, inline_actions, sort_by_priority};
pub use progress::ProgressTracker;

// Re-export the snapshot types actions are written against
pub use quickfix_workspace as workspace;
