//! # Operation Computation
//!
//! Turns a deferred `CodeAction` into its ordered list of effects.
//!
//! ```text
//! get_operations ──▶ compute_operations ──▶ post_process ──▶ [effects]
//!                        │
//!                        └─ get_changed_solution ──▶ producer closure
//!
//! get_preview_operations ──▶ compute_preview_operations ──▶ post_process
//! ```
//!
//! Nothing here touches the live workspace. Every snapshot is derived from
//! the `original_solution` captured in the `ComputeContext`, so any number of
//! actions can be computed in parallel against the same base.

use crate::action::ActionKind;
use crate::cancellation::run_cancellable;
use crate::{ActionError, ActionResult, CodeAction, CodeActionOperation, CodeCleanup, ProgressTracker};
use quickfix_workspace::{Document, Solution};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// The snapshot an action is computed against, and the cleanup to run.
#[derive(Debug, Clone)]
pub struct ComputeContext {
    original_solution: Solution,
    cleanup: Arc<CodeCleanup>,
}

impl ComputeContext {
    pub fn new(original_solution: Solution) -> Self {
        Self {
            original_solution,
            cleanup: Arc::new(CodeCleanup::default()),
        }
    }

    pub fn with_cleanup(mut self, cleanup: Arc<CodeCleanup>) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn original_solution(&self) -> &Solution {
        &self.original_solution
    }

    pub fn cleanup(&self) -> &CodeCleanup {
        &self.cleanup
    }

    pub(crate) fn shared_cleanup(&self) -> Arc<CodeCleanup> {
        self.cleanup.clone()
    }
}

impl CodeAction {
    /// Effects to apply, post-processed.
    #[instrument(skip_all, fields(title = %self.title(), kind = self.kind_name(), base = %context.original_solution().id()))]
    pub async fn get_operations(
        &self,
        context: &ComputeContext,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<Vec<CodeActionOperation>> {
        let operations = self.compute_operations(context, progress, cancel).await?;
        let operations = post_process(context, operations, progress, cancel).await?;
        debug!(operations = operations.len(), "Computed operations");
        Ok(operations)
    }

    /// Effects to show in a preview, post-processed. Nothing is applied.
    #[instrument(skip_all, fields(title = %self.title(), kind = self.kind_name(), base = %context.original_solution().id()))]
    pub async fn get_preview_operations(
        &self,
        context: &ComputeContext,
        cancel: &CancellationToken,
    ) -> ActionResult<Vec<CodeActionOperation>> {
        let progress = ProgressTracker::new();
        let operations = self.compute_preview_operations(context, cancel).await?;
        let operations = post_process(context, operations, &progress, cancel).await?;
        debug!(operations = operations.len(), "Computed preview operations");
        Ok(operations)
    }

    /// The document a single-document action produces, without cleanup.
    pub async fn get_changed_document(&self, cancel: &CancellationToken) -> ActionResult<Document> {
        match self.kind() {
            ActionKind::Document(create) => run_cancellable(cancel, create(cancel.clone())).await,
            _ => Err(ActionError::NotSupported(self.kind_name())),
        }
    }

    /// The changed solution, or `None` when the action changes nothing.
    /// Used by bulk application, which merges solutions rather than effects.
    #[instrument(skip_all, fields(title = %self.title(), post_process = post_process))]
    pub async fn get_changed_solution_internal(
        &self,
        context: &ComputeContext,
        post_process: bool,
        cancel: &CancellationToken,
    ) -> ActionResult<Option<Solution>> {
        let progress = ProgressTracker::new();
        let Some(changed) = self.get_changed_solution(context, &progress, cancel).await? else {
            return Ok(None);
        };

        if !post_process {
            return Ok(Some(changed));
        }

        let cleaned = context
            .cleanup()
            .post_process_changes(context.original_solution(), changed, &progress, cancel)
            .await?;
        Ok(Some(cleaned))
    }

    async fn compute_operations(
        &self,
        context: &ComputeContext,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<Vec<CodeActionOperation>> {
        match self.kind() {
            ActionKind::Custom(custom) => {
                run_cancellable(cancel, custom.compute_operations(context, progress, cancel)).await
            }
            ActionKind::Nested { .. } => Err(ActionError::NotSupported(self.kind_name())),
            _ => {
                let changed = self.get_changed_solution(context, progress, cancel).await?;
                Ok(changed
                    .map(CodeActionOperation::apply_changes)
                    .into_iter()
                    .collect())
            }
        }
    }

    async fn compute_preview_operations(
        &self,
        context: &ComputeContext,
        cancel: &CancellationToken,
    ) -> ActionResult<Vec<CodeActionOperation>> {
        match self.kind() {
            // An override that yields nothing means the preview shows nothing
            ActionKind::Custom(custom) => {
                run_cancellable(cancel, custom.compute_preview_operations(context, cancel)).await
            }
            _ => {
                let progress = ProgressTracker::new();
                self.compute_operations(context, &progress, cancel).await
            }
        }
    }

    async fn get_changed_solution(
        &self,
        context: &ComputeContext,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> ActionResult<Option<Solution>> {
        let original = context.original_solution();

        match self.kind() {
            ActionKind::Document(create) => {
                let document = run_cancellable(cancel, create(cancel.clone())).await?;
                integrate_document(original, document)
            }
            ActionKind::Solution(create) => {
                let changed = run_cancellable(cancel, create(cancel.clone())).await?;
                Ok(changed.filter(|solution| !solution.is_same_snapshot(original)))
            }
            ActionKind::NoChange => Ok(None),
            ActionKind::Nested { .. } => Err(ActionError::NotSupported(self.kind_name())),
            ActionKind::Custom(custom) => {
                let operations =
                    run_cancellable(cancel, custom.compute_operations(context, progress, cancel)).await?;
                Ok(operations
                    .into_iter()
                    .find_map(|op| op.changed_solution().cloned()))
            }
        }
    }
}

fn integrate_document(original: &Solution, document: Document) -> ActionResult<Option<Solution>> {
    match original.document(document.id()) {
        Some(existing) if existing.same_content(&document) => Ok(None),
        _ => Ok(Some(original.with_document(document)?)),
    }
}

async fn post_process(
    context: &ComputeContext,
    operations: Vec<CodeActionOperation>,
    progress: &ProgressTracker,
    cancel: &CancellationToken,
) -> ActionResult<Vec<CodeActionOperation>> {
    let mut processed = Vec::with_capacity(operations.len());
    for operation in operations {
        match operation {
            CodeActionOperation::ApplyChanges(apply) => {
                let cleaned = context
                    .cleanup()
                    .post_process_changes(
                        context.original_solution(),
                        apply.changed_solution().clone(),
                        progress,
                        cancel,
                    )
                    .await?;
                processed.push(CodeActionOperation::apply_changes(cleaned));
            }
            other => processed.push(other),
        }
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickfix_workspace::{AnnotationKind, DocumentId, TextRange};

    fn seeded(text: &str) -> (Solution, DocumentId) {
        let (solution, project) = Solution::empty().add_project("P");
        solution.add_document(project, "a.cs", text).unwrap()
    }

    #[tokio::test]
    async fn test_solution_action_returning_none_has_no_effects() {
        let (solution, _) = seeded("x");
        let action = CodeAction::solution("Nothing", |_cancel| async { Ok(None) }).unwrap();

        let ops = action
            .get_operations(&ComputeContext::new(solution), &ProgressTracker::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(ops.is_empty());
    }

    #[tokio::test]
    async fn test_solution_action_returning_base_has_no_effects() {
        let (solution, _) = seeded("x");
        let returned = solution.clone();
        let action = CodeAction::solution("Same", move |_cancel| {
            let returned = returned.clone();
            async move { Ok(Some(returned)) }
        })
        .unwrap();

        let ops = action
            .get_operations(&ComputeContext::new(solution), &ProgressTracker::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(ops.is_empty());
    }

    #[tokio::test]
    async fn test_no_change_action_has_no_effects() {
        let (solution, _) = seeded("x");
        let action = CodeAction::no_change("Nothing to do").unwrap().with_equivalence_key("K");

        let ops = action
            .get_operations(&ComputeContext::new(solution), &ProgressTracker::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(ops.is_empty());
    }

    #[tokio::test]
    async fn test_nested_action_has_no_operations_of_its_own() {
        let (solution, _) = seeded("x");
        let child = CodeAction::no_change("Child").unwrap();
        let group = CodeAction::nested("Group", vec![child], true).unwrap();

        let result = group
            .get_operations(&ComputeContext::new(solution), &ProgressTracker::new(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ActionError::NotSupported(_))));
    }

    #[tokio::test]
    async fn test_changed_document_only_for_document_actions() {
        let action = CodeAction::solution("S", |_cancel| async { Ok(None) }).unwrap();
        let result = action.get_changed_document(&CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(ActionError::NotSupported("SolutionChangeAction"))
        ));
    }

    #[tokio::test]
    async fn test_internal_solution_honours_post_process_flag() {
        let (solution, id) = seeded("a b");
        let base = solution.clone();
        let action = CodeAction::document("Widen", move |_cancel| {
            let document = base
                .document(id)
                .cloned()
                .ok_or_else(|| ActionError::compute(anyhow::anyhow!("missing document")));
            async move {
                let document = document?.replace_text("a b", "a   b");
                Ok(document.with_annotation(AnnotationKind::Elastic, TextRange::new(0, 5), None)?)
            }
        })
        .unwrap();
        let context = ComputeContext::new(solution);
        let cancel = CancellationToken::new();

        let raw = action
            .get_changed_solution_internal(&context, false, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw.document(id).unwrap().text(), "a   b");

        let cleaned = action
            .get_changed_solution_internal(&context, true, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleaned.document(id).unwrap().text(), "a b");
    }

    #[tokio::test]
    async fn test_producer_failure_is_propagated() {
        let (solution, _) = seeded("x");
        let action = CodeAction::solution("Boom", |_cancel| async {
            Err(ActionError::compute(anyhow::anyhow!("analysis failed")))
        })
        .unwrap();

        let result = action
            .get_operations(&ComputeContext::new(solution), &ProgressTracker::new(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ActionError::Compute(_))));
    }
}
