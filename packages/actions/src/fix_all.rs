//! # Fix All
//!
//! Applies every occurrence of "the same fix" across a document, project or
//! solution in one step.
//!
//! ## Selection
//!
//! A candidate is selected when its document is in scope, it came from the
//! same provider as the trigger action, and its equivalence key equals the
//! trigger's. Un-keyed actions are never selected, so two structurally
//! identical fixes without keys stay independent.
//!
//! ## Merge
//!
//! All selected actions are computed concurrently against the same base and
//! cleaned up individually. Each result is split into its separate edited
//! regions, and the regions are folded into one snapshot per document:
//!
//! ```text
//! action 1: doc A [10..14) → "x"      ┐
//! action 2: doc A [40..41) → "y"      ├─▶ doc A with both changes
//! action 3: doc A [12..13) → "z"      ┘   (overlaps action 1: dropped)
//! ```
//!
//! Identical changes are applied once, so an import added by several fixes
//! lands once. An action whose regions collide with an accepted one is
//! dropped as a whole for that document. Added documents are carried over.

use crate::{ActionError, ActionResult, CodeAction, CodeCleanup, ComputeContext, TelemetryId};
use futures::future::try_join_all;
use quickfix_workspace::{diff_hunks, Document, DocumentId, ProjectId, Solution, TextChange, TextRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixAllScope {
    Document(DocumentId),
    Project(ProjectId),
    Solution,
}

impl FixAllScope {
    /// Discriminator mixed into telemetry ids. Zero means "no scope".
    pub fn telemetry_id(&self) -> u32 {
        match self {
            FixAllScope::Document(_) => 1,
            FixAllScope::Project(_) => 2,
            FixAllScope::Solution => 3,
        }
    }

    pub fn contains(&self, document_id: DocumentId) -> bool {
        match self {
            FixAllScope::Document(id) => *id == document_id,
            FixAllScope::Project(project_id) => document_id.project_id() == *project_id,
            FixAllScope::Solution => true,
        }
    }
}

impl fmt::Display for FixAllScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixAllScope::Document(_) => write!(f, "document"),
            FixAllScope::Project(_) => write!(f, "project"),
            FixAllScope::Solution => write!(f, "solution"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixAllContext {
    solution: Solution,
    scope: FixAllScope,
    trigger: CodeAction,
    candidates: Vec<(DocumentId, CodeAction)>,
    cleanup: Arc<CodeCleanup>,
}

impl FixAllContext {
    /// `candidates` are every action offered in `solution`, paired with the
    /// document it was offered for. `trigger` is the one the user picked.
    pub fn new(
        solution: Solution,
        scope: FixAllScope,
        trigger: CodeAction,
        candidates: Vec<(DocumentId, CodeAction)>,
    ) -> ActionResult<Self> {
        if trigger.equivalence_key().is_none() {
            return Err(ActionError::InvalidArgument {
                name: "trigger",
                reason: "fix all needs an action with an equivalence key",
            });
        }

        Ok(Self {
            solution,
            scope,
            trigger,
            candidates,
            cleanup: Arc::new(CodeCleanup::default()),
        })
    }

    pub fn with_cleanup(mut self, cleanup: Arc<CodeCleanup>) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Share the cleanup pipeline of an existing compute context.
    pub fn with_context_cleanup(self, context: &ComputeContext) -> Self {
        self.with_cleanup(context.shared_cleanup())
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn scope(&self) -> FixAllScope {
        self.scope
    }

    pub fn trigger(&self) -> &CodeAction {
        &self.trigger
    }

    pub fn selected_actions(&self) -> Vec<&CodeAction> {
        self.candidates
            .iter()
            .filter(|(document_id, _)| self.scope.contains(*document_id))
            .map(|(_, action)| action)
            .filter(|action| action.is_equivalent_to(&self.trigger))
            .collect()
    }

    pub fn telemetry_id(&self) -> TelemetryId {
        self.trigger.get_telemetry_id(Some(&self.scope))
    }

    /// Compute all selected actions and merge them into one snapshot.
    /// `None` when none of them changes anything.
    #[instrument(skip_all, fields(scope = %self.scope, key = self.trigger.equivalence_key()))]
    pub async fn compute_merged_solution(
        &self,
        cancel: &CancellationToken,
    ) -> ActionResult<Option<Solution>> {
        let selected = self.selected_actions();
        info!(selected = selected.len(), "Computing fix all");

        let context = ComputeContext::new(self.solution.clone()).with_cleanup(self.cleanup.clone());
        let results = try_join_all(
            selected
                .iter()
                .map(|action| action.get_changed_solution_internal(&context, true, cancel)),
        )
        .await?;

        let changed: Vec<Solution> = results.into_iter().flatten().collect();
        debug!(changed = changed.len(), "Merging changed solutions");
        merge_solutions(&self.solution, &changed)
    }

    /// One solution action that performs the whole batch.
    pub fn into_code_action(self) -> ActionResult<CodeAction> {
        let title = format!("Fix all '{}' in {}", self.trigger.title(), self.scope);
        let key = self.trigger.equivalence_key().map(str::to_string);
        let trigger = self.trigger.clone();
        let context = Arc::new(self);

        let action = CodeAction::solution(title, move |cancel| {
            let context = context.clone();
            async move { context.compute_merged_solution(&cancel).await }
        })?
        .with_provider_of(&trigger);

        Ok(match key {
            Some(key) => action.with_equivalence_key(key),
            None => action,
        })
    }
}

/// Fold the text changes of every `changed` snapshot into one child of `original`.
///
/// Each document edit of one snapshot is split into its separate regions. A
/// snapshot's regions in one document are kept or dropped together.
fn merge_solutions(original: &Solution, changed: &[Solution]) -> ActionResult<Option<Solution>> {
    let mut accepted: BTreeMap<DocumentId, Vec<TextChange>> = BTreeMap::new();
    let mut added: BTreeMap<DocumentId, Document> = BTreeMap::new();
    let mut removed: Vec<DocumentId> = Vec::new();

    for solution in changed {
        let changes = solution.get_changes(original);
        for project in &changes.project_changes {
            for id in project.get_changed_documents(true) {
                let before = original.get_required_document(id)?;
                let after = solution.get_required_document(id)?;

                let kept = accepted.entry(id).or_default();
                let fresh: Vec<TextChange> = diff_hunks(before.text(), after.text())
                    .into_iter()
                    .filter(|change| !kept.contains(change))
                    .collect();

                if let Some((dropped, existing)) = fresh.iter().find_map(|change| {
                    kept.iter()
                        .find(|c| collides(&c.range, &change.range))
                        .map(|existing| (change, existing))
                }) {
                    warn!(
                        document = %id,
                        dropped = ?dropped.range,
                        kept = ?existing.range,
                        "Dropping overlapping fix"
                    );
                    continue;
                }
                kept.extend(fresh);
            }

            for id in &project.added_documents {
                if let Some(document) = solution.document(*id) {
                    added.entry(*id).or_insert_with(|| document.clone());
                }
            }
            for id in &project.removed_documents {
                if !removed.contains(id) {
                    removed.push(*id);
                }
            }
        }
    }

    let mut merged = original.clone();
    for (id, changes) in accepted {
        if changes.is_empty() {
            continue;
        }
        let document = original.get_required_document(id)?.apply_changes(&changes)?;
        merged = merged.with_document(document)?;
    }
    for (_, document) in added {
        merged = merged.with_document(document)?;
    }
    for id in removed {
        if merged.document(id).is_some() {
            merged = merged.remove_document(id)?;
        }
    }

    if merged.is_same_snapshot(original) {
        Ok(None)
    } else {
        Ok(Some(merged))
    }
}

/// Ranges that cannot both be applied to the same text.
fn collides(a: &TextRange, b: &TextRange) -> bool {
    let (first, second) = if (a.start, a.end) <= (b.start, b.end) {
        (a, b)
    } else {
        (b, a)
    };
    first.end > second.start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_contains() {
        let (solution, p1) = Solution::empty().add_project("P1");
        let (solution, p2) = solution.add_project("P2");
        let (solution, a) = solution.add_document(p1, "a.cs", "").unwrap();
        let (_, b) = solution.add_document(p2, "b.cs", "").unwrap();

        assert!(FixAllScope::Document(a).contains(a));
        assert!(!FixAllScope::Document(a).contains(b));
        assert!(FixAllScope::Project(p1).contains(a));
        assert!(!FixAllScope::Project(p1).contains(b));
        assert!(FixAllScope::Solution.contains(b));
    }

    #[test]
    fn test_scope_telemetry_ids_are_distinct() {
        let (_, p) = Solution::empty().add_project("P");
        let ids = [
            FixAllScope::Project(p).telemetry_id(),
            FixAllScope::Solution.telemetry_id(),
        ];
        assert_eq!(ids, [2, 3]);
    }

    #[test]
    fn test_collides() {
        assert!(collides(&TextRange::new(0, 5), &TextRange::new(3, 8)));
        assert!(collides(&TextRange::new(3, 3), &TextRange::new(0, 5)));
        assert!(!collides(&TextRange::new(0, 3), &TextRange::new(3, 5)));
        assert!(!collides(&TextRange::new(3, 3), &TextRange::new(3, 3)));
    }

    #[test]
    fn test_trigger_needs_key() {
        let trigger = CodeAction::no_change("Fix").unwrap();
        let result = FixAllContext::new(Solution::empty(), FixAllScope::Solution, trigger, vec![]);
        assert!(matches!(
            result,
            Err(ActionError::InvalidArgument { name: "trigger", .. })
        ));
    }

    #[test]
    fn test_merge_keeps_first_of_overlapping_changes() {
        let (solution, project) = Solution::empty().add_project("P");
        let (original, id) = solution.add_document(project, "a.cs", "0123456789").unwrap();

        let first = original.with_document_text(id, "0AB3456789").unwrap();
        let overlapping = original.with_document_text(id, "01C3456789").unwrap();
        let disjoint = original.with_document_text(id, "01234567D9").unwrap();
        let duplicate = first.clone();

        let merged = merge_solutions(&original, &[first, overlapping, disjoint, duplicate])
            .unwrap()
            .unwrap();
        assert_eq!(merged.document(id).unwrap().text(), "0AB34567D9");
        assert!(merged.descends_from(&original));
    }

    #[test]
    fn test_merge_splits_each_result_into_regions() {
        let (solution, project) = Solution::empty().add_project("P");
        let (original, id) = solution.add_document(project, "a.cs", "x\n1\n2\n3\n").unwrap();

        // Both add the same header line, each edits a different line
        let first = original.with_document_text(id, "H\nx\nA\n2\n3\n").unwrap();
        let second = original.with_document_text(id, "H\nx\n1\n2\nC\n").unwrap();

        let merged = merge_solutions(&original, &[first, second]).unwrap().unwrap();
        assert_eq!(merged.document(id).unwrap().text(), "H\nx\nA\n2\nC\n");
    }

    #[test]
    fn test_merge_drops_colliding_result_as_a_whole() {
        let (solution, project) = Solution::empty().add_project("P");
        let (original, id) = solution.add_document(project, "a.cs", "1\n2\n3\n").unwrap();

        let first = original.with_document_text(id, "1\n2\nC\n").unwrap();
        // Its first region is disjoint, its second collides with `first`
        let second = original.with_document_text(id, "A\n2\nc\n").unwrap();

        let merged = merge_solutions(&original, &[first, second]).unwrap().unwrap();
        assert_eq!(merged.document(id).unwrap().text(), "1\n2\nC\n");
    }

    #[test]
    fn test_merge_of_nothing_is_none() {
        let (original, _) = Solution::empty().add_project("P");
        assert!(merge_solutions(&original, &[]).unwrap().is_none());
    }
}
