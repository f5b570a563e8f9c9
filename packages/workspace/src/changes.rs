//! Per-document differences between two solution snapshots.

use crate::{diff_text, DocumentId, ProjectId, Solution, TextChange};

/// A document present in both snapshots whose content differs.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub id: DocumentId,
    /// Minimal text change, `None` when only annotations changed.
    pub text_change: Option<TextChange>,
}

impl DocumentChange {
    pub fn has_text_changes(&self) -> bool {
        self.text_change.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ProjectChanges {
    pub project_id: ProjectId,
    pub changed_documents: Vec<DocumentChange>,
    pub added_documents: Vec<DocumentId>,
    pub removed_documents: Vec<DocumentId>,
}

impl ProjectChanges {
    pub fn get_changed_documents(&self, only_text_changes: bool) -> impl Iterator<Item = DocumentId> + '_ {
        self.changed_documents
            .iter()
            .filter(move |c| !only_text_changes || c.has_text_changes())
            .map(|c| c.id)
    }

    pub fn is_empty(&self) -> bool {
        self.changed_documents.is_empty()
            && self.added_documents.is_empty()
            && self.removed_documents.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolutionChanges {
    pub project_changes: Vec<ProjectChanges>,
    pub added_projects: Vec<ProjectId>,
    pub removed_projects: Vec<ProjectId>,
}

impl SolutionChanges {
    pub fn is_empty(&self) -> bool {
        self.project_changes.is_empty() && self.added_projects.is_empty() && self.removed_projects.is_empty()
    }

    /// Documents whose text changed or that were added, in project order.
    /// Documents of newly added projects come last.
    pub fn documents_to_process<'a>(&'a self, new: &'a Solution) -> impl Iterator<Item = DocumentId> + 'a {
        let changed = self.project_changes.iter().flat_map(|p| {
            p.get_changed_documents(true)
                .chain(p.added_documents.iter().copied())
        });
        let from_new_projects = self
            .added_projects
            .iter()
            .filter_map(move |id| new.project(*id))
            .flat_map(|p| p.document_ids());
        changed.chain(from_new_projects)
    }
}

impl Solution {
    /// Differences from `old` to this snapshot.
    pub fn get_changes(&self, old: &Solution) -> SolutionChanges {
        let mut changes = SolutionChanges::default();
        if self.is_same_snapshot(old) {
            return changes;
        }

        for project in self.projects() {
            let Some(old_project) = old.project(project.id()) else {
                changes.added_projects.push(project.id());
                continue;
            };

            let mut project_changes = ProjectChanges {
                project_id: project.id(),
                changed_documents: Vec::new(),
                added_documents: Vec::new(),
                removed_documents: Vec::new(),
            };

            for document in project.documents() {
                match old_project.document(document.id()) {
                    None => project_changes.added_documents.push(document.id()),
                    Some(old_document) if !old_document.same_content(document) => {
                        project_changes.changed_documents.push(DocumentChange {
                            id: document.id(),
                            text_change: diff_text(old_document.text(), document.text()),
                        });
                    }
                    Some(_) => {}
                }
            }

            project_changes.removed_documents = old_project
                .document_ids()
                .filter(|id| project.document(*id).is_none())
                .collect();

            if !project_changes.is_empty() {
                changes.project_changes.push(project_changes);
            }
        }

        changes.removed_projects = old
            .project_ids()
            .filter(|id| self.project(*id).is_none())
            .collect();

        changes
    }
}
