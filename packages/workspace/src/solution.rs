//! # Solution Snapshots
//!
//! A `Solution` is an immutable snapshot of every project and document.
//! Edits never mutate a snapshot: they fork a child snapshot that shares all
//! unchanged projects and documents with its parent.
//!
//! Snapshots are related only through their lineage. Two snapshots with
//! identical contents produced by unrelated edits are still different
//! snapshots.

use crate::{Document, DocumentId, ProjectId, SnapshotId, WorkspaceError};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
struct Lineage {
    id: SnapshotId,
    parent: Option<Arc<Lineage>>,
}

impl Drop for Lineage {
    // Unlink iteratively so long edit histories don't overflow the stack.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

/// A project and its documents
#[derive(Debug, Clone)]
pub struct Project {
    id: ProjectId,
    name: Arc<str>,
    documents: Arc<BTreeMap<DocumentId, Document>>,
}

impl Project {
    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.keys().copied()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn with_documents(&self, documents: BTreeMap<DocumentId, Document>) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            documents: Arc::new(documents),
        }
    }
}

/// Immutable snapshot of the whole project graph
#[derive(Debug, Clone)]
pub struct Solution {
    lineage: Arc<Lineage>,
    projects: Arc<BTreeMap<ProjectId, Project>>,
}

impl Solution {
    /// Create a new root snapshot with no projects.
    pub fn empty() -> Self {
        Self {
            lineage: Arc::new(Lineage {
                id: SnapshotId::fresh(),
                parent: None,
            }),
            projects: Arc::new(BTreeMap::new()),
        }
    }

    fn fork(&self, projects: BTreeMap<ProjectId, Project>) -> Self {
        Self {
            lineage: Arc::new(Lineage {
                id: SnapshotId::fresh(),
                parent: Some(self.lineage.clone()),
            }),
            projects: Arc::new(projects),
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.lineage.id
    }

    pub fn parent_id(&self) -> Option<SnapshotId> {
        self.lineage.parent.as_ref().map(|p| p.id)
    }

    /// Lineage identity, never structural equality.
    pub fn is_same_snapshot(&self, other: &Solution) -> bool {
        self.lineage.id == other.lineage.id
    }

    /// True if `ancestor` is a strict ancestor of this snapshot.
    pub fn descends_from(&self, ancestor: &Solution) -> bool {
        let mut current = self.lineage.parent.as_ref();
        while let Some(node) = current {
            if node.id == ancestor.lineage.id {
                return true;
            }
            current = node.parent.as_ref();
        }
        false
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn project_ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.projects.keys().copied()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.projects.get(&id.project_id())?.document(id)
    }

    pub fn get_required_document(&self, id: DocumentId) -> Result<&Document, WorkspaceError> {
        self.document(id).ok_or(WorkspaceError::DocumentNotFound(id))
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.projects.values().flat_map(|p| p.documents())
    }

    pub fn add_project(&self, name: impl Into<Arc<str>>) -> (Solution, ProjectId) {
        let id = ProjectId::fresh();
        let mut projects = (*self.projects).clone();
        projects.insert(
            id,
            Project {
                id,
                name: name.into(),
                documents: Arc::new(BTreeMap::new()),
            },
        );
        (self.fork(projects), id)
    }

    pub fn remove_project(&self, id: ProjectId) -> Result<Solution, WorkspaceError> {
        let mut projects = (*self.projects).clone();
        projects
            .remove(&id)
            .ok_or(WorkspaceError::ProjectNotFound(id))?;
        Ok(self.fork(projects))
    }

    pub fn add_document(
        &self,
        project_id: ProjectId,
        name: impl Into<Arc<str>>,
        text: impl Into<Arc<str>>,
    ) -> Result<(Solution, DocumentId), WorkspaceError> {
        let id = DocumentId::fresh(project_id);
        let solution = self.with_document(Document::new(id, name, text))?;
        Ok((solution, id))
    }

    /// Insert or replace `document` in its owning project.
    pub fn with_document(&self, document: Document) -> Result<Solution, WorkspaceError> {
        let project_id = document.id().project_id();
        let project = self
            .projects
            .get(&project_id)
            .ok_or(WorkspaceError::ProjectNotFound(project_id))?;

        let mut documents = (*project.documents).clone();
        documents.insert(document.id(), document);

        let mut projects = (*self.projects).clone();
        projects.insert(project_id, project.with_documents(documents));
        Ok(self.fork(projects))
    }

    pub fn with_document_text(
        &self,
        id: DocumentId,
        text: impl Into<Arc<str>>,
    ) -> Result<Solution, WorkspaceError> {
        let document = self.get_required_document(id)?.with_text(text);
        self.with_document(document)
    }

    pub fn remove_document(&self, id: DocumentId) -> Result<Solution, WorkspaceError> {
        let project_id = id.project_id();
        let project = self
            .projects
            .get(&project_id)
            .ok_or(WorkspaceError::ProjectNotFound(project_id))?;

        let mut documents = (*project.documents).clone();
        documents
            .remove(&id)
            .ok_or(WorkspaceError::DocumentNotFound(id))?;

        let mut projects = (*self.projects).clone();
        projects.insert(project_id, project.with_documents(documents));
        Ok(self.fork(projects))
    }
}
