use crate::{DocumentId, ProjectId, TextRange};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("Range {range:?} is out of bounds for text of length {len}")]
    RangeOutOfBounds { range: TextRange, len: usize },

    #[error("Range {0:?} does not fall on a character boundary")]
    NotCharBoundary(TextRange),

    #[error("Text changes overlap at {0:?}")]
    OverlappingChanges(TextRange),
}
