//! # Documents
//!
//! A `Document` is one immutable source file inside a project snapshot.
//!
//! Besides its text, a document carries an ordered list of annotations. Code
//! action producers attach annotations to mark the places the post-processing
//! passes should visit (missing imports, reducible expressions, nodes to
//! format, casing to correct). Every edit returns a new document; the text and
//! annotation list of untouched documents are shared between snapshots.
//!
//! ## Annotation tracking
//!
//! Ranged edits keep annotations attached to the text they were placed on:
//!
//! ```text
//! before edit    [a)      [ edit )      [b)
//! after edit     [a)      [ new text  )    [b)   (b shifted by delta)
//! ```
//!
//! Annotations intersecting the edit are stretched or clamped to the edited
//! region.

use crate::{DocumentId, TextChange, TextRange, WorkspaceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kinds of annotation consumed by the post-processing passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Node needs an import directive; data is the namespace to import.
    AddImports,
    /// Expression can be reduced; data is the minimal form.
    Simplify,
    /// Explicit request to format the range.
    Format,
    /// Whitespace inserted by a producer that should be formatted.
    Elastic,
    /// Identifier whose casing should match its declaration; data is the declared spelling.
    CaseCorrect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub range: TextRange,
    pub data: Option<Arc<str>>,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Arc<str>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Position of this annotation after `range` was replaced by `new_len` bytes.
    fn adjusted(&self, range: TextRange, new_len: usize) -> Annotation {
        let delta = new_len as isize - range.len() as isize;
        let shift = |offset: usize| (offset as isize + delta) as usize;
        let own = self.range;

        let adjusted = if own.end <= range.start {
            own
        } else if own.start >= range.end {
            TextRange::new(shift(own.start), shift(own.end))
        } else {
            let start = own.start.min(range.start);
            let end = if own.end >= range.end {
                shift(own.end)
            } else {
                range.start + new_len
            };
            TextRange::new(start, end.max(start))
        };

        Annotation {
            kind: self.kind,
            range: adjusted,
            data: self.data.clone(),
        }
    }
}

/// Immutable source document
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    name: Arc<str>,
    text: Arc<str>,
    annotations: Arc<[Annotation]>,
}

impl Document {
    pub fn new(id: DocumentId, name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
            text: text.into(),
            annotations: Arc::from(Vec::new()),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotations_of(&self, kind: AnnotationKind) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.kind == kind)
    }

    pub fn has_annotations(&self, kind: AnnotationKind) -> bool {
        self.annotations.iter().any(|a| a.kind == kind)
    }

    /// True when both documents have the same text.
    pub fn text_equals(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.text, &other.text) || self.text == other.text
    }

    /// True when both documents have the same text and annotations.
    pub fn same_content(&self, other: &Document) -> bool {
        self.text_equals(other)
            && (Arc::ptr_eq(&self.annotations, &other.annotations)
                || self.annotations == other.annotations)
    }

    /// Replace the whole text. Annotations are dropped.
    pub fn with_text(&self, text: impl Into<Arc<str>>) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            text: text.into(),
            annotations: Arc::from(Vec::new()),
        }
    }

    pub fn with_name(&self, name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Replace `range` with `replacement`, keeping annotations attached.
    pub fn replace_range(&self, range: TextRange, replacement: &str) -> Result<Self, WorkspaceError> {
        range.validate(&self.text)?;

        let mut text = String::with_capacity(self.text.len() + replacement.len());
        text.push_str(&self.text[..range.start]);
        text.push_str(replacement);
        text.push_str(&self.text[range.end..]);

        let annotations: Vec<Annotation> = self
            .annotations
            .iter()
            .map(|a| a.adjusted(range, replacement.len()))
            .collect();

        Ok(Self {
            id: self.id,
            name: self.name.clone(),
            text: text.into(),
            annotations: annotations.into(),
        })
    }

    /// Replace the first occurrence of `find`. Returns an unchanged copy when absent.
    pub fn replace_text(&self, find: &str, replacement: &str) -> Self {
        match self.text.find(find) {
            Some(start) if !find.is_empty() => self
                .replace_range(TextRange::new(start, start + find.len()), replacement)
                .unwrap_or_else(|_| self.clone()),
            _ => self.clone(),
        }
    }

    pub fn insert(&self, offset: usize, text: &str) -> Result<Self, WorkspaceError> {
        self.replace_range(TextRange::empty(offset), text)
    }

    /// Apply changes expressed against this document's current text.
    pub fn apply_changes(&self, changes: &[TextChange]) -> Result<Self, WorkspaceError> {
        let mut sorted: Vec<&TextChange> = changes.iter().collect();
        sorted.sort_by_key(|c| (c.range.start, c.range.end));
        for pair in sorted.windows(2) {
            if pair[0].range.end > pair[1].range.start {
                return Err(WorkspaceError::OverlappingChanges(pair[1].range));
            }
        }

        let mut document = self.clone();
        for change in sorted.iter().rev() {
            document = document.replace_range(change.range, &change.new_text)?;
        }
        Ok(document)
    }

    pub fn with_annotation(
        &self,
        kind: AnnotationKind,
        range: TextRange,
        data: Option<&str>,
    ) -> Result<Self, WorkspaceError> {
        range.validate(&self.text)?;

        let mut annotation = Annotation::new(kind, range);
        if let Some(data) = data {
            annotation = annotation.with_data(data);
        }

        let mut annotations = self.annotations.to_vec();
        annotations.push(annotation);

        Ok(Self {
            annotations: annotations.into(),
            ..self.clone()
        })
    }

    /// Drop every annotation of `kind`, leaving the others untouched.
    pub fn without_annotations(&self, kind: AnnotationKind) -> Self {
        if !self.has_annotations(kind) {
            return self.clone();
        }

        let annotations: Vec<Annotation> = self
            .annotations
            .iter()
            .filter(|a| a.kind != kind)
            .cloned()
            .collect();

        Self {
            annotations: annotations.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectId;

    fn doc(text: &str) -> Document {
        Document::new(DocumentId::fresh(ProjectId::fresh()), "test.cs", text)
    }

    #[test]
    fn test_replace_text_first_occurrence() {
        let d = doc("using(var a=b){}");
        let changed = d.replace_text("using(var a=b){}", "using var a=b;");
        assert_eq!(changed.text(), "using var a=b;");
        assert_eq!(changed.id(), d.id());
    }

    #[test]
    fn test_replace_text_missing_is_unchanged() {
        let d = doc("class C {}");
        let changed = d.replace_text("struct", "class");
        assert!(changed.same_content(&d));
    }

    #[test]
    fn test_annotations_after_edit_are_shifted() {
        let d = doc("aaa bbb ccc")
            .with_annotation(AnnotationKind::Format, TextRange::new(8, 11), None)
            .unwrap();
        let changed = d.replace_range(TextRange::new(0, 3), "a").unwrap();
        assert_eq!(changed.text(), "a bbb ccc");
        assert_eq!(changed.annotations()[0].range, TextRange::new(6, 9));
        assert_eq!(&changed.text()[6..9], "ccc");
    }

    #[test]
    fn test_annotations_before_edit_are_kept() {
        let d = doc("aaa bbb ccc")
            .with_annotation(AnnotationKind::Simplify, TextRange::new(0, 3), Some("a"))
            .unwrap();
        let changed = d.replace_range(TextRange::new(8, 11), "cccccc").unwrap();
        assert_eq!(changed.annotations()[0].range, TextRange::new(0, 3));
        assert_eq!(changed.annotations()[0].data.as_deref(), Some("a"));
    }

    #[test]
    fn test_containing_annotation_is_stretched() {
        let d = doc("{ x }")
            .with_annotation(AnnotationKind::Format, TextRange::new(0, 5), None)
            .unwrap();
        let changed = d.insert(2, "y + ").unwrap();
        assert_eq!(changed.text(), "{ y + x }");
        assert_eq!(changed.annotations()[0].range, TextRange::new(0, 9));
    }

    #[test]
    fn test_annotation_inside_replaced_range_is_clamped() {
        let d = doc("System.String s;")
            .with_annotation(AnnotationKind::Simplify, TextRange::new(0, 13), Some("string"))
            .unwrap();
        let changed = d.replace_range(TextRange::new(0, 13), "string").unwrap();
        assert_eq!(changed.annotations()[0].range, TextRange::new(0, 6));
    }

    #[test]
    fn test_without_annotations_keeps_other_kinds() {
        let d = doc("abc def")
            .with_annotation(AnnotationKind::Format, TextRange::new(0, 3), None)
            .unwrap()
            .with_annotation(AnnotationKind::CaseCorrect, TextRange::new(4, 7), Some("Def"))
            .unwrap();
        let stripped = d.without_annotations(AnnotationKind::Format);
        assert_eq!(stripped.annotations().len(), 1);
        assert_eq!(stripped.annotations()[0].kind, AnnotationKind::CaseCorrect);
    }

    #[test]
    fn test_with_text_drops_annotations() {
        let d = doc("abc")
            .with_annotation(AnnotationKind::Format, TextRange::new(0, 3), None)
            .unwrap();
        assert!(d.with_text("xyz").annotations().is_empty());
    }

    #[test]
    fn test_apply_changes_rejects_overlap() {
        let d = doc("abcdef");
        let changes = vec![
            TextChange::new(TextRange::new(0, 3), "x"),
            TextChange::new(TextRange::new(1, 2), "y"),
        ];
        assert!(d.apply_changes(&changes).is_err());
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let d = doc("abc");
        assert!(matches!(
            d.replace_range(TextRange::new(1, 9), "x"),
            Err(WorkspaceError::RangeOutOfBounds { .. })
        ));
    }
}
