//! # Default Cleanup Passes
//!
//! Reference implementations of the post-processing collaborators. Each pass
//! reads only annotations of its own kind, rewrites the annotated text and
//! then drops those annotations, so running a pass twice is a no-op.
//!
//! - `ImportAdder`: inserts missing import directives after the leading block
//! - `Simplifier`: replaces annotated expressions with their minimal form
//! - `Formatter`: normalises whitespace at `Format` and `Elastic` ranges
//! - `CaseCorrector`: restores declared casing at annotated identifiers
//!
//! Hosts with real language services swap these out through the
//! `CodeCleanup` builder methods.

use crate::cancellation::ensure_not_cancelled;
use crate::config::{AddImportOptions, CleanupOptions, FormattingOptions};
use crate::{ActionResult, CleanupPass};
use async_trait::async_trait;
use quickfix_workspace::{Annotation, AnnotationKind, Document, TextChange, TextRange};
use tokio_util::sync::CancellationToken;

/// Inserts `{keyword} {namespace};` for every `AddImports` annotation
#[derive(Debug, Default)]
pub struct ImportAdder;

#[async_trait]
impl CleanupPass for ImportAdder {
    fn name(&self) -> &'static str {
        "add-imports"
    }

    async fn run(
        &self,
        document: Document,
        kind: AnnotationKind,
        options: &CleanupOptions,
        cancel: &CancellationToken,
    ) -> ActionResult<Document> {
        ensure_not_cancelled(cancel)?;
        let options = &options.add_imports;
        if !options.enabled || !document.has_annotations(kind) {
            return Ok(document);
        }

        let mut namespaces: Vec<String> = Vec::new();
        for annotation in document.annotations_of(kind) {
            if let Some(namespace) = annotation.data.as_deref() {
                let namespace = namespace.trim();
                if !namespace.is_empty() && !namespaces.iter().any(|n| n == namespace) {
                    namespaces.push(namespace.to_string());
                }
            }
        }

        let mut document = document;
        for namespace in &namespaces {
            let directive = format!("{} {};", options.directive_keyword, namespace);
            let block = ImportBlock::scan(document.text(), options);
            if block.contains(&directive) {
                continue;
            }

            let offset = if options.place_system_first && is_system_namespace(namespace) {
                block.first_non_system.unwrap_or(block.end)
            } else {
                block.end
            };

            let inserted = if offset > 0 && !document.text()[..offset].ends_with('\n') {
                format!("\n{directive}")
            } else {
                format!("{directive}\n")
            };
            document = document.insert(offset, &inserted)?;
        }

        Ok(document.without_annotations(kind))
    }
}

/// Leading run of directive lines at the top of a document, after any
/// comment header
struct ImportBlock {
    directives: Vec<String>,
    end: usize,
    first_non_system: Option<usize>,
}

impl ImportBlock {
    fn scan(text: &str, options: &AddImportOptions) -> Self {
        let prefix = format!("{} ", options.directive_keyword);
        let mut block = ImportBlock {
            directives: Vec::new(),
            end: 0,
            first_non_system: None,
        };

        let mut lines = text.split_inclusive('\n').peekable();
        let mut offset = 0;
        let mut in_block_comment = false;
        while let Some(line) = lines.peek() {
            let trimmed = line.trim();
            let is_header = if in_block_comment {
                in_block_comment = !trimmed.contains("*/");
                true
            } else if trimmed.starts_with("/*") {
                in_block_comment = !trimmed.contains("*/");
                true
            } else {
                trimmed.is_empty() || trimmed.starts_with("//")
            };
            if !is_header {
                break;
            }
            offset += line.len();
            lines.next();
        }
        block.end = offset;

        for line in lines {
            let trimmed = line.trim();
            let Some(namespace) = trimmed
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(';'))
            else {
                break;
            };

            if block.first_non_system.is_none() && !is_system_namespace(namespace.trim()) {
                block.first_non_system = Some(offset);
            }
            block.directives.push(trimmed.to_string());
            offset += line.len();
            block.end = offset;
        }

        block
    }

    fn contains(&self, directive: &str) -> bool {
        self.directives.iter().any(|d| d == directive)
    }
}

fn is_system_namespace(namespace: &str) -> bool {
    namespace == "System" || namespace.starts_with("System.")
}

/// Replaces each `Simplify` range with the minimal form stored on the annotation
#[derive(Debug, Default)]
pub struct Simplifier;

#[async_trait]
impl CleanupPass for Simplifier {
    fn name(&self) -> &'static str {
        "simplify"
    }

    async fn run(
        &self,
        document: Document,
        kind: AnnotationKind,
        options: &CleanupOptions,
        cancel: &CancellationToken,
    ) -> ActionResult<Document> {
        ensure_not_cancelled(cancel)?;
        if !options.simplifier.enabled || !document.has_annotations(kind) {
            return Ok(document);
        }

        let targets = non_overlapping_descending(document.annotations_of(kind));
        let mut result = document.clone();
        for annotation in targets {
            let Some(minimal) = annotation.data.as_deref() else {
                continue;
            };
            if &document.text()[annotation.range.start..annotation.range.end] != minimal {
                result = result.replace_range(annotation.range, minimal)?;
            }
        }

        Ok(result.without_annotations(kind))
    }
}

/// Whitespace normaliser used for both explicit and elastic formatting
#[derive(Debug, Default)]
pub struct Formatter;

#[async_trait]
impl CleanupPass for Formatter {
    fn name(&self) -> &'static str {
        "format"
    }

    async fn run(
        &self,
        document: Document,
        kind: AnnotationKind,
        options: &CleanupOptions,
        cancel: &CancellationToken,
    ) -> ActionResult<Document> {
        ensure_not_cancelled(cancel)?;
        if !document.has_annotations(kind) {
            return Ok(document);
        }

        let mut edits = Vec::new();
        for span in merged_ranges(document.annotations_of(kind).map(|a| a.range)) {
            edits.extend(whitespace_edits(document.text(), span, &options.formatting));
        }

        // One edit per whitespace run keeps annotations between runs exact
        let result = document.apply_changes(&edits)?;
        Ok(result.without_annotations(kind))
    }
}

/// Minimal edits normalising the whitespace inside `span`.
fn whitespace_edits(text: &str, span: TextRange, options: &FormattingOptions) -> Vec<TextChange> {
    let bytes = text.as_bytes();
    let is_blank = |b: u8| b == b' ' || b == b'\t';
    let is_line_break = |at: usize| {
        at < span.end
            && (bytes[at] == b'\n' || (bytes[at] == b'\r' && at + 1 < span.end && bytes[at + 1] == b'\n'))
    };

    let mut edits = Vec::new();
    let mut i = span.start;
    while i < span.end {
        if bytes[i] == b'\r' && is_line_break(i) {
            if options.normalize_line_endings {
                edits.push(TextChange::new(TextRange::new(i, i + 1), ""));
            }
            i += 1;
            continue;
        }
        if !is_blank(bytes[i]) {
            i += 1;
            continue;
        }

        let start = i;
        while i < span.end && is_blank(bytes[i]) {
            i += 1;
        }
        let run = TextRange::new(start, i);
        let at_line_start = start == 0 || bytes[start - 1] == b'\n';

        if is_line_break(i) && options.trim_trailing_whitespace {
            edits.push(TextChange::new(run, ""));
        } else if !at_line_start && options.collapse_whitespace && &text[start..i] != " " {
            edits.push(TextChange::new(run, " "));
        }
    }

    edits
}

/// Restores the declared spelling of identifiers that differ only in case
#[derive(Debug, Default)]
pub struct CaseCorrector;

#[async_trait]
impl CleanupPass for CaseCorrector {
    fn name(&self) -> &'static str {
        "case-correct"
    }

    async fn run(
        &self,
        document: Document,
        kind: AnnotationKind,
        _options: &CleanupOptions,
        cancel: &CancellationToken,
    ) -> ActionResult<Document> {
        ensure_not_cancelled(cancel)?;
        if !document.has_annotations(kind) {
            return Ok(document);
        }

        let targets = non_overlapping_descending(document.annotations_of(kind));
        let mut result = document.clone();
        for annotation in targets {
            let Some(declared) = annotation.data.as_deref() else {
                continue;
            };
            let current = &document.text()[annotation.range.start..annotation.range.end];
            if current != declared && current.eq_ignore_ascii_case(declared) {
                result = result.replace_range(annotation.range, declared)?;
            }
        }

        Ok(result.without_annotations(kind))
    }
}

/// Annotations sorted by descending start. Any annotation overlapping one
/// that starts later is dropped, as is a repeat of the same range.
fn non_overlapping_descending<'a>(
    annotations: impl Iterator<Item = &'a Annotation>,
) -> Vec<&'a Annotation> {
    let mut sorted: Vec<&Annotation> = annotations.collect();
    sorted.sort_by(|a, b| b.range.start.cmp(&a.range.start).then(b.range.end.cmp(&a.range.end)));

    let mut kept: Vec<&Annotation> = Vec::with_capacity(sorted.len());
    let mut floor = usize::MAX;
    for annotation in sorted {
        let repeated = kept.last().is_some_and(|last| last.range == annotation.range);
        if annotation.range.end <= floor && !repeated {
            floor = annotation.range.start;
            kept.push(annotation);
        }
    }
    kept
}

/// Ascending, with overlapping or touching ranges joined.
fn merged_ranges(ranges: impl Iterator<Item = TextRange>) -> Vec<TextRange> {
    let mut sorted: Vec<TextRange> = ranges.collect();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<TextRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickfix_workspace::Solution;

    fn document(text: &str) -> Document {
        let (solution, project) = Solution::empty().add_project("P");
        let (_, id) = solution.add_document(project, "a.cs", text).unwrap();
        Document::new(id, "a.cs", text)
    }

    async fn run(pass: &dyn CleanupPass, document: Document, kind: AnnotationKind) -> Document {
        pass.run(document, kind, &CleanupOptions::default(), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_import_adder_appends_after_block() {
        let doc = document("using System;\nusing Foo;\n\nclass C { Bar b; }\n")
            .with_annotation(AnnotationKind::AddImports, TextRange::new(22, 25), Some("Bar.Baz"))
            .unwrap();

        let result = run(&ImportAdder, doc, AnnotationKind::AddImports).await;
        assert_eq!(
            result.text(),
            "using System;\nusing Foo;\nusing Bar.Baz;\n\nclass C { Bar b; }\n"
        );
        assert!(!result.has_annotations(AnnotationKind::AddImports));
    }

    #[tokio::test]
    async fn test_import_adder_places_system_first() {
        let doc = document("using Foo;\nclass C {}\n")
            .with_annotation(AnnotationKind::AddImports, TextRange::new(11, 16), Some("System.Linq"))
            .unwrap();

        let result = run(&ImportAdder, doc, AnnotationKind::AddImports).await;
        assert_eq!(result.text(), "using System.Linq;\nusing Foo;\nclass C {}\n");
    }

    #[tokio::test]
    async fn test_import_adder_skips_present_directive() {
        let doc = document("using Foo;\nclass C {}")
            .with_annotation(AnnotationKind::AddImports, TextRange::new(11, 16), Some("Foo"))
            .unwrap();

        let result = run(&ImportAdder, doc, AnnotationKind::AddImports).await;
        assert_eq!(result.text(), "using Foo;\nclass C {}");
    }

    #[tokio::test]
    async fn test_import_adder_keeps_other_annotations_aligned() {
        let doc = document("class C { x; }")
            .with_annotation(AnnotationKind::AddImports, TextRange::new(0, 5), Some("Foo"))
            .unwrap()
            .with_annotation(AnnotationKind::Format, TextRange::new(8, 14), None)
            .unwrap();

        let result = run(&ImportAdder, doc, AnnotationKind::AddImports).await;
        let format: Vec<_> = result.annotations_of(AnnotationKind::Format).collect();
        assert_eq!(format.len(), 1);
        let shift = "using Foo;\n".len();
        assert_eq!(format[0].range, TextRange::new(8 + shift, 14 + shift));
    }

    #[tokio::test]
    async fn test_simplifier_replaces_annotated_ranges() {
        let doc = document("var x = System.String.Empty; var y = System.Int32.MaxValue;")
            .with_annotation(AnnotationKind::Simplify, TextRange::new(8, 27), Some("string.Empty"))
            .unwrap()
            .with_annotation(AnnotationKind::Simplify, TextRange::new(37, 58), Some("int.MaxValue"))
            .unwrap();

        let result = run(&Simplifier, doc, AnnotationKind::Simplify).await;
        assert_eq!(result.text(), "var x = string.Empty; var y = int.MaxValue;");
    }

    #[tokio::test]
    async fn test_simplifier_inserts_once_for_repeated_empty_range() {
        let doc = document("int? x;")
            .with_annotation(AnnotationKind::Simplify, TextRange::empty(6), Some(" = null"))
            .unwrap()
            .with_annotation(AnnotationKind::Simplify, TextRange::empty(6), Some(" = null"))
            .unwrap();

        let result = run(&Simplifier, doc, AnnotationKind::Simplify).await;
        assert_eq!(result.text(), "int? x = null;");
    }

    #[tokio::test]
    async fn test_import_adder_goes_below_comment_header() {
        let text = "// Copyright (c) Contoso\n/* Licensed under MIT\n */\nclass C {}\n";
        let doc = document(text)
            .with_annotation(AnnotationKind::AddImports, TextRange::new(52, 57), Some("Foo"))
            .unwrap();

        let result = run(&ImportAdder, doc, AnnotationKind::AddImports).await;
        assert_eq!(
            result.text(),
            "// Copyright (c) Contoso\n/* Licensed under MIT\n */\nusing Foo;\nclass C {}\n"
        );
    }

    #[tokio::test]
    async fn test_import_adder_sees_directive_below_header() {
        let text = "// Header\n\nusing Foo;\nclass C {}\n";
        let doc = document(text)
            .with_annotation(AnnotationKind::AddImports, TextRange::new(23, 28), Some("Foo"))
            .unwrap();

        let result = run(&ImportAdder, doc, AnnotationKind::AddImports).await;
        assert_eq!(result.text(), text);
    }

    #[tokio::test]
    async fn test_disabled_simplifier_is_untouched() {
        let doc = document("a.b")
            .with_annotation(AnnotationKind::Simplify, TextRange::new(0, 3), Some("b"))
            .unwrap();
        let mut options = CleanupOptions::default();
        options.simplifier.enabled = false;

        let result = Simplifier
            .run(doc.clone(), AnnotationKind::Simplify, &options, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.same_content(&doc));
    }

    #[tokio::test]
    async fn test_formatter_collapses_and_trims() {
        let text = "  if (a  ==\tb)   \r\n    x;";
        let doc = document(text)
            .with_annotation(AnnotationKind::Format, TextRange::new(0, text.len()), None)
            .unwrap();

        let result = run(&Formatter, doc, AnnotationKind::Format).await;
        assert_eq!(result.text(), "  if (a == b)\n    x;");
    }

    #[tokio::test]
    async fn test_formatter_only_touches_its_kind() {
        let doc = document("a   b")
            .with_annotation(AnnotationKind::Elastic, TextRange::new(0, 5), None)
            .unwrap();

        let unchanged = run(&Formatter, doc.clone(), AnnotationKind::Format).await;
        assert!(unchanged.same_content(&doc));

        let formatted = run(&Formatter, doc, AnnotationKind::Elastic).await;
        assert_eq!(formatted.text(), "a b");
    }

    #[tokio::test]
    async fn test_case_corrector_restores_declared_casing() {
        let doc = document("var s = myvalue + other;")
            .with_annotation(AnnotationKind::CaseCorrect, TextRange::new(8, 15), Some("myValue"))
            .unwrap()
            .with_annotation(AnnotationKind::CaseCorrect, TextRange::new(18, 23), Some("Different"))
            .unwrap();

        let result = run(&CaseCorrector, doc, AnnotationKind::CaseCorrect).await;
        assert_eq!(result.text(), "var s = myValue + other;");
    }

    #[tokio::test]
    async fn test_pass_observes_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = Formatter
            .run(document("x"), AnnotationKind::Format, &CleanupOptions::default(), &cancel)
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_whitespace_edits_are_stable() {
        let options = FormattingOptions::default();
        let text = "a  b \t\n\t c   d\r\n   ";
        let edits = whitespace_edits(text, TextRange::new(0, text.len()), &options);
        let once = quickfix_workspace::apply_text_changes(text, &edits).unwrap();

        assert_eq!(once, "a b\n\t c d\n   ");
        assert!(whitespace_edits(&once, TextRange::new(0, once.len()), &options).is_empty());
    }

    #[tokio::test]
    async fn test_formatter_preserves_inner_annotations() {
        let doc = document("FOO   bar")
            .with_annotation(AnnotationKind::Elastic, TextRange::new(0, 9), None)
            .unwrap()
            .with_annotation(AnnotationKind::CaseCorrect, TextRange::new(0, 3), Some("Foo"))
            .unwrap();

        let result = run(&Formatter, doc, AnnotationKind::Elastic).await;
        assert_eq!(result.text(), "FOO bar");
        let kept: Vec<_> = result.annotations_of(AnnotationKind::CaseCorrect).collect();
        assert_eq!(kept[0].range, TextRange::new(0, 3));
    }

    #[test]
    fn test_merged_ranges_joins_overlaps() {
        let merged = merged_ranges(
            vec![TextRange::new(5, 8), TextRange::new(0, 3), TextRange::new(2, 5)].into_iter(),
        );
        assert_eq!(merged, vec![TextRange::new(0, 8)]);
    }
}
