//! Integration tests for snapshots and the live workspace

use quickfix_workspace::{
    apply_text_changes, diff_text, AnnotationKind, Solution, TextRange, Workspace,
};
use std::sync::Arc;

#[test]
fn test_edits_share_unchanged_documents() {
    let (solution, app) = Solution::empty().add_project("App");
    let (solution, program) = solution.add_document(app, "Program.cs", "class Program {}").unwrap();
    let (s0, helpers) = solution.add_document(app, "Helpers.cs", "class Helpers {}").unwrap();

    let s1 = s0.with_document_text(program, "class Program { }").unwrap();

    // The untouched document is the same allocation in both snapshots
    let before = s0.document(helpers).unwrap().text();
    let after = s1.document(helpers).unwrap().text();
    assert!(std::ptr::eq(before, after));

    assert_eq!(s0.document(program).unwrap().text(), "class Program {}");
    assert!(s1.descends_from(&s0));
    assert!(!s0.descends_from(&s1));
}

#[test]
fn test_changes_between_snapshots() {
    let (solution, app) = Solution::empty().add_project("App");
    let (s0, program) = solution.add_document(app, "Program.cs", "using(var a=b){}").unwrap();

    let edited = s0
        .document(program)
        .unwrap()
        .replace_text("using(var a=b){}", "using var a=b;");
    let s1 = s0.with_document(edited).unwrap();
    let (s2, added) = s1.add_document(app, "New.cs", "").unwrap();

    let changes = s2.get_changes(&s0);
    let to_process: Vec<_> = changes.documents_to_process(&s2).collect();
    assert_eq!(to_process, vec![program, added]);

    let change = changes.project_changes[0].changed_documents[0]
        .text_change
        .clone()
        .unwrap();
    let replayed = apply_text_changes(s0.document(program).unwrap().text(), &[change]).unwrap();
    assert_eq!(replayed, "using var a=b;");
}

#[test]
fn test_annotations_follow_edits() {
    let (solution, app) = Solution::empty().add_project("App");
    let (s0, id) = solution.add_document(app, "a.cs", "var x = Foo.Bar;").unwrap();

    let document = s0
        .document(id)
        .unwrap()
        .with_annotation(AnnotationKind::Simplify, TextRange::new(8, 15), Some("Bar"))
        .unwrap()
        .insert(0, "// comment\n")
        .unwrap();

    let annotation = document.annotations_of(AnnotationKind::Simplify).next().unwrap();
    assert_eq!(&document.text()[annotation.range.start..annotation.range.end], "Foo.Bar");
}

#[test]
fn test_diff_is_minimal() {
    let change = diff_text("let value = 1;", "let value = 42;").unwrap();
    assert_eq!(change.range, TextRange::new(12, 13));
    assert_eq!(change.new_text, "42");
}

#[test]
fn test_concurrent_writers_race_on_one_base() {
    let (solution, app) = Solution::empty().add_project("App");
    let (s0, id) = solution.add_document(app, "a.cs", "0").unwrap();
    let workspace = Arc::new(Workspace::new(s0.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let workspace = workspace.clone();
            let target = s0.with_document_text(id, i.to_string()).unwrap();
            let base = s0.clone();
            std::thread::spawn(move || workspace.apply_if_base(&base, target))
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert!(workspace.current_snapshot().descends_from(&s0));
}
