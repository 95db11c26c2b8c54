use crate::grammar::{Component, Grammar};
use crate::interner::Interner;

use super::table::AnalysisTable;

/// E -> E + T | T ; T -> T * F | F ; F -> ( E ) | int
fn expr_grammar() -> Grammar {
    let mut names = Interner::new();
    let e = names.intern("E");
    let t = names.intern("T");
    let f = names.intern("F");
    let plus = names.intern("PLUS");
    let star = names.intern("STAR");
    let lparen = names.intern("LPAREN");
    let rparen = names.intern("RPAREN");
    let int = names.intern("INT");

    use Component::{NonTerm, Term};
    Grammar::new(
        vec![
            (e, vec![NonTerm(e), Term(plus), NonTerm(t)]),
            (e, vec![NonTerm(t)]),
            (t, vec![NonTerm(t), Term(star), NonTerm(f)]),
            (t, vec![NonTerm(f)]),
            (f, vec![Term(lparen), NonTerm(e), Term(rparen)]),
            (f, vec![Term(int)]),
        ],
        None,
        names,
    )
    .unwrap()
}

/// E -> E + E | int (ambiguous)
fn ambiguous_grammar() -> Grammar {
    let mut names = Interner::new();
    let e = names.intern("E");
    let plus = names.intern("PLUS");
    let int = names.intern("INT");

    use Component::{NonTerm, Term};
    Grammar::new(
        vec![
            (e, vec![NonTerm(e), Term(plus), NonTerm(e)]),
            (e, vec![Term(int)]),
        ],
        None,
        names,
    )
    .unwrap()
}

#[test]
fn unambiguous_grammar_has_no_conflicts() {
    let grammar = expr_grammar();
    let table = AnalysisTable::build(&grammar);
    assert!(table.conflicts().is_empty());
}

#[test]
fn ambiguous_grammar_reports_conflicts() {
    let grammar = ambiguous_grammar();
    let table = AnalysisTable::build(&grammar);
    let conflicts = table.conflicts();
    assert!(!conflicts.is_empty());

    let description = table.describe_conflicts(&grammar);
    assert!(description.contains("PLUS"));
    assert!(description.contains("E <- E PLUS E"));
}

#[test]
fn save_and_load_roundtrip() {
    let grammar = expr_grammar();
    let table = AnalysisTable::build(&grammar);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expr_lr1.tbl");
    table.save(&path, &grammar).unwrap();

    let first_line = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_owned();
    assert_eq!(first_line, grammar.checksum());

    let loaded = AnalysisTable::load(&path, &grammar).expect("cache should load");
    assert!(loaded.conflicts().is_empty());

    // every cell of the original must survive the round trip
    let names = grammar.names().clone();
    let e = names.get("E").unwrap();
    for state in 0..32 {
        let col = super::Column::NonTerm(e);
        assert_eq!(table.single(state, col), loaded.single(state, col));
    }
}

#[test]
fn stale_checksum_is_rejected() {
    let grammar = expr_grammar();
    let table = AnalysisTable::build(&grammar);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expr_lr1.tbl");
    table.save(&path, &grammar).unwrap();

    let other = ambiguous_grammar();
    assert!(AnalysisTable::load(&path, &other).is_none());
}

#[test]
fn missing_file_is_rejected() {
    let grammar = expr_grammar();
    let path = std::path::Path::new("/nonexistent/never/here.tbl");
    assert!(AnalysisTable::load(path, &grammar).is_none());
}
