use indexmap::IndexSet;

use crate::grammar::{Component, Grammar, Lookahead};
use crate::interner::Interner;
use crate::GrammarError;

fn nullable_grammar() -> Grammar {
    // S -> A B ; A -> a | ε ; B -> b
    let mut names = Interner::new();
    let s = names.intern("S");
    let a = names.intern("A");
    let b = names.intern("B");
    let ta = names.intern("a");
    let tb = names.intern("b");

    Grammar::new(
        vec![
            (s, vec![Component::NonTerm(a), Component::NonTerm(b)]),
            (a, vec![Component::Term(ta)]),
            (a, vec![]),
            (b, vec![Component::Term(tb)]),
        ],
        None,
        names,
    )
    .unwrap()
}

#[test]
fn first_sets_propagate_through_nullable_prefixes() {
    let grammar = nullable_grammar();
    let names = grammar.names().clone();
    let (s, a) = (names.get("S").unwrap(), names.get("A").unwrap());
    let (ta, tb) = (names.get("a").unwrap(), names.get("b").unwrap());

    let first_s: IndexSet<Lookahead> = grammar.first1(s).clone();
    assert!(first_s.contains(&Lookahead::Term(ta)));
    assert!(first_s.contains(&Lookahead::Term(tb)));
    assert!(!first_s.contains(&Lookahead::Empty));

    let first_a = grammar.first1(a);
    assert!(first_a.contains(&Lookahead::Term(ta)));
    assert!(first_a.contains(&Lookahead::Empty));
}

#[test]
fn follow_sets() {
    let grammar = nullable_grammar();
    let names = grammar.names().clone();
    let (s, a, b) = (
        names.get("S").unwrap(),
        names.get("A").unwrap(),
        names.get("B").unwrap(),
    );
    let tb = names.get("b").unwrap();

    assert!(grammar.follow1(s).contains(&Lookahead::End));
    assert!(grammar.follow1(a).contains(&Lookahead::Term(tb)));
    assert!(grammar.follow1(b).contains(&Lookahead::End));
}

#[test]
fn first_of_sequence_requires_all_prefixes_nullable() {
    let grammar = nullable_grammar();
    let names = grammar.names().clone();
    let (a, b) = (names.get("A").unwrap(), names.get("B").unwrap());

    let seq = [Component::NonTerm(a), Component::NonTerm(b)];
    let first = grammar.first_of_sequence(&seq);
    // B is not nullable, so the sequence is not nullable
    assert!(!first.contains(&Lookahead::Empty));

    let first_a_only = grammar.first_of_sequence(&seq[..1]);
    assert!(first_a_only.contains(&Lookahead::Empty));
}

#[test]
fn rule_ids_follow_declaration_order() {
    let grammar = nullable_grammar();
    for (i, rule) in grammar.rules().iter().enumerate() {
        assert_eq!(rule.id, i);
    }
}

#[test]
fn checksum_tracks_rule_shapes() {
    let g1 = nullable_grammar();
    let g2 = nullable_grammar();
    assert_eq!(g1.checksum(), g2.checksum());

    // same rule count, different shape
    let mut names = Interner::new();
    let s = names.intern("S");
    let a = names.intern("A");
    let b = names.intern("B");
    let ta = names.intern("a");
    let tb = names.intern("b");
    let g3 = Grammar::new(
        vec![
            (s, vec![Component::NonTerm(b), Component::NonTerm(a)]),
            (a, vec![Component::Term(ta)]),
            (a, vec![]),
            (b, vec![Component::Term(tb)]),
        ],
        None,
        names,
    )
    .unwrap();
    assert_ne!(g1.checksum(), g3.checksum());
    assert!(g1.checksum().starts_with("4:"));
}

#[test]
fn rejects_undefined_non_terminals() {
    let mut names = Interner::new();
    let s = names.intern("S");
    let missing = names.intern("MISSING");
    let err = Grammar::new(vec![(s, vec![Component::NonTerm(missing)])], None, names);
    assert!(matches!(err, Err(GrammarError::UndefinedNonTerminals(_))));
}

#[test]
fn rejects_empty_grammar() {
    let names = Interner::new();
    assert!(matches!(
        Grammar::new(vec![], None, names),
        Err(GrammarError::Empty)
    ));
}
