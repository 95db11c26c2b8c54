use crate::ParseError;
use crate::grammar::{Component, Grammar};
use crate::interner::{Interner, Sym};

use super::driver::{Lr1Parser, Lr1Token};

/// E -> E + T | T ; T -> T * F | F ; F -> ( E ) | int
fn expr_parser() -> (Lr1Parser, Interner) {
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
    let grammar = Grammar::new(
        vec![
            (e, vec![NonTerm(e), Term(plus), NonTerm(t)]),
            (e, vec![NonTerm(t)]),
            (t, vec![NonTerm(t), Term(star), NonTerm(f)]),
            (t, vec![NonTerm(f)]),
            (f, vec![Term(lparen), NonTerm(e), Term(rparen)]),
            (f, vec![Term(int)]),
        ],
        None,
        names.clone(),
    )
    .unwrap();
    (Lr1Parser::new(grammar).unwrap(), names)
}

fn tokenize(names: &Interner, input: &str) -> Vec<Lr1Token<i64>> {
    let mut tokens = Vec::new();
    let mut col = 1;
    for c in input.chars() {
        let (term, value): (Sym, i64) = match c {
            '+' => (names.get("PLUS").unwrap(), 0),
            '*' => (names.get("STAR").unwrap(), 0),
            '(' => (names.get("LPAREN").unwrap(), 0),
            ')' => (names.get("RPAREN").unwrap(), 0),
            '0'..='9' => (names.get("INT").unwrap(), (c as u8 - b'0') as i64),
            _ => panic!("bad test input"),
        };
        tokens.push(Lr1Token {
            term,
            lexeme: c.to_string(),
            line: 1,
            col,
            value,
        });
        col += 1;
    }
    tokens
}

fn eval(parser: &Lr1Parser, names: &Interner, input: &str) -> Result<i64, ParseError> {
    parser.parse(tokenize(names, input), |rule, args| {
        let arg = |i: usize| args[i].expect("value present");
        Ok::<i64, std::convert::Infallible>(match rule {
            0 => arg(0) + arg(2), // E -> E + T
            2 => arg(0) * arg(2), // T -> T * F
            4 => arg(1),          // F -> ( E )
            _ => arg(0),
        })
    })
}

#[test]
fn parses_with_precedence() {
    let (parser, names) = expr_parser();
    assert_eq!(eval(&parser, &names, "2+3*4").unwrap(), 14);
    assert_eq!(eval(&parser, &names, "(2+3)*4").unwrap(), 20);
    assert_eq!(eval(&parser, &names, "7").unwrap(), 7);
}

#[test]
fn deterministic_across_runs() {
    let (parser, names) = expr_parser();
    let a = eval(&parser, &names, "1+2*3+4").unwrap();
    let b = eval(&parser, &names, "1+2*3+4").unwrap();
    assert_eq!(a, b);
    assert_eq!(a, 11);
}

#[test]
fn table_miss_reports_token_position() {
    let (parser, names) = expr_parser();
    let err = eval(&parser, &names, "2+*3").unwrap_err();
    match err {
        ParseError::UnexpectedToken { line, col, lexeme } => {
            assert_eq!((line, col), (1, 3));
            assert_eq!(lexeme, "*");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn truncated_input_reports_eof() {
    let (parser, names) = expr_parser();
    let err = eval(&parser, &names, "2+").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof));
}

#[test]
fn action_errors_carry_position() {
    let (parser, names) = expr_parser();
    let result: Result<i64, ParseError> =
        parser.parse(tokenize(&names, "1+2"), |rule, args| {
            if rule == 0 {
                return Err("overflow".to_owned());
            }
            Ok(args[0].unwrap())
        });
    match result.unwrap_err() {
        ParseError::Action { message, .. } => assert_eq!(message, "overflow"),
        ParseError::ActionAtEof { message } => assert_eq!(message, "overflow"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cached_parser_behaves_identically() {
    let (parser, names) = expr_parser();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.tbl");

    // first run writes the cache, second run loads it
    let cached1 = Lr1Parser::with_cache(rebuild_grammar(&names), &path).unwrap();
    assert!(path.exists());
    let cached2 = Lr1Parser::with_cache(rebuild_grammar(&names), &path).unwrap();

    for input in ["2+3*4", "(1+1)*(2+3)"] {
        let expected = eval(&parser, &names, input).unwrap();
        assert_eq!(eval(&cached1, &names, input).unwrap(), expected);
        assert_eq!(eval(&cached2, &names, input).unwrap(), expected);
    }
}

fn rebuild_grammar(names: &Interner) -> Grammar {
    let names = names.clone();
    let e = names.get("E").unwrap();
    let t = names.get("T").unwrap();
    let f = names.get("F").unwrap();
    let plus = names.get("PLUS").unwrap();
    let star = names.get("STAR").unwrap();
    let lparen = names.get("LPAREN").unwrap();
    let rparen = names.get("RPAREN").unwrap();
    let int = names.get("INT").unwrap();

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
