use crate::LexError;
use crate::interner::Interner;
use crate::lexer::Lexer;

fn lexer(interner: &mut Interner) -> Lexer {
    let mut lexer = Lexer::new();
    lexer.add_rule(interner.intern("WS"), "( |\t|\n|\r)+").unwrap();
    lexer.add_rule(interner.intern("KW_IF"), "if").unwrap();
    lexer.add_rule(interner.intern("INT"), "[0-9]+").unwrap();
    lexer
        .add_rule(interner.intern("ID"), "[_A-Za-z][_A-Za-z0-9]*")
        .unwrap();
    lexer.add_rule(interner.intern("PLUS"), r"\+").unwrap();
    lexer
}

#[test]
fn tokenizes_with_longest_match() {
    let mut interner = Interner::new();
    let lexer = lexer(&mut interner);
    let tokens = lexer.tokenize("iffy+12").unwrap();
    let kinds: Vec<&str> = tokens.iter().map(|t| interner.resolve(t.kind)).collect();
    // "iffy" is longer than the keyword prefix "if"
    assert_eq!(kinds, ["ID", "PLUS", "INT"]);
    assert_eq!(tokens[0].text, "iffy");
    assert_eq!(tokens[2].text, "12");
}

#[test]
fn earlier_rule_wins_ties() {
    let mut interner = Interner::new();
    let lexer = lexer(&mut interner);
    let tokens = lexer.tokenize("if").unwrap();
    assert_eq!(interner.resolve(tokens[0].kind), "KW_IF");
}

#[test]
fn tracks_lines_and_columns() {
    let mut interner = Interner::new();
    let lexer = lexer(&mut interner);
    let tokens = lexer.tokenize("a\nbb 12").unwrap();
    // a WS bb WS 12
    assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    assert_eq!((tokens[2].line, tokens[2].col), (2, 1));
    assert_eq!(tokens[2].text, "bb");
    assert_eq!((tokens[4].line, tokens[4].col), (2, 4));
    assert_eq!(tokens[4].offset, 5);
}

#[test]
fn reports_invalid_token_position() {
    let mut interner = Interner::new();
    let lexer = lexer(&mut interner);
    let err = lexer.tokenize("ab\n  ?").unwrap_err();
    match err {
        LexError::InvalidToken { line, col } => {
            assert_eq!((line, col), (2, 3));
        }
        other => panic!("unexpected error: {other}"),
    }
}
