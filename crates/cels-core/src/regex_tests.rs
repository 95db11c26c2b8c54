use crate::RegexError;
use crate::regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::compile(pattern).expect("pattern should compile")
}

#[test]
fn literal_sequence() {
    let r = re("begin");
    assert!(r.is_match("begin"));
    assert!(!r.is_match("begi"));
    assert!(!r.is_match("beginn"));
}

#[test]
fn alternation_of_groups() {
    let r = re("(true)|(false)");
    assert!(r.is_match("true"));
    assert!(r.is_match("false"));
    assert!(!r.is_match("truefalse"));
}

#[test]
fn class_with_ranges() {
    let r = re("[_A-Za-z][_A-Za-z0-9]*");
    assert!(r.is_match("x"));
    assert!(r.is_match("_foo42"));
    assert!(r.is_match("CamelCase"));
    assert!(!r.is_match("42x"));
    assert!(!r.is_match(""));
}

#[test]
fn negated_class() {
    let r = re("[^abc]");
    assert!(r.is_match("d"));
    assert!(r.is_match("0"));
    assert!(!r.is_match("a"));
}

#[test]
fn escapes_strip_specialness() {
    let r = re(r"\*\+");
    assert!(r.is_match("*+"));
    assert!(!r.is_match("ab"));

    let arrow = re(r"\->");
    assert!(arrow.is_match("->"));
}

#[test]
fn repetition_operators() {
    let r = re("[0-9]+");
    assert!(r.is_match("7"));
    assert!(r.is_match("123456"));
    assert!(!r.is_match(""));

    let dec = re(r"[0-9]+\.[0-9]*");
    assert!(dec.is_match("1."));
    assert!(dec.is_match("3.14"));
    assert!(!dec.is_match(".5"));
    assert!(!dec.is_match("14"));
}

#[test]
fn whitespace_pattern() {
    let r = re("( |\t|\n|\r)+");
    assert!(r.is_match(" \t\n"));
    assert!(r.is_match(" "));
    assert!(!r.is_match(""));
    assert!(!r.is_match("x"));
}

#[test]
fn string_literal_pattern() {
    let r = re(r#""([^\\"]|(\\"))*""#);
    assert!(r.is_match(r#""""#));
    assert!(r.is_match(r#""hello""#));
    assert!(r.is_match(r#""say \"hi\"""#));
    assert!(!r.is_match(r#""unterminated"#));
}

#[test]
fn block_comment_pattern() {
    let r = re(r"/\*(([^*])|(\*[^/]))*\*/");
    assert!(r.is_match("/**/"));
    assert!(r.is_match("/* a comment */"));
    assert!(r.is_match("/* spans\nlines */"));
    assert!(!r.is_match("/* unterminated"));
}

#[test]
fn longest_match_on_prefix() {
    let ident = re("[_A-Za-z][_A-Za-z0-9]*");
    assert_eq!(ident.longest_match("foo+bar", 0), Some(3));
    assert_eq!(ident.longest_match("foo+bar", 4), Some(3));
    assert_eq!(ident.longest_match("+foo", 0), None);
}

#[test]
fn error_cases() {
    assert!(matches!(
        Regex::compile("[abc"),
        Err(RegexError::UnterminatedClass)
    ));
    assert!(matches!(
        Regex::compile("(ab"),
        Err(RegexError::UnterminatedGroup)
    ));
    assert!(matches!(
        Regex::compile("*a"),
        Err(RegexError::DanglingRepeat('*'))
    ));
    assert!(matches!(Regex::compile("a|"), Err(RegexError::MissingAlternand)));
    assert!(matches!(Regex::compile("ab\\"), Err(RegexError::TrailingEscape)));
}
