//! Generic engine underneath the Celesta compiler.
//!
//! Nothing in this crate knows the surface language. It provides:
//! - `charset` - code-point sets as sorted disjoint ranges
//! - `automaton` - NFA/DFA over charset-labelled edges
//! - `regex` - regex strings compiled to automata
//! - `lexer` - longest-match rule-based tokenizer
//! - `grammar` - rules, FIRST₁/FOLLOW₁
//! - `lr1` - canonical LR(1) collection, analysis table, driver
//! - `interner` - cheap symbol handles for grammar/token names

pub mod automaton;
pub mod charset;
pub mod grammar;
pub mod interner;
pub mod lexer;
pub mod lr1;
pub mod regex;

#[cfg(test)]
mod charset_tests;
#[cfg(test)]
mod grammar_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod regex_tests;

pub use charset::Charset;
pub use automaton::FiniteAutomaton;
pub use grammar::{Component, Grammar, Lookahead, Rule};
pub use interner::{Interner, Sym};
pub use lexer::{Lexer, Token};
pub use lr1::{AnalysisTable, Lr1Parser, Lr1Token};

/// Errors produced while compiling a regular expression.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegexError {
    #[error("unterminated character class")]
    UnterminatedClass,

    #[error("unterminated group")]
    UnterminatedGroup,

    #[error("dangling `{0}`: no expression to repeat")]
    DanglingRepeat(char),

    #[error("`|` is missing an operand")]
    MissingAlternand,

    #[error("invalid range in character class")]
    InvalidRange,

    #[error("trailing escape at end of pattern")]
    TrailingEscape,
}

/// Errors produced while tokenizing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexError {
    #[error("invalid token at {line}:{col}")]
    InvalidToken { line: u32, col: u32 },

    #[error("{message} (at {line}:{col})")]
    Adjacency { message: String, line: u32, col: u32 },
}

/// Errors produced while validating a grammar or building its table.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    #[error("grammar must contain at least one rule")]
    Empty,

    #[error("start symbol `{0}` is not defined by any rule")]
    UndefinedStart(String),

    #[error("no rules define non-terminal symbols: {0}")]
    UndefinedNonTerminals(String),

    #[error("LR(1) conflicts in {0} table cells:\n{1}")]
    Conflicts(usize, String),
}

/// Errors produced by the shift/reduce driver.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("parse failed at {line}:{col}: unexpected token `{lexeme}`")]
    UnexpectedToken { line: u32, col: u32, lexeme: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("parse failed at {line}:{col} (near `{lexeme}`): {message}")]
    Action {
        line: u32,
        col: u32,
        lexeme: String,
        message: String,
    },

    #[error("parse failed at end of input: {message}")]
    ActionAtEof { message: String },

    #[error("internal parser error: {0}")]
    Internal(String),
}
