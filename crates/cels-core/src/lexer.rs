//! Longest-match, first-rule-wins tokenizer.
//!
//! Rules are an ordered list of `(kind, regex)`. At every offset each
//! rule's DFA is asked for its longest accepted prefix; the longest wins,
//! earlier rules winning ties. Whitespace/comment filtering and any
//! adjacency constraints between token categories belong to the caller,
//! which knows the token taxonomy.

use crate::LexError;
use crate::interner::Sym;
use crate::regex::Regex;
use crate::RegexError;

/// A token: kind handle, lexeme, byte offset and 1-based position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: Sym,
    pub text: String,
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

struct LexRule {
    kind: Sym,
    regex: Regex,
}

/// Rule-based tokenizer.
#[derive(Default)]
pub struct Lexer {
    rules: Vec<LexRule>,
}

impl Lexer {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Order matters: earlier rules win length ties.
    pub fn add_rule(&mut self, kind: Sym, pattern: &str) -> Result<(), RegexError> {
        let regex = Regex::compile(pattern)?;
        self.rules.push(LexRule { kind, regex });
        Ok(())
    }

    /// Tokenize the whole input.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        let mut line: u32 = 1;
        let mut col: u32 = 1;

        while offset < text.len() {
            let mut best_len = 0;
            let mut best_kind = None;
            for rule in &self.rules {
                if let Some(len) = rule.regex.longest_match(text, offset) {
                    if len > best_len {
                        best_len = len;
                        best_kind = Some(rule.kind);
                    }
                }
            }

            let Some(kind) = best_kind.filter(|_| best_len > 0) else {
                return Err(LexError::InvalidToken { line, col });
            };

            let lexeme = &text[offset..offset + best_len];
            tokens.push(Token {
                kind,
                text: lexeme.to_owned(),
                offset,
                line,
                col,
            });

            for c in lexeme.chars() {
                if c == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
            }
            offset += best_len;
        }
        Ok(tokens)
    }
}
