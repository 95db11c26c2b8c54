//! Regular expressions compiled to finite automata.
//!
//! A small stack-based parser with two modes: expression context and
//! character-class context. Supported syntax: literals, `\` escapes,
//! `|`, implicit concatenation, `*`, `+`, `(...)`, `[...]`, `[^...]` and
//! ranges `a-z` inside classes.
//!
//! `|` combines single atoms, so alternations of multi-character words
//! are written with groups: `(true)|(false)`.

use crate::RegexError;
use crate::automaton::FiniteAutomaton;
use crate::charset::Charset;

/// A compiled regular expression: the pattern and its DFA.
#[derive(Clone, Debug)]
pub struct Regex {
    pattern: String,
    dfa: FiniteAutomaton,
}

impl Regex {
    /// Compile `pattern` into a deterministic automaton.
    pub fn compile(pattern: &str) -> Result<Self, RegexError> {
        let nfa = parse(pattern)?;
        Ok(Self {
            pattern: pattern.to_owned(),
            dfa: nfa.determinize(),
        })
    }

    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[inline]
    pub fn dfa(&self) -> &FiniteAutomaton {
        &self.dfa
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.dfa.accepts(input)
    }

    /// Byte length of the longest accepted prefix of `text[start..]`.
    pub fn longest_match(&self, text: &str, start: usize) -> Option<usize> {
        self.dfa.longest_match(text, start)
    }
}

enum Item {
    Fa(FiniteAutomaton),
    Or,
    LParen,
    LBracket,
    Escape,
    RangeOp,
    Negate,
    Lit(char),
    Set(Charset),
}

/// Parse a pattern into an NFA.
pub fn parse(pattern: &str) -> Result<FiniteAutomaton, RegexError> {
    let mut stack: Vec<Item> = Vec::new();
    let mut in_class = false;

    for c in pattern.chars() {
        if in_class {
            in_class = push_in_class(&mut stack, c)?;
        } else {
            push_in_expr(&mut stack, c, &mut in_class)?;
        }
    }
    if in_class {
        return Err(RegexError::UnterminatedClass);
    }

    // whatever remains is an implicit concatenation
    let mut result = FiniteAutomaton::empty();
    for item in stack {
        match item {
            Item::Fa(fa) => result = result.concat(&fa),
            Item::Or => return Err(RegexError::MissingAlternand),
            Item::LParen => return Err(RegexError::UnterminatedGroup),
            Item::Escape => return Err(RegexError::TrailingEscape),
            _ => return Err(RegexError::InvalidRange),
        }
    }
    Ok(result)
}

fn push_in_expr(stack: &mut Vec<Item>, c: char, in_class: &mut bool) -> Result<(), RegexError> {
    if matches!(stack.last(), Some(Item::Escape)) {
        stack.pop();
        push_fa(stack, FiniteAutomaton::for_charset(Charset::single(c)))?;
        return Ok(());
    }
    match c {
        '\\' => stack.push(Item::Escape),
        '[' => {
            stack.push(Item::LBracket);
            *in_class = true;
        }
        '*' | '+' => {
            let Some(Item::Fa(fa)) = stack.pop() else {
                return Err(RegexError::DanglingRepeat(c));
            };
            let repeated = if c == '*' { fa.star() } else { fa.plus() };
            push_fa(stack, repeated)?;
        }
        '|' => stack.push(Item::Or),
        '(' => stack.push(Item::LParen),
        ')' => {
            let mut group = Vec::new();
            loop {
                match stack.pop() {
                    Some(Item::LParen) => break,
                    Some(item) => group.push(item),
                    None => return Err(RegexError::UnterminatedGroup),
                }
            }
            let mut fa = FiniteAutomaton::empty();
            for item in group.into_iter().rev() {
                match item {
                    Item::Fa(inner) => fa = fa.concat(&inner),
                    Item::Or => return Err(RegexError::MissingAlternand),
                    Item::Escape => return Err(RegexError::TrailingEscape),
                    _ => return Err(RegexError::UnterminatedGroup),
                }
            }
            push_fa(stack, fa)?;
        }
        _ => push_fa(stack, FiniteAutomaton::for_charset(Charset::single(c)))?,
    }
    Ok(())
}

/// Push an automaton, combining with a pending `|` if one is on top.
fn push_fa(stack: &mut Vec<Item>, fa: FiniteAutomaton) -> Result<(), RegexError> {
    if matches!(stack.last(), Some(Item::Or)) {
        stack.pop();
        let Some(Item::Fa(left)) = stack.pop() else {
            return Err(RegexError::MissingAlternand);
        };
        stack.push(Item::Fa(left.union(&fa)));
    } else {
        stack.push(Item::Fa(fa));
    }
    Ok(())
}

/// Returns whether the parser is still inside the class after `c`.
fn push_in_class(stack: &mut Vec<Item>, c: char) -> Result<bool, RegexError> {
    if matches!(stack.last(), Some(Item::Escape)) {
        stack.pop();
        push_class_literal(stack, c)?;
        return Ok(true);
    }
    match c {
        '\\' => stack.push(Item::Escape),
        '-' => {
            if matches!(stack.last(), Some(Item::RangeOp)) {
                return Err(RegexError::InvalidRange);
            }
            stack.push(Item::RangeOp);
        }
        '^' if matches!(stack.last(), Some(Item::LBracket)) => stack.push(Item::Negate),
        ']' => {
            let mut charset = Charset::empty();
            let mut negate = false;
            loop {
                match stack.pop() {
                    Some(Item::LBracket) => break,
                    Some(Item::Set(cs)) => charset = charset.union(&cs),
                    Some(Item::Lit(l)) => charset = charset.union(&Charset::single(l)),
                    Some(Item::Negate) => negate = true,
                    Some(Item::RangeOp) => charset = charset.union(&Charset::single('-')),
                    Some(_) | None => return Err(RegexError::UnterminatedClass),
                }
            }
            if negate {
                charset = charset.complement();
            }
            push_fa(stack, FiniteAutomaton::for_charset(charset))?;
            return Ok(false);
        }
        _ => push_class_literal(stack, c)?,
    }
    Ok(true)
}

fn push_class_literal(stack: &mut Vec<Item>, c: char) -> Result<(), RegexError> {
    if matches!(stack.last(), Some(Item::RangeOp)) {
        stack.pop();
        let Some(Item::Lit(lo)) = stack.pop() else {
            return Err(RegexError::InvalidRange);
        };
        stack.push(Item::Set(Charset::range(lo, c)));
    } else {
        stack.push(Item::Lit(c));
    }
    Ok(())
}
