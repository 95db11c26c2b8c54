//! The generic shift/reduce driver.

use std::path::Path;

use crate::grammar::Grammar;
use crate::interner::Sym;
use crate::{GrammarError, ParseError};

use super::table::{Action, AnalysisTable, Column};

/// A token as the driver sees it: the terminal it matches, its lexeme
/// and position for error reporting, and the semantic value shifted
/// onto the stack.
#[derive(Clone, Debug)]
pub struct Lr1Token<V> {
    pub term: Sym,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
    pub value: V,
}

/// An LR(1) parser: grammar plus conflict-free analysis table.
pub struct Lr1Parser {
    grammar: Grammar,
    table: AnalysisTable,
}

impl Lr1Parser {
    /// Build the analysis table and refuse conflicted grammars.
    pub fn new(grammar: Grammar) -> Result<Self, GrammarError> {
        let table = AnalysisTable::build(&grammar);
        Self::check(grammar, table)
    }

    /// Like `new`, but consult a table cache first. A missing, stale or
    /// unreadable cache triggers a rebuild and rewrite; a cache write
    /// failure is logged and otherwise ignored (the cache is only an
    /// optimization).
    pub fn with_cache(grammar: Grammar, path: &Path) -> Result<Self, GrammarError> {
        let table = match AnalysisTable::load(path, &grammar) {
            Some(table) => table,
            None => {
                let table = AnalysisTable::build(&grammar);
                if let Err(error) = table.save(path, &grammar) {
                    tracing::warn!(%error, path = %path.display(), "could not write LR(1) table cache");
                }
                table
            }
        };
        Self::check(grammar, table)
    }

    fn check(grammar: Grammar, table: AnalysisTable) -> Result<Self, GrammarError> {
        let conflicts = table.conflicts();
        if !conflicts.is_empty() {
            let details = table.describe_conflicts(&grammar);
            return Err(GrammarError::Conflicts(conflicts.len(), details));
        }
        Ok(Self { grammar, table })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn table(&self) -> &AnalysisTable {
        &self.table
    }

    /// Run the driver. `reduce` is invoked once per reduction with the
    /// rule id and the popped values in source order; its result is the
    /// semantic value of the left-hand side. Errors from `reduce` abort
    /// the parse annotated with the current token position.
    pub fn parse<V, E: std::fmt::Display>(
        &self,
        tokens: Vec<Lr1Token<V>>,
        mut reduce: impl FnMut(usize, Vec<Option<V>>) -> Result<V, E>,
    ) -> Result<V, ParseError> {
        let positions: Vec<(u32, u32, String)> = tokens
            .iter()
            .map(|t| (t.line, t.col, t.lexeme.clone()))
            .collect();
        let mut input: Vec<Option<Lr1Token<V>>> = tokens.into_iter().map(Some).collect();

        let mut states: Vec<usize> = vec![0];
        let mut values: Vec<Option<V>> = Vec::new();
        let mut pos = 0;

        loop {
            let state = *states.last().expect("state stack never empties");
            let column = match input.get(pos) {
                Some(tok) => Column::Term(tok.as_ref().expect("token taken twice").term),
                None => Column::End,
            };

            let Some(action) = self.table.single(state, column) else {
                return Err(self.miss_error(&positions, pos));
            };

            match action {
                Action::Shift(next) => {
                    let token = input[pos].take().expect("token taken twice");
                    values.push(Some(token.value));
                    states.push(next);
                    pos += 1;
                }
                Action::Reduce(rule_id) => {
                    let rule = self.grammar.rule(rule_id);
                    let arity = rule.rhs.len();
                    if values.len() < arity || states.len() < arity + 1 {
                        return Err(ParseError::Internal(format!(
                            "stack underflow reducing rule {rule_id}"
                        )));
                    }
                    let args: Vec<Option<V>> = values.split_off(values.len() - arity);
                    states.truncate(states.len() - arity);

                    let value = reduce(rule_id, args)
                        .map_err(|e| self.action_error(&positions, pos, e))?;

                    let state = *states.last().expect("state stack never empties");
                    match self.table.single(state, Column::NonTerm(rule.lhs)) {
                        Some(Action::Shift(next)) => {
                            values.push(Some(value));
                            states.push(next);
                        }
                        _ => {
                            return Err(ParseError::Internal(format!(
                                "missing GOTO for `{}` in state {state}",
                                self.grammar.name(rule.lhs)
                            )));
                        }
                    }
                }
                Action::Accept => {
                    let Some(Some(value)) = values.pop() else {
                        return Err(ParseError::Internal(
                            "accept with an empty value stack".to_owned(),
                        ));
                    };
                    return Ok(value);
                }
            }
        }
    }

    fn miss_error(&self, positions: &[(u32, u32, String)], pos: usize) -> ParseError {
        match positions.get(pos) {
            Some((line, col, lexeme)) => ParseError::UnexpectedToken {
                line: *line,
                col: *col,
                lexeme: lexeme.clone(),
            },
            None => ParseError::UnexpectedEof,
        }
    }

    fn action_error<E: std::fmt::Display>(
        &self,
        positions: &[(u32, u32, String)],
        pos: usize,
        error: E,
    ) -> ParseError {
        match positions.get(pos) {
            Some((line, col, lexeme)) => ParseError::Action {
                line: *line,
                col: *col,
                lexeme: lexeme.clone(),
                message: error.to_string(),
            },
            None => ParseError::ActionAtEof {
                message: error.to_string(),
            },
        }
    }
}
