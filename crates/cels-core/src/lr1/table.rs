//! LR(1) analysis table: construction, conflict detection, persistence.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};

use crate::grammar::{Component, Grammar, Lookahead};
use crate::interner::Sym;

use super::collection::CanonicalCollection;

/// A table column: a terminal, a non-terminal, or end-of-input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Column {
    Term(Sym),
    NonTerm(Sym),
    End,
}

/// A table cell entry. `Shift` doubles as GOTO on non-terminal columns.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shift(n) => write!(f, "s{n}"),
            Action::Reduce(n) => write!(f, "r{n}"),
            Action::Accept => write!(f, "a"),
        }
    }
}

/// A conflicted cell, with the rules of the state it belongs to.
#[derive(Clone, Debug)]
pub struct Conflict {
    pub state: usize,
    pub column: Column,
    pub actions: Vec<Action>,
    pub rules: Vec<usize>,
}

/// The action/GOTO table. Cells may hold several entries until conflict
/// detection rejects the grammar.
pub struct AnalysisTable {
    cells: IndexMap<(usize, Column), IndexSet<Action>>,
    /// rule ids appearing in each state's kernel, for conflict reports
    state_rules: Vec<Vec<usize>>,
}

impl AnalysisTable {
    /// Build the table from the canonical collection.
    pub fn build(grammar: &Grammar) -> Self {
        let cc = CanonicalCollection::build(grammar);
        let mut table = Self {
            cells: IndexMap::new(),
            state_rules: cc
                .states
                .iter()
                .map(|s| {
                    s.kernel
                        .iter()
                        .map(|item| item.rule)
                        .collect::<IndexSet<_>>()
                        .into_iter()
                        .collect()
                })
                .collect(),
        };

        for (&(state, comp), &target) in &cc.transitions {
            let column = match comp {
                Component::Term(t) => Column::Term(t),
                Component::NonTerm(n) => Column::NonTerm(n),
            };
            table.add(state, column, Action::Shift(target));
        }

        for (state_id, state) in cc.states.iter().enumerate() {
            for item in &state.closure {
                let rule = grammar.rule(item.rule);
                if item.dot != rule.rhs.len() {
                    continue;
                }
                match item.lookahead {
                    Lookahead::End if rule.lhs == grammar.start() => {
                        table.add(state_id, Column::End, Action::Accept);
                    }
                    Lookahead::End => {
                        table.add(state_id, Column::End, Action::Reduce(item.rule));
                    }
                    Lookahead::Term(t) => {
                        table.add(state_id, Column::Term(t), Action::Reduce(item.rule));
                    }
                    Lookahead::Empty => {}
                }
            }
        }

        tracing::debug!(cells = table.cells.len(), "LR(1) analysis table built");
        table
    }

    fn add(&mut self, state: usize, column: Column, action: Action) {
        self.cells.entry((state, column)).or_default().insert(action);
    }

    /// Entries of a cell; empty when the cell is blank.
    pub fn get(&self, state: usize, column: Column) -> Vec<Action> {
        self.cells
            .get(&(state, column))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The unique entry of a cell, if the cell has exactly one.
    pub fn single(&self, state: usize, column: Column) -> Option<Action> {
        let set = self.cells.get(&(state, column))?;
        (set.len() == 1).then(|| *set.iter().next().unwrap())
    }

    /// Every cell holding more than one entry.
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.cells
            .iter()
            .filter(|(_, actions)| actions.len() > 1)
            .map(|(&(state, column), actions)| Conflict {
                state,
                column,
                actions: actions.iter().copied().collect(),
                rules: self.state_rules.get(state).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Render conflicts for a `GrammarError`.
    pub fn describe_conflicts(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        for conflict in self.conflicts() {
            let column = match conflict.column {
                Column::Term(t) => grammar.name(t).to_owned(),
                Column::NonTerm(n) => grammar.name(n).to_owned(),
                Column::End => "$".to_owned(),
            };
            let actions: Vec<String> =
                conflict.actions.iter().map(|a| a.to_string()).collect();
            out.push_str(&format!(
                "state {} on `{}`: {}\n",
                conflict.state,
                column,
                actions.join("/")
            ));
            for rule in conflict.rules {
                out.push_str(&format!("  {}\n", grammar.display_rule(rule)));
            }
        }
        out
    }

    /// Write the table to `path` keyed by the grammar checksum. The file
    /// is written to a temporary sibling and renamed into place so an
    /// interrupt cannot poison the cache.
    pub fn save(&self, path: &Path, grammar: &Grammar) -> std::io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = tempfile::NamedTempFile::new_in(dir)?;

        writeln!(file, "{}", grammar.checksum())?;
        for (&(state, column), actions) in &self.cells {
            let (kind, payload) = match column {
                Column::Term(t) => ("t", grammar.name(t)),
                Column::NonTerm(n) => ("n", grammar.name(n)),
                Column::End => ("e", "$"),
            };
            write!(file, "{state} {kind} {payload}")?;
            for action in actions {
                write!(file, " {action}")?;
            }
            writeln!(file)?;
        }
        file.flush()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Load a table previously written by `save`. Returns `None` when
    /// the file is missing, malformed, or carries a stale checksum — the
    /// caller then rebuilds and rewrites.
    pub fn load(path: &Path, grammar: &Grammar) -> Option<Self> {
        let file = std::fs::File::open(path).ok()?;
        let mut lines = BufReader::new(file).lines();

        let checksum = lines.next()?.ok()?;
        if checksum != grammar.checksum() {
            tracing::debug!("stale LR(1) table checksum, rebuilding");
            return None;
        }

        let mut table = Self {
            cells: IndexMap::new(),
            state_rules: Vec::new(),
        };
        for line in lines {
            let line = line.ok()?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let state: usize = parts.next()?.parse().ok()?;
            let kind = parts.next()?;
            let payload = parts.next()?;
            let column = match kind {
                "t" => Column::Term(grammar.names().get(payload)?),
                "n" => Column::NonTerm(grammar.names().get(payload)?),
                "e" => Column::End,
                _ => return None,
            };
            for action in parts {
                let action = if action == "a" {
                    Action::Accept
                } else if let Some(n) = action.strip_prefix('r') {
                    Action::Reduce(n.parse().ok()?)
                } else if let Some(n) = action.strip_prefix('s') {
                    Action::Shift(n.parse().ok()?)
                } else {
                    return None;
                };
                table.add(state, column, action);
            }
        }
        tracing::debug!(cells = table.cells.len(), "LR(1) table loaded from cache");
        Some(table)
    }
}
