//! Context-free grammars with FIRST₁/FOLLOW₁ analysis.
//!
//! Rules are `lhs -> rhs` over interned symbol handles; an ε-rule has an
//! empty right-hand side. Rule ids are assigned in declaration order and
//! are stable: they key the semantic actions and the persisted LR(1)
//! table.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::GrammarError;
use crate::interner::{Interner, Sym};

/// One slot of a rule's right-hand side.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Component {
    Term(Sym),
    NonTerm(Sym),
}

/// A production `lhs -> rhs` with its declaration-order id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    pub lhs: Sym,
    pub rhs: Vec<Component>,
    pub id: usize,
}

/// A one-token prediction: a terminal, end-of-input, or ε.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Lookahead {
    Term(Sym),
    End,
    Empty,
}

/// A validated grammar with FIRST₁ and FOLLOW₁ tables.
pub struct Grammar {
    rules: Vec<Rule>,
    start: Sym,
    terminals: IndexSet<Sym>,
    non_terminals: IndexSet<Sym>,
    derivations: HashMap<Sym, Vec<usize>>,
    first1: HashMap<Sym, IndexSet<Lookahead>>,
    follow1: HashMap<Sym, IndexSet<Lookahead>>,
    checksum: String,
    names: Interner,
}

impl Grammar {
    /// Build and validate a grammar. The start symbol is the lhs of the
    /// first rule unless given explicitly. `names` must be the interner
    /// the rule symbols were created with.
    pub fn new(
        rule_defs: Vec<(Sym, Vec<Component>)>,
        start: Option<Sym>,
        names: Interner,
    ) -> Result<Self, GrammarError> {
        if rule_defs.is_empty() {
            return Err(GrammarError::Empty);
        }
        let rules: Vec<Rule> = rule_defs
            .into_iter()
            .enumerate()
            .map(|(id, (lhs, rhs))| Rule { lhs, rhs, id })
            .collect();

        let start = start.unwrap_or(rules[0].lhs);
        if !rules.iter().any(|r| r.lhs == start) {
            return Err(GrammarError::UndefinedStart(
                names.resolve(start).to_owned(),
            ));
        }

        let non_terminals: IndexSet<Sym> = rules.iter().map(|r| r.lhs).collect();
        let terminals: IndexSet<Sym> = rules
            .iter()
            .flat_map(|r| r.rhs.iter())
            .filter_map(|c| match c {
                Component::Term(t) => Some(*t),
                Component::NonTerm(_) => None,
            })
            .collect();

        let undefined: Vec<&str> = rules
            .iter()
            .flat_map(|r| r.rhs.iter())
            .filter_map(|c| match c {
                Component::NonTerm(n) if !non_terminals.contains(n) => {
                    Some(names.resolve(*n))
                }
                _ => None,
            })
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        if !undefined.is_empty() {
            return Err(GrammarError::UndefinedNonTerminals(undefined.join(", ")));
        }

        let mut derivations: HashMap<Sym, Vec<usize>> = HashMap::new();
        for rule in &rules {
            derivations.entry(rule.lhs).or_default().push(rule.id);
        }

        let checksum = compute_checksum(&rules, &names);

        let mut grammar = Self {
            rules,
            start,
            terminals,
            non_terminals,
            derivations,
            first1: HashMap::new(),
            follow1: HashMap::new(),
            checksum,
            names,
        };
        grammar.build_first1();
        grammar.build_follow1();
        Ok(grammar)
    }

    #[inline]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[inline]
    pub fn rule(&self, id: usize) -> &Rule {
        &self.rules[id]
    }

    #[inline]
    pub fn start(&self) -> Sym {
        self.start
    }

    #[inline]
    pub fn terminals(&self) -> &IndexSet<Sym> {
        &self.terminals
    }

    #[inline]
    pub fn non_terminals(&self) -> &IndexSet<Sym> {
        &self.non_terminals
    }

    /// Rule ids with the given left-hand side.
    pub fn derivations_of(&self, n: Sym) -> &[usize] {
        self.derivations.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first1(&self, n: Sym) -> &IndexSet<Lookahead> {
        &self.first1[&n]
    }

    pub fn follow1(&self, n: Sym) -> &IndexSet<Lookahead> {
        &self.follow1[&n]
    }

    /// Grammar fingerprint used to key the persisted LR(1) table:
    /// rule count plus a CRC-32 over every rule shape.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn name(&self, sym: Sym) -> &str {
        self.names.resolve(sym)
    }

    pub fn names(&self) -> &Interner {
        &self.names
    }

    pub fn component_name(&self, c: Component) -> &str {
        match c {
            Component::Term(t) => self.names.resolve(t),
            Component::NonTerm(n) => self.names.resolve(n),
        }
    }

    pub fn display_rule(&self, id: usize) -> String {
        let rule = &self.rules[id];
        let rhs: Vec<&str> = rule.rhs.iter().map(|c| self.component_name(*c)).collect();
        format!(
            "{} <- {}",
            self.names.resolve(rule.lhs),
            if rhs.is_empty() {
                "ε".to_owned()
            } else {
                rhs.join(" ")
            }
        )
    }

    /// FIRST₁ of a component sequence. Contains `Empty` only when every
    /// prefix is nullable.
    pub fn first_of_sequence(&self, components: &[Component]) -> IndexSet<Lookahead> {
        let mut out = IndexSet::new();
        for comp in components {
            match comp {
                Component::Term(t) => {
                    out.insert(Lookahead::Term(*t));
                    return out;
                }
                Component::NonTerm(n) => {
                    let first = &self.first1[n];
                    out.extend(first.iter().copied().filter(|p| *p != Lookahead::Empty));
                    if !first.contains(&Lookahead::Empty) {
                        return out;
                    }
                }
            }
        }
        out.insert(Lookahead::Empty);
        out
    }

    fn build_first1(&mut self) {
        for n in &self.non_terminals {
            self.first1.insert(*n, IndexSet::new());
        }
        let mut changed = true;
        while changed {
            changed = false;
            for rule in &self.rules {
                let firsts = self.first_of_sequence(&rule.rhs);
                let entry = self.first1.get_mut(&rule.lhs).unwrap();
                for p in firsts {
                    changed |= entry.insert(p);
                }
            }
        }
    }

    fn build_follow1(&mut self) {
        for n in &self.non_terminals {
            self.follow1.insert(*n, IndexSet::new());
        }
        self.follow1
            .get_mut(&self.start)
            .unwrap()
            .insert(Lookahead::End);

        let mut changed = true;
        while changed {
            changed = false;
            for rule in &self.rules {
                for (i, comp) in rule.rhs.iter().enumerate() {
                    let Component::NonTerm(b) = comp else { continue };
                    let beta = &rule.rhs[i + 1..];
                    let first_beta = self.first_of_sequence(beta);
                    let mut additions: Vec<Lookahead> = first_beta
                        .iter()
                        .copied()
                        .filter(|p| *p != Lookahead::Empty)
                        .collect();
                    if first_beta.contains(&Lookahead::Empty) {
                        additions.extend(self.follow1[&rule.lhs].iter().copied());
                    }
                    let entry = self.follow1.get_mut(b).unwrap();
                    for p in additions {
                        changed |= entry.insert(p);
                    }
                }
            }
        }
    }
}

fn compute_checksum(rules: &[Rule], names: &Interner) -> String {
    let mut hasher = crc32fast::Hasher::new();
    for rule in rules {
        hasher.update(names.resolve(rule.lhs).as_bytes());
        hasher.update(b"<-");
        for comp in &rule.rhs {
            let (tag, sym) = match comp {
                Component::Term(t) => ("t:", t),
                Component::NonTerm(n) => ("n:", n),
            };
            hasher.update(tag.as_bytes());
            hasher.update(names.resolve(*sym).as_bytes());
            hasher.update(b" ");
        }
        hasher.update(b";");
    }
    format!("{}:{:08x}", rules.len(), hasher.finalize())
}
