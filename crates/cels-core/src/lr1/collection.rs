//! The canonical collection of LR(1) item sets.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::grammar::{Component, Grammar, Lookahead};

use super::Item;

/// One state: its kernel and the kernel's closure.
pub(crate) struct State {
    pub kernel: BTreeSet<Item>,
    pub closure: BTreeSet<Item>,
}

/// States plus GOTO transitions over grammar components.
pub(crate) struct CanonicalCollection {
    pub states: Vec<State>,
    pub transitions: IndexMap<(usize, Component), usize>,
}

impl CanonicalCollection {
    pub fn build(grammar: &Grammar) -> Self {
        let kernel: BTreeSet<Item> = grammar
            .derivations_of(grammar.start())
            .iter()
            .map(|&rule| Item {
                rule,
                dot: 0,
                lookahead: Lookahead::End,
            })
            .collect();

        let mut states = vec![State {
            closure: closure(grammar, &kernel),
            kernel: kernel.clone(),
        }];
        let mut index: HashMap<BTreeSet<Item>, usize> = HashMap::from([(kernel, 0)]);
        let mut transitions = IndexMap::new();

        let mut next = 0;
        while next < states.len() {
            // group closure items by the component after the dot
            let mut by_component: IndexMap<Component, BTreeSet<Item>> = IndexMap::new();
            for item in &states[next].closure {
                let rule = grammar.rule(item.rule);
                if let Some(&comp) = rule.rhs.get(item.dot) {
                    by_component.entry(comp).or_default().insert(Item {
                        rule: item.rule,
                        dot: item.dot + 1,
                        lookahead: item.lookahead,
                    });
                }
            }

            for (comp, kernel) in by_component {
                let target = match index.get(&kernel) {
                    Some(&existing) => existing,
                    None => {
                        let id = states.len();
                        states.push(State {
                            closure: closure(grammar, &kernel),
                            kernel: kernel.clone(),
                        });
                        index.insert(kernel, id);
                        id
                    }
                };
                transitions.insert((next, comp), target);
            }
            next += 1;
        }

        tracing::debug!(states = states.len(), "canonical LR(1) collection built");
        Self {
            states,
            transitions,
        }
    }
}

/// LR(1) closure: for `[A -> α•Bβ, a]` add `[B -> •γ, b]` for every rule
/// `B -> γ` and every `b ∈ FIRST(βa)`.
fn closure(grammar: &Grammar, kernel: &BTreeSet<Item>) -> BTreeSet<Item> {
    let mut items = kernel.clone();
    let mut queue: Vec<Item> = items.iter().copied().collect();

    while let Some(item) = queue.pop() {
        let rule = grammar.rule(item.rule);
        let Some(Component::NonTerm(b)) = rule.rhs.get(item.dot).copied() else {
            continue;
        };
        let mut lookaheads = grammar.first_of_sequence(&rule.rhs[item.dot + 1..]);
        if lookaheads.contains(&Lookahead::Empty) {
            lookaheads.insert(item.lookahead);
        }

        for &derived in grammar.derivations_of(b) {
            for &la in &lookaheads {
                if la == Lookahead::Empty {
                    continue;
                }
                let new_item = Item {
                    rule: derived,
                    dot: 0,
                    lookahead: la,
                };
                if items.insert(new_item) {
                    queue.push(new_item);
                }
            }
        }
    }
    items
}
