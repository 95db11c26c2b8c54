//! Finite automata over charset-labelled edges.
//!
//! Transitions are labelled with whole `Charset`s rather than single
//! characters, so an automaton over Unicode stays small. The constructor
//! re-partitions edge labels so that every pair of labels in the automaton
//! is disjoint; determinisation then reasons per symbol class instead of
//! per code point.
//!
//! Combinators (`concat`, `union`, `star`, ...) return NFAs; callers
//! determinise when they need to run the automaton. Every constructor
//! maintains the invariant that the initial state has no incoming
//! transitions, which is what makes the epsilon-free combinators sound.

use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeSet, VecDeque};

use crate::charset::Charset;

pub type StateId = u32;

type TransitionMap = IndexMap<(StateId, Charset), IndexSet<StateId>>;

/// A finite automaton: states, initial state, accepting states and a
/// transition relation `(state, charset) -> {state}`.
#[derive(Clone, Debug)]
pub struct FiniteAutomaton {
    transitions: TransitionMap,
    initial: StateId,
    accepting: IndexSet<StateId>,
    deterministic: bool,
}

impl FiniteAutomaton {
    /// Build an automaton. Edge labels are re-partitioned into pairwise
    /// disjoint charsets; empty labels are dropped.
    pub fn new(
        transitions: TransitionMap,
        initial: StateId,
        accepting: impl IntoIterator<Item = StateId>,
    ) -> Self {
        let transitions = disjointify(transitions);
        let deterministic = transitions.values().all(|succs| succs.len() <= 1);
        Self {
            transitions,
            initial,
            accepting: accepting.into_iter().collect(),
            deterministic,
        }
    }

    /// The automaton accepting only the empty string.
    pub fn empty() -> Self {
        Self::new(TransitionMap::new(), 0, [0])
    }

    /// Single transition over `cs`: accepts exactly the one-character
    /// strings drawn from the charset.
    pub fn for_charset(cs: Charset) -> Self {
        let mut transitions = TransitionMap::new();
        if !cs.is_empty() {
            transitions.insert((0, cs), IndexSet::from([1]));
        }
        Self::new(transitions, 0, [1])
    }

    #[inline]
    pub fn initial(&self) -> StateId {
        self.initial
    }

    #[inline]
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    #[inline]
    pub fn is_accepting(&self, q: StateId) -> bool {
        self.accepting.contains(&q)
    }

    /// All states mentioned anywhere in the automaton.
    pub fn states(&self) -> IndexSet<StateId> {
        let mut states = IndexSet::new();
        states.insert(self.initial);
        for ((q, _), succs) in &self.transitions {
            states.insert(*q);
            states.extend(succs.iter().copied());
        }
        states.extend(self.accepting.iter().copied());
        states
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(|s| s.len()).sum()
    }

    fn next_state(&self, q: StateId, cp: u32) -> Option<StateId> {
        // labels out of one state are pairwise disjoint, so at most one
        // entry matches a code point
        for ((q0, cs), succs) in &self.transitions {
            if *q0 == q && cs.contains_cp(cp) {
                return succs.first().copied();
            }
        }
        None
    }

    /// Whether the automaton accepts the whole input.
    ///
    /// # Panics
    /// Panics if the automaton is nondeterministic; determinise first.
    pub fn accepts(&self, input: &str) -> bool {
        assert!(
            self.deterministic,
            "cannot run a nondeterministic automaton; call determinize() first"
        );
        let mut q = self.initial;
        for c in input.chars() {
            match self.next_state(q, c as u32) {
                Some(next) => q = next,
                None => return false,
            }
        }
        self.is_accepting(q)
    }

    /// Length in bytes of the longest prefix of `text[start..]` that
    /// leads to an accepting state, or `None` if no prefix (including
    /// the empty one) is accepted. Never reads past the match.
    ///
    /// # Panics
    /// Panics if the automaton is nondeterministic.
    pub fn longest_match(&self, text: &str, start: usize) -> Option<usize> {
        assert!(
            self.deterministic,
            "cannot run a nondeterministic automaton; call determinize() first"
        );
        let mut q = self.initial;
        let mut best = self.is_accepting(q).then_some(0);
        let mut consumed = 0;
        for c in text[start..].chars() {
            match self.next_state(q, c as u32) {
                Some(next) => q = next,
                None => break,
            }
            consumed += c.len_utf8();
            if self.is_accepting(q) {
                best = Some(consumed);
            }
        }
        best
    }

    /// Subset construction. The result is deterministic, with states not
    /// reachable from the initial state and states from which no
    /// accepting state is reachable dropped.
    pub fn determinize(&self) -> FiniteAutomaton {
        if self.deterministic {
            return self.prune();
        }

        // Edge labels are globally pairwise disjoint, so the successor
        // sets of a state set can be keyed by the label itself.
        let mut ids: IndexMap<BTreeSet<StateId>, StateId> = IndexMap::new();
        let mut transitions = TransitionMap::new();
        let mut queue = VecDeque::new();

        let start: BTreeSet<StateId> = BTreeSet::from([self.initial]);
        ids.insert(start.clone(), 0);
        queue.push_back(start);

        while let Some(set) = queue.pop_front() {
            let from = ids[&set];
            let mut by_label: IndexMap<Charset, BTreeSet<StateId>> = IndexMap::new();
            for ((q, cs), succs) in &self.transitions {
                if set.contains(q) {
                    by_label
                        .entry(cs.clone())
                        .or_default()
                        .extend(succs.iter().copied());
                }
            }
            for (cs, target) in by_label {
                let next_id = ids.len() as StateId;
                let to = *ids.entry(target.clone()).or_insert_with(|| {
                    queue.push_back(target.clone());
                    next_id
                });
                transitions.insert((from, cs), IndexSet::from([to]));
            }
        }

        let accepting: IndexSet<StateId> = ids
            .iter()
            .filter(|(set, _)| set.iter().any(|q| self.is_accepting(*q)))
            .map(|(_, id)| *id)
            .collect();

        FiniteAutomaton::new(transitions, 0, accepting).prune()
    }

    /// Drop states unreachable from the initial state, then states from
    /// which no accepting state is reachable.
    fn prune(&self) -> FiniteAutomaton {
        // forward reachability
        let mut reachable: IndexSet<StateId> = IndexSet::from([self.initial]);
        let mut queue = VecDeque::from([self.initial]);
        while let Some(q) = queue.pop_front() {
            for ((q0, _), succs) in &self.transitions {
                if *q0 != q {
                    continue;
                }
                for &s in succs {
                    if reachable.insert(s) {
                        queue.push_back(s);
                    }
                }
            }
        }

        // backward reachability from accepting states
        let mut productive: IndexSet<StateId> = self
            .accepting
            .iter()
            .copied()
            .filter(|q| reachable.contains(q))
            .collect();
        let mut changed = true;
        while changed {
            changed = false;
            for ((q0, _), succs) in &self.transitions {
                if !reachable.contains(q0) || productive.contains(q0) {
                    continue;
                }
                if succs.iter().any(|s| productive.contains(s)) {
                    productive.insert(*q0);
                    changed = true;
                }
            }
        }

        let keep = |q: &StateId| reachable.contains(q) && productive.contains(q);
        let mut transitions = TransitionMap::new();
        for ((q0, cs), succs) in &self.transitions {
            if !keep(q0) && *q0 != self.initial {
                continue;
            }
            if !reachable.contains(q0) {
                continue;
            }
            let kept: IndexSet<StateId> = succs.iter().copied().filter(|s| keep(s)).collect();
            if !kept.is_empty() {
                transitions.insert((*q0, cs.clone()), kept);
            }
        }
        let accepting: IndexSet<StateId> = self
            .accepting
            .iter()
            .copied()
            .filter(|q| reachable.contains(q))
            .collect();
        FiniteAutomaton::new(transitions, self.initial, accepting)
    }

    /// Language concatenation: strings of `self` followed by strings of
    /// `other`.
    pub fn concat(&self, other: &FiniteAutomaton) -> FiniteAutomaton {
        let offset = self.max_state() + 1;
        let map_b = |q: StateId| q + offset;

        let mut transitions = self.transitions.clone();

        for ((q0, cs), succs) in &other.transitions {
            let targets: IndexSet<StateId> = succs.iter().map(|&q| map_b(q)).collect();
            if *q0 == other.initial {
                // other's initial is dissolved: its out-edges hang off
                // every accepting state of self
                for &f in &self.accepting {
                    transitions
                        .entry((f, cs.clone()))
                        .or_default()
                        .extend(targets.iter().copied());
                }
            } else {
                transitions
                    .entry((map_b(*q0), cs.clone()))
                    .or_default()
                    .extend(targets.iter().copied());
            }
        }

        let mut accepting: IndexSet<StateId> = other
            .accepting
            .iter()
            .filter(|&&q| q != other.initial)
            .map(|&q| map_b(q))
            .collect();
        if other.is_accepting(other.initial) {
            accepting.extend(self.accepting.iter().copied());
        }

        FiniteAutomaton::new(transitions, self.initial, accepting)
    }

    /// Language union.
    pub fn union(&self, other: &FiniteAutomaton) -> FiniteAutomaton {
        // both initial states collapse onto a single fresh state 0
        let offset_a = 1;
        let offset_b = offset_a + self.max_state() + 1;
        let map_a = |q: StateId| if q == self.initial { 0 } else { q + offset_a };
        let map_b = |q: StateId| if q == other.initial { 0 } else { q + offset_b };

        let mut transitions = TransitionMap::new();
        for ((q0, cs), succs) in &self.transitions {
            transitions
                .entry((map_a(*q0), cs.clone()))
                .or_default()
                .extend(succs.iter().map(|&q| map_a(q)));
        }
        for ((q0, cs), succs) in &other.transitions {
            transitions
                .entry((map_b(*q0), cs.clone()))
                .or_default()
                .extend(succs.iter().map(|&q| map_b(q)));
        }

        let mut accepting: IndexSet<StateId> =
            self.accepting.iter().map(|&q| map_a(q)).collect();
        accepting.extend(other.accepting.iter().map(|&q| map_b(q)));

        FiniteAutomaton::new(transitions, 0, accepting)
    }

    /// Kleene star: zero or more repetitions.
    pub fn star(&self) -> FiniteAutomaton {
        let fresh = self.max_state() + 1;
        let mut transitions = self.transitions.clone();

        for ((q0, cs), succs) in &self.transitions {
            if *q0 != self.initial {
                continue;
            }
            // the fresh initial and every accepting state replay the old
            // initial state's out-edges
            transitions
                .entry((fresh, cs.clone()))
                .or_default()
                .extend(succs.iter().copied());
            for &f in &self.accepting {
                transitions
                    .entry((f, cs.clone()))
                    .or_default()
                    .extend(succs.iter().copied());
            }
        }

        let mut accepting = self.accepting.clone();
        accepting.insert(fresh);
        FiniteAutomaton::new(transitions, fresh, accepting)
    }

    /// One or more repetitions.
    pub fn plus(&self) -> FiniteAutomaton {
        self.concat(&self.star())
    }

    /// Exactly `n` repetitions; `repeat(0)` accepts only the empty string.
    pub fn repeat(&self, n: usize) -> FiniteAutomaton {
        let mut result = FiniteAutomaton::empty();
        for _ in 0..n {
            result = result.concat(self);
        }
        result
    }

    fn max_state(&self) -> StateId {
        self.states().into_iter().max().unwrap_or(0)
    }
}

/// Re-partition edge labels so that every pair of charsets appearing on
/// transitions is disjoint, unioning successor sets per piece.
fn disjointify(transitions: TransitionMap) -> TransitionMap {
    let labels: IndexSet<Charset> = transitions.keys().map(|(_, cs)| cs.clone()).collect();
    if labels.len() <= 1 {
        return transitions;
    }

    // refine into an atomic partition: each piece is a subset of, or
    // disjoint from, every original label
    let mut partition: Vec<Charset> = Vec::new();
    for label in &labels {
        let mut next = Vec::with_capacity(partition.len() + 1);
        let mut rest = label.clone();
        for piece in partition {
            let inter = piece.intersect(label);
            if inter.is_empty() {
                next.push(piece);
                continue;
            }
            let outside = piece.difference(label);
            if !outside.is_empty() {
                next.push(outside);
            }
            rest = rest.difference(&inter);
            next.push(inter);
        }
        if !rest.is_empty() {
            next.push(rest);
        }
        partition = next;
    }

    let mut out = TransitionMap::new();
    for ((q, cs), succs) in transitions {
        for piece in &partition {
            // atomicity: a nonempty intersection means piece ⊆ cs
            if !piece.intersect(&cs).is_empty() {
                out.entry((q, piece.clone()))
                    .or_default()
                    .extend(succs.iter().copied());
            }
        }
    }
    out
}
