// DFA - subset construction over the explicit pattern alphabet
//
// Each DFA state stands for the ε-closed set of NFA states reachable on
// some input. Transitions are only recorded for symbols that lead
// somewhere; a missing entry means "no path" and is treated as the dead
// state by every consumer.

use crate::nfa::{Nfa, StateId, Tags};
use crate::symbol::Symbol;
use crate::{RegexError, RegexResult};
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

/// A DFA state
#[derive(Debug, Clone)]
pub struct DfaState<S, T> {
    /// symbol -> next state
    pub(crate) transitions: BTreeMap<S, StateId>,

    /// `Some` if accepting, with the tags of every pattern accepted here
    pub(crate) accept: Option<Tags<T>>,
}

impl<S: Symbol, T> DfaState<S, T> {
    pub(crate) fn new(accept: Option<Tags<T>>) -> Self {
        Self {
            transitions: BTreeMap::new(),
            accept,
        }
    }

    pub fn get_transition(&self, symbol: S) -> Option<StateId> {
        self.transitions.get(&symbol).copied()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_accepting(&self) -> bool {
        self.accept.is_some()
    }

    pub fn tags(&self) -> &[T] {
        self.accept.as_deref().unwrap_or(&[])
    }
}

/// A deterministic automaton, possibly partial over its alphabet
#[derive(Clone)]
pub struct Dfa<S, T> {
    pub(crate) states: Vec<DfaState<S, T>>,
    pub(crate) start: StateId,
}

/// Subset construction with no state limit
pub fn determinize<S: Symbol, T: Clone>(nfa: &Nfa<S, T>) -> Dfa<S, T> {
    match determinize_bounded(nfa, 0) {
        Ok(dfa) => dfa,
        Err(e) => panic!("invariant violated: unbounded determinization failed: {}", e),
    }
}

/// Subset construction that gives up once more than `max_states` states
/// exist (0 = unlimited)
pub fn determinize_bounded<S: Symbol, T: Clone>(
    nfa: &Nfa<S, T>,
    max_states: usize,
) -> RegexResult<Dfa<S, T>> {
    let initial = nfa.epsilon_closure([nfa.start()]);

    let mut dfa = Dfa {
        states: vec![DfaState::new(nfa.tags(&initial))],
        start: 0,
    };

    let mut state_map: AHashMap<Vec<StateId>, StateId> = AHashMap::default();
    state_map.insert(initial.clone(), 0);
    let mut unmarked = vec![initial];

    while let Some(subset) = unmarked.pop() {
        let from = state_map[&subset];

        // Only symbols some member can consume; anything else has no path
        let symbols: BTreeSet<S> = subset
            .iter()
            .filter_map(|&id| nfa.state(id))
            .flat_map(|st| st.transitions.keys().copied())
            .collect();

        for sym in symbols {
            let next = nfa.step(&subset, sym);
            if next.is_empty() {
                continue;
            }

            let to = match state_map.get(&next) {
                Some(&id) => id,
                None => {
                    let id = dfa.states.len();
                    dfa.states.push(DfaState::new(nfa.tags(&next)));
                    state_map.insert(next.clone(), id);
                    unmarked.push(next);

                    if max_states > 0 && dfa.states.len() > max_states {
                        tracing::warn!(
                            states = dfa.states.len(),
                            max = max_states,
                            "DFA state limit exceeded"
                        );
                        return Err(RegexError::StateLimitExceeded {
                            states: dfa.states.len(),
                            max: max_states,
                        });
                    }
                    id
                }
            };

            dfa.states[from].transitions.insert(sym, to);
        }
    }

    Ok(dfa)
}

impl<S: Symbol, T> Dfa<S, T> {
    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn get_state(&self, id: StateId) -> Option<&DfaState<S, T>> {
        self.states.get(id)
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(DfaState::transition_count).sum()
    }

    /// Every symbol with an explicit transition somewhere in the automaton
    pub fn alphabet(&self) -> BTreeSet<S> {
        self.states
            .iter()
            .flat_map(|st| st.transitions.keys().copied())
            .collect()
    }

    fn run(&self, input: &[S]) -> Option<&DfaState<S, T>> {
        let mut current = self.start;
        for &sym in input {
            current = self.states[current].get_transition(sym)?;
        }
        self.states.get(current)
    }

    /// Whole-input acceptance
    pub fn matches(&self, input: &[S]) -> bool {
        self.run(input).is_some_and(DfaState::is_accepting)
    }

    /// Tags of the state the whole input leads to (empty if none)
    pub fn matching(&self, input: &[S]) -> &[T] {
        self.run(input).map(DfaState::tags).unwrap_or(&[])
    }

    /// Re-key every transition through `f`
    ///
    /// Panics if two symbols of one state map to the same new symbol with
    /// different targets, which would make the result nondeterministic.
    pub fn map_symbols<B: Symbol>(self, mut f: impl FnMut(S) -> B) -> Dfa<B, T> {
        let states = self
            .states
            .into_iter()
            .enumerate()
            .map(|(id, st)| {
                let mut transitions = BTreeMap::new();
                for (sym, to) in st.transitions {
                    let mapped = f(sym);
                    if let Some(prev) = transitions.insert(mapped, to) {
                        assert!(
                            prev == to,
                            "invariant violated: state {} maps {:?} onto {:?} with two targets",
                            id,
                            sym,
                            mapped
                        );
                    }
                }
                DfaState {
                    transitions,
                    accept: st.accept,
                }
            })
            .collect();

        Dfa {
            states,
            start: self.start,
        }
    }

    /// Export as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph dfa {\n");

        for (id, st) in self.states.iter().enumerate() {
            let shape = crate::dot::shape(id == self.start, st.is_accepting());
            let _ = writeln!(out, "    s{} [shape={}];", id, shape);
        }

        for (id, st) in self.states.iter().enumerate() {
            for (sym, to) in &st.transitions {
                let _ = writeln!(out, "    s{} -> s{} [label=\"{}\"];", id, to, sym.label());
            }
        }

        out.push('}');
        out
    }
}

impl<S, T> fmt::Debug for Dfa<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dfa")
            .field("start", &self.start)
            .field("state_count", &self.states.len())
            .finish()
    }
}
