// NFA - Thompson construction and multi-pattern merge
//
// States live in an arena addressed by index; transitions store target
// indices, so the cycles introduced by `*` and `+` need no shared
// ownership. An automaton is only mutated by the builder that creates it.

use crate::program::{Op, Repeat};
use crate::symbol::Symbol;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Index of a state inside its automaton
pub type StateId = usize;

/// Ordered tag list carried by an accepting state
///
/// Order is declaration order of the originating patterns; duplicates
/// are kept.
pub type Tags<T> = SmallVec<[T; 1]>;

/// A single NFA state
#[derive(Debug, Clone)]
pub struct NfaState<S, T> {
    /// Targets reachable without consuming a symbol
    pub(crate) epsilon: SmallVec<[StateId; 2]>,

    /// symbol -> targets
    pub(crate) transitions: BTreeMap<S, SmallVec<[StateId; 1]>>,

    /// `Some` if accepting; the list may be empty for untagged patterns
    pub(crate) accept: Option<Tags<T>>,
}

impl<S, T> NfaState<S, T> {
    fn new() -> Self {
        Self {
            epsilon: SmallVec::new(),
            transitions: BTreeMap::new(),
            accept: None,
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accept.is_some()
    }
}

/// A nondeterministic automaton with a single start state
#[derive(Debug, Clone)]
pub struct Nfa<S, T> {
    pub(crate) states: Vec<NfaState<S, T>>,
    pub(crate) start: StateId,
}

/// Entry and exit of a partially built automaton
#[derive(Debug, Clone, Copy)]
struct Fragment {
    entry: StateId,
    exit: StateId,
}

struct Builder<S, T> {
    states: Vec<NfaState<S, T>>,
}

impl<S: Symbol, T> Builder<S, T> {
    fn new() -> Self {
        Self { states: Vec::new() }
    }

    fn state(&mut self) -> StateId {
        self.states.push(NfaState::new());
        self.states.len() - 1
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from].epsilon.push(to);
    }

    fn transition(&mut self, from: StateId, symbol: S, to: StateId) {
        let targets = self.states[from].transitions.entry(symbol).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    /// Pop the top `n` operands, bottom first
    fn operands(stack: &mut Vec<Fragment>, n: usize) -> Vec<Fragment> {
        match stack.len().checked_sub(n) {
            Some(at) if n > 0 => stack.split_off(at),
            _ => panic!("invariant violated: {} operands requested, {} on the stack", n, stack.len()),
        }
    }

    /// Run a postfix program against a fragment stack
    fn build(&mut self, program: &[Op<S>]) -> Fragment {
        let mut stack: Vec<Fragment> = Vec::new();

        for op in program {
            let frag = match *op {
                Op::Literal(sym) => {
                    let entry = self.state();
                    let exit = self.state();
                    self.transition(entry, sym, exit);
                    Fragment { entry, exit }
                }
                Op::Any => {
                    let entry = self.state();
                    let exit = self.state();
                    for sym in S::wildcard() {
                        self.transition(entry, sym, exit);
                    }
                    Fragment { entry, exit }
                }
                Op::Concat(n) => {
                    let frags = Self::operands(&mut stack, n);
                    for pair in frags.windows(2) {
                        self.epsilon(pair[0].exit, pair[1].entry);
                    }
                    match (frags.first(), frags.last()) {
                        (Some(first), Some(last)) => Fragment {
                            entry: first.entry,
                            exit: last.exit,
                        },
                        _ => panic!("invariant violated: empty concatenation"),
                    }
                }
                Op::Alternate(n) => {
                    let entry = self.state();
                    let exit = self.state();
                    for branch in Self::operands(&mut stack, n) {
                        self.epsilon(entry, branch.entry);
                        self.epsilon(branch.exit, exit);
                    }
                    Fragment { entry, exit }
                }
                Op::Repeat(rep) => {
                    let body = Self::operands(&mut stack, 1)[0];
                    match rep {
                        Repeat::ZeroOrMore => {
                            let entry = self.state();
                            let exit = self.state();
                            self.epsilon(entry, body.entry);
                            self.epsilon(entry, exit);
                            self.epsilon(body.exit, body.entry);
                            self.epsilon(body.exit, exit);
                            Fragment { entry, exit }
                        }
                        Repeat::OneOrMore => {
                            // One mandatory pass, then loop back for more
                            let exit = self.state();
                            self.epsilon(body.exit, body.entry);
                            self.epsilon(body.exit, exit);
                            Fragment {
                                entry: body.entry,
                                exit,
                            }
                        }
                        Repeat::ZeroOrOne => {
                            let entry = self.state();
                            let exit = self.state();
                            self.epsilon(entry, body.entry);
                            self.epsilon(entry, exit);
                            self.epsilon(body.exit, exit);
                            Fragment { entry, exit }
                        }
                    }
                }
            };
            stack.push(frag);
        }

        match (stack.pop(), stack.is_empty()) {
            (Some(frag), true) => frag,
            _ => panic!("invariant violated: program left {} operands", stack.len() + 1),
        }
    }
}

impl<S: Symbol, T> Nfa<S, T> {
    /// Thompson construction; `tag` is attached to the final exit state
    pub(crate) fn from_program(program: &[Op<S>], tag: Option<T>) -> Self {
        let mut builder = Builder::new();
        let frag = builder.build(program);
        builder.states[frag.exit].accept = Some(tag.into_iter().collect());

        Self {
            states: builder.states,
            start: frag.entry,
        }
    }

    /// Combine automata under one new start state
    ///
    /// The new start has an ε-edge to each input's start, in input order.
    /// Sub-automata are copied unchanged, renumbered so that every state of
    /// an earlier input precedes every state of a later one.
    pub fn merge(nfas: impl IntoIterator<Item = Nfa<S, T>>) -> Self {
        let mut states = vec![NfaState::new()];
        let start = 0;

        for nfa in nfas {
            let offset = states.len();
            states[start].epsilon.push(nfa.start + offset);

            states.extend(nfa.states.into_iter().map(|mut st| {
                st.epsilon.iter_mut().for_each(|id| *id += offset);
                st.transitions
                    .values_mut()
                    .flat_map(|targets| targets.iter_mut())
                    .for_each(|id| *id += offset);
                st
            }));
        }

        Self { states, start }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> Option<&NfaState<S, T>> {
        self.states.get(id)
    }

    /// Every symbol with an explicit transition somewhere in the automaton
    pub fn alphabet(&self) -> BTreeSet<S> {
        self.states
            .iter()
            .flat_map(|st| st.transitions.keys().copied())
            .collect()
    }

    /// Sorted ε-closure of a set of states
    pub(crate) fn epsilon_closure(&self, seeds: impl IntoIterator<Item = StateId>) -> Vec<StateId> {
        let mut seen = vec![false; self.states.len()];
        let mut stack: Vec<StateId> = Vec::new();
        let mut closure = Vec::new();

        for id in seeds {
            if !seen[id] {
                seen[id] = true;
                stack.push(id);
            }
        }

        while let Some(id) = stack.pop() {
            closure.push(id);
            for &next in &self.states[id].epsilon {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }

        closure.sort_unstable();
        closure
    }

    /// ε-closure of everything reachable from `set` on `symbol`
    pub(crate) fn step(&self, set: &[StateId], symbol: S) -> Vec<StateId> {
        let targets = set
            .iter()
            .filter_map(|&id| self.states[id].transitions.get(&symbol))
            .flat_map(|targets| targets.iter().copied());
        self.epsilon_closure(targets)
    }

    /// Whether any state of `set` accepts
    pub(crate) fn accepts(&self, set: &[StateId]) -> bool {
        set.iter().any(|&id| self.states[id].is_accepting())
    }

    fn initial(&self) -> Vec<StateId> {
        self.epsilon_closure([self.start])
    }

    fn run(&self, input: &[S]) -> Vec<StateId> {
        let mut current = self.initial();
        for &sym in input {
            if current.is_empty() {
                break;
            }
            current = self.step(&current, sym);
        }
        current
    }

    /// Direct simulation: whole-input acceptance
    pub fn matches(&self, input: &[S]) -> bool {
        self.accepts(&self.run(input))
    }

    /// Export as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph nfa {\n");

        for (id, st) in self.states.iter().enumerate() {
            let shape = crate::dot::shape(id == self.start, st.is_accepting());
            let _ = writeln!(out, "    s{} [shape={}];", id, shape);
        }

        for (id, st) in self.states.iter().enumerate() {
            for &to in &st.epsilon {
                let _ = writeln!(out, "    s{} -> s{} [label=\"ε\"];", id, to);
            }
            for (sym, targets) in &st.transitions {
                for &to in targets {
                    let _ = writeln!(out, "    s{} -> s{} [label=\"{}\"];", id, to, sym.label());
                }
            }
        }

        out.push('}');
        out
    }
}

impl<S: Symbol, T: Clone> Nfa<S, T> {
    /// Concatenated tags of every accepting state in `set`, in state order
    pub(crate) fn tags(&self, set: &[StateId]) -> Option<Tags<T>> {
        let mut accepting = set
            .iter()
            .filter_map(|&id| self.states[id].accept.as_ref())
            .peekable();
        accepting.peek()?;
        Some(accepting.flat_map(|tags| tags.iter().cloned()).collect())
    }

    /// Direct simulation: tags of every pattern that matches the whole input
    pub fn matching(&self, input: &[S]) -> Vec<T> {
        self.tags(&self.run(input))
            .map(|tags| tags.into_vec())
            .unwrap_or_default()
    }
}
