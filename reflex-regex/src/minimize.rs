// DFA minimization
//
// 1. trim: drop states unreachable from the start and states that can never
//    reach an accepting state (missing transitions already mean "dead")
// 2. refine: Moore partition refinement, starting from classes keyed by the
//    accept tag list and splitting on per-symbol target classes until stable
// 3. collapse each class into one state, then trim again so numbering is
//    breadth-first from the start
//
// Re-minimizing the output yields the same automaton.

use crate::dfa::{Dfa, DfaState};
use crate::nfa::StateId;
use crate::symbol::Symbol;
use ahash::AHashMap;
use std::collections::VecDeque;
use std::hash::Hash;

/// Reduce `dfa` to the fewest states with the same matching and tagging
pub fn minimize<S, T>(dfa: &Dfa<S, T>) -> Dfa<S, T>
where
    S: Symbol,
    T: Clone + Eq + Hash,
{
    let trimmed = trim(dfa);
    let classes = refine(&trimmed);
    let collapsed = collapse(&trimmed, &classes);
    let minimized = trim(&collapsed);

    tracing::trace!(
        before = dfa.state_count(),
        after = minimized.state_count(),
        "Minimized DFA"
    );

    minimized
}

/// Keep only live states, renumbered breadth-first from the start
pub(crate) fn trim<S: Symbol, T: Clone>(dfa: &Dfa<S, T>) -> Dfa<S, T> {
    let live = co_reachable(dfa);

    let mut renumber: Vec<Option<StateId>> = vec![None; dfa.state_count()];
    let mut order = vec![dfa.start];
    let mut queue = VecDeque::from([dfa.start]);
    renumber[dfa.start] = Some(0);

    while let Some(id) = queue.pop_front() {
        for &to in dfa.states[id].transitions.values() {
            if live[to] && renumber[to].is_none() {
                renumber[to] = Some(order.len());
                order.push(to);
                queue.push_back(to);
            }
        }
    }

    let states = order
        .iter()
        .map(|&old| {
            let st = &dfa.states[old];
            let mut next = DfaState::new(st.accept.clone());
            next.transitions = st
                .transitions
                .iter()
                .filter_map(|(&sym, &to)| renumber[to].map(|id| (sym, id)))
                .collect();
            next
        })
        .collect();

    Dfa { states, start: 0 }
}

/// States from which some accepting state is reachable
fn co_reachable<S: Symbol, T>(dfa: &Dfa<S, T>) -> Vec<bool> {
    let n = dfa.state_count();
    let mut incoming: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for (from, st) in dfa.states.iter().enumerate() {
        for &to in st.transitions.values() {
            incoming[to].push(from);
        }
    }

    let mut live = vec![false; n];
    let mut stack: Vec<StateId> = (0..n).filter(|&id| dfa.states[id].is_accepting()).collect();
    for &id in &stack {
        live[id] = true;
    }

    while let Some(id) = stack.pop() {
        for &from in &incoming[id] {
            if !live[from] {
                live[from] = true;
                stack.push(from);
            }
        }
    }

    live
}

/// Equivalence class of every state; class ids are assigned in state order
fn refine<S, T>(dfa: &Dfa<S, T>) -> Vec<usize>
where
    S: Symbol,
    T: Eq + Hash,
{
    let alphabet: Vec<S> = dfa.alphabet().into_iter().collect();

    // Initial partition: non-accepting, and one class per distinct tag list
    let mut keys: AHashMap<Option<&[T]>, usize> = AHashMap::default();
    let mut class: Vec<usize> = dfa
        .states
        .iter()
        .map(|st| {
            let next = keys.len();
            *keys.entry(st.accept.as_deref()).or_insert(next)
        })
        .collect();
    let mut count = keys.len();

    loop {
        // Signature: own class plus target class per symbol (None = dead)
        let mut signatures: AHashMap<(usize, Vec<Option<usize>>), usize> = AHashMap::default();
        let next_class: Vec<usize> = dfa
            .states
            .iter()
            .enumerate()
            .map(|(id, st)| {
                let targets = alphabet
                    .iter()
                    .map(|sym| st.transitions.get(sym).map(|&to| class[to]))
                    .collect();
                let next = signatures.len();
                *signatures.entry((class[id], targets)).or_insert(next)
            })
            .collect();

        // Classes only ever split, so an unchanged count is a fixed point
        let next_count = signatures.len();
        class = next_class;
        if next_count == count {
            return class;
        }
        count = next_count;
    }
}

fn collapse<S: Symbol, T: Clone>(dfa: &Dfa<S, T>, class: &[usize]) -> Dfa<S, T> {
    let count = class.iter().copied().max().map_or(0, |max| max + 1);
    let mut states: Vec<Option<DfaState<S, T>>> = vec![None; count];

    for (id, st) in dfa.states.iter().enumerate() {
        let slot = &mut states[class[id]];
        if slot.is_some() {
            continue;
        }

        // Any member represents its class; members are equivalent
        let mut rep = DfaState::new(st.accept.clone());
        rep.transitions = st
            .transitions
            .iter()
            .map(|(&sym, &to)| (sym, class[to]))
            .collect();
        *slot = Some(rep);
    }

    let states = states
        .into_iter()
        .enumerate()
        .map(|(id, st)| {
            st.unwrap_or_else(|| panic!("invariant violated: equivalence class {} has no members", id))
        })
        .collect();

    Dfa {
        states,
        start: class[dfa.start],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::determinize;
    use crate::nfa::{Nfa, Tags};
    use crate::parser::parse_chars;

    fn minimal(patterns: &[(&str, &'static str)]) -> Dfa<char, &'static str> {
        let nfa = Nfa::merge(
            patterns
                .iter()
                .map(|&(p, t)| parse_chars(p, Some(t)).unwrap()),
        );
        minimize(&determinize(&nfa))
    }

    fn state(transitions: &[(char, StateId)], accept: Option<&[&'static str]>) -> DfaState<char, &'static str> {
        let mut st = DfaState::new(accept.map(|t| t.iter().copied().collect::<Tags<_>>()));
        st.transitions = transitions.iter().copied().collect();
        st
    }

    #[test]
    fn test_equivalent_branches_collapse() {
        // (a|b)c: both branches reach the same suffix
        let dfa = minimal(&[("(ac|bc)", "t")]);
        assert_eq!(dfa.state_count(), 3);
        assert!(dfa.matches(&['a', 'c']));
        assert!(dfa.matches(&['b', 'c']));
        assert!(!dfa.matches(&['c']));
    }

    #[test]
    fn test_star_collapses_to_one_state() {
        let dfa = minimal(&[("a*", "t")]);
        assert_eq!(dfa.state_count(), 1);
        assert!(dfa.matches(&[]));
        assert!(dfa.matches(&['a', 'a', 'a']));
    }

    #[test]
    fn test_even_length_loop() {
        let dfa = minimal(&[("(..)+", "even")]);
        assert_eq!(dfa.state_count(), 3);
        assert!(!dfa.matches(&[]));
        assert!(!dfa.matches(&['x']));
        assert!(dfa.matches(&['x', 'y']));
        assert!(dfa.matches(&['x', 'y', 'z', 'w']));
    }

    #[test]
    fn test_different_tags_never_merge() {
        let dfa = minimal(&[("a", "left"), ("b", "right")]);
        // start, accept(left), accept(right)
        assert_eq!(dfa.state_count(), 3);
        assert_eq!(dfa.matching(&['a']), &["left"]);
        assert_eq!(dfa.matching(&['b']), &["right"]);
    }

    #[test]
    fn test_same_tags_merge() {
        let dfa = minimal(&[("a", "same"), ("b", "same")]);
        assert_eq!(dfa.state_count(), 2);
    }

    #[test]
    fn test_idempotent() {
        let once = minimal(&[("ab*c|a(b|d)c", "x"), ("(..)+", "y"), ("abc", "z")]);
        let twice = minimize(&once);
        assert_eq!(once.state_count(), twice.state_count());
        assert_eq!(once.transition_count(), twice.transition_count());
        for input in ["", "ac", "abc", "adc", "abbc", "xy", "abcd"] {
            let chars: Vec<char> = input.chars().collect();
            assert_eq!(once.matching(&chars), twice.matching(&chars), "input {:?}", input);
        }
    }

    #[test]
    fn test_trim_drops_unreachable_and_dead_states() {
        // 0 -a-> 1 (accept), 0 -b-> 2 (dead end), 3 unreachable
        let dfa = Dfa {
            states: vec![
                state(&[('a', 1), ('b', 2)], None),
                state(&[], Some(&["t"])),
                state(&[('c', 2)], None),
                state(&[('a', 1)], Some(&["t"])),
            ],
            start: 0,
        };

        let trimmed = trim(&dfa);
        assert_eq!(trimmed.state_count(), 2);
        assert!(trimmed.matches(&['a']));
        assert!(!trimmed.matches(&['b']));
        assert_eq!(trimmed.get_state(0).unwrap().transition_count(), 1);
    }

    #[test]
    fn test_empty_language_keeps_start() {
        let dfa: Dfa<char, &str> = Dfa {
            states: vec![state(&[('a', 1)], None), state(&[], None)],
            start: 0,
        };

        let min = minimize(&dfa);
        assert_eq!(min.state_count(), 1);
        assert!(!min.matches(&[]));
        assert!(!min.matches(&['a']));
    }
}
