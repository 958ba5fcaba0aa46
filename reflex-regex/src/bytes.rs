// Byte table - the runtime representation
//
// Every state owns one 256-entry row indexed by byte value. Bytes without
// an explicit transition point at a dedicated dead row (always the last
// row) whose entries all point back at itself, so the table is total over
// the byte range. The table is immutable once built.

use crate::dfa::Dfa;
use crate::error::{RegexError, RegexResult};
use crate::symbol::Symbol;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Number of columns in a row
const ROW: usize = 256;

/// Dense `state x byte -> state` table with per-state accept tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ByteDfa<T> {
    start: u32,
    dead: u32,
    table: Vec<u32>,
    accept: Vec<Option<Vec<T>>>,
}

/// Why a frame was or was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport<'a, T> {
    /// Length of the prefix replayed before reaching the dead state
    pub consumed: usize,

    /// The byte that led to the dead state, if any
    pub failure: Option<Mismatch>,

    /// Whole-input acceptance
    pub matched: bool,

    /// Tags of the final state (empty unless `matched`)
    pub tags: &'a [T],
}

/// First byte with no path forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub offset: usize,
    pub byte: u8,

    /// Bytes that would have been accepted at `offset`, ascending
    pub expected: Vec<u8>,
}

fn index(id: usize) -> u32 {
    u32::try_from(id)
        .unwrap_or_else(|_| panic!("invariant violated: state index {} does not fit a table entry", id))
}

impl<T> ByteDfa<T> {
    /// Lower a DFA onto the byte range
    ///
    /// `to_byte` maps every symbol of the automaton to its byte value. A
    /// symbol without a mapping, or two symbols of one state mapping onto
    /// the same byte with different targets, is a compiler bug and panics.
    pub fn from_dfa<S: Symbol>(dfa: Dfa<S, T>, mut to_byte: impl FnMut(S) -> Option<u8>) -> Self {
        let dfa = dfa.map_symbols(|sym| {
            to_byte(sym)
                .unwrap_or_else(|| panic!("invariant violated: symbol {:?} has no byte mapping", sym))
        });

        let rows = dfa.states.len() + 1;
        let dead = index(rows - 1);
        let mut table = vec![dead; rows * ROW];
        let mut accept = Vec::with_capacity(rows);

        for (id, st) in dfa.states.into_iter().enumerate() {
            let row = &mut table[id * ROW..(id + 1) * ROW];
            for (byte, to) in st.transitions {
                assert!(to < rows - 1, "invariant violated: transition to missing state {}", to);
                row[usize::from(byte)] = index(to);
            }
            accept.push(st.accept.map(|tags| tags.into_vec()));
        }
        accept.push(None);

        Self {
            start: index(dfa.start),
            dead,
            table,
            accept,
        }
    }

    pub fn start(&self) -> usize {
        self.start as usize
    }

    /// Index of the sink row
    pub fn dead(&self) -> usize {
        self.dead as usize
    }

    /// Rows in the table, dead sink included
    pub fn state_count(&self) -> usize {
        self.accept.len()
    }

    /// Table entries that lead anywhere but the dead state
    pub fn transition_count(&self) -> usize {
        self.table.iter().filter(|&&to| to != self.dead).count()
    }

    #[inline]
    fn next(&self, state: u32, byte: u8) -> u32 {
        self.table[state as usize * ROW + usize::from(byte)]
    }

    /// Final state for `input`, or `None` once the dead state is hit
    #[inline]
    fn run(&self, input: &[u8]) -> Option<usize> {
        let mut state = self.start;
        for &byte in input {
            state = self.next(state, byte);
            if state == self.dead {
                return None;
            }
        }
        Some(state as usize)
    }

    /// Whole-input acceptance
    pub fn matches(&self, input: &[u8]) -> bool {
        self.run(input).is_some_and(|state| self.accept[state].is_some())
    }

    /// Tags of every pattern matching the whole input, in declaration order
    pub fn matching(&self, input: &[u8]) -> &[T] {
        self.run(input)
            .and_then(|state| self.accept[state].as_deref())
            .unwrap_or(&[])
    }

    /// Replay `input` and describe where it stopped making progress
    pub fn explain(&self, input: &[u8]) -> MatchReport<'_, T> {
        let mut state = self.start;

        for (offset, &byte) in input.iter().enumerate() {
            let next = self.next(state, byte);
            if next == self.dead {
                let expected = (0..=u8::MAX)
                    .filter(|&b| self.next(state, b) != self.dead)
                    .collect();
                return MatchReport {
                    consumed: offset,
                    failure: Some(Mismatch {
                        offset,
                        byte,
                        expected,
                    }),
                    matched: false,
                    tags: &[],
                };
            }
            state = next;
        }

        let tags = self.accept[state as usize].as_deref();
        MatchReport {
            consumed: input.len(),
            failure: None,
            matched: tags.is_some(),
            tags: tags.unwrap_or(&[]),
        }
    }

    /// Same table, tags transformed by `f`
    pub fn map_tags<U>(self, mut f: impl FnMut(T) -> U) -> ByteDfa<U> {
        let accept = self
            .accept
            .into_iter()
            .map(|tags| tags.map(|tags| tags.into_iter().map(&mut f).collect()))
            .collect();

        ByteDfa {
            start: self.start,
            dead: self.dead,
            table: self.table,
            accept,
        }
    }

    /// Export as a Graphviz digraph; edges into the dead state are omitted
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph table {\n");
        let live = (0..self.state_count()).filter(|&id| id != self.dead());

        for id in live.clone() {
            let shape = crate::dot::shape(id == self.start(), self.accept[id].is_some());
            let _ = writeln!(out, "    s{} [shape={}];", id, shape);
        }

        for id in live {
            let mut targets: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
            for byte in 0..=u8::MAX {
                let to = self.next(index(id), byte);
                if to != self.dead {
                    targets.entry(to).or_default().push(byte);
                }
            }

            for (to, bytes) in targets {
                let label = crate::dot::byte_ranges(&bytes);
                let _ = writeln!(out, "    s{} -> s{} [label=\"{}\"];", id, to, label);
            }
        }

        out.push('}');
        out
    }
}

/// Serialized form, checked before it becomes a `ByteDfa`
#[derive(Deserialize)]
struct RawByteDfa<T> {
    start: u32,
    dead: u32,
    table: Vec<u32>,
    accept: Vec<Option<Vec<T>>>,
}

impl<T> RawByteDfa<T> {
    fn validate(self) -> RegexResult<ByteDfa<T>> {
        let rows = self.accept.len();
        if rows == 0 {
            return Err(RegexError::corrupt("table has no states"));
        }
        if self.table.len() != rows * ROW {
            return Err(RegexError::corrupt(format!(
                "{} entries for {} states, expected {}",
                self.table.len(),
                rows,
                rows * ROW
            )));
        }
        if self.start as usize >= rows || self.dead as usize >= rows {
            return Err(RegexError::corrupt(format!(
                "start {} or dead {} out of range for {} states",
                self.start, self.dead, rows
            )));
        }
        if self.start == self.dead {
            return Err(RegexError::corrupt("start state is the dead state"));
        }
        if let Some(pos) = self.table.iter().position(|&to| to as usize >= rows) {
            return Err(RegexError::corrupt(format!(
                "state {} byte {:02X} targets missing state {}",
                pos / ROW,
                pos % ROW,
                self.table[pos]
            )));
        }

        let dead = self.dead as usize;
        if self.table[dead * ROW..(dead + 1) * ROW]
            .iter()
            .any(|&to| to != self.dead)
        {
            return Err(RegexError::corrupt("dead state has an exit"));
        }
        if self.accept[dead].is_some() {
            return Err(RegexError::corrupt("dead state is accepting"));
        }

        Ok(ByteDfa {
            start: self.start,
            dead: self.dead,
            table: self.table,
            accept: self.accept,
        })
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ByteDfa<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawByteDfa::deserialize(deserializer)?
            .validate()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::determinize;
    use crate::minimize::minimize;
    use crate::nfa::Nfa;
    use crate::parser::{parse_bytes, parse_chars};
    use crate::symbol::ascii_byte;

    fn table(patterns: &[(&str, &'static str)]) -> ByteDfa<&'static str> {
        let nfa = Nfa::merge(
            patterns
                .iter()
                .map(|&(p, t)| parse_bytes(p, Some(t)).unwrap()),
        );
        ByteDfa::from_dfa(minimize(&determinize(&nfa)), Some)
    }

    #[test]
    fn test_table_shape() {
        let t = table(&[("00 01", "pair")]);
        // start, after 00, accept, dead
        assert_eq!(t.state_count(), 4);
        assert_eq!(t.dead(), 3);
        assert_eq!(t.table.len(), 4 * 256);
        assert_eq!(t.transition_count(), 2);
    }

    #[test]
    fn test_dead_row_loops() {
        let t = table(&[("AA", "x")]);
        let dead = t.dead as usize;
        assert!(t.table[dead * ROW..].iter().all(|&to| to == t.dead));
        assert!(t.accept[dead].is_none());
    }

    #[test]
    fn test_matching() {
        let t = table(&[("00 (AA|55)+ 00", "frame"), ("00 .* 00", "any")]);
        assert_eq!(t.matching(&[0x00, 0xAA, 0x55, 0x00]), &["frame", "any"]);
        assert_eq!(t.matching(&[0x00, 0x12, 0x00]), &["any"]);
        assert!(t.matching(&[0x01]).is_empty());
        assert!(!t.matches(&[]));
        assert!(t.matches(&[0x00, 0x00]));
    }

    #[test]
    fn test_empty_input_uses_start_acceptance() {
        let t = table(&[("7E?", "opt")]);
        assert!(t.matches(&[]));
        assert_eq!(t.matching(&[]), &["opt"]);
    }

    #[test]
    fn test_explain_mismatch() {
        let t = table(&[("00 (01|03) FF", "x")]);

        let report = t.explain(&[0x00, 0x02, 0xFF]);
        assert_eq!(report.consumed, 1);
        assert!(!report.matched);
        let failure = report.failure.unwrap();
        assert_eq!(failure.offset, 1);
        assert_eq!(failure.byte, 0x02);
        assert_eq!(failure.expected, vec![0x01, 0x03]);
    }

    #[test]
    fn test_explain_short_input() {
        let t = table(&[("00 01", "x")]);

        let report = t.explain(&[0x00]);
        assert_eq!(report.consumed, 1);
        assert_eq!(report.failure, None);
        assert!(!report.matched);
        assert!(report.tags.is_empty());

        let report = t.explain(&[0x00, 0x01]);
        assert!(report.matched);
        assert_eq!(report.tags, &["x"]);
    }

    #[test]
    fn test_map_tags_keeps_table() {
        let t = table(&[("01", "one"), ("02", "two")]);
        let before = t.table.clone();
        let mapped = t.map_tags(str::len);
        assert_eq!(mapped.table, before);
        assert_eq!(mapped.matching(&[0x01]), &[3]);
    }

    #[test]
    fn test_char_automaton_lowering() {
        let dfa = determinize(&parse_chars("ab|c", Some("t")).unwrap());
        let t = ByteDfa::from_dfa(dfa, ascii_byte);
        assert!(t.matches(b"ab"));
        assert!(t.matches(b"c"));
        assert!(!t.matches(b"a"));
    }

    #[test]
    #[should_panic(expected = "no byte mapping")]
    fn test_unmapped_symbol_panics() {
        let dfa = determinize(&parse_chars("ab", Some("t")).unwrap());
        ByteDfa::from_dfa(dfa, |c| (c == 'a').then_some(b'a'));
    }

    #[test]
    fn test_dot_collapses_ranges() {
        let t = table(&[("00 .", "x")]);
        let dot = t.to_dot();
        assert!(dot.starts_with("digraph table {"));
        assert!(dot.contains("label=\"00\""));
        assert!(dot.contains("label=\"00-FF\""));
        assert!(!dot.contains(&format!("s{} ", t.dead())));
    }

    #[test]
    fn test_serde_round_trip() {
        let t = table(&[("00 (AA|55)* 00", "frame")]);
        let json = serde_json::to_string(&t).unwrap();
        let back: ByteDfa<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.matching(&[0x00, 0xAA, 0x00]), &["frame".to_string()]);
        assert_eq!(back.state_count(), t.state_count());
    }

    #[test]
    fn test_corrupt_tables_rejected() {
        let t = table(&[("00", "x")]);
        let good = serde_json::to_value(&t).unwrap();

        let mut bad_target = good.clone();
        bad_target["table"][0] = serde_json::json!(99);
        assert!(serde_json::from_value::<ByteDfa<String>>(bad_target).is_err());

        let mut short = good.clone();
        short["table"].as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<ByteDfa<String>>(short).is_err());

        let mut live_dead = good.clone();
        let dead = t.dead();
        live_dead["table"][dead * ROW] = serde_json::json!(0);
        assert!(serde_json::from_value::<ByteDfa<String>>(live_dead).is_err());

        let mut accepting_dead = good.clone();
        accepting_dead["accept"][dead] = serde_json::json!(["y"]);
        assert!(serde_json::from_value::<ByteDfa<String>>(accepting_dead).is_err());

        let mut bad_start = good;
        bad_start["start"] = serde_json::json!(dead);
        let err = serde_json::from_value::<ByteDfa<String>>(bad_start).unwrap_err();
        assert!(err.to_string().contains("corrupt byte table"));
    }
}
