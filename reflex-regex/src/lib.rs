// Reflex Regex - Byte-Pattern Compiler and Table-Driven Matcher
//!
// This crate compiles tagged byte patterns such as `"00 ((AA|55) 01)+ 00"`
// into a dense transition table that classifies a whole frame in one pass,
// one table lookup per byte and no allocation.
//
// ## Pipeline
//
// ```text
//  pattern strings + tags
//          │  lexer / parser
//          v
//  Thompson NFA per pattern ──> merged NFA (one start, declaration order)
//          │  subset construction
//          v
//  DFA over the explicit alphabet
//          │  trim + partition refinement
//          v
//  minimal DFA
//          │  symbol -> byte, dead-state fill
//          v
//  ByteDfa (state x 256 table)  ──> matches / matching / explain
// ```
//
// Every stage is generic over the alphabet (`u8` in production, `char` for
// tests and graph dumps); only the byte compiler needs a symbol -> byte map.

mod bytes;
mod dfa;
mod dot;
mod error;
mod lexer;
mod matcher;
mod minimize;
mod nfa;
mod parser;
mod program;
mod symbol;

pub use bytes::{ByteDfa, MatchReport, Mismatch};
pub use dfa::{determinize, determinize_bounded, Dfa, DfaState};
pub use error::{PatternSyntaxError, RegexError, RegexResult, SyntaxErrorKind};
pub use matcher::{compile, compile_chars, CompileStats, CompiledMatcher, Compiler, MatcherBuilder};
pub use minimize::minimize;
pub use nfa::{Nfa, NfaState, StateId, Tags};
pub use parser::{parse_bytes, parse_chars};
pub use symbol::{ascii_byte, Symbol};

use serde::{Deserialize, Serialize};

/// Configuration for the pattern compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Reduce the DFA to its minimal form before building the byte table
    pub minimize: bool,

    /// Maximum DFA states per compile (0 = unlimited)
    pub max_dfa_states: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            minimize: true,
            max_dfa_states: 0,
        }
    }
}
