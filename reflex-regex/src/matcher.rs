// Compiled matcher - the pattern-set entry point
//
// Runs the whole pipeline for a batch of tagged patterns:
// parse each -> merge -> determinize -> minimize -> lower to a byte table.
// A batch is all-or-nothing; the first bad pattern fails it.

use crate::bytes::{ByteDfa, MatchReport};
use crate::dfa::determinize_bounded;
use crate::error::PatternSyntaxError;
use crate::minimize::minimize;
use crate::nfa::Nfa;
use crate::parser::{parse_bytes, parse_chars};
use crate::symbol::{ascii_byte, Symbol};
use crate::{CompilerConfig, RegexError, RegexResult};
use serde::Serialize;
use std::hash::Hash;
use tracing::debug;

/// State counts of each pipeline stage for one compile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    pub patterns: usize,
    pub nfa_states: usize,
    pub dfa_states: usize,

    /// Equal to `dfa_states` when minimization is disabled
    pub minimized_states: usize,

    /// Byte table rows, dead sink included
    pub table_states: usize,
}

/// A compiled pattern set, ready to classify frames
///
/// Immutable; safe to share between threads.
#[derive(Debug, Clone)]
pub struct CompiledMatcher<T> {
    table: ByteDfa<T>,
    stats: CompileStats,
}

impl<T> CompiledMatcher<T> {
    /// Whether any pattern matches the whole input
    pub fn matches(&self, input: &[u8]) -> bool {
        self.table.matches(input)
    }

    /// Tags of every pattern matching the whole input, in declaration order
    pub fn matching(&self, input: &[u8]) -> &[T] {
        self.table.matching(input)
    }

    pub fn explain(&self, input: &[u8]) -> MatchReport<'_, T> {
        self.table.explain(input)
    }

    pub fn table(&self) -> &ByteDfa<T> {
        &self.table
    }

    pub fn into_table(self) -> ByteDfa<T> {
        self.table
    }

    pub fn stats(&self) -> CompileStats {
        self.stats
    }

    pub fn map_tags<U>(self, f: impl FnMut(T) -> U) -> CompiledMatcher<U> {
        CompiledMatcher {
            table: self.table.map_tags(f),
            stats: self.stats,
        }
    }

    pub fn to_dot(&self) -> String {
        self.table.to_dot()
    }

    /// Create a builder for constructing a CompiledMatcher
    pub fn builder() -> MatcherBuilder<T> {
        MatcherBuilder::default()
    }
}

/// Pattern-set compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile byte-mode patterns
    pub fn compile<T, P>(&self, patterns: impl IntoIterator<Item = (P, T)>) -> RegexResult<CompiledMatcher<T>>
    where
        T: Clone + Eq + Hash,
        P: AsRef<str>,
    {
        let (count, nfa) = merge_patterns(patterns, parse_bytes)?;
        self.lower(count, nfa, Some)
    }

    /// Compile character-mode patterns; characters map to their ASCII byte
    pub fn compile_chars<T, P>(
        &self,
        patterns: impl IntoIterator<Item = (P, T)>,
    ) -> RegexResult<CompiledMatcher<T>>
    where
        T: Clone + Eq + Hash,
        P: AsRef<str>,
    {
        let (count, nfa) = merge_patterns(patterns, parse_chars)?;
        self.lower(count, nfa, ascii_byte)
    }

    /// Parse and merge byte-mode patterns without determinizing
    pub fn build_nfa<T, P>(&self, patterns: impl IntoIterator<Item = (P, T)>) -> RegexResult<Nfa<u8, T>>
    where
        P: AsRef<str>,
    {
        merge_patterns(patterns, parse_bytes).map(|(_, nfa)| nfa)
    }

    /// Parse and merge character-mode patterns without determinizing
    pub fn build_nfa_chars<T, P>(
        &self,
        patterns: impl IntoIterator<Item = (P, T)>,
    ) -> RegexResult<Nfa<char, T>>
    where
        P: AsRef<str>,
    {
        merge_patterns(patterns, parse_chars).map(|(_, nfa)| nfa)
    }

    fn lower<S, T>(
        &self,
        patterns: usize,
        nfa: Nfa<S, T>,
        to_byte: impl FnMut(S) -> Option<u8>,
    ) -> RegexResult<CompiledMatcher<T>>
    where
        S: Symbol,
        T: Clone + Eq + Hash,
    {
        let nfa_states = nfa.state_count();

        let dfa = determinize_bounded(&nfa, self.config.max_dfa_states)?;
        let dfa_states = dfa.state_count();

        let dfa = if self.config.minimize {
            minimize(&dfa)
        } else {
            dfa
        };
        let minimized_states = dfa.state_count();

        let table = ByteDfa::from_dfa(dfa, to_byte);
        let stats = CompileStats {
            patterns,
            nfa_states,
            dfa_states,
            minimized_states,
            table_states: table.state_count(),
        };

        debug!(
            patterns,
            nfa_states,
            dfa_states,
            minimized_states,
            table_states = stats.table_states,
            "Compiled pattern set"
        );

        Ok(CompiledMatcher { table, stats })
    }
}

fn merge_patterns<S, T, P>(
    patterns: impl IntoIterator<Item = (P, T)>,
    parse: impl Fn(&str, Option<T>) -> Result<Nfa<S, T>, PatternSyntaxError>,
) -> RegexResult<(usize, Nfa<S, T>)>
where
    S: Symbol,
    P: AsRef<str>,
{
    let nfas = patterns
        .into_iter()
        .enumerate()
        .map(|(index, (pattern, tag))| {
            parse(pattern.as_ref(), Some(tag)).map_err(|e| RegexError::syntax(index, e))
        })
        .collect::<RegexResult<Vec<_>>>()?;

    Ok((nfas.len(), Nfa::merge(nfas)))
}

/// Compile byte-mode patterns with the default configuration
pub fn compile<T, P>(patterns: impl IntoIterator<Item = (P, T)>) -> RegexResult<CompiledMatcher<T>>
where
    T: Clone + Eq + Hash,
    P: AsRef<str>,
{
    Compiler::default().compile(patterns)
}

/// Compile character-mode patterns with the default configuration
pub fn compile_chars<T, P>(patterns: impl IntoIterator<Item = (P, T)>) -> RegexResult<CompiledMatcher<T>>
where
    T: Clone + Eq + Hash,
    P: AsRef<str>,
{
    Compiler::default().compile_chars(patterns)
}

/// Builder for constructing a CompiledMatcher
pub struct MatcherBuilder<T> {
    patterns: Vec<(String, T)>,
    config: CompilerConfig,
}

impl<T> Default for MatcherBuilder<T> {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            config: CompilerConfig::default(),
        }
    }
}

impl<T: Clone + Eq + Hash> MatcherBuilder<T> {
    /// Add a tagged pattern
    pub fn add_pattern(mut self, pattern: impl Into<String>, tag: T) -> Self {
        self.patterns.push((pattern.into(), tag));
        self
    }

    /// Add multiple tagged patterns
    pub fn add_patterns<P: Into<String>>(mut self, patterns: impl IntoIterator<Item = (P, T)>) -> Self {
        self.patterns
            .extend(patterns.into_iter().map(|(p, tag)| (p.into(), tag)));
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build a byte-mode matcher
    pub fn build(self) -> RegexResult<CompiledMatcher<T>> {
        Compiler::new(self.config).compile(self.patterns)
    }

    /// Build a character-mode matcher
    pub fn build_chars(self) -> RegexResult<CompiledMatcher<T>> {
        Compiler::new(self.config).compile_chars(self.patterns)
    }
}
