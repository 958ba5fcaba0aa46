//! Error types for the pattern compiler

use std::fmt;
use thiserror::Error;

/// What went wrong while reading a pattern string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The pattern contains no tokens at all
    EmptyPattern,

    /// An alternative or group with nothing in it (`|00`, `00|`, `()`)
    EmptyAlternative,

    /// A `(` that is never closed, or a `)` with no matching `(`
    UnbalancedParen,

    /// A literal that is not valid for the alphabet (odd hex run, non-hex
    /// character in byte mode, non-ASCII character in character mode)
    MalformedLiteral,

    /// A postfix operator with no term before it
    NothingToRepeat,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SyntaxErrorKind::EmptyPattern => "empty pattern",
            SyntaxErrorKind::EmptyAlternative => "empty alternative",
            SyntaxErrorKind::UnbalancedParen => "unbalanced parenthesis",
            SyntaxErrorKind::MalformedLiteral => "malformed literal",
            SyntaxErrorKind::NothingToRepeat => "repetition operator with nothing to repeat",
        };
        f.write_str(msg)
    }
}

/// A pattern string could not be parsed
///
/// `position` is a byte offset into `pattern`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at position {position} in pattern '{pattern}'")]
pub struct PatternSyntaxError {
    pub pattern: String,
    pub position: usize,
    pub kind: SyntaxErrorKind,
}

impl PatternSyntaxError {
    pub fn new(pattern: impl Into<String>, position: usize, kind: SyntaxErrorKind) -> Self {
        Self {
            pattern: pattern.into(),
            position,
            kind,
        }
    }

    /// Two-line rendering with a caret under the offending position
    pub fn caret(&self) -> String {
        // Characters that end at or before the offset; an offset inside a
        // multi-byte character points at that character
        let column = self
            .pattern
            .char_indices()
            .take_while(|&(start, ch)| start + ch.len_utf8() <= self.position)
            .count();
        format!("{}\n{}^", self.pattern, " ".repeat(column))
    }
}

/// Errors that can occur while compiling a pattern set
#[derive(Debug, Error)]
pub enum RegexError {
    #[error("pattern {index}: {source}")]
    Syntax {
        index: usize,
        #[source]
        source: PatternSyntaxError,
    },

    #[error("DFA state limit exceeded: {states} states (max: {max})")]
    StateLimitExceeded { states: usize, max: usize },

    #[error("corrupt byte table: {0}")]
    CorruptTable(String),
}

impl RegexError {
    pub fn syntax(index: usize, source: PatternSyntaxError) -> Self {
        RegexError::Syntax { index, source }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        RegexError::CorruptTable(message.into())
    }
}

/// Result type for compiler operations
pub type RegexResult<T> = Result<T, RegexError>;
