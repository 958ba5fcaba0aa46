//! Postfix pattern program
//!
//! The parser flattens a pattern into operators in postfix order, so
//! `00 01* | 02` becomes `00 01 * concat(2) 02 alternate(2)`. Nesting depth
//! only ever lives in explicit stacks, never in the call stack or in boxed
//! trees.

/// Postfix repetition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Repeat {
    /// `e*`
    ZeroOrMore,
    /// `e+`
    OneOrMore,
    /// `e?`
    ZeroOrOne,
}

/// One instruction of a postfix program
///
/// `Concat(n)` and `Alternate(n)` consume the top `n` operands, with
/// `n >= 2`; `Repeat` wraps the top operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op<S> {
    Literal(S),
    Any,
    Repeat(Repeat),
    Concat(usize),
    Alternate(usize),
}
