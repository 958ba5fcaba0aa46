// Pattern parser
//
// Binding strength, loosest first: alternation `a|b`, concatenation,
// postfix `* + ?`, then atoms (literal, `.`, parenthesized group).
//
//   alternation := concat ('|' concat)*
//   concat      := repeat+
//   repeat      := atom ('*' | '+' | '?')*
//   atom        := LITERAL | '.' | '(' alternation ')'
//
// The grammar is run as a single left-to-right pass that emits a postfix
// program. Each open group is a frame on an explicit stack, so nesting depth
// is bounded by memory rather than by the thread's stack.

use crate::error::{PatternSyntaxError, SyntaxErrorKind};
use crate::lexer::{self, Token, TokenKind};
use crate::nfa::Nfa;
use crate::program::{Op, Repeat};
use crate::symbol::Symbol;

/// Parse a byte-mode pattern into an automaton; `tag` marks its accept state
pub fn parse_bytes<T>(pattern: &str, tag: Option<T>) -> Result<Nfa<u8, T>, PatternSyntaxError> {
    let tokens = lexer::lex_bytes(pattern)?;
    let program = parse_tokens(pattern, &tokens)?;
    tracing::trace!(pattern, tokens = tokens.len(), ops = program.len(), "Parsed byte pattern");
    Ok(Nfa::from_program(&program, tag))
}

/// Parse a character-mode pattern into an automaton
pub fn parse_chars<T>(pattern: &str, tag: Option<T>) -> Result<Nfa<char, T>, PatternSyntaxError> {
    let tokens = lexer::lex_chars(pattern)?;
    let program = parse_tokens(pattern, &tokens)?;
    tracing::trace!(pattern, tokens = tokens.len(), ops = program.len(), "Parsed character pattern");
    Ok(Nfa::from_program(&program, tag))
}

/// Alternation being collected: the top level or one open group
#[derive(Debug, Default)]
struct Group {
    /// Offset of the `(`, `None` at the top level
    open: Option<usize>,
    /// Operands emitted for the current branch so far
    terms: usize,
    /// Branches already completed
    branches: usize,
}

impl Group {
    fn opened_at(pos: usize) -> Self {
        Self {
            open: Some(pos),
            ..Self::default()
        }
    }

    /// Close the current branch; `false` if it was empty
    fn end_branch<S>(&mut self, ops: &mut Vec<Op<S>>) -> bool {
        match self.terms {
            0 => return false,
            1 => {}
            n => ops.push(Op::Concat(n)),
        }
        self.terms = 0;
        self.branches += 1;
        true
    }

    /// Close the last branch and join all branches into one operand
    fn finish<S>(mut self, ops: &mut Vec<Op<S>>) -> bool {
        if !self.end_branch(ops) {
            return false;
        }
        if self.branches > 1 {
            ops.push(Op::Alternate(self.branches));
        }
        true
    }
}

pub(crate) fn parse_tokens<S: Symbol>(
    pattern: &str,
    tokens: &[Token<S>],
) -> Result<Vec<Op<S>>, PatternSyntaxError> {
    let error =
        |position: usize, kind: SyntaxErrorKind| PatternSyntaxError::new(pattern, position, kind);

    if tokens.is_empty() {
        return Err(error(0, SyntaxErrorKind::EmptyPattern));
    }

    let mut ops = Vec::with_capacity(tokens.len());
    let mut current = Group::default();
    let mut enclosing: Vec<Group> = Vec::new();

    for tok in tokens {
        match tok.kind {
            TokenKind::Literal(sym) => {
                ops.push(Op::Literal(sym));
                current.terms += 1;
            }
            TokenKind::Any => {
                ops.push(Op::Any);
                current.terms += 1;
            }
            TokenKind::Star | TokenKind::Plus | TokenKind::Question => {
                if current.terms == 0 {
                    return Err(error(tok.pos, SyntaxErrorKind::NothingToRepeat));
                }
                let op = match tok.kind {
                    TokenKind::Star => Repeat::ZeroOrMore,
                    TokenKind::Plus => Repeat::OneOrMore,
                    _ => Repeat::ZeroOrOne,
                };
                ops.push(Op::Repeat(op));
            }
            TokenKind::Pipe => {
                if !current.end_branch(&mut ops) {
                    return Err(error(tok.pos, SyntaxErrorKind::EmptyAlternative));
                }
            }
            TokenKind::LParen => {
                enclosing.push(std::mem::replace(&mut current, Group::opened_at(tok.pos)));
            }
            TokenKind::RParen => {
                if current.terms == 0 {
                    return Err(error(tok.pos, SyntaxErrorKind::EmptyAlternative));
                }
                let Some(parent) = enclosing.pop() else {
                    return Err(error(tok.pos, SyntaxErrorKind::UnbalancedParen));
                };
                std::mem::replace(&mut current, parent).finish(&mut ops);
                current.terms += 1;
            }
        }
    }

    // Running off the end inside a group is the innermost group's fault
    if let Some(open) = current.open {
        return Err(error(open, SyntaxErrorKind::UnbalancedParen));
    }
    if !current.finish(&mut ops) {
        return Err(error(pattern.len(), SyntaxErrorKind::EmptyAlternative));
    }

    Ok(ops)
}
