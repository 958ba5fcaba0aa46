// Pattern tokenizer
//
// Two front ends share one token type: the byte lexer reads two-digit hex
// literals and ignores whitespace, the character lexer reads one ASCII
// character per literal and supports `\` escapes.

use crate::error::{PatternSyntaxError, SyntaxErrorKind};

/// Token kinds produced by the lexers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind<S> {
    Literal(S),
    Any,
    Star,
    Plus,
    Question,
    Pipe,
    LParen,
    RParen,
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<S> {
    pub kind: TokenKind<S>,
    pub pos: usize,
}

impl<S> Token<S> {
    fn new(kind: TokenKind<S>, pos: usize) -> Self {
        Self { kind, pos }
    }
}

fn operator<S>(ch: char) -> Option<TokenKind<S>> {
    match ch {
        '*' => Some(TokenKind::Star),
        '+' => Some(TokenKind::Plus),
        '?' => Some(TokenKind::Question),
        '|' => Some(TokenKind::Pipe),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '.' => Some(TokenKind::Any),
        _ => None,
    }
}

/// Tokenize a byte-mode pattern such as `"00 (AA|55)+ 0d"`
pub(crate) fn lex_bytes(pattern: &str) -> Result<Vec<Token<u8>>, PatternSyntaxError> {
    let malformed = |pos| PatternSyntaxError::new(pattern, pos, SyntaxErrorKind::MalformedLiteral);

    let mut tokens = Vec::with_capacity(pattern.len() / 2);
    // High nibble waiting for its partner, with the offset it was read at
    let mut pending: Option<(u8, usize)> = None;

    for (pos, ch) in pattern.char_indices() {
        if let Some(digit) = ch.to_digit(16) {
            let digit = digit as u8;
            match pending.take() {
                Some((high, start)) => {
                    tokens.push(Token::new(TokenKind::Literal((high << 4) | digit), start));
                }
                None => pending = Some((digit, pos)),
            }
            continue;
        }

        if let Some((_, start)) = pending {
            return Err(malformed(start));
        }

        if ch.is_ascii_whitespace() {
            continue;
        }

        match operator(ch) {
            Some(kind) => tokens.push(Token::new(kind, pos)),
            None => return Err(malformed(pos)),
        }
    }

    if let Some((_, start)) = pending {
        return Err(malformed(start));
    }

    Ok(tokens)
}

/// Tokenize a character-mode pattern such as `"ab(c|d)*"`
pub(crate) fn lex_chars(pattern: &str) -> Result<Vec<Token<char>>, PatternSyntaxError> {
    let mut tokens = Vec::with_capacity(pattern.len());
    // Offset of an unconsumed `\`
    let mut escape: Option<usize> = None;

    for (pos, ch) in pattern.char_indices() {
        if !ch.is_ascii() {
            return Err(PatternSyntaxError::new(
                pattern,
                pos,
                SyntaxErrorKind::MalformedLiteral,
            ));
        }

        if let Some(start) = escape.take() {
            tokens.push(Token::new(TokenKind::Literal(ch), start));
            continue;
        }

        if ch == '\\' {
            escape = Some(pos);
            continue;
        }

        let kind = operator(ch).unwrap_or(TokenKind::Literal(ch));
        tokens.push(Token::new(kind, pos));
    }

    // A trailing lone backslash stands for itself
    if let Some(start) = escape {
        tokens.push(Token::new(TokenKind::Literal('\\'), start));
    }

    Ok(tokens)
}
