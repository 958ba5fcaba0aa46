// Alphabet abstraction
//
// The automaton stages are generic over the symbol type so the same
// pipeline can run on raw bytes (production) and on characters (tests and
// graph dumps). Conversion to bytes happens only in the byte compiler,
// through a mapping function passed in by the caller.

use std::fmt;
use std::hash::Hash;

/// An element of a pattern alphabet
pub trait Symbol: Copy + Ord + Hash + fmt::Debug {
    /// Every symbol the `.` wildcard stands for
    fn wildcard() -> Vec<Self>;

    /// Edge label used in graph output
    fn label(&self) -> String;
}

impl Symbol for u8 {
    fn wildcard() -> Vec<Self> {
        (0..=u8::MAX).collect()
    }

    fn label(&self) -> String {
        format!("{:02X}", self)
    }
}

impl Symbol for char {
    fn wildcard() -> Vec<Self> {
        (0x20u8..=0x7E).map(char::from).collect()
    }

    fn label(&self) -> String {
        match self {
            '"' => "\\\"".to_string(),
            '\\' => "\\\\".to_string(),
            c => c.to_string(),
        }
    }
}

/// Byte mapping for the character alphabet
///
/// The character lexer only admits ASCII, so every symbol of a character
/// automaton has a mapping.
pub fn ascii_byte(c: char) -> Option<u8> {
    c.is_ascii().then_some(c as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_wildcard_covers_all_bytes() {
        let all = u8::wildcard();
        assert_eq!(all.len(), 256);
        assert_eq!(all[0], 0x00);
        assert_eq!(all[255], 0xFF);
    }

    #[test]
    fn test_char_wildcard_is_printable_ascii() {
        let all = char::wildcard();
        assert_eq!(all.len(), 95);
        assert!(all.contains(&' '));
        assert!(all.contains(&'~'));
        assert!(!all.contains(&'\n'));
    }

    #[test]
    fn test_labels() {
        assert_eq!(0x0Au8.label(), "0A");
        assert_eq!('a'.label(), "a");
        assert_eq!('"'.label(), "\\\"");
    }

    #[test]
    fn test_ascii_byte() {
        assert_eq!(ascii_byte('A'), Some(0x41));
        assert_eq!(ascii_byte('é'), None);
    }
}
