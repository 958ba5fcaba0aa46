//! Graphviz helpers shared by the automaton dumps

/// Node shape for a state: start states are double-bordered, accepting
/// states are octagons
pub(crate) fn shape(start: bool, accepting: bool) -> &'static str {
    match (start, accepting) {
        (true, true) => "doubleoctagon",
        (true, false) => "doublecircle",
        (false, true) => "octagon",
        (false, false) => "circle",
    }
}

/// Collapse a sorted byte list into `lo-hi` runs, e.g. `00-1F,41`
pub(crate) fn byte_ranges(bytes: &[u8]) -> String {
    let mut runs: Vec<(u8, u8)> = Vec::new();
    for &b in bytes {
        match runs.last_mut() {
            Some((_, hi)) if hi.checked_add(1) == Some(b) => *hi = b,
            _ => runs.push((b, b)),
        }
    }

    runs.iter()
        .map(|&(lo, hi)| {
            if lo == hi {
                format!("{:02X}", lo)
            } else {
                format!("{:02X}-{:02X}", lo, hi)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        assert_eq!(shape(true, true), "doubleoctagon");
        assert_eq!(shape(false, false), "circle");
    }

    #[test]
    fn test_byte_ranges() {
        assert_eq!(byte_ranges(&[0x00, 0x01, 0x02, 0x41, 0xFE, 0xFF]), "00-02,41,FE-FF");
        assert_eq!(byte_ranges(&[0x10]), "10");
        assert_eq!(byte_ranges(&[]), "");
    }
}
