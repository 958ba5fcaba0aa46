//! Cross-stage agreement, persistence and sharing of compiled tables

use reflex_regex::{
    ascii_byte, compile, compile_chars, determinize, minimize, parse_bytes, parse_chars, ByteDfa,
    Compiler, CompilerConfig, Nfa, RegexError, SyntaxErrorKind,
};

/// Every sequence over `alphabet` up to `max_len` symbols, shortest first
fn inputs<S: Copy>(alphabet: &[S], max_len: usize) -> Vec<Vec<S>> {
    let mut all = vec![Vec::new()];
    let mut frontier: Vec<Vec<S>> = vec![Vec::new()];
    for _ in 0..max_len {
        frontier = frontier
            .iter()
            .flat_map(|prefix| {
                alphabet.iter().map(move |&sym| {
                    let mut next = prefix.clone();
                    next.push(sym);
                    next
                })
            })
            .collect();
        all.extend(frontier.iter().cloned());
    }
    all
}

const FRAME_PATTERNS: [(&str, &str); 5] = [
    ("00 (AA|55)+ 00", "frame"),
    ("00 .* 00", "wrapped"),
    ("(01|AA)? 55*", "tail"),
    ("((00|01) FF)+", "pairs"),
    ("00 AA 00", "exact"),
];

#[test]
fn test_all_stages_agree_on_bytes() {
    let nfa = Nfa::merge(
        FRAME_PATTERNS
            .iter()
            .map(|&(p, t)| parse_bytes(p, Some(t)).unwrap()),
    );
    let dfa = determinize(&nfa);
    let min = minimize(&dfa);
    let table = ByteDfa::from_dfa(min.clone(), Some);

    assert!(min.state_count() <= dfa.state_count());

    for input in inputs(&[0x00, 0x01, 0x55, 0xAA, 0xFF], 5) {
        let expected = nfa.matching(&input);
        assert_eq!(dfa.matching(&input), expected.as_slice(), "dfa on {:02X?}", input);
        assert_eq!(min.matching(&input), expected.as_slice(), "min on {:02X?}", input);
        assert_eq!(table.matching(&input), expected.as_slice(), "table on {:02X?}", input);

        let accepted = nfa.matches(&input);
        assert_eq!(dfa.matches(&input), accepted);
        assert_eq!(min.matches(&input), accepted);
        assert_eq!(table.matches(&input), accepted);
    }
}

#[test]
fn test_known_frames() {
    let matcher = compile(FRAME_PATTERNS).unwrap();
    assert_eq!(
        matcher.matching(&[0x00, 0xAA, 0x00]),
        &["frame", "wrapped", "exact"]
    );
    assert_eq!(matcher.matching(&[]), &["tail"]);
    assert_eq!(matcher.matching(&[0x01, 0xFF, 0x00, 0xFF]), &["pairs"]);
}

#[test]
fn test_unminimized_compile_agrees() {
    let min = compile(FRAME_PATTERNS).unwrap();
    let full = Compiler::new(CompilerConfig {
        minimize: false,
        ..CompilerConfig::default()
    })
    .compile(FRAME_PATTERNS)
    .unwrap();

    assert!(min.stats().table_states <= full.stats().table_states);
    for input in inputs(&[0x00, 0x55, 0xAA, 0xFF], 4) {
        assert_eq!(min.matching(&input), full.matching(&input), "input {:02X?}", input);
    }
}

#[test]
fn test_all_stages_agree_on_chars() {
    let patterns = [("a(b|c)*d", "word"), ("a.*", "prefixed"), ("(ab)+|ba?", "pairs")];

    let nfa = Nfa::merge(
        patterns
            .iter()
            .map(|&(p, t)| parse_chars(p, Some(t)).unwrap()),
    );
    let dfa = determinize(&nfa);
    let min = minimize(&dfa);
    let table = ByteDfa::from_dfa(min.clone(), ascii_byte);
    let compiled = compile_chars(patterns).unwrap();

    for input in inputs(&['a', 'b', 'c', 'd'], 5) {
        let bytes: Vec<u8> = input.iter().map(|&c| c as u8).collect();
        let expected = nfa.matching(&input);
        assert_eq!(dfa.matching(&input), expected.as_slice());
        assert_eq!(min.matching(&input), expected.as_slice());
        assert_eq!(table.matching(&bytes), expected.as_slice());
        assert_eq!(compiled.matching(&bytes), expected.as_slice(), "input {:?}", input);
    }
}

#[test]
fn test_char_mode_escapes_operators() {
    let matcher = compile_chars(vec![(r"1\+1", "sum"), (r"\(x\)", "paren")]).unwrap();
    assert!(matcher.matches(b"1+1"));
    assert!(!matcher.matches(b"11"));
    assert!(matcher.matches(b"(x)"));
}

#[test]
fn test_table_survives_json() {
    let matcher = compile(FRAME_PATTERNS).unwrap();
    let json = serde_json::to_string(matcher.table()).unwrap();
    let restored: ByteDfa<String> = serde_json::from_str(&json).unwrap();

    for input in inputs(&[0x00, 0x55, 0xAA, 0xFF], 4) {
        let original: Vec<String> = matcher
            .matching(&input)
            .iter()
            .map(|tag| tag.to_string())
            .collect();
        assert_eq!(restored.matching(&input), original.as_slice());
    }
}

#[test]
fn test_corrupt_json_is_rejected() {
    let matcher = compile(vec![("00 01", "x")]).unwrap();
    let mut value = serde_json::to_value(matcher.table()).unwrap();
    value["dead"] = serde_json::json!(0);

    let err = serde_json::from_value::<ByteDfa<String>>(value).unwrap_err();
    assert!(err.to_string().contains("corrupt byte table"));
}

#[test]
fn test_syntax_errors_surface_through_compile() {
    let cases = [
        ("", SyntaxErrorKind::EmptyPattern, 0),
        ("00 |", SyntaxErrorKind::EmptyAlternative, 4),
        ("(00", SyntaxErrorKind::UnbalancedParen, 0),
        ("00)", SyntaxErrorKind::UnbalancedParen, 2),
        ("0G", SyntaxErrorKind::MalformedLiteral, 0),
        ("+00", SyntaxErrorKind::NothingToRepeat, 0),
    ];

    for (pattern, kind, position) in cases {
        match compile(vec![("00", "ok"), (pattern, "bad")]) {
            Err(RegexError::Syntax { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source.kind, kind, "pattern {:?}", pattern);
                assert_eq!(source.position, position, "pattern {:?}", pattern);
            }
            other => panic!("pattern {:?}: unexpected {:?}", pattern, other.map(|m| m.stats())),
        }
    }
}

#[test]
fn test_concurrent_matching() {
    let matcher = compile(FRAME_PATTERNS).unwrap();
    let frames = inputs(&[0x00, 0xAA, 0xFF], 4);
    let expected: Vec<Vec<&str>> = frames.iter().map(|f| matcher.matching(f).to_vec()).collect();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for (frame, tags) in frames.iter().zip(&expected) {
                    assert_eq!(matcher.matching(frame), tags.as_slice());
                }
            });
        }
    });
}
