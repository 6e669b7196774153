// Property-based tests for key script parsing.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use tagcalc_cli::script::{parse, Key};

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn escape(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

fn arb_named() -> impl Strategy<Value = (&'static str, Key)> {
    proptest::sample::select(vec![
        ("{enter}", Key::Enter),
        ("{tab}", Key::Tab),
        ("{bs}", Key::Backspace),
        ("{esc}", Key::Escape),
        ("{up}", Key::Up),
        ("{down}", Key::Down),
    ])
}

proptest! {
    #![proptest_config(config_256())]

    /// Escaped text types exactly its own characters.
    #[test]
    fn escaped_text_types_itself(text in "\\PC{0,40}") {
        let keys = parse(&escape(&text)).unwrap();
        let expected: Vec<Key> = text.chars().map(Key::Char).collect();
        prop_assert_eq!(keys, expected);
    }

    /// Named keys interleave with typed text in order.
    #[test]
    fn named_keys_keep_position(
        parts in prop::collection::vec(("[a-z0-9+*]{0,4}", arb_named()), 0..8)
    ) {
        let mut script = String::new();
        let mut expected = Vec::new();
        for (text, (name, key)) in &parts {
            script.push_str(text);
            expected.extend(text.chars().map(Key::Char));
            script.push_str(name);
            expected.push(*key);
        }
        prop_assert_eq!(parse(&script).unwrap(), expected);
    }
}
