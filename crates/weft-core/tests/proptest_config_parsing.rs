//! Property-based tests for reading `RuntimeConfig` from environment
//! variables.
//!
//! 1. Any string in any variable yields a config or an `InvalidEnv` naming
//!    that variable; parsing never panics.
//! 2. Positive integers round-trip through every numeric variable,
//!    surrounding whitespace included.
//! 3. Zero is always rejected.
//! 4. Flag spellings are case-insensitive.

use proptest::prelude::*;
use weft_core::{ConfigError, RuntimeConfig};

const NUMERIC: [&str; 3] = [
    RuntimeConfig::ENV_MAX_NOTIFY_DEPTH,
    RuntimeConfig::ENV_MAX_FLUSH_PASSES,
    RuntimeConfig::ENV_MAX_SEQUENCE_LEN,
];

fn only(var: &'static str, value: String) -> impl Fn(&str) -> Option<String> {
    move |name| (name == var).then(|| value.clone())
}

fn numeric_field(config: &RuntimeConfig, var: &str) -> u32 {
    match var {
        RuntimeConfig::ENV_MAX_NOTIFY_DEPTH => config.max_notify_depth,
        RuntimeConfig::ENV_MAX_FLUSH_PASSES => config.max_flush_passes,
        _ => config.max_sequence_len,
    }
}

fn any_var() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(RuntimeConfig::ENV_MAX_NOTIFY_DEPTH),
        Just(RuntimeConfig::ENV_MAX_FLUSH_PASSES),
        Just(RuntimeConfig::ENV_MAX_SEQUENCE_LEN),
        Just(RuntimeConfig::ENV_WARN_READONLY),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Arbitrary input
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn arbitrary_values_parse_or_name_the_variable(var in any_var(), value in ".{0,24}") {
        match RuntimeConfig::from_lookup(only(var, value.clone())) {
            Ok(_) => {}
            Err(ConfigError::InvalidEnv { var: bad, value: seen, .. }) => {
                prop_assert_eq!(bad, var);
                prop_assert_eq!(seen, value);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–3. Numeric variables
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn positive_integers_round_trip(
        idx in 0usize..NUMERIC.len(),
        n in 1u32..,
        pad_left in " {0,2}",
        pad_right in " {0,2}",
    ) {
        let var = NUMERIC[idx];
        let config = RuntimeConfig::from_lookup(only(var, format!("{pad_left}{n}{pad_right}")))
            .unwrap();
        prop_assert_eq!(numeric_field(&config, var), n);
    }

    #[test]
    fn zero_is_rejected(idx in 0usize..NUMERIC.len(), zeros in "0{1,4}") {
        let var = NUMERIC[idx];
        let err = RuntimeConfig::from_lookup(only(var, zeros)).unwrap_err();
        prop_assert!(err.to_string().contains("greater than zero"));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Flags
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn flag_spellings_ignore_case(
        spelling in prop_oneof![
            Just(("true", true)), Just(("yes", true)), Just(("on", true)), Just(("1", true)),
            Just(("false", false)), Just(("no", false)), Just(("off", false)), Just(("0", false)),
        ],
        upper in proptest::collection::vec(any::<bool>(), 5),
    ) {
        let (word, expected) = spelling;
        let mixed: String = word
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        let config = RuntimeConfig::from_lookup(only(RuntimeConfig::ENV_WARN_READONLY, mixed))
            .unwrap();
        prop_assert_eq!(config.warn_on_readonly, expected);
    }
}
