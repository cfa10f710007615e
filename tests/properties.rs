//! Property-based tests for the pure routing and limiting logic

use proptest::prelude::*;
use saargate::middleware::{MemoryRateLimitStore, RateLimitStore};
use saargate::router::{FallbackResponder, is_complex_query};

proptest! {
    /// The fallback responder answers every prompt, deterministically
    #[test]
    fn fallback_always_answers_and_is_deterministic(prompt in ".{0,400}") {
        let responder = FallbackResponder::new();
        let first = responder.respond(&prompt);
        prop_assert!(!first.is_empty());
        prop_assert_eq!(first, responder.respond(&prompt));
    }

    /// Within one window the store allows exactly min(requests, max) calls
    #[test]
    fn store_never_exceeds_max_within_window(
        requests in 1usize..200,
        max in 1u32..50,
    ) {
        let store = MemoryRateLimitStore::new();
        let allowed = (0..requests)
            .filter(|_| store.check("client", max, 60_000, 1_000).allowed)
            .count() as u32;
        prop_assert_eq!(allowed, max.min(requests as u32));
    }

    /// Distinct keys never interfere with each other
    #[test]
    fn store_isolates_keys(key_a in "[a-z]{1,10}", key_b in "[A-Z]{1,10}") {
        let store = MemoryRateLimitStore::new();
        for _ in 0..5 {
            store.check(&key_a, 5, 60_000, 1_000);
        }
        // key_a is exhausted; key_b must still have its full window
        prop_assert!(!store.check(&key_a, 5, 60_000, 1_000).allowed);
        prop_assert!(store.check(&key_b, 5, 60_000, 1_000).allowed);
    }

    /// Prompts over the length threshold are always complex
    #[test]
    fn long_prompts_are_complex(filler in "[a-z ]{301,500}") {
        prop_assert!(is_complex_query(&filler));
    }

    /// Complexity classification is stable across repeated calls
    #[test]
    fn complexity_is_deterministic(prompt in ".{0,350}") {
        prop_assert_eq!(is_complex_query(&prompt), is_complex_query(&prompt));
    }
}
