//! Invariant tests for the token-ring model and sub-range generator.
//!
//! # Test Strategy
//!
//! 1. **Generator invariants**: contiguity, slice count, endpoint identity
//! 2. **Wrap-around**: ranges crossing the ring's wrap point
//! 3. **Preceding-token lookup**: ordering and wrap behavior
//! 4. **Both regimes**: signed-64 (Murmur3) and unsigned-128 (Random)

use corelib::{Partitioner, SubRange, SubRanges, TokenRing};
use proptest::prelude::*;

fn slices(p: Partitioner, start: i128, stop: i128, steps: u32) -> Vec<SubRange> {
    SubRanges::new(p, start, stop, steps).collect()
}

// ============================================================================
// Generator Invariants (property tests)
// ============================================================================

proptest! {
    // The formatted end of slice i equals the formatted start of slice i+1,
    // the first start is format(start) and the last end is format(stop).
    #[test]
    fn prop_non_wrapping_slices_are_contiguous(
        a in -1_000_000_000i128..1_000_000_000,
        span in 1i128..5_000_000,
        steps in 1u32..300,
    ) {
        let p = Partitioner::Murmur3;
        let start = a;
        let stop = a + span;
        let out = slices(p, start, stop, steps);

        prop_assert!(!out.is_empty());
        prop_assert_eq!(&out[0].start, &p.format(start));
        prop_assert_eq!(&out[out.len() - 1].end, &p.format(stop));
        for pair in out.windows(2) {
            prop_assert_eq!(&pair[0].end, &pair[1].start);
        }
    }

    // Never more slices than requested steps, and step indices are
    // 1-based and monotone.
    #[test]
    fn prop_slice_count_bounded_by_steps(
        a in -1_000_000_000i128..1_000_000_000,
        span in 1i128..5_000_000,
        steps in 1u32..300,
    ) {
        let out = slices(Partitioner::Murmur3, a, a + span, steps);
        prop_assert!(out.len() <= steps as usize);
        for (i, s) in out.iter().enumerate() {
            prop_assert_eq!(s.step, (i + 1) as u32);
        }
    }

    // Wrapping ranges keep the same invariants.
    #[test]
    fn prop_wrapping_slices_are_contiguous(
        head in 1i128..1_000_000,
        tail in 1i128..1_000_000,
        steps in 1u32..300,
    ) {
        let p = Partitioner::Murmur3;
        let start = p.range_max() - head;
        let stop = p.range_min() + tail;
        let out = slices(p, start, stop, steps);

        prop_assert!(!out.is_empty());
        prop_assert!(out.len() <= steps as usize);
        prop_assert_eq!(&out[0].start, &p.format(start));
        prop_assert_eq!(&out[out.len() - 1].end, &p.format(stop));
        for pair in out.windows(2) {
            prop_assert_eq!(&pair[0].end, &pair[1].start);
        }
    }

    // The unsigned-128 regime is exercised with the same invariants; its
    // range_max sits at the top of i128, which is where overflow would bite.
    #[test]
    fn prop_random_regime_wrap(
        head in 1i128..1_000_000,
        tail in 1i128..1_000_000,
        steps in 1u32..300,
    ) {
        let p = Partitioner::Random;
        let start = p.range_max() - head;
        let stop = p.range_min() + tail;
        let out = slices(p, start, stop, steps);

        prop_assert!(!out.is_empty());
        prop_assert!(out.len() <= steps as usize);
        prop_assert_eq!(&out[out.len() - 1].end, &p.format(stop));
        for pair in out.windows(2) {
            prop_assert_eq!(&pair[0].end, &pair[1].start);
        }
    }
}

// ============================================================================
// Wrap-Around Scenario
// ============================================================================

#[test]
fn test_wrap_around_four_slices() {
    // start = RANGE_MAX - 100, stop = RANGE_MIN + 100, steps = 4 covers the
    // wrap in exactly 4 slices, the last ending at format(RANGE_MIN + 100).
    let p = Partitioner::Murmur3;
    let start = p.range_max() - 100;
    let stop = p.range_min() + 100;
    let out = slices(p, start, stop, 4);

    assert_eq!(out.len(), 4);
    assert_eq!(out[0].start, p.format(start));
    assert_eq!(out[3].end, p.format(stop));
}

// ============================================================================
// Preceding-Token Lookup
// ============================================================================

proptest! {
    // preceding_token(t) < t, except for the ring minimum which wraps to
    // the ring maximum.
    #[test]
    fn prop_preceding_token_is_smaller_or_wraps(
        tokens in proptest::collection::btree_set(-1_000_000i128..1_000_000, 2..64),
        probe in -1_000_000i128..1_000_000,
    ) {
        let tokens: Vec<i128> = tokens.iter().copied().collect();
        let ring = TokenRing::new(tokens.clone(), tokens.clone(), Vec::new()).unwrap();
        let min = *tokens.iter().min().unwrap();
        let max = *tokens.iter().max().unwrap();

        let preceding = ring.preceding_token(probe);
        if probe <= min {
            prop_assert_eq!(preceding, max);
        } else {
            prop_assert!(preceding < probe);
            // And it is the largest such ring token.
            prop_assert!(tokens.iter().all(|&t| t >= probe || t <= preceding));
        }
    }
}
