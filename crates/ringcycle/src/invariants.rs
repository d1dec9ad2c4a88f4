//! Assertion macros for ring invariants.
//!
//! The `debug_assert_*` macros check counter arithmetic and compile away in
//! release builds. `slot_violation!` guards the slot tag protocol and is
//! always active: a tag in an impossible state means the payload can no
//! longer be trusted, so the only safe move is to stop.

// =============================================================================
// INV-SEQ-01: Bounded Count
// =============================================================================

/// Assert that the occupied count does not exceed capacity.
///
/// **Invariant**: `0 ≤ (tail - head) ≤ capacity` whenever tail is ahead of head
macro_rules! debug_assert_bounded_count {
    ($head:expr, $tail:expr, $capacity:expr) => {
        debug_assert!(
            $tail.saturating_sub($head) <= $capacity as u64,
            "INV-SEQ-01 violated: tail {} is more than capacity {} ahead of head {}",
            $tail,
            $capacity,
            $head
        )
    };
}

// =============================================================================
// INV-SEQ-02: Monotonic Progress
// =============================================================================

/// Assert that a position counter only moves forward.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new > $old,
            "INV-SEQ-02 violated: {} went from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-TAG-01: One transition per lap
// =============================================================================

/// Abort on a slot tag that no legal interleaving can produce.
///
/// Emits an `error!` trace event before panicking so the state is visible
/// even when the panic is caught further up.
macro_rules! slot_violation {
    ($side:literal, $position:expr, $tag:expr) => {{
        let position: u64 = $position;
        let tag = $tag;
        crate::trace::error!(position, ?tag, side = $side, "slot tag in impossible state");
        panic!(
            "INV-TAG-01 violated: {} at position {} found slot tag {:?}",
            $side, position, tag
        )
    }};
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_monotonic;
pub(crate) use slot_violation;
