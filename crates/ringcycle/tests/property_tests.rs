//! Property-based tests for single-threaded queue behaviour.
//!
//! Coverage:
//! - INV-SEQ-01: `len()` tracks enqueues minus dequeues and never exceeds capacity
//! - INV-ORD-01: FIFO round-trip with one producer and one consumer
//! - INV-CAP-01: capacity boundary (N succeed, N+1 fails, one dequeue frees a slot)
//! - INV-DROP-01: every queued value is dropped exactly once
//!
//! Single-threaded runs never race, so all four modes must behave identically
//! here even though they take different claim paths.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use ringcycle::{CircularQueue, Config};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn capacity_strategy() -> impl Strategy<Value = usize> {
    (5u32..=9).prop_map(|bits| 1usize << bits)
}

// =============================================================================
// INV-SEQ-01: Bounded Count
// =============================================================================

fn check_len_tracks_ops<const SP: bool, const SC: bool>(
    capacity: usize,
    ops: &[bool],
) -> Result<(), TestCaseError> {
    let queue = CircularQueue::<u64, SP, SC>::new(Config::new(capacity, 4, false))
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut producer = queue.register_producer().unwrap();
    let mut consumer = queue.register_consumer().unwrap();

    let mut expected = 0usize;
    for (i, &write) in ops.iter().enumerate() {
        if write {
            match producer.try_enqueue(i as u64) {
                Ok(()) => expected += 1,
                Err(v) => {
                    prop_assert_eq!(v, i as u64);
                    prop_assert_eq!(expected, capacity, "enqueue failed below capacity");
                }
            }
        } else if consumer.try_dequeue().is_some() {
            expected -= 1;
        } else {
            prop_assert_eq!(expected, 0, "dequeue failed on a non-empty queue");
        }

        prop_assert_eq!(queue.len(), expected);
        prop_assert!(queue.len() <= capacity,
            "INV-SEQ-01 violated: len {} > capacity {}", queue.len(), capacity);
        prop_assert_eq!(queue.is_empty(), expected == 0);
        prop_assert_eq!(queue.is_full(), expected == capacity);
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_len_tracks_ops_spsc(
        capacity in capacity_strategy(),
        ops in prop::collection::vec(prop::bool::weighted(0.6), 1..600),
    ) {
        check_len_tracks_ops::<true, true>(capacity, &ops)?;
    }

    #[test]
    fn prop_len_tracks_ops_mpsc(
        capacity in capacity_strategy(),
        ops in prop::collection::vec(prop::bool::weighted(0.6), 1..600),
    ) {
        check_len_tracks_ops::<false, true>(capacity, &ops)?;
    }

    #[test]
    fn prop_len_tracks_ops_spmc(
        capacity in capacity_strategy(),
        ops in prop::collection::vec(prop::bool::weighted(0.6), 1..600),
    ) {
        check_len_tracks_ops::<true, false>(capacity, &ops)?;
    }

    #[test]
    fn prop_len_tracks_ops_mpmc(
        capacity in capacity_strategy(),
        ops in prop::collection::vec(prop::bool::weighted(0.6), 1..600),
    ) {
        check_len_tracks_ops::<false, false>(capacity, &ops)?;
    }
}

// =============================================================================
// INV-ORD-01: FIFO round-trip
// =============================================================================

proptest! {
    /// Values come back in the order they went in, across wrap-around too.
    #[test]
    fn prop_fifo_roundtrip(
        prefill in 0usize..32,
        values in prop::collection::vec(any::<u32>(), 0..=32),
    ) {
        let queue = CircularQueue::<u32, true, true>::with_capacity(32).unwrap();
        let mut producer = queue.register_producer().unwrap();
        let mut consumer = queue.register_consumer().unwrap();

        // Shift head/tail so the round-trip starts mid-ring.
        for i in 0..prefill {
            producer.try_enqueue(i as u32).unwrap();
            prop_assert_eq!(consumer.try_dequeue(), Some(i as u32));
        }

        for &v in &values {
            prop_assert!(producer.try_enqueue(v).is_ok());
        }
        let mut out = Vec::with_capacity(values.len());
        while let Some(v) = consumer.try_dequeue() {
            out.push(v);
        }
        prop_assert_eq!(out, values);
    }
}

// =============================================================================
// INV-CAP-01: Capacity boundary
// =============================================================================

proptest! {
    #[test]
    fn prop_capacity_boundary(capacity in capacity_strategy()) {
        let queue = CircularQueue::<usize, true, true>::with_capacity(capacity).unwrap();
        let mut producer = queue.register_producer().unwrap();
        let mut consumer = queue.register_consumer().unwrap();

        for i in 0..capacity {
            prop_assert!(producer.try_enqueue(i).is_ok(), "enqueue {} failed", i);
        }
        prop_assert_eq!(producer.try_enqueue(capacity), Err(capacity));
        prop_assert!(!queue.is_empty());

        prop_assert_eq!(consumer.try_dequeue(), Some(0));
        prop_assert!(producer.try_enqueue(capacity).is_ok());
        prop_assert!(queue.is_full());
    }
}

// =============================================================================
// INV-DROP-01: Every value dropped exactly once
// =============================================================================

#[derive(Debug)]
struct Counted(Arc<AtomicUsize>);

impl Drop for Counted {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

proptest! {
    #[test]
    fn prop_drop_releases_each_value_once(
        enqueues in 0usize..64,
        dequeues in 0usize..64,
    ) {
        let drops = Arc::new(AtomicUsize::new(0));
        let queue = CircularQueue::<Counted, false, false>::with_capacity(64).unwrap();
        {
            let mut producer = queue.register_producer().unwrap();
            let mut consumer = queue.register_consumer().unwrap();

            for _ in 0..enqueues {
                prop_assert!(producer.try_enqueue(Counted(Arc::clone(&drops))).is_ok());
            }
            let taken = (0..dequeues).filter_map(|_| consumer.try_dequeue()).count();
            prop_assert_eq!(taken, dequeues.min(enqueues));
            prop_assert_eq!(drops.load(Ordering::SeqCst), taken);
        }
        drop(queue);
        prop_assert_eq!(drops.load(Ordering::SeqCst), enqueues);
    }
}
