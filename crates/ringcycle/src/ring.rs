use crate::invariants::{debug_assert_bounded_count, debug_assert_monotonic, slot_violation};
use crate::slot::{Slot, SlotView, Tag};
use crate::{trace, Backoff, Config, Metrics, MetricsSnapshot, QueueError};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// ## Positions and cycles
//
// `head` and `tail` are unbounded u64 positions. A position `p` maps to slot
// `p & mask` and lap (cycle) `p >> shift`. Only the slot tag says whether the
// payload is live, so the counters can be read without pairing them.
//
// ## Tag protocol (see slot.rs)
//
// **Producer at position p, cycle c:**
// 1. Acquire-load the tag; proceed only on `Empty(c)` (previous lap drained)
// 2. Multi-consumer only: CAS `Empty(c) -> Busy(c)` to fence off abandonment
// 3. Write the payload into the slot
// 4. Release-store `Full(c)` (publishes the payload)
//
// **Consumer at position p, cycle c:**
// 1. Acquire-load the tag; proceed only on `Full(c)`
// 2. Move the payload out
// 3. Release-store `Empty(c + 1)` (hands the slot to the next lap's producer)
//
// ## Claiming positions
//
// - Single owner: the owner reads its own counter, checks the slot, and
//   bumps the counter after the slot transition. No RMW on the counter.
// - Multi owner, slack available: `fetch_add` on the counter. The claim is
//   final; the thread waits on the slot until its counterpart arrives.
// - Multi owner, near full/empty: CAS on the counter, but only after the
//   slot was seen ready, so the claimed slot never needs waiting on.
//
// A multi-consumer that waited out its backoff on an `Empty(c)` slot gives
// the position up with CAS `Empty(c) -> Empty(c + 1)`. The producer that
// claims the same position either wins `Empty(c) -> Busy(c)` first, or sees
// the cycle ahead of its own and skips the position.
//
// =============================================================================

/// Bounded lock-free ring with cycle-tagged slots.
///
/// `SP`/`SC` select the single-producer/single-consumer algorithms for each
/// end. The operations are `unsafe` because the single-owner paths assume
/// exclusive access to their end; [`CircularQueue`](crate::CircularQueue)
/// upholds that through its handles.
pub(crate) struct Ring<T, const SP: bool, const SC: bool> {
    /// Next position to consume.
    head: CachePadded<AtomicU64>,
    /// Next position to produce.
    tail: CachePadded<AtomicU64>,
    slots: Box<[CachePadded<Slot<T>>]>,
    shift: u32,
    mask: u64,
    config: Config,
    metrics: Metrics,
}

// Safety: payloads move between threads but are never shared; each slot is
// accessed by exactly one thread per transition, as decided by its tag.
unsafe impl<T: Send, const SP: bool, const SC: bool> Send for Ring<T, SP, SC> {}
unsafe impl<T: Send, const SP: bool, const SC: bool> Sync for Ring<T, SP, SC> {}

impl<T, const SP: bool, const SC: bool> Ring<T, SP, SC> {
    /// Creates a ring after validating `config`.
    pub(crate) fn new(config: Config) -> Result<Self, QueueError> {
        config.validate()?;

        let slots = (0..config.capacity)
            .map(|_| CachePadded::new(Slot::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        trace::info!(
            capacity = config.capacity,
            max_threads = config.max_threads,
            single_producer = SP,
            single_consumer = SC,
            "ring created"
        );

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots,
            shift: config.capacity.trailing_zeros(),
            mask: config.mask() as u64,
            config,
            metrics: Metrics::new(),
        })
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.config.capacity
    }

    #[inline]
    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Estimated number of stored values, clamped to `[0, capacity]`.
    ///
    /// `head` and `tail` are loaded independently, so the result may be
    /// stale by the time it is returned.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        (tail.saturating_sub(head) as usize).min(self.capacity())
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub(crate) fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    #[inline]
    fn cycle_of(&self, position: u64) -> u64 {
        position >> self.shift
    }

    #[inline]
    fn slot(&self, position: u64) -> &Slot<T> {
        &self.slots[(position & self.mask) as usize]
    }

    #[inline]
    fn load_tag(slot: &Slot<T>) -> Tag {
        Tag::from_bits(slot.tag.load(Ordering::Acquire))
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Try to publish `value`; hands it back if the queue is full or the
    /// claimed position was given up by a consumer.
    ///
    /// With several producers the room check and the `fetch_add` claim are
    /// not one step. Producers racing into that gap can claim a position a
    /// full lap ahead of `head`; such a claim is final and waits for the
    /// consumer to drain the previous lap of its slot.
    ///
    /// # Safety
    ///
    /// With `SP`, no other thread may run a producer operation on this ring
    /// concurrently.
    pub(crate) unsafe fn try_enqueue(&self, value: T) -> Result<(), T> {
        let result = if SP {
            self.enqueue_single(value)
        } else {
            self.enqueue_shared(value)
        };

        if self.config.enable_metrics {
            match result {
                Ok(()) => self.metrics.add_enqueued(),
                Err(_) => self.metrics.add_enqueue_failure(),
            }
        }
        result
    }

    /// Publish `value`, spinning and then yielding until there is room.
    ///
    /// # Safety
    ///
    /// Same contract as [`Ring::try_enqueue`].
    pub(crate) unsafe fn enqueue(&self, mut value: T) {
        let mut backoff = Backoff::new();
        loop {
            match self.try_enqueue(value) {
                Ok(()) => return,
                Err(rejected) => value = rejected,
            }
            backoff.snooze();
        }
    }

    fn enqueue_single(&self, value: T) -> Result<(), T> {
        let capacity = self.capacity() as u64;
        let mut tail = self.tail.load(Ordering::Relaxed);

        loop {
            let head = self.head.load(Ordering::Relaxed);
            if tail.saturating_sub(head) >= capacity {
                return Err(value);
            }

            let cycle = self.cycle_of(tail);
            let slot = self.slot(tail);
            let tag = Self::load_tag(slot);

            match tag.for_producer(cycle) {
                SlotView::Ready => {
                    if !SC && !Self::mark_busy(slot, cycle) {
                        // A consumer gave the position up in between; the
                        // reload sees the cycle ahead and skips it.
                        continue;
                    }
                    // SAFETY: the slot is Empty(cycle) (or Busy(cycle) and
                    // ours), and only the single producer writes it.
                    unsafe { Self::publish(slot, cycle, value) };
                    self.advance_tail(tail);
                    return Ok(());
                }
                // Previous lap not consumed yet.
                SlotView::Behind => return Err(value),
                SlotView::Ahead if !SC => {
                    trace::trace!(position = tail, "skipping position abandoned by consumer");
                    self.advance_tail(tail);
                    tail += 1;
                }
                _ => slot_violation!("producer", tail, tag),
            }
        }
    }

    fn enqueue_shared(&self, value: T) -> Result<(), T> {
        let capacity = self.capacity() as u64;
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);

        let occupied = tail.saturating_sub(head);
        if occupied >= capacity {
            return Err(value);
        }

        // `occupied` may be stale by the time of the claim; an overshoot
        // waits in `fill_claimed`.
        if occupied + self.config.max_threads as u64 <= capacity - 1 {
            let position = self.tail.fetch_add(1, Ordering::Relaxed);
            self.fill_claimed(position, value)
        } else {
            self.enqueue_contended(value)
        }
    }

    /// Degraded path: claim `tail` with CAS only once its slot is ready.
    fn enqueue_contended(&self, value: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);

        for _ in 0..self.config.max_threads {
            let cycle = self.cycle_of(tail);
            let slot = self.slot(tail);
            let tag = Self::load_tag(slot);

            match tag.for_producer(cycle) {
                SlotView::Ready => {
                    match self.tail.compare_exchange(
                        tail,
                        tail + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return self.fill_claimed(tail, value),
                        Err(current) => {
                            if self.config.enable_metrics {
                                self.metrics.add_cas_retry();
                            }
                            tail = current;
                        }
                    }
                }
                SlotView::Behind => {
                    let current = self.tail.load(Ordering::Relaxed);
                    if current == tail {
                        return Err(value);
                    }
                    tail = current;
                }
                SlotView::Ahead if !SC => {
                    // Abandoned and not yet claimed by any producer: step over it.
                    let _ = self.tail.compare_exchange(
                        tail,
                        tail + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    );
                    tail = self.tail.load(Ordering::Relaxed);
                }
                _ => {
                    // Someone else already owns `tail`; only a fresh value helps.
                    let current = self.tail.load(Ordering::Relaxed);
                    if current == tail {
                        slot_violation!("producer", tail, tag);
                    }
                    tail = current;
                }
            }
        }

        Err(value)
    }

    /// Write `value` at an already claimed position, waiting for the slot's
    /// previous lap to drain if necessary.
    fn fill_claimed(&self, position: u64, value: T) -> Result<(), T> {
        let cycle = self.cycle_of(position);
        let slot = self.slot(position);
        let mut backoff = Backoff::new();

        let result = loop {
            let tag = Self::load_tag(slot);
            match tag.for_producer(cycle) {
                SlotView::Ready => {
                    if SC || Self::mark_busy(slot, cycle) {
                        // SAFETY: `position` is claimed by this thread alone
                        // and its slot has drained the previous lap.
                        unsafe { Self::publish(slot, cycle, value) };
                        break Ok(());
                    }
                }
                SlotView::Behind => backoff.snooze(),
                SlotView::Ahead if !SC => {
                    trace::trace!(position, "claimed position was abandoned by consumer");
                    break Err(value);
                }
                _ => slot_violation!("producer", position, tag),
            }
        };

        if self.config.enable_metrics {
            self.metrics.add_claim_waits(backoff.rounds());
        }
        result
    }

    /// Release on success: a thread that acquires `Busy(cycle)` must also see
    /// the counter move that claimed this position.
    #[inline]
    fn mark_busy(slot: &Slot<T>, cycle: u64) -> bool {
        slot.tag
            .compare_exchange(
                Tag::empty(cycle).bits(),
                Tag::busy(cycle).bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// # Safety
    ///
    /// The caller must own the slot for lap `cycle`.
    #[inline]
    unsafe fn publish(slot: &Slot<T>, cycle: u64, value: T) {
        unsafe { (*slot.value.get()).write(value) };
        slot.tag.store(Tag::full(cycle).bits(), Ordering::Release);
    }

    #[inline]
    fn advance_tail(&self, tail: u64) {
        let new_tail = tail + 1;
        debug_assert_monotonic!("tail", tail, new_tail);
        debug_assert_bounded_count!(self.head.load(Ordering::Relaxed), new_tail, self.capacity());
        self.tail.store(new_tail, Ordering::Release);
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Try to take the next value. `None` if nothing is ready.
    ///
    /// # Safety
    ///
    /// With `SC`, no other thread may run a consumer operation on this ring
    /// concurrently.
    pub(crate) unsafe fn try_dequeue(&self) -> Option<T> {
        let result = if SC {
            self.dequeue_single()
        } else {
            self.dequeue_shared()
        };

        if self.config.enable_metrics {
            match result {
                Some(_) => self.metrics.add_dequeued(),
                None => self.metrics.add_dequeue_failure(),
            }
        }
        result
    }

    /// Take the next value, spinning and then yielding until one arrives.
    ///
    /// # Safety
    ///
    /// Same contract as [`Ring::try_dequeue`].
    pub(crate) unsafe fn dequeue(&self) -> T {
        let mut backoff = Backoff::new();
        loop {
            if let Some(value) = self.try_dequeue() {
                return value;
            }
            backoff.snooze();
        }
    }

    /// Take up to `max_items` values, handing each to `handler` by value.
    ///
    /// With a single consumer the whole run is read first and `head` is
    /// stored once at the end.
    ///
    /// # Safety
    ///
    /// Same contract as [`Ring::try_dequeue`].
    pub(crate) unsafe fn consume_up_to<F>(&self, max_items: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        if !SC {
            let mut count = 0;
            while count < max_items {
                match self.try_dequeue() {
                    Some(value) => handler(value),
                    None => break,
                }
                count += 1;
            }
            return count;
        }

        let start = self.head.load(Ordering::Relaxed);
        // Publishes whatever was consumed, even if `handler` unwinds.
        let mut guard = HeadGuard {
            head: &self.head,
            start,
            position: start,
        };

        while ((guard.position - start) as usize) < max_items {
            let position = guard.position;
            let cycle = self.cycle_of(position);
            let slot = self.slot(position);
            let tag = Self::load_tag(slot);

            match tag.for_consumer(cycle) {
                SlotView::Ready => {
                    // SAFETY: Full(cycle) at a position only this consumer reads.
                    let value = unsafe { Self::take(slot, cycle) };
                    guard.position += 1;
                    if self.config.enable_metrics {
                        self.metrics.add_dequeued();
                    }
                    handler(value);
                }
                SlotView::Behind => break,
                _ => slot_violation!("consumer", position, tag),
            }
        }

        (guard.position - start) as usize
    }

    fn dequeue_single(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let cycle = self.cycle_of(head);
        let slot = self.slot(head);
        let tag = Self::load_tag(slot);

        match tag.for_consumer(cycle) {
            SlotView::Ready => {
                // SAFETY: Full(cycle) at the single consumer's own position.
                let value = unsafe { Self::take(slot, cycle) };
                let new_head = head + 1;
                debug_assert_monotonic!("head", head, new_head);
                self.head.store(new_head, Ordering::Release);
                Some(value)
            }
            SlotView::Behind => None,
            _ => slot_violation!("consumer", head, tag),
        }
    }

    fn dequeue_shared(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        let available = tail.saturating_sub(head);
        if available == 0 {
            return None;
        }

        if available > self.config.max_threads as u64 {
            let position = self.head.fetch_add(1, Ordering::Relaxed);
            self.drain_claimed(position)
        } else {
            self.dequeue_contended()
        }
    }

    /// Degraded path: claim `head` with CAS only once its slot is full.
    fn dequeue_contended(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Relaxed);

        for _ in 0..self.config.max_threads {
            let cycle = self.cycle_of(head);
            let slot = self.slot(head);
            let tag = Self::load_tag(slot);

            match tag.for_consumer(cycle) {
                SlotView::Ready => {
                    match self.head.compare_exchange(
                        head,
                        head + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        // SAFETY: the CAS made `head` ours and the slot was
                        // seen Full(cycle) with Acquire.
                        Ok(_) => return Some(unsafe { Self::take(slot, cycle) }),
                        Err(current) => {
                            if self.config.enable_metrics {
                                self.metrics.add_cas_retry();
                            }
                            head = current;
                        }
                    }
                }
                SlotView::Behind => {
                    let current = self.head.load(Ordering::Relaxed);
                    if current == head {
                        return None;
                    }
                    head = current;
                }
                _ => {
                    let current = self.head.load(Ordering::Relaxed);
                    if current == head {
                        slot_violation!("consumer", head, tag);
                    }
                    head = current;
                }
            }
        }

        None
    }

    /// Take the value at an already claimed position, or give the position
    /// up if no producer shows up within the backoff budget.
    fn drain_claimed(&self, position: u64) -> Option<T> {
        let cycle = self.cycle_of(position);
        let slot = self.slot(position);
        let mut backoff = Backoff::new();
        let mut waited = 0;
        let mut seen_empty = false;

        let result = loop {
            let tag = Self::load_tag(slot);
            match tag.for_consumer(cycle) {
                // SAFETY: `position` is claimed by this thread alone.
                SlotView::Ready => break Some(unsafe { Self::take(slot, cycle) }),
                SlotView::Behind if tag == Tag::empty(cycle) => {
                    if !seen_empty {
                        // Give the producer of this lap a full budget.
                        seen_empty = true;
                        waited += backoff.rounds();
                        backoff.reset();
                    }
                    if backoff.is_completed() {
                        if Self::abandon(slot, cycle) {
                            trace::trace!(position, "abandoned claim with no producer");
                            if self.config.enable_metrics {
                                self.metrics.add_abandoned_claim();
                            }
                            break None;
                        }
                        // A producer marked the slot busy first and is writing.
                    } else {
                        backoff.snooze();
                    }
                }
                SlotView::Behind => backoff.snooze(),
                _ => slot_violation!("consumer", position, tag),
            }
        };

        if self.config.enable_metrics {
            self.metrics.add_claim_waits(waited + backoff.rounds());
        }
        result
    }

    #[inline]
    fn abandon(slot: &Slot<T>, cycle: u64) -> bool {
        slot.tag
            .compare_exchange(
                Tag::empty(cycle).bits(),
                Tag::empty(cycle + 1).bits(),
                Ordering::Release,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// # Safety
    ///
    /// The slot must be Full(cycle) and the caller must own its position.
    #[inline]
    unsafe fn take(slot: &Slot<T>, cycle: u64) -> T {
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.tag.store(Tag::empty(cycle + 1).bits(), Ordering::Release);
        value
    }
}

impl<T, const SP: bool, const SC: bool> Drop for Ring<T, SP, SC> {
    fn drop(&mut self) {
        let mut remaining = 0usize;
        for slot in self.slots.iter_mut() {
            let tag = Tag::from_bits(*slot.tag.get_mut());
            if tag.is_full() {
                // SAFETY: Full means the payload was written and not taken;
                // `&mut self` rules out concurrent access.
                unsafe { slot.value.get_mut().assume_init_drop() };
                remaining += 1;
            }
        }
        if remaining > 0 {
            trace::debug!(remaining, "ring dropped with values still queued");
        }
    }
}

/// Stores the batch end position into `head` when a batch finishes.
struct HeadGuard<'a> {
    head: &'a AtomicU64,
    start: u64,
    position: u64,
}

impl Drop for HeadGuard<'_> {
    fn drop(&mut self) {
        if self.position != self.start {
            debug_assert_monotonic!("head", self.start, self.position);
            self.head.store(self.position, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::thread;
    use std::time::Duration;

    fn config(capacity: usize) -> Config {
        Config::new(capacity, 4, true)
    }

    #[test]
    fn test_ring_rejects_bad_capacity() {
        assert!(matches!(
            Ring::<u64, true, true>::new(config(100)),
            Err(QueueError::CapacityNotPowerOfTwo { capacity: 100 })
        ));
        assert!(matches!(
            Ring::<u64, true, true>::new(config(16)),
            Err(QueueError::CapacityTooSmall { .. })
        ));
    }

    #[test]
    fn test_ring_spsc_roundtrip() {
        let ring = Ring::<u64, true, true>::new(config(32)).unwrap();
        unsafe {
            for i in 0..10 {
                assert!(ring.try_enqueue(i).is_ok());
            }
            assert_eq!(ring.len(), 10);
            for i in 0..10 {
                assert_eq!(ring.try_dequeue(), Some(i));
            }
            assert_eq!(ring.try_dequeue(), None);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_full_hands_value_back() {
        let ring = Ring::<String, true, true>::new(config(32)).unwrap();
        unsafe {
            for i in 0..32 {
                assert!(ring.try_enqueue(i.to_string()).is_ok());
            }
            assert!(ring.is_full());
            assert_eq!(ring.try_enqueue("late".to_string()), Err("late".to_string()));
        }
    }

    #[test]
    fn test_ring_tags_advance_one_lap() {
        let ring = Ring::<u64, true, true>::new(config(32)).unwrap();
        unsafe {
            for lap in 0..3u64 {
                for i in 0..32 {
                    ring.try_enqueue(lap * 32 + i).unwrap();
                }
                assert_eq!(Ring::<u64, true, true>::load_tag(ring.slot(0)), Tag::full(lap));
                for _ in 0..32 {
                    ring.try_dequeue().unwrap();
                }
                assert_eq!(Ring::<u64, true, true>::load_tag(ring.slot(0)), Tag::empty(lap + 1));
            }
        }
    }

    #[test]
    fn test_ring_mpmc_fast_and_contended_paths() {
        // Capacity 32 with max_threads 4: the fast path covers the first 28
        // values, the CAS path the rest.
        let ring = Ring::<u64, false, false>::new(config(32)).unwrap();
        unsafe {
            for i in 0..32 {
                assert!(ring.try_enqueue(i).is_ok(), "enqueue {} failed", i);
            }
            assert!(ring.try_enqueue(99).is_err());

            let mut seen = Vec::new();
            while let Some(v) = ring.try_dequeue() {
                seen.push(v);
            }
            assert_eq!(seen, (0..32).collect::<Vec<_>>());
        }
        let m = ring.metrics();
        assert_eq!(m.enqueued, 32);
        assert_eq!(m.dequeued, 32);
        assert_eq!(m.enqueue_failures, 1);
        assert_eq!(m.abandoned_claims, 0);
    }

    #[test]
    fn test_ring_abandoned_position_is_skipped_by_producer() {
        let ring = Ring::<u64, false, false>::new(config(32)).unwrap();
        unsafe {
            // Pretend 10 values are in flight so the consumer takes the
            // fetch-add path, then let it give position 0 up.
            ring.tail.store(10, Ordering::Relaxed);
            assert_eq!(ring.try_dequeue(), None);
            assert_eq!(Ring::<u64, false, false>::load_tag(ring.slot(0)), Tag::empty(1));
            assert_eq!(ring.head.load(Ordering::Relaxed), 1);

            // The producer that owned position 0 finds it abandoned.
            assert_eq!(ring.fill_claimed(0, 7), Err(7));
        }
        assert_eq!(ring.metrics().abandoned_claims, 1);
    }

    #[test]
    fn test_ring_single_producer_skips_abandoned_positions() {
        let ring = Ring::<u64, true, false>::new(config(32)).unwrap();
        unsafe {
            // A consumer claimed and abandoned position 0 ahead of the producer.
            ring.slot(0).tag.store(Tag::empty(1).bits(), Ordering::Relaxed);
            ring.head.store(1, Ordering::Relaxed);

            assert!(ring.try_enqueue(5).is_ok());
            assert_eq!(ring.tail.load(Ordering::Relaxed), 2);
            assert_eq!(ring.try_dequeue(), Some(5));
        }
    }

    #[test]
    fn test_ring_overclaimed_producer_waits_for_consumer() {
        let ring = Ring::<u64, false, true>::new(config(32)).unwrap();
        unsafe {
            for i in 0..32 {
                ring.try_enqueue(i).unwrap();
            }
        }

        // A producer that passed the room check just before the ring filled
        // up claims a position a full lap ahead of head.
        let position = ring.tail.fetch_add(1, Ordering::Relaxed);
        assert_eq!(position, 32);

        let done = AtomicBool::new(false);
        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let result = ring.fill_claimed(position, 32);
                done.store(true, Ordering::Release);
                result
            });

            thread::sleep(Duration::from_millis(20));
            assert!(!done.load(Ordering::Acquire), "claim completed over a full slot");

            assert_eq!(unsafe { ring.try_dequeue() }, Some(0));
            assert_eq!(waiter.join().unwrap(), Ok(()));
        });

        let drained: Vec<u64> = std::iter::from_fn(|| unsafe { ring.try_dequeue() }).collect();
        assert_eq!(drained, (1..=32).collect::<Vec<_>>());
    }

    #[test]
    fn test_mark_busy_claims_empty_slot_once() {
        type R = Ring<u64, false, false>;

        let slot = Slot::<u64>::new();
        assert!(R::mark_busy(&slot, 0));
        assert_eq!(R::load_tag(&slot), Tag::busy(0));
        assert!(!R::mark_busy(&slot, 0));

        let abandoned = Slot::<u64>::new();
        abandoned.tag.store(Tag::empty(1).bits(), Ordering::Relaxed);
        assert!(!R::mark_busy(&abandoned, 0));
        assert_eq!(R::load_tag(&abandoned), Tag::empty(1));
    }

    #[test]
    #[should_panic(expected = "INV-TAG-01")]
    fn test_ring_corrupt_tag_panics() {
        let ring = Ring::<u64, true, true>::new(config(32)).unwrap();
        // Position 0 of lap 0 can never be Empty(1) for a single consumer.
        ring.slot(0).tag.store(Tag::empty(1).bits(), Ordering::Relaxed);
        let _ = unsafe { ring.try_dequeue() };
    }

    #[test]
    fn test_consume_up_to_single_head_update() {
        let ring = Ring::<u64, true, true>::new(config(64)).unwrap();
        unsafe {
            for i in 0..10 {
                ring.try_enqueue(i * 10).unwrap();
            }
            let mut sum = 0;
            let consumed = ring.consume_up_to(5, |v| sum += v);
            assert_eq!(consumed, 5);
            assert_eq!(sum, 10 + 20 + 30 + 40);
            assert_eq!(ring.len(), 5);

            let consumed = ring.consume_up_to(100, |_| {});
            assert_eq!(consumed, 5);
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn test_drop_releases_remaining_values() {
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropTracker;

        impl Drop for DropTracker {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);
        {
            let ring = Ring::<DropTracker, false, false>::new(config(32)).unwrap();
            unsafe {
                for _ in 0..12 {
                    assert!(ring.try_enqueue(DropTracker).is_ok());
                }
                drop(ring.try_dequeue());
            }
            assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
        }
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 12);
    }
}
