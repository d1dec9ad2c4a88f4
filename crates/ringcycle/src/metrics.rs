use std::sync::atomic::{AtomicU64, Ordering};

/// Optional counters for monitoring queue behaviour.
///
/// All counters are relaxed: they are diagnostics, never used to decide
/// anything on the hot path.
#[derive(Debug, Default)]
pub struct Metrics {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    enqueue_failures: AtomicU64,
    dequeue_failures: AtomicU64,
    abandoned_claims: AtomicU64,
    cas_retries: AtomicU64,
    claim_waits: AtomicU64,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Values published by producers.
    pub enqueued: u64,
    /// Values taken by consumers.
    pub dequeued: u64,
    /// `try_enqueue` calls that handed the value back.
    pub enqueue_failures: u64,
    /// `try_dequeue` calls that returned `None`.
    pub dequeue_failures: u64,
    /// Positions given up by a consumer before any producer filled them.
    pub abandoned_claims: u64,
    /// Lost compare-and-swap rounds on `head` or `tail`.
    pub cas_retries: u64,
    /// Backoff rounds spent waiting on a claimed slot.
    pub claim_waits: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_enqueue_failure(&self) {
        self.enqueue_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dequeue_failure(&self) {
        self.dequeue_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_abandoned_claim(&self) {
        self.abandoned_claims.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_cas_retry(&self) {
        self.cas_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_claim_waits(&self, rounds: u64) {
        if rounds > 0 {
            self.claim_waits.fetch_add(rounds, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            enqueue_failures: self.enqueue_failures.load(Ordering::Relaxed),
            dequeue_failures: self.dequeue_failures.load(Ordering::Relaxed),
            abandoned_claims: self.abandoned_claims.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
            claim_waits: self.claim_waits.load(Ordering::Relaxed),
        }
    }
}
