use std::hint;
use std::thread;

/// Adaptive backoff used while waiting on a slot or retrying a full/empty queue.
///
/// Spins with PAUSE hints, doubling each round, then switches to
/// `thread::yield_now`. `is_completed` reports when the spinning budget and a
/// few yields are spent; callers that must not give up simply keep snoozing.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
    rounds: u64,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10;

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0, rounds: 0 }
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
        self.rounds += 1;
    }

    /// Spin while the budget lasts, then yield to the OS.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= Self::YIELD_LIMIT {
                self.step += 1;
            }
            self.rounds += 1;
        }
    }

    /// True once both spinning and the yield budget are exhausted.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    /// Number of spin/yield rounds since creation or the last reset.
    #[inline]
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
        self.rounds = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
