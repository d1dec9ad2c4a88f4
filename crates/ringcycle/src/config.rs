use crate::QueueError;

/// Smallest capacity a queue may be built with.
pub const MIN_CAPACITY: usize = 32;

/// Configuration for a circular queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of slots (power of two, at least [`MIN_CAPACITY`]).
    pub capacity: usize,
    /// Upper bound on threads racing at one end of a multi-owner queue.
    ///
    /// This is the slack kept free before the fetch-and-add fast path gives
    /// way to the compare-and-swap path. It also caps the number of live
    /// handles on a multi-owner end.
    pub max_threads: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, max_threads: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            max_threads,
            enable_metrics,
        }
    }

    /// Sets the capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the slack bound.
    pub const fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Turns metrics collection on or off.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity - 1
    }

    /// Checks the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.capacity < MIN_CAPACITY {
            return Err(QueueError::CapacityTooSmall {
                capacity: self.capacity,
                min: MIN_CAPACITY,
            });
        }
        if !self.capacity.is_power_of_two() {
            return Err(QueueError::CapacityNotPowerOfTwo {
                capacity: self.capacity,
            });
        }
        if self.max_threads == 0 || self.max_threads >= self.capacity {
            return Err(QueueError::InvalidMaxThreads {
                max_threads: self.max_threads,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_threads: 16,
            enable_metrics: false,
        }
    }
}

/// Low latency configuration (256 slots, fits in L1/L2 with padding)
pub const LOW_LATENCY_CONFIG: Config = Config::new(256, 16, false);

/// High throughput configuration (64K slots, 32 racing threads)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(1 << 16, 32, false);
