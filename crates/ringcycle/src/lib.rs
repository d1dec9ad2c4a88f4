//! ringcycle - Bounded Lock-Free Circular Queue
//!
//! A fixed-capacity ring buffer for every producer/consumer cardinality:
//! SPSC, MPSC, SPMC and MPMC, picked at compile time through the `SP` / `SC`
//! const parameters of [`CircularQueue`].
//!
//! Each slot carries a packed tag `(cycle, state)` in one atomic word. A
//! producer publishes a value by release-storing `Full(cycle)`; a consumer
//! takes it after acquire-loading that tag and hands the slot to the next
//! lap with `Empty(cycle + 1)`.
//!
//! # Key Features
//!
//! - Cache-line padded slots, head and tail
//! - Single-owner ends run without read-modify-write on their counter
//! - Multi-owner ends claim with `fetch_add` while slack remains, then fall
//!   back to compare-and-swap near full/empty
//! - Blocking operations use adaptive backoff (spin → yield), never OS waits
//!
//! # Ordering
//!
//! Values are delivered in FIFO order when there is one producer and one
//! consumer. With several producers, values claimed concurrently may be
//! observed in either order; every value is still delivered exactly once.
//!
//! # Example
//!
//! ```
//! use ringcycle::{Config, MpscQueue};
//! use std::thread;
//!
//! let queue = MpscQueue::<u64>::new(Config::default()).unwrap();
//! let mut consumer = queue.register_consumer().unwrap();
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|id| {
//!         let mut producer = queue.register_producer().unwrap();
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 producer.enqueue(id * 1000 + i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let mut sum = 0;
//! for _ in 0..400 {
//!     sum += consumer.dequeue();
//! }
//! for w in workers {
//!     w.join().unwrap();
//! }
//! assert_eq!(sum, (0..4).map(|id| id * 100_000 + 4950).sum::<u64>());
//! ```

#[cfg(not(target_has_atomic = "64"))]
compile_error!("ringcycle needs lock-free 64-bit atomics for its slot tags");

mod backoff;
mod config;
mod error;
mod invariants;
mod metrics;
mod queue;
mod ring;
mod slot;
mod trace;

pub use backoff::Backoff;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG, MIN_CAPACITY};
pub use error::{End, QueueError};
pub use metrics::MetricsSnapshot;
use metrics::Metrics;
pub use queue::{
    CircularQueue, Consumer, MpmcQueue, MpscQueue, Producer, SpmcQueue, SpscQueue,
};
pub use trace::init_tracing;
