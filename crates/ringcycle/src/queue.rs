use crate::ring::Ring;
use crate::{trace, Backoff, Config, End, MetricsSnapshot, QueueError};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Bounded lock-free circular queue.
///
/// `SP` and `SC` pick the single-owner algorithm for the producer and
/// consumer end. Values are pushed through a [`Producer`] and taken through
/// a [`Consumer`]; a single-owner end hands out one live handle, a
/// multi-owner end up to [`Config::max_threads`] handles.
///
/// The queue itself is a cheap, cloneable reference to shared state; the
/// ring is freed, dropping any values still queued, when the last queue and
/// handle are gone.
///
/// # Example
///
/// ```
/// use ringcycle::{Config, MpmcQueue};
///
/// let queue = MpmcQueue::<u64>::new(Config::default()).unwrap();
/// let mut producer = queue.register_producer().unwrap();
/// let mut consumer = queue.register_consumer().unwrap();
///
/// producer.try_enqueue(7).unwrap();
/// assert_eq!(consumer.try_dequeue(), Some(7));
/// ```
pub struct CircularQueue<T, const SP: bool, const SC: bool> {
    shared: Arc<Shared<T, SP, SC>>,
}

/// Single-producer single-consumer queue.
pub type SpscQueue<T> = CircularQueue<T, true, true>;
/// Multi-producer single-consumer queue.
pub type MpscQueue<T> = CircularQueue<T, false, true>;
/// Single-producer multi-consumer queue.
pub type SpmcQueue<T> = CircularQueue<T, true, false>;
/// Multi-producer multi-consumer queue.
pub type MpmcQueue<T> = CircularQueue<T, false, false>;

struct Shared<T, const SP: bool, const SC: bool> {
    ring: Ring<T, SP, SC>,
    producers: AtomicUsize,
    consumers: AtomicUsize,
}

impl<T, const SP: bool, const SC: bool> CircularQueue<T, SP, SC> {
    /// Creates a queue with the given configuration.
    pub fn new(config: Config) -> Result<Self, QueueError> {
        Ok(Self {
            shared: Arc::new(Shared {
                ring: Ring::new(config)?,
                producers: AtomicUsize::new(0),
                consumers: AtomicUsize::new(0),
            }),
        })
    }

    /// Creates a queue with `capacity` slots and default settings otherwise.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        Self::new(Config::default().with_capacity(capacity))
    }

    /// Register a producer handle.
    pub fn register_producer(&self) -> Result<Producer<T, SP, SC>, QueueError> {
        self.register(End::Producer, SP)?;
        Ok(Producer {
            shared: Arc::clone(&self.shared),
            _not_sync: PhantomData,
        })
    }

    /// Register a consumer handle.
    pub fn register_consumer(&self) -> Result<Consumer<T, SP, SC>, QueueError> {
        self.register(End::Consumer, SC)?;
        Ok(Consumer {
            shared: Arc::clone(&self.shared),
            _not_sync: PhantomData,
        })
    }

    fn register(&self, end: End, single: bool) -> Result<(), QueueError> {
        let max = if single {
            1
        } else {
            self.shared.ring.config().max_threads
        };

        let registered = self
            .shared
            .counter(end)
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            });

        match registered {
            Ok(_previous) => {
                trace::debug!(%end, handles = _previous + 1, "handle registered");
                Ok(())
            }
            Err(_) if single => Err(QueueError::EndpointTaken { end }),
            Err(_) => Err(QueueError::TooManyHandles { end, max }),
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Returns the estimated number of queued values.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.ring.len()
    }

    /// Returns true if the queue looks empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.ring.is_empty()
    }

    /// Returns true if the queue looks full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.ring.is_full()
    }

    /// Returns the configuration the queue was built with.
    pub fn config(&self) -> Config {
        *self.shared.ring.config()
    }

    /// Returns the number of live producer handles.
    pub fn producer_count(&self) -> usize {
        self.shared.producers.load(Ordering::Acquire)
    }

    /// Returns the number of live consumer handles.
    pub fn consumer_count(&self) -> usize {
        self.shared.consumers.load(Ordering::Acquire)
    }

    /// Get a metrics snapshot (all zeros unless metrics are enabled).
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.ring.metrics()
    }
}

impl<T, const SP: bool, const SC: bool> Shared<T, SP, SC> {
    fn counter(&self, end: End) -> &AtomicUsize {
        match end {
            End::Producer => &self.producers,
            End::Consumer => &self.consumers,
        }
    }

    fn release(&self, end: End) {
        let previous = self.counter(end).fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "{} handle count underflow", end);
        trace::debug!(%end, handles = previous - 1, "handle released");
    }
}

impl<T, const SP: bool, const SC: bool> Clone for CircularQueue<T, SP, SC> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, const SP: bool, const SC: bool> fmt::Debug for CircularQueue<T, SP, SC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("single_producer", &SP)
            .field("single_consumer", &SC)
            .finish()
    }
}

/// Producer handle.
///
/// Operations take `&mut self`, so one handle is never in two producer
/// operations at once. Register one handle per producing thread. Handles
/// are `Send` but not `Sync`:
///
/// ```compile_fail
/// fn shared_between_threads<H: Sync>() {}
/// shared_between_threads::<ringcycle::Producer<u64, false, false>>();
/// ```
pub struct Producer<T, const SP: bool, const SC: bool> {
    shared: Arc<Shared<T, SP, SC>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T, const SP: bool, const SC: bool> Producer<T, SP, SC> {
    /// Try to enqueue without blocking on a full queue.
    ///
    /// Returns the value in `Err` if the queue is full, or if a racing
    /// consumer gave up the claimed position. Either way a retry may succeed.
    ///
    /// On a multi-producer queue, producers racing past the room check at
    /// the same moment can claim a position whose slot still holds the
    /// previous lap's value. That call then waits for a consumer to take the
    /// old value before it returns.
    #[inline]
    pub fn try_enqueue(&mut self, value: T) -> Result<(), T> {
        // SAFETY: a single-producer queue has at most one Producer, and
        // `&mut self` keeps it to one thread at a time.
        unsafe { self.shared.ring.try_enqueue(value) }
    }

    /// Try to enqueue a value built by `make`, without blocking.
    ///
    /// `make` only runs if the queue does not already look full; in that case
    /// the error is `Err(None)`. A value that was built but could not be
    /// placed comes back as `Err(Some(value))`.
    pub fn try_enqueue_with<F>(&mut self, make: F) -> Result<(), Option<T>>
    where
        F: FnOnce() -> T,
    {
        if self.shared.ring.is_full() {
            return Err(None);
        }
        self.try_enqueue(make()).map_err(Some)
    }

    /// Enqueue, spinning and then yielding until there is room.
    ///
    /// Never gives up: with no consumer draining a full queue this waits
    /// forever.
    #[inline]
    pub fn enqueue(&mut self, value: T) {
        // SAFETY: see `try_enqueue`.
        unsafe { self.shared.ring.enqueue(value) }
    }

    /// Enqueue a value built by `make` once the queue has room.
    pub fn enqueue_with<F>(&mut self, make: F)
    where
        F: FnOnce() -> T,
    {
        let mut backoff = Backoff::new();
        while self.shared.ring.is_full() {
            backoff.snooze();
        }
        self.enqueue(make());
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Returns the estimated number of queued values.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.ring.is_full()
    }
}

impl<T, const SP: bool, const SC: bool> Drop for Producer<T, SP, SC> {
    fn drop(&mut self) {
        self.shared.release(End::Producer);
    }
}

impl<T, const SP: bool, const SC: bool> fmt::Debug for Producer<T, SP, SC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("single", &SP)
            .field("len", &self.len())
            .finish()
    }
}

/// Consumer handle.
///
/// Operations take `&mut self`, so one handle is never in two consumer
/// operations at once. Register one handle per consuming thread. Like
/// [`Producer`], a handle is `Send` but not `Sync`:
///
/// ```compile_fail
/// fn shared_between_threads<H: Sync>() {}
/// shared_between_threads::<ringcycle::Consumer<u64, false, false>>();
/// ```
pub struct Consumer<T, const SP: bool, const SC: bool> {
    shared: Arc<Shared<T, SP, SC>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T, const SP: bool, const SC: bool> Consumer<T, SP, SC> {
    /// Try to dequeue without blocking. `None` if nothing is ready.
    #[inline]
    pub fn try_dequeue(&mut self) -> Option<T> {
        // SAFETY: a single-consumer queue has at most one Consumer, and
        // `&mut self` keeps it to one thread at a time.
        unsafe { self.shared.ring.try_dequeue() }
    }

    /// Dequeue, spinning and then yielding until a value arrives.
    ///
    /// Never gives up: with no producer this waits forever.
    #[inline]
    pub fn dequeue(&mut self) -> T {
        // SAFETY: see `try_dequeue`.
        unsafe { self.shared.ring.dequeue() }
    }

    /// Consume up to `max_items` values, transferring ownership to `handler`.
    ///
    /// Stops at the first position that is not ready. Returns the number of
    /// values handed out.
    ///
    /// # Example
    ///
    /// ```
    /// use ringcycle::SpscQueue;
    ///
    /// let queue = SpscQueue::<String>::with_capacity(64).unwrap();
    /// let mut producer = queue.register_producer().unwrap();
    /// let mut consumer = queue.register_consumer().unwrap();
    /// for word in ["a", "b", "c"] {
    ///     producer.try_enqueue(word.to_string()).unwrap();
    /// }
    ///
    /// let mut batch = Vec::new();
    /// assert_eq!(consumer.consume_up_to(8, |s| batch.push(s)), 3);
    /// assert_eq!(batch, ["a", "b", "c"]);
    /// ```
    pub fn consume_up_to<F>(&mut self, max_items: usize, handler: F) -> usize
    where
        F: FnMut(T),
    {
        // SAFETY: see `try_dequeue`.
        unsafe { self.shared.ring.consume_up_to(max_items, handler) }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Returns the estimated number of queued values.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.ring.is_full()
    }
}

impl<T, const SP: bool, const SC: bool> Drop for Consumer<T, SP, SC> {
    fn drop(&mut self) {
        self.shared.release(End::Consumer);
    }
}

impl<T, const SP: bool, const SC: bool> fmt::Debug for Consumer<T, SP, SC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("single", &SC)
            .field("len", &self.len())
            .finish()
    }
}
