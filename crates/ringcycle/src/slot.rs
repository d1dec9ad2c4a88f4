//! Slot storage and the packed cycle tag that guards it.
//!
//! ```text
//!  63                                   2    1      0
//! +--------------------------------------+------+------+
//! |               cycle                  | busy | full |
//! +--------------------------------------+------+------+
//! ```
//!
//! The tag of an empty slot names the lap (`position / capacity`) that may
//! use it next. A slot moves `Empty(k) -> Full(k) -> Empty(k + 1)` once per
//! lap. When consumers may abandon a claimed position, producers pass
//! through `Busy(k)` while writing, and an abandoning consumer moves the
//! slot straight from `Empty(k)` to `Empty(k + 1)`.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicU64;

const FULL: u64 = 0b01;
const BUSY: u64 = 0b10;
const STATE_BITS: u32 = 2;

/// Packed `(cycle, busy, full)` word stored in [`Slot::tag`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tag(u64);

impl Tag {
    #[inline]
    pub(crate) const fn empty(cycle: u64) -> Self {
        Self(cycle << STATE_BITS)
    }

    #[inline]
    pub(crate) const fn busy(cycle: u64) -> Self {
        Self((cycle << STATE_BITS) | BUSY)
    }

    #[inline]
    pub(crate) const fn full(cycle: u64) -> Self {
        Self((cycle << STATE_BITS) | FULL)
    }

    #[inline]
    pub(crate) const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub(crate) const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) const fn cycle(self) -> u64 {
        self.0 >> STATE_BITS
    }

    #[inline]
    pub(crate) const fn is_full(self) -> bool {
        self.0 & FULL != 0
    }

    #[inline]
    pub(crate) const fn is_busy(self) -> bool {
        self.0 & BUSY != 0
    }

    #[inline]
    pub(crate) const fn is_empty(self) -> bool {
        self.0 & (FULL | BUSY) == 0
    }

    /// How a producer holding a claim on lap `cycle` should treat this tag.
    #[inline]
    pub(crate) fn for_producer(self, cycle: u64) -> SlotView {
        if self.cycle() == cycle {
            if self.is_empty() {
                SlotView::Ready
            } else {
                SlotView::Corrupt
            }
        } else if self.cycle() < cycle {
            SlotView::Behind
        } else {
            SlotView::Ahead
        }
    }

    /// How a consumer holding a claim on lap `cycle` should treat this tag.
    #[inline]
    pub(crate) fn for_consumer(self, cycle: u64) -> SlotView {
        if self.cycle() == cycle {
            if self.is_full() {
                SlotView::Ready
            } else {
                SlotView::Behind
            }
        } else if self.cycle() < cycle {
            SlotView::Behind
        } else {
            SlotView::Ahead
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_full() {
            "Full"
        } else if self.is_busy() {
            "Busy"
        } else {
            "Empty"
        };
        write!(f, "{}({})", state, self.cycle())
    }
}

/// What a slot's tag means to a thread that expects a given lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotView {
    /// The slot is in exactly the state this side needs.
    Ready,
    /// The slot has not reached the expected state yet.
    Behind,
    /// The slot has already moved past the expected lap.
    Ahead,
    /// Another thread acted on the same position: the protocol is broken.
    Corrupt,
}

/// One ring element: a tag plus storage that holds a `T` only while full.
pub(crate) struct Slot<T> {
    pub(crate) tag: AtomicU64,
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            tag: AtomicU64::new(Tag::empty(0).bits()),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}
