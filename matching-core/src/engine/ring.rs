//! A fixed-capacity, single-producer/single-consumer ring buffer with
//! release/acquire cursor publication (spec.md §4.4).
//!
//! Built on `crossbeam::utils::CachePadded` for the false-sharing guard
//! spec.md §4.4 requires between the producer-owned and consumer-owned
//! cursors.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    value: UnsafeCell<T>,
}

// SAFETY: a slot is only ever accessed through the claim/publish/poll/
// release protocol below, which guarantees the producer and consumer never
// touch the same slot at the same time.
unsafe impl<T: Send> Sync for Slot<T> {}

/// Shared ring state: the slot array and the two padded cursors.
pub struct RingCore<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    capacity: usize,
    /// Producer-written, consumer-read. Padded so consumer-side reads of
    /// `tail` never share a cache line with producer-side reads of `head`.
    tail: CachePadded<AtomicUsize>,
    /// Consumer-written, producer-read.
    head: CachePadded<AtomicUsize>,
}

impl<T: Copy + Default> RingCore<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        let slots = (0..capacity)
            .map(|_| Slot {
                value: UnsafeCell::new(T::default()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: capacity - 1,
            capacity,
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Acquire-reads both cursors; racy with respect to a concurrently
    /// advancing producer/consumer, intended for diagnostics only.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }
}

/// Builds a ring buffer and returns its producer and consumer handles.
/// `capacity` must be a power of two.
pub fn channel<T: Copy + Default>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(RingCore::new(capacity));
    (
        Producer {
            ring: ring.clone(),
            write_cursor: 0,
            cached_head: 0,
        },
        Consumer {
            ring,
            head_local: 0,
            cached_tail: 0,
            slot_outstanding: false,
        },
    )
}

/// Producer-exclusive handle. Never blocks: `claim` returning `None` is
/// the expected backpressure signal and the caller silently drops that
/// event (spec.md §4.4 "Losses").
pub struct Producer<T> {
    ring: Arc<RingCore<T>>,
    write_cursor: usize,
    cached_head: usize,
}

impl<T: Copy + Default> Producer<T> {
    /// Reserves the next slot for writing. Returns `None` if the ring is
    /// full after refreshing the cached `head`.
    #[inline]
    pub fn claim(&mut self) -> Option<&mut T> {
        if self.write_cursor - self.cached_head >= self.ring.capacity {
            self.cached_head = self.ring.head.load(Ordering::Acquire);
            if self.write_cursor - self.cached_head >= self.ring.capacity {
                return None;
            }
        }
        let idx = self.write_cursor & self.ring.mask;
        self.write_cursor += 1;
        // SAFETY: indices in [cached_head, write_cursor) are exclusively
        // owned by the producer until `publish` makes them visible and the
        // consumer later advances `head` past them.
        Some(unsafe { &mut *self.ring.slots[idx].value.get() })
    }

    /// Makes every slot claimed since the last `publish` visible, in
    /// order, to the consumer. A call site may claim several slots and
    /// publish once to amortize the release-store (spec.md §4.4
    /// "Batching").
    #[inline]
    pub fn publish(&mut self) {
        self.ring.tail.store(self.write_cursor, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

/// Consumer-exclusive handle.
pub struct Consumer<T> {
    ring: Arc<RingCore<T>>,
    head_local: usize,
    cached_tail: usize,
    /// `true` once `poll` has handed out a slot that `release` has not yet
    /// reclaimed. Lets `release` detect a caller releasing the same slot
    /// twice in a row with no intervening `poll` (spec.md §7's "release on
    /// an already-released slot", a fatal invariant violation).
    slot_outstanding: bool,
}

impl<T: Copy + Default> Consumer<T> {
    /// Returns the next published slot, or `None` if the ring is empty
    /// after refreshing the cached `tail`.
    #[inline]
    pub fn poll(&mut self) -> Option<&T> {
        if self.head_local == self.cached_tail {
            self.cached_tail = self.ring.tail.load(Ordering::Acquire);
            if self.head_local == self.cached_tail {
                return None;
            }
        }
        let idx = self.head_local & self.ring.mask;
        self.slot_outstanding = true;
        // SAFETY: `publish`'s release-store of `tail` happens-before this
        // acquire-load observing it, so every write the producer made to
        // this slot's payload is visible here.
        Some(unsafe { &*self.ring.slots[idx].value.get() })
    }

    /// Releases the slot most recently returned by `poll`, making it
    /// available for the producer to reuse.
    #[inline]
    pub fn release(&mut self) {
        assert!(self.slot_outstanding, "{}", crate::engine::error::EngineFault::DoubleRelease);
        self.slot_outstanding = false;
        self.head_local += 1;
        self.ring.head.store(self.head_local, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
