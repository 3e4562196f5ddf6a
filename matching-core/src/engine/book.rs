//! The resting order book: one price-time-priority skip list per side.
//!
//! Pared down to what this engine actually needs: a single instrument, no
//! per-order index (no cancel/replace is exposed), and no separate
//! market-order list (market orders never rest).
//! `crossbeam_skiplist::SkipList` plus `crossbeam::epoch` pinning are used
//! even though matching here is single-threaded end to end — the
//! lock-free skip list is still the right structure for O(log n)
//! best-price lookup and in-place
//! update of a resting order through its `UnsafeCell` fields.

use crate::engine::trace::TraceContext;
use crate::engine::types::{BookKey, Order, Price, Side};
use crossbeam::epoch;
use crossbeam::epoch::default_collector;
use crossbeam_skiplist::SkipList;

/// A single instrument's resting orders, one `BookKey`-ordered skip list
/// per side (spec.md §4.1).
pub struct OrderBook {
    buy: SkipList<BookKey, Order>,
    sell: SkipList<BookKey, Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        let collector = default_collector().clone();
        Self {
            buy: SkipList::new(collector.clone()),
            sell: SkipList::new(collector),
        }
    }

    fn side_list(&self, side: Side) -> &SkipList<BookKey, Order> {
        match side {
            Side::Buy => &self.buy,
            Side::Sell => &self.sell,
        }
    }

    /// `true` if `side` has no resting orders.
    pub fn is_empty(&self, side: Side) -> bool {
        let guard = &epoch::pin();
        self.side_list(side).front(guard).is_none()
    }

    /// The best (price-time-priority-first) price resting on `side`.
    pub fn best(&self, side: Side) -> Option<Price> {
        let guard = &epoch::pin();
        self.side_list(side).front(guard).map(|entry| entry.key().price)
    }

    /// Calls `f` with the order currently at the head of `side`'s book.
    /// The reference lets a caller mutate the maker's remaining and
    /// cumulative quantity in place through `Order`'s `UnsafeCell` fields,
    /// without removing and reinserting the skip list entry.
    pub fn with_head<R>(&self, side: Side, f: impl FnOnce(&Order) -> R) -> Option<R> {
        let guard = &epoch::pin();
        self.side_list(side).front(guard).map(|entry| f(entry.value()))
    }

    /// Removes the order at the head of `side`'s book, if any. A no-op if
    /// the head has already been removed (idempotent on the head only,
    /// per spec.md §8's `remove_head` invariant).
    pub fn remove_head(&self, side: Side) {
        let guard = &epoch::pin();
        if let Some(entry) = self.side_list(side).front(guard) {
            entry.remove();
        }
    }

    /// Inserts `order` at its price-time priority key, emitting the
    /// BOOK_ADD trace event immediately before it becomes visible to the
    /// opposite side of the book (spec.md §4.6).
    pub fn insert(&self, order: Order, trace: &mut TraceContext) {
        trace.emit_book_add(&order);
        let guard = &epoch::pin();
        let key = order.book_key();
        self.side_list(order.side).insert(key, order, guard);
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
