//! The single-threaded, price-time-priority matching core (spec.md §4.2,
//! §4.3). A struct owning the book and driving a walk over it from one
//! public entry point, implemented as a direct loop against `OrderBook`'s
//! head-peek methods rather than a callback-driven walker trait — this
//! crate has exactly one order book implementation and one caller, so a
//! trait layer for testability/mocking would not be pulling its weight.

use crate::engine::book::OrderBook;
use crate::engine::error::RejectedOrder;
use crate::engine::trace::{TraceContext, function_id};
use crate::engine::types::{ArrivalSequencer, ExecutionReport, Order, OrderId, OrderType, Price, Quantity, Side};
use crypto_bigint::Zero;

/// One instrument's matching core: the resting book, the arrival-sequence
/// generator, and the trace context threaded through every `submit` call.
pub struct MatchingEngine {
    book: OrderBook,
    sequencer: ArrivalSequencer,
    trace: TraceContext,
}

impl MatchingEngine {
    pub fn new(trace: TraceContext) -> Self {
        Self {
            book: OrderBook::new(),
            sequencer: ArrivalSequencer::new(),
            trace,
        }
    }

    /// The best resting price on `side`, for callers that want to inspect
    /// book state between submissions (e.g. tests).
    pub fn best_price(&self, side: Side) -> Option<Price> {
        self.book.best(side)
    }

    pub fn side_is_empty(&self, side: Side) -> bool {
        self.book.is_empty(side)
    }

    /// Inspects the order currently resting at the head of `side`'s book,
    /// for callers that want to check per-order invariants between
    /// submissions (e.g. tests). Returns `None` if `side` is empty.
    pub fn with_book_head<R>(&self, side: Side, f: impl FnOnce(&crate::engine::types::Order) -> R) -> Option<R> {
        self.book.with_head(side, f)
    }

    /// Validates, matches, and rests or cancels one incoming order
    /// (spec.md §4.2). Returns the execution reports produced, in
    /// generation order. A rejected order produces no reports and no
    /// trace events (spec.md §4.2 step 1, §7).
    pub fn submit(
        &mut self,
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Option<Price>,
        quantity: Quantity,
    ) -> Result<Vec<ExecutionReport>, RejectedOrder> {
        if bool::from(quantity.is_zero()) {
            return Err(RejectedOrder::NonPositiveQuantity);
        }
        let price = match (order_type, price) {
            (OrderType::Limit, Some(p)) => p,
            (OrderType::Limit, None) => return Err(RejectedOrder::LimitMissingPrice),
            (OrderType::Market, _) => Price::ZERO,
        };

        let priority = self.sequencer.next();
        let order = Order::new(id, side, order_type, price, quantity, priority);

        self.trace.begin_order(order.id);
        self.trace.emit_order_in(&order);
        self.trace.emit_call(function_id::SUBMIT);

        let mut reports = Vec::new();

        self.trace.enter();
        self.trace.emit_call(function_id::MATCH_LOOP);
        self.match_loop(&order, &mut reports);
        self.trace.leave();

        self.trace.enter();
        self.trace.emit_call(function_id::REST_OR_CANCEL);
        self.rest_or_cancel(order, &mut reports);
        self.trace.leave();

        if let (Some(buy), Some(sell)) = (self.book.best(Side::Buy), self.book.best(Side::Sell)) {
            assert!(buy < sell, "{}", crate::engine::error::EngineFault::CrossedBook);
        }

        if self.trace.depth() == 0 {
            self.trace.maybe_emit_snapshot();
        }
        self.trace.publish();
        self.trace.end_order();

        Ok(reports)
    }

    /// Walks the opposite side of the book head-first, generating fills
    /// against `taker` until it is exhausted or no further match is
    /// possible (spec.md §4.3): a LIMIT taker stops at the first resting
    /// price it no longer crosses; a MARKET taker only stops when either
    /// side empties.
    fn match_loop(&mut self, taker: &Order, reports: &mut Vec<ExecutionReport>) {
        let opposite = taker.side.opposite();
        loop {
            if bool::from(taker.remaining().is_zero()) {
                break;
            }
            let Some(maker_price) = self.book.best(opposite) else {
                break;
            };
            if taker.order_type == OrderType::Limit {
                let crosses = match taker.side {
                    Side::Buy => taker.price >= maker_price,
                    Side::Sell => taker.price <= maker_price,
                };
                if !crosses {
                    break;
                }
            }

            let (taker_report, maker_report, maker_filled) = self
                .book
                .with_head(opposite, |maker| {
                    let fill_quantity = taker.remaining().min(maker.remaining());
                    // Executes at the resting (maker's) price, never the
                    // taker's limit price (spec.md §4.3).
                    taker.apply_fill(fill_quantity);
                    maker.apply_fill(fill_quantity);
                    let taker_report = ExecutionReport::from_fill(taker, fill_quantity, maker_price);
                    let maker_report = ExecutionReport::from_fill(maker, fill_quantity, maker_price);
                    (taker_report, maker_report, bool::from(maker.remaining().is_zero()))
                })
                .expect("opposite book head disappeared mid-match: invariant violation");

            // Incoming order's report before the resting order's, per
            // trace emission order (spec.md §4.6).
            self.trace.emit_exec_report(&taker_report);
            reports.push(taker_report);
            self.trace.emit_exec_report(&maker_report);
            reports.push(maker_report);

            if maker_filled {
                self.book.remove_head(opposite);
            }
        }
    }

    /// Rests any unfilled LIMIT residual on the book, or cancels an
    /// unfilled MARKET residual (spec.md §4.2 step 4, Non-goals: no
    /// IOC/FOK semantics, a MARKET order simply cancels whatever it could
    /// not immediately fill).
    fn rest_or_cancel(&mut self, order: Order, reports: &mut Vec<ExecutionReport>) {
        if bool::from(order.remaining().is_zero()) {
            return;
        }
        match order.order_type {
            OrderType::Limit => {
                self.book.insert(order, &mut self.trace);
            }
            OrderType::Market => {
                let report = ExecutionReport::cancel(&order);
                self.trace.emit_exec_report(&report);
                reports.push(report);
            }
        }
    }
}
