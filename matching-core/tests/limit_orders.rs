//! LIMIT-order-specific matching behavior: price priority, FIFO time
//! priority, and resting/removal mechanics (spec.md §4.1, §4.2).

mod common;

use crate::common::*;
use matching_core::prelude::*;

#[test]
fn full_fill_removes_resting_order() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 10);
    submit_limit(&mut eng, 2, Side::Buy, 100, 10);
    assert!(eng.side_is_empty(Side::Sell));
}

#[test]
fn earlier_arrival_matches_first_at_same_price() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 10); // earlier
    submit_limit(&mut eng, 2, Side::Sell, 100, 10); // later

    let reports = submit_limit(&mut eng, 3, Side::Buy, 100, 10);
    // The earlier sell (id 1) is the one fully filled and removed.
    assert_eq!(reports[1].order_id, order_id(1));
    assert_eq!(reports[1].execution_type, ExecutionType::FullFill);

    // Sell2 (id 2) is still resting, untouched.
    let remaining = eng.with_book_head(Side::Sell, |order| order.id).unwrap();
    assert_eq!(remaining, order_id(2));
}

#[test]
fn no_cross_no_fill() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 105, 10); // asks too high
    let reports = submit_limit(&mut eng, 2, Side::Buy, 100, 10); // bids too low

    assert!(reports.is_empty());
    assert_eq!(eng.best_price(Side::Sell), Some(price(105)));
    assert_eq!(eng.best_price(Side::Buy), Some(price(100)));
}

#[test]
fn multiple_partial_fills_consume_levels_in_fifo_order() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 5);
    submit_limit(&mut eng, 2, Side::Sell, 100, 5);

    let reports = submit_limit(&mut eng, 3, Side::Buy, 100, 8);
    assert_eq!(reports.len(), 4);
    // sell1 fully filled first, sell2 partially filled for the remainder.
    assert_eq!(reports[1].order_id, order_id(1));
    assert_eq!(reports[1].execution_type, ExecutionType::FullFill);
    assert_eq!(reports[3].order_id, order_id(2));
    assert_eq!(reports[3].execution_type, ExecutionType::PartialFill);
    assert_eq!(reports[3].last_quantity, qty(3));

    let remaining_qty = eng
        .with_book_head(Side::Sell, |order| order.remaining())
        .unwrap();
    assert_eq!(remaining_qty, qty(2));
}

#[test]
fn crossing_limit_exhausts_multiple_levels_best_to_worse() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 10);
    submit_limit(&mut eng, 2, Side::Sell, 101, 10);

    let reports = submit_limit(&mut eng, 3, Side::Buy, 101, 15);
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].price, Some(price(100)));
    assert_eq!(reports[1].price, Some(price(100)));
    assert_eq!(reports[2].price, Some(price(101)));
    assert_eq!(reports[3].price, Some(price(101)));

    // Residual 5 rests on the buy side at 101.
    assert_eq!(eng.best_price(Side::Buy), Some(price(101)));
    let remaining_qty = eng
        .with_book_head(Side::Buy, |order| order.remaining())
        .unwrap();
    assert_eq!(remaining_qty, qty(5));
}

#[test]
fn remove_head_is_safe_to_call_with_nothing_resting() {
    let book = OrderBook::new();
    let mut trace = TraceContext::disabled();

    let order = Order::new(OrderId::new(1), Side::Buy, OrderType::Limit, Price::from(100u64), Quantity::from(10u64), 0);
    book.insert(order, &mut trace);
    book.remove_head(Side::Buy);
    assert!(book.is_empty(Side::Buy));

    // The level is now empty; removing the (nonexistent) head again must not
    // panic and must leave the book empty (spec.md §8 idempotence note).
    book.remove_head(Side::Buy);
    assert!(book.is_empty(Side::Buy));
}
