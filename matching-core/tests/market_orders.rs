//! MARKET-order-specific matching behavior: walking the book, cancelling
//! unfilled residuals, and never resting (spec.md §4.2 step 3, §8).

mod common;

use crate::common::*;
use matching_core::prelude::*;

#[test]
fn market_order_full_fill_against_single_level() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 10);

    let reports = submit_market(&mut eng, 2, Side::Buy, 10);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].execution_type, ExecutionType::FullFill);
    assert_eq!(reports[1].execution_type, ExecutionType::FullFill);
    assert!(eng.side_is_empty(Side::Sell));
}

#[test]
fn market_order_on_empty_book_cancels_immediately() {
    let mut eng = engine();
    let reports = submit_market(&mut eng, 1, Side::Sell, 10);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].execution_type, ExecutionType::Cancel);
    assert!(eng.side_is_empty(Side::Sell));
    assert!(eng.side_is_empty(Side::Buy));
}

#[test]
fn market_order_walks_multiple_price_levels() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 4);
    submit_limit(&mut eng, 2, Side::Sell, 101, 6);

    let reports = submit_market(&mut eng, 3, Side::Buy, 10);
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].price, Some(price(100)));
    assert_eq!(reports[2].price, Some(price(101)));
    assert!(eng.side_is_empty(Side::Sell));
}

#[test]
fn market_order_residual_cancels_with_correct_cumulative() {
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 2);

    let reports = submit_market(&mut eng, 2, Side::Buy, 5);
    let cancel = reports.last().unwrap();
    assert_eq!(cancel.execution_type, ExecutionType::Cancel);
    assert_eq!(cancel.order_size, qty(5));
    assert_eq!(cancel.last_quantity, qty(3));
    assert_eq!(cancel.cumulative_quantity, qty(2));
    assert_eq!(cancel.price, None);
}

#[test]
fn market_order_never_rests_even_with_residual() {
    let mut eng = engine();
    submit_market(&mut eng, 1, Side::Sell, 10);
    // A residual market order is cancelled, never rested: the side it
    // would have rested on stays empty.
    assert!(eng.side_is_empty(Side::Sell));
}

#[test]
fn market_order_ignores_a_supplied_price() {
    // spec.md §3: a MARKET order with a price field present at the
    // boundary is ignored. At this crate's API boundary that means
    // `submit`'s `price` parameter is simply not read for MARKET orders.
    let mut eng = engine();
    submit_limit(&mut eng, 1, Side::Sell, 100, 10);

    let reports = eng
        .submit(order_id(2), Side::Buy, OrderType::Market, Some(price(9999)), qty(10))
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].price, Some(price(100)));
}
