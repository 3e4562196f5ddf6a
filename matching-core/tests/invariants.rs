//! Property-based tests for the quantified invariants of spec.md §8.

mod common;

use crate::common::*;
use matching_core::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct SubmitDirective {
    side: Side,
    is_market: bool,
    price_level: u64,
    quantity: u64,
}

fn directive_strategy() -> impl Strategy<Value = SubmitDirective> {
    (
        prop_oneof![Just(Side::Buy), Just(Side::Sell)],
        any::<bool>(),
        1u64..=10,
        1u64..=20,
    )
        .prop_map(|(side, is_market, price_level, quantity)| SubmitDirective {
            side,
            is_market,
            price_level,
            quantity,
        })
}

fn apply(engine: &mut MatchingEngine, id: u128, directive: SubmitDirective) -> Vec<ExecutionReport> {
    if directive.is_market {
        submit_market(engine, id, directive.side, directive.quantity)
    } else {
        submit_limit(engine, id, directive.side, directive.price_level, directive.quantity)
    }
}

/// Reports for a single submission are either `2K` fill reports (empty if
/// `K=0`), or `2K` fill reports followed by exactly one `CANCEL` (spec.md
/// §4.3, §8).
fn assert_report_shape(reports: &[ExecutionReport]) {
    let (fills, cancel) = match reports.last() {
        Some(last) if last.execution_type == ExecutionType::Cancel => {
            (&reports[..reports.len() - 1], Some(last))
        }
        _ => (reports, None),
    };
    assert_eq!(fills.len() % 2, 0, "fill reports must come in pairs");
    for pair in fills.chunks(2) {
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].price, pair[1].price, "a match's two reports share one price");
        assert!(pair[0].price.is_some(), "fill reports always carry a price");
    }
    if let Some(cancel) = cancel {
        assert_eq!(cancel.price, None, "CANCEL reports never carry a price");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// After every submission the book is never crossed, and reports from
    /// that submission have the shape spec.md §4.3/§8 requires.
    #[test]
    fn book_never_crosses_and_reports_are_well_shaped(directives in proptest::collection::vec(directive_strategy(), 1..40)) {
        let mut eng = engine();
        for (i, directive) in directives.into_iter().enumerate() {
            let reports = apply(&mut eng, i as u128, directive);
            assert_report_shape(&reports);

            if let (Some(buy), Some(sell)) = (eng.best_price(Side::Buy), eng.best_price(Side::Sell)) {
                prop_assert!(buy < sell, "book crossed: best buy {:?} >= best sell {:?}", buy, sell);
            }
        }
    }

    /// `quantity = remaining + cumulative` holds for whichever order sits at
    /// the head of either side after every submission.
    #[test]
    fn head_order_quantity_identity_holds(directives in proptest::collection::vec(directive_strategy(), 1..40)) {
        let mut eng = engine();
        for (i, directive) in directives.into_iter().enumerate() {
            apply(&mut eng, i as u128, directive);
            for side in [Side::Buy, Side::Sell] {
                eng.with_book_head(side, |order| {
                    assert_eq!(order.quantity, order.remaining().saturating_add(&order.cumulative()));
                });
            }
        }
    }

    /// Execution-report round-trip: parsing a formatted row reproduces the
    /// original report exactly (spec.md §8).
    #[test]
    fn execution_report_csv_round_trips(
        order_id_raw in any::<u128>(),
        side in prop_oneof![Just(Side::Buy), Just(Side::Sell)],
        execution_type in prop_oneof![
            Just(ExecutionType::PartialFill),
            Just(ExecutionType::FullFill),
            Just(ExecutionType::Cancel),
        ],
        order_size in 1u64..1_000_000,
        last_quantity in 0u64..1_000_000,
        cumulative_quantity in 0u64..1_000_000,
        has_price in any::<bool>(),
        price_whole in 0u64..1_000_000,
    ) {
        let price = if execution_type == ExecutionType::Cancel && !has_price {
            None
        } else {
            Some(Price::from(price_whole))
        };
        let report = ExecutionReport {
            order_id: OrderId::new(order_id_raw),
            side,
            execution_type,
            order_size: Quantity::from(order_size),
            last_quantity: Quantity::from(last_quantity),
            cumulative_quantity: Quantity::from(cumulative_quantity),
            price,
        };
        let fields = report.to_csv_fields();
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let parsed = ExecutionReport::from_csv_fields(&refs).expect("well-formed row must parse");
        prop_assert_eq!(parsed.order_id, report.order_id);
        prop_assert_eq!(parsed.side, report.side);
        prop_assert_eq!(parsed.execution_type, report.execution_type);
        prop_assert_eq!(parsed.order_size, report.order_size);
        prop_assert_eq!(parsed.last_quantity, report.last_quantity);
        prop_assert_eq!(parsed.cumulative_quantity, report.cumulative_quantity);
        prop_assert_eq!(parsed.price, report.price);
    }
}

#[test]
fn order_row_csv_round_trips_market_order() {
    let row = OrderRow {
        id: OrderId::new(0x1234_5678_90ab_cdef_1122_3344_5566_7788),
        side: Side::Sell,
        order_type: OrderType::Market,
        price: None,
        quantity: qty(42),
    };
    let fields = row.to_csv_fields();
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let parsed = OrderRow::from_csv_fields(&refs).unwrap();
    assert_eq!(parsed, row);
}

#[test]
fn order_row_csv_round_trips_limit_order() {
    let row = OrderRow {
        id: OrderId::new(7),
        side: Side::Buy,
        order_type: OrderType::Limit,
        price: Some(price(100)),
        quantity: qty(10),
    };
    let fields = row.to_csv_fields();
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let parsed = OrderRow::from_csv_fields(&refs).unwrap();
    assert_eq!(parsed, row);
}

#[test]
fn decimal_round_trips_fixed_scale() {
    let value = parse_decimal("100.5").unwrap();
    assert_eq!(format_decimal(value), "100.500000");
    assert_eq!(parse_decimal(&format_decimal(value)).unwrap(), value);
}
