use matching_core::prelude::*;

/// Installs a test-scoped `tracing` subscriber so a drain sink downgrade
/// (spec.md §7) is visible in test output instead of silently swallowed.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Builds a `MatchingEngine` with tracing disabled, for tests that only
/// care about book/report behavior.
pub fn engine() -> MatchingEngine {
    MatchingEngine::new(TraceContext::disabled())
}

pub fn order_id(raw: u128) -> OrderId {
    OrderId::new(raw)
}

pub fn price(whole: u64) -> Price {
    Price::from(whole)
}

pub fn qty(n: u64) -> Quantity {
    Quantity::from(n)
}

/// Submits a LIMIT order and unwraps the reports (test orders are always
/// well-formed, so validation rejection would indicate a test bug).
pub fn submit_limit(
    engine: &mut MatchingEngine,
    id: u128,
    side: Side,
    price_whole: u64,
    quantity: u64,
) -> Vec<ExecutionReport> {
    engine
        .submit(
            order_id(id),
            side,
            OrderType::Limit,
            Some(price(price_whole)),
            qty(quantity),
        )
        .expect("well-formed limit order rejected")
}

/// Submits a MARKET order and unwraps the reports.
pub fn submit_market(
    engine: &mut MatchingEngine,
    id: u128,
    side: Side,
    quantity: u64,
) -> Vec<ExecutionReport> {
    engine
        .submit(order_id(id), side, OrderType::Market, None, qty(quantity))
        .expect("well-formed market order rejected")
}
