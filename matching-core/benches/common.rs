use matching_core::prelude::*;

/// Builds a `MatchingEngine` with tracing disabled, isolating matching
/// throughput from ring/drain overhead.
pub fn untraced_engine() -> MatchingEngine {
    MatchingEngine::new(TraceContext::disabled())
}

pub fn submit_limit(engine: &mut MatchingEngine, id: u128, side: Side, price: u64, qty: u64) {
    engine
        .submit(OrderId::new(id), side, OrderType::Limit, Some(Price::from(price)), Quantity::from(qty))
        .unwrap();
}
