//! Trace events, the emission hooks' shared context, and the line/header
//! formats of spec.md §6.
//!
//! `TraceContext` follows spec.md §9's explicit guidance: "a
//! language-neutral design threads a small context struct through the
//! matching call-graph ... preferred over hidden thread-local globals" —
//! owned by `MatchingEngine` and passed as `&mut`, never reached for as a
//! static.

use crate::engine::config::Config;
use crate::engine::ring::{Consumer, Producer};
use crate::engine::types::{ExecutionReport, Order, OrderId, OrderType, Price, Quantity, Side};
use uuid::Uuid;

/// Static, compile-time-resolved identifiers for traced functions, replacing
/// the bytecode-injected UUIDs of the original instrumentation (spec.md §9).
pub mod function_id {
    use uuid::Uuid;

    pub const SUBMIT: Uuid = Uuid::from_u128(0x5f3d1b8a_5c9e_4b0d_8e2a_3a1f9b7c6d01);
    pub const MATCH_LOOP: Uuid = Uuid::from_u128(0x5f3d1b8a_5c9e_4b0d_8e2a_3a1f9b7c6d02);
    pub const REST_OR_CANCEL: Uuid = Uuid::from_u128(0x5f3d1b8a_5c9e_4b0d_8e2a_3a1f9b7c6d03);

    /// `(functionName, uuid, description)` tuples for the trace log's
    /// header section (spec.md §6).
    pub const TABLE: &[(&str, Uuid, &str)] = &[
        (
            "submit",
            SUBMIT,
            "Top-level entry point: processes one incoming order to completion.",
        ),
        (
            "match_loop",
            MATCH_LOOP,
            "Walks the opposite side of the book, generating fills against the incoming order.",
        ),
        (
            "rest_or_cancel",
            REST_OR_CANCEL,
            "Rests remaining limit quantity on the book, or cancels a residual market order.",
        ),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceEventType {
    #[default]
    Call,
    OrderIn,
    ExecReport,
    BookAdd,
    Snapshot,
}

/// A single traced event. Fully `Copy` with no heap references (spec.md
/// §9's recommended alternative to clear-on-release): enums are small
/// `Copy` values, `OrderId` is a `u128`, prices/quantities are `U256`, and
/// function identifiers are a 16-byte `Uuid`. `release()` on the ring
/// therefore never needs to clear anything out of a reused slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceEvent {
    pub event_type: TraceEventType,
    pub depth: u16,
    pub context_order_id: Option<OrderId>,
    pub function_id: Option<Uuid>,
    pub order_id: Option<OrderId>,
    pub side: Option<Side>,
    pub order_type: Option<OrderType>,
    pub execution_type: Option<crate::engine::types::ExecutionType>,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub order_size: Option<Quantity>,
    pub last_quantity: Option<Quantity>,
    pub cumulative_quantity: Option<Quantity>,
    pub remaining_quantity: Option<Quantity>,
}

/// Per-engine-instance context threaded through the matching call graph:
/// call-stack depth, the top-level order currently being processed, the
/// snapshot counter, and the ring producer. Owned by `MatchingEngine`, never
/// global (spec.md §4.6, §9).
pub struct TraceContext {
    depth: u32,
    current_order_id: Option<OrderId>,
    order_counter: u64,
    snapshot_interval: u64,
    producer: Option<Producer<TraceEvent>>,
}

impl TraceContext {
    pub fn new(producer: Option<Producer<TraceEvent>>, snapshot_interval: u64) -> Self {
        Self {
            depth: 0,
            current_order_id: None,
            order_counter: 0,
            snapshot_interval,
            producer,
        }
    }

    /// Disabled context: every emission site becomes a no-op, matching
    /// `emit = false` (spec.md §6).
    pub fn disabled() -> Self {
        Self::new(None, 1)
    }

    #[inline]
    fn claim(&mut self) -> Option<&mut TraceEvent> {
        let depth = self.depth as u16;
        let context_order_id = self.current_order_id;
        let slot = self.producer.as_mut()?.claim()?;
        *slot = TraceEvent {
            depth,
            context_order_id,
            ..TraceEvent::default()
        };
        Some(slot)
    }

    #[inline]
    pub fn publish(&mut self) {
        if let Some(producer) = self.producer.as_mut() {
            producer.publish();
        }
    }

    pub(crate) fn begin_order(&mut self, order_id: OrderId) {
        self.current_order_id = Some(order_id);
    }

    pub(crate) fn end_order(&mut self) {
        self.current_order_id = None;
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }

    pub(crate) fn emit_order_in(&mut self, order: &Order) {
        if let Some(event) = self.claim() {
            event.event_type = TraceEventType::OrderIn;
            event.order_id = Some(order.id);
            event.side = Some(order.side);
            event.order_type = Some(order.order_type);
            event.quantity = Some(order.quantity);
            event.price = match order.order_type {
                OrderType::Limit => Some(order.price),
                OrderType::Market => None,
            };
        }
    }

    pub(crate) fn emit_call(&mut self, function_id: Uuid) {
        if let Some(event) = self.claim() {
            event.event_type = TraceEventType::Call;
            event.function_id = Some(function_id);
        }
    }

    pub(crate) fn emit_exec_report(&mut self, report: &ExecutionReport) {
        if let Some(event) = self.claim() {
            event.event_type = TraceEventType::ExecReport;
            event.order_id = Some(report.order_id);
            event.side = Some(report.side);
            event.execution_type = Some(report.execution_type);
            event.order_size = Some(report.order_size);
            event.last_quantity = Some(report.last_quantity);
            event.cumulative_quantity = Some(report.cumulative_quantity);
            event.price = report.price;
        }
    }

    pub(crate) fn emit_book_add(&mut self, order: &Order) {
        if let Some(event) = self.claim() {
            event.event_type = TraceEventType::BookAdd;
            event.order_id = Some(order.id);
            event.side = Some(order.side);
            event.price = Some(order.price);
            event.remaining_quantity = Some(order.remaining());
            event.cumulative_quantity = Some(order.cumulative());
        }
    }

    /// Increments the per-instance order counter and, every
    /// `snapshot_interval` orders, claims a SNAPSHOT event (spec.md §4.6).
    /// Must only be called once, at `submit` exit at depth 0.
    pub(crate) fn maybe_emit_snapshot(&mut self) {
        self.order_counter += 1;
        if self.snapshot_interval == 0 {
            return;
        }
        if self.order_counter % self.snapshot_interval == 0
            && let Some(event) = self.claim()
        {
            event.event_type = TraceEventType::Snapshot;
        }
    }
}

/// Builds the trace context and, if tracing is enabled, the ring consumer
/// handle for `DrainWorker::spawn`, from a `Config` the way an external
/// driver is expected to before constructing `MatchingEngine::new`
/// (spec.md §6, "Config"). When `config.emit` is false the engine side
/// never claims a ring slot and no consumer is produced.
pub fn build_pipeline(config: &Config) -> (TraceContext, Option<Consumer<TraceEvent>>) {
    if !config.emit {
        return (TraceContext::disabled(), None);
    }
    let (producer, consumer) = crate::engine::ring::channel(config.ring_capacity);
    (
        TraceContext::new(Some(producer), config.snapshot_interval),
        Some(consumer),
    )
}

fn context_order_id_field(event: &TraceEvent) -> String {
    match event.context_order_id {
        Some(id) => id.to_string(),
        None => "N/A".to_string(),
    }
}

// `U256` has no `Display` impl, so the trace log reuses the CSV boundary's
// fixed-point decimal renderer rather than falling back to `Debug`'s hex
// dump — a human reading the trace log wants the same `100.500000` a reader
// of the report CSV sees, not a limb dump.
fn price_field(price: Option<Price>) -> String {
    match price {
        Some(p) => crate::engine::csv::format_decimal(p),
        None => String::new(),
    }
}

fn qty_field(qty: Quantity) -> String {
    crate::engine::csv::format_decimal(qty)
}

fn indent(depth: u16) -> String {
    "  ".repeat(depth as usize)
}

/// Renders the trace log's header section: one line per traced function.
pub fn format_header() -> String {
    let mut out = String::new();
    for (name, uuid, description) in function_id::TABLE {
        out.push_str(&format!("{name} | {uuid} | {description}\n"));
    }
    out
}

/// Renders one event line in the format of spec.md §6. `snapshot_payload`
/// is required (and only used) for `TraceEventType::Snapshot` events,
/// since a SNAPSHOT carries no payload of its own — the drain's virtual
/// book supplies it (spec.md §4.5).
pub fn format_event_line(event: &TraceEvent, snapshot_payload: Option<&str>) -> String {
    let ctx = context_order_id_field(event);
    let pad = indent(event.depth);
    match event.event_type {
        TraceEventType::OrderIn => {
            let order_id = event.order_id.expect("ORDER_IN event missing order_id");
            let side = event.side.expect("ORDER_IN event missing side");
            let order_type = event
                .order_type
                .expect("ORDER_IN event missing order_type");
            let qty = event.quantity.expect("ORDER_IN event missing quantity");
            format!(
                "{ctx} | {pad}ORDER_IN | {order_id} | {side} | {order_type} | qty={} | price={}",
                qty_field(qty),
                price_field(event.price)
            )
        }
        TraceEventType::Call => {
            let function_id = event.function_id.expect("CALL event missing function_id");
            format!("{ctx} | {pad}CALL | {function_id}")
        }
        TraceEventType::ExecReport => {
            let order_id = event.order_id.expect("EXEC_REPORT event missing order_id");
            let side = event.side.expect("EXEC_REPORT event missing side");
            let execution_type = event
                .execution_type
                .expect("EXEC_REPORT event missing execution_type");
            let order_size = event
                .order_size
                .expect("EXEC_REPORT event missing order_size");
            let last_qty = event
                .last_quantity
                .expect("EXEC_REPORT event missing last_quantity");
            let cum_qty = event
                .cumulative_quantity
                .expect("EXEC_REPORT event missing cumulative_quantity");
            format!(
                "{ctx} | {pad}EXEC_REPORT | {order_id} | {side} | {execution_type} | qty={} | lastQty={} | cumQty={} | price={}",
                qty_field(order_size),
                qty_field(last_qty),
                qty_field(cum_qty),
                price_field(event.price)
            )
        }
        TraceEventType::BookAdd => {
            let order_id = event.order_id.expect("BOOK_ADD event missing order_id");
            let side = event.side.expect("BOOK_ADD event missing side");
            let price = event.price.expect("BOOK_ADD event missing price");
            let remaining = event
                .remaining_quantity
                .expect("BOOK_ADD event missing remaining_quantity");
            let cum_qty = event
                .cumulative_quantity
                .expect("BOOK_ADD event missing cumulative_quantity");
            format!(
                "{ctx} | {pad}BOOK_ADD | {order_id} | {side} | price={} | remainingQty={} | cumQty={}",
                price_field(Some(price)),
                qty_field(remaining),
                qty_field(cum_qty)
            )
        }
        TraceEventType::Snapshot => {
            let payload = snapshot_payload.unwrap_or("Buy: []  Sell: []");
            format!("{ctx} | {pad}SNAPSHOT | {payload}")
        }
    }
}
