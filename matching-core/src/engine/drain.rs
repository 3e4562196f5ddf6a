//! The drain side of the trace pipeline: a background thread that polls
//! the ring consumer, reconstructs just enough order book state to render
//! SNAPSHOT events cheaply, formats every event as a line, and appends it
//! to the configured sink (spec.md §4.5).
//!
//! The background-thread shape — an `Arc<AtomicBool>` running flag, a
//! spawned loop, and a joined shutdown — is the same pattern used to drive
//! a long-lived worker thread elsewhere in this crate's benches
//! (`benches/matching_bench.rs`).

use crate::engine::config::{Config, OutputMode};
use crate::engine::error::DrainError;
use crate::engine::ring::Consumer;
use crate::engine::trace::{TraceEvent, TraceEventType, format_event_line, format_header};
use crate::engine::types::{OrderId, Price, Quantity, Side};
use crypto_bigint::Zero;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct PriceLevel {
    quantity: Quantity,
    order_count: u32,
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self {
            quantity: Quantity::ZERO,
            order_count: 0,
        }
    }
}

/// A best-effort reconstruction of the resting book, built from nothing
/// but BOOK_ADD and EXEC_REPORT trace events (spec.md §4.5): the drain
/// never touches the live `OrderBook`, so this is the only state a
/// SNAPSHOT can be rendered from off the hot path.
#[derive(Default)]
struct VirtualBook {
    resting: HashMap<OrderId, (Side, Price)>,
    remaining: HashMap<OrderId, Quantity>,
    buy_levels: BTreeMap<Price, PriceLevel>,
    sell_levels: BTreeMap<Price, PriceLevel>,
}

impl VirtualBook {
    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.buy_levels,
            Side::Sell => &mut self.sell_levels,
        }
    }

    fn apply(&mut self, event: &TraceEvent) {
        match event.event_type {
            TraceEventType::BookAdd => {
                let order_id = event.order_id.expect("BOOK_ADD missing order_id");
                let side = event.side.expect("BOOK_ADD missing side");
                let price = event.price.expect("BOOK_ADD missing price");
                let remaining = event
                    .remaining_quantity
                    .expect("BOOK_ADD missing remaining_quantity");
                self.resting.insert(order_id, (side, price));
                self.remaining.insert(order_id, remaining);
                let level = self.levels_mut(side).entry(price).or_default();
                level.quantity = level.quantity.saturating_add(&remaining);
                level.order_count += 1;
            }
            TraceEventType::ExecReport => {
                let order_id = event.order_id.expect("EXEC_REPORT missing order_id");
                // Cancels and fully-filled taker reports never had a
                // corresponding BOOK_ADD (market orders never rest, and an
                // immediately-filled taker never reaches `OrderBook::insert`);
                // such reports are simply not in `resting` and are ignored.
                let Some(&(side, price)) = self.resting.get(&order_id) else {
                    return;
                };
                let last_quantity = event
                    .last_quantity
                    .expect("EXEC_REPORT missing last_quantity");
                let still_remaining = self
                    .remaining
                    .get(&order_id)
                    .copied()
                    .unwrap_or(Quantity::ZERO)
                    .saturating_sub(&last_quantity);
                if let Some(level) = self.levels_mut(side).get_mut(&price) {
                    level.quantity = level.quantity.saturating_sub(&last_quantity);
                    if bool::from(still_remaining.is_zero()) {
                        level.order_count = level.order_count.saturating_sub(1);
                        if level.order_count == 0 {
                            self.levels_mut(side).remove(&price);
                        }
                    }
                }
                if bool::from(still_remaining.is_zero()) {
                    self.resting.remove(&order_id);
                    self.remaining.remove(&order_id);
                } else {
                    self.remaining.insert(order_id, still_remaining);
                }
            }
            TraceEventType::OrderIn | TraceEventType::Call | TraceEventType::Snapshot => {}
        }
    }

    /// Renders up to `levels` price levels per side, best price first:
    /// descending for Buy, ascending for Sell.
    fn format_snapshot(&self, levels: usize) -> String {
        let buy: Vec<String> = self
            .buy_levels
            .iter()
            .rev()
            .take(levels)
            .map(|(price, level)| {
                format!(
                    "{}:{}({})",
                    crate::engine::csv::format_decimal(*price),
                    crate::engine::csv::format_decimal(level.quantity),
                    level.order_count
                )
            })
            .collect();
        let sell: Vec<String> = self
            .sell_levels
            .iter()
            .take(levels)
            .map(|(price, level)| {
                format!(
                    "{}:{}({})",
                    crate::engine::csv::format_decimal(*price),
                    crate::engine::csv::format_decimal(level.quantity),
                    level.order_count
                )
            })
            .collect();
        format!("Buy: [{}]  Sell: [{}]", buy.join(", "), sell.join(", "))
    }
}

enum Sink {
    File(BufWriter<File>),
    Null,
}

impl Sink {
    fn open(mode: &OutputMode) -> Result<Self, DrainError> {
        match mode {
            OutputMode::None => Ok(Sink::Null),
            OutputMode::File(path) => {
                let file = File::create(path).map_err(|source| DrainError::Open {
                    path: path.clone(),
                    source,
                })?;
                let mut writer = BufWriter::new(file);
                writer
                    .write_all(format_header().as_bytes())
                    .map_err(DrainError::Write)?;
                Ok(Sink::File(writer))
            }
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), DrainError> {
        match self {
            Sink::Null => Ok(()),
            Sink::File(writer) => writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(DrainError::Write),
        }
    }

    fn flush(&mut self) -> Result<(), DrainError> {
        match self {
            Sink::Null => Ok(()),
            Sink::File(writer) => writer.flush().map_err(DrainError::Write),
        }
    }
}

/// Owns the consumer half of the trace ring and the background thread
/// that drains it. Dropping this without calling `shutdown` still joins
/// the thread (see `Drop`), but `shutdown` is the orderly path: it signals
/// exit, joins with a bound, and performs one final drain pass from the
/// calling thread in case the worker missed the signal mid-park
/// (spec.md §4.5, §7).
pub struct DrainWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Consumer<TraceEvent>>>,
}

impl DrainWorker {
    /// Spawns the drain thread. `snapshot_levels` bounds how many price
    /// levels per side a SNAPSHOT line renders.
    pub fn spawn(consumer: Consumer<TraceEvent>, config: &Config) -> Result<Self, DrainError> {
        let sink = Sink::open(&config.output)?;
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        let snapshot_levels = config.snapshot_levels;
        let flush_high_water = config.flush_high_water;
        let handle = std::thread::Builder::new()
            .name("trace-drain".into())
            .spawn(move || drain_loop(consumer, sink, snapshot_levels, flush_high_water, worker_running))
            .expect("failed to spawn trace-drain thread");
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Signals the drain loop to exit and joins it, bounding the wait so a
    /// wedged drain thread cannot hang the caller forever (spec.md §5). If
    /// the thread has not finished within `timeout`, this gives up on the
    /// join rather than blocking past it — the drain thread is left to
    /// finish in the background and its final flush still happens there;
    /// the calling thread cannot safely reach into the ring's consumer
    /// half to drain it itself without risking two threads polling the
    /// same SPSC consumer at once, so it cannot act as the safety net the
    /// ring is otherwise shared with.
    pub fn shutdown(mut self, timeout: Duration) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let start = std::time::Instant::now();
            while !handle.is_finished() && start.elapsed() < timeout {
                std::thread::sleep(Duration::from_millis(1));
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn drain_loop(
    mut consumer: Consumer<TraceEvent>,
    mut sink: Sink,
    snapshot_levels: usize,
    flush_high_water: usize,
    running: Arc<AtomicBool>,
) -> Consumer<TraceEvent> {
    let mut book = VirtualBook::default();
    let mut pending_bytes = 0usize;
    loop {
        let mut drained_any = false;
        while let Some(event) = consumer.poll() {
            let event = *event;
            book.apply(&event);
            let snapshot_payload = matches!(event.event_type, TraceEventType::Snapshot)
                .then(|| book.format_snapshot(snapshot_levels));
            let line = format_event_line(&event, snapshot_payload.as_deref());
            pending_bytes += line.len() + 1;
            if let Err(err) = sink.write_line(&line) {
                tracing::error!(error = %err, "trace sink write failed, downgrading to null sink");
                sink = Sink::Null;
            }
            consumer.release();
            drained_any = true;
            if pending_bytes >= flush_high_water {
                if let Err(err) = sink.flush() {
                    tracing::error!(error = %err, "trace sink flush failed, downgrading to null sink");
                    sink = Sink::Null;
                }
                pending_bytes = 0;
            }
        }
        if !running.load(Ordering::Relaxed) && !drained_any {
            break;
        }
        if !drained_any {
            std::thread::sleep(Duration::from_micros(100));
        }
    }
    let _ = sink.flush();
    consumer
}
