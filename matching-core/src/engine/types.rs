use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use crypto_bigint::{U256, Zero};
use mimalloc::MiMalloc;
use std::cell::UnsafeCell;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Price is the type used for prices in an order.
///
/// Represented as a fixed-point scaled 256-bit unsigned integer rather than
/// a float, so arithmetic stays exact and the type stays `Copy` with no
/// heap reference (see `TraceEvent`, which stores prices by value).
pub type Price = U256;

/// Quantity is the type used for order sizes.
pub type Quantity = U256;

/// Priority is the time-priority tiebreaker used by the order book.
pub type Priority = u64;

/// OrderId is a 128-bit identifier, base64url-encoded (no padding) at the
/// wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u128);

/// Error returned when an `OrderId` fails to parse from its wire encoding.
#[derive(Debug, thiserror::Error)]
pub enum OrderIdParseError {
    #[error("invalid base64 encoding: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded order id must be exactly 16 bytes, got {0}")]
    WrongLength(usize),
}

impl OrderId {
    pub fn new(id: u128) -> Self {
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0.to_be_bytes()))
    }
}

impl FromStr for OrderId {
    type Err = OrderIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        if bytes.len() != 16 {
            return Err(OrderIdParseError::WrongLength(bytes.len()));
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&bytes);
        Ok(OrderId(u128::from_be_bytes(buf)))
    }
}

/// Monotonically increasing arrival-sequence generator.
///
/// spec.md §9 leaves the source of `arrivalSequence` an open question
/// (wall-clock stamp vs. dedicated counter). This crate resolves it with a
/// dedicated counter assigned at `submit` entry: a wall-clock stamp can
/// produce duplicates under rapid submission, and the FIFO queues this
/// feeds are only correct if priorities are strictly increasing in arrival
/// order.
#[derive(Debug, Default)]
pub struct ArrivalSequencer(AtomicU64);

impl ArrivalSequencer {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn next(&self) -> Priority {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Side indicates the direction of the order.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// OrderType determines how the order is executed.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum OrderType {
    /// Limit orders specify a price and can rest on the book.
    Limit,
    /// Market orders have no price and never rest on the book.
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Market => write!(f, "MARKET"),
        }
    }
}

/// ExecutionType classifies an execution report.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ExecutionType {
    PartialFill,
    FullFill,
    Cancel,
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionType::PartialFill => write!(f, "PARTIAL_FILL"),
            ExecutionType::FullFill => write!(f, "FULL_FILL"),
            ExecutionType::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// BookKey orders resting orders by price-time priority.
///
/// For Buy orders higher prices sort first (reversed `Ord`), for Sell
/// orders lower prices sort first; within a price, lower `priority`
/// (earlier arrival) sorts first. A single skip list per side is enough to
/// get both price priority and FIFO time priority without a secondary
/// per-price-level queue structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookKey {
    pub price: Price,
    pub priority: Priority,
    pub side: Side,
}

impl Ord for BookKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.side {
            Side::Buy => self
                .price
                .cmp(&other.price)
                .reverse()
                .then(self.priority.cmp(&other.priority)),
            Side::Sell => self
                .price
                .cmp(&other.price)
                .then(self.priority.cmp(&other.priority)),
        }
    }
}

impl PartialOrd for BookKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// `Order` is a single limit or market order as it flows through the
/// engine. `remaining_quantity` and `cumulative_quantity` sit behind
/// `UnsafeCell` so a resting order can be updated in place while it lives
/// as a value inside the lock-free `SkipList` entry the book holds it in.
///
/// SAFETY: the matching engine is single-threaded end to end (spec.md §5);
/// no other thread ever reads or writes these cells, so the interior
/// mutability here never races.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Quantity,
    pub remaining_quantity: UnsafeCell<Quantity>,
    pub cumulative_quantity: UnsafeCell<Quantity>,
    pub arrival_sequence: Priority,
}

unsafe impl Sync for Order {}

impl Clone for Order {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            quantity: self.quantity,
            remaining_quantity: UnsafeCell::new(self.remaining()),
            cumulative_quantity: UnsafeCell::new(self.cumulative()),
            arrival_sequence: self.arrival_sequence,
        }
    }
}

impl Order {
    pub fn new(
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        arrival_sequence: Priority,
    ) -> Self {
        Self {
            id,
            side,
            order_type,
            price,
            quantity,
            remaining_quantity: UnsafeCell::new(quantity),
            cumulative_quantity: UnsafeCell::new(Price::ZERO),
            arrival_sequence,
        }
    }

    #[inline]
    pub fn remaining(&self) -> Quantity {
        unsafe { *self.remaining_quantity.get() }
    }

    #[inline]
    pub fn cumulative(&self) -> Quantity {
        unsafe { *self.cumulative_quantity.get() }
    }

    #[inline]
    pub fn book_key(&self) -> BookKey {
        BookKey {
            price: self.price,
            priority: self.arrival_sequence,
            side: self.side,
        }
    }

    /// Applies a fill of `qty` to this order, moving it from `remaining`
    /// into `cumulative`.
    ///
    /// SAFETY: only the (single) matching engine thread ever calls this,
    /// on an order it either owns locally (the taker) or has exclusive
    /// logical access to via the book (the maker head).
    ///
    /// Fatal: an invariant violation (underflow) panics rather than
    /// returning an error — spec.md §4.2 requires the engine not attempt
    /// to heal from a negative remaining quantity.
    #[inline]
    pub(crate) fn apply_fill(&self, qty: Quantity) {
        unsafe {
            let remaining = self.remaining_quantity.get();
            let cumulative = self.cumulative_quantity.get();
            assert!(qty <= *remaining, "{}", crate::engine::error::EngineFault::NegativeRemaining);
            *remaining = (*remaining).saturating_sub(&qty);
            *cumulative = (*cumulative).saturating_add(&qty);
        }
    }

    #[inline]
    pub fn execution_type_after_fill(&self) -> ExecutionType {
        if bool::from(self.remaining().is_zero()) {
            ExecutionType::FullFill
        } else {
            ExecutionType::PartialFill
        }
    }
}

/// ExecutionReport is an immutable record of one lifecycle event on one
/// side of a trade, or of a market-order cancellation.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub side: Side,
    pub execution_type: ExecutionType,
    pub order_size: Quantity,
    pub last_quantity: Quantity,
    pub cumulative_quantity: Quantity,
    pub price: Option<Price>,
}

impl ExecutionReport {
    pub fn from_fill(order: &Order, last_quantity: Quantity, price: Price) -> Self {
        Self {
            order_id: order.id,
            side: order.side,
            execution_type: order.execution_type_after_fill(),
            order_size: order.quantity,
            last_quantity,
            cumulative_quantity: order.cumulative(),
            price: Some(price),
        }
    }

    pub fn cancel(order: &Order) -> Self {
        Self {
            order_id: order.id,
            side: order.side,
            execution_type: ExecutionType::Cancel,
            order_size: order.quantity,
            last_quantity: order.remaining(),
            cumulative_quantity: order.cumulative(),
            price: None,
        }
    }
}
