//! Row-level CSV encode/decode for `Order` submissions and
//! `ExecutionReport`s (spec.md §6).
//!
//! No file, stdin/stdout, or exit-code handling lives here — reading the
//! input CSV and writing the output CSV remains the out-of-scope driver's
//! job (spec.md §1). These functions exist so that boundary, which the
//! driver owns, has a single parse/format surface to call into per row, and
//! so spec.md §8's round-trip property ("parse(serialize(report)) =
//! report") is expressible as an in-crate test.

use crate::engine::types::{
    ExecutionReport, ExecutionType, OrderId, OrderIdParseError, OrderType, Price, Quantity, Side,
};
use crypto_bigint::{Limb, NonZero, Reciprocal};

/// Prices and quantities are `U256` fixed-point scaled integers (spec.md
/// §9, `SPEC_FULL.md` §3); this is the number of implied decimal digits
/// used to render and parse them at the CSV boundary.
pub const DECIMAL_SCALE: u32 = 6;

const SCALE: u64 = 1_000_000; // 10^DECIMAL_SCALE

const SCALE_RECIPROCAL: Reciprocal = Reciprocal::new(NonZero::<Limb>::new_unwrap(Limb(SCALE)));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("wrong number of CSV fields: expected {expected}, got {got}")]
    FieldCount { expected: usize, got: usize },
    #[error("invalid order id: {0}")]
    OrderId(#[from] OrderIdParseError),
    #[error("invalid side: {0:?}")]
    Side(String),
    #[error("invalid order type: {0:?}")]
    OrderType(String),
    #[error("invalid execution type: {0:?}")]
    ExecutionType(String),
    #[error("invalid decimal value: {0:?}")]
    Decimal(String),
    #[error("limit row must carry a price")]
    MissingPrice,
}

/// Renders a scaled `Price`/`Quantity` as a fixed `DECIMAL_SCALE`-digit
/// decimal string (e.g. `100.500000`).
///
/// Assumes the value's whole-number part fits in a `u64` once the scale is
/// divided out, which holds for every realistic instrument; this crate's
/// CSV boundary is row-level encode/decode only; a driver feeding it values
/// outside that range is out of scope (spec.md §1).
pub fn format_decimal(value: Price) -> String {
    let (quotient, remainder) = value.div_rem_limb_with_reciprocal(&SCALE_RECIPROCAL);
    let whole = quotient.as_limbs()[0].0;
    format!("{whole}.{:0width$}", remainder.0, width = DECIMAL_SCALE as usize)
}

/// Parses a decimal string produced by `format_decimal` (or any decimal
/// string with at most `DECIMAL_SCALE` fractional digits) back into a
/// scaled `Price`/`Quantity`.
pub fn parse_decimal(s: &str) -> Result<Price, CsvError> {
    let (whole_str, frac_str) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if frac_str.len() > DECIMAL_SCALE as usize || (!whole_str.is_empty() && !whole_str.bytes().all(|b| b.is_ascii_digit())) {
        return Err(CsvError::Decimal(s.to_string()));
    }
    if !frac_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CsvError::Decimal(s.to_string()));
    }
    let whole: u64 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().map_err(|_| CsvError::Decimal(s.to_string()))?
    };
    let mut frac_padded = frac_str.to_string();
    frac_padded.push_str(&"0".repeat(DECIMAL_SCALE as usize - frac_str.len()));
    let frac: u64 = if frac_padded.is_empty() {
        0
    } else {
        frac_padded.parse().map_err(|_| CsvError::Decimal(s.to_string()))?
    };
    let scaled = Price::from(whole).saturating_mul(&Price::from(SCALE));
    Ok(scaled.saturating_add(&Price::from(frac)))
}

fn side_to_field(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn side_from_field(s: &str) -> Result<Side, CsvError> {
    match s {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(CsvError::Side(other.to_string())),
    }
}

fn order_type_to_field(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit => "LIMIT",
        OrderType::Market => "MARKET",
    }
}

fn order_type_from_field(s: &str) -> Result<OrderType, CsvError> {
    match s {
        "LIMIT" => Ok(OrderType::Limit),
        "MARKET" => Ok(OrderType::Market),
        other => Err(CsvError::OrderType(other.to_string())),
    }
}

fn execution_type_to_field(execution_type: ExecutionType) -> &'static str {
    match execution_type {
        ExecutionType::PartialFill => "PARTIAL_FILL",
        ExecutionType::FullFill => "FULL_FILL",
        ExecutionType::Cancel => "CANCEL",
    }
}

fn execution_type_from_field(s: &str) -> Result<ExecutionType, CsvError> {
    match s {
        "PARTIAL_FILL" => Ok(ExecutionType::PartialFill),
        "FULL_FILL" => Ok(ExecutionType::FullFill),
        "CANCEL" => Ok(ExecutionType::Cancel),
        other => Err(CsvError::ExecutionType(other.to_string())),
    }
}

/// The parsed contents of one input-CSV row: `orderId,side,orderType,
/// quantity,price` (spec.md §6). Carries no `arrivalSequence` — that is
/// assigned by `MatchingEngine::submit` at engine entry, not at the CSV
/// boundary — so this is the natural unit to hand a parsed row to
/// `submit`'s parameters directly, rather than constructing a throwaway
/// `Order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRow {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub quantity: Quantity,
}

impl OrderRow {
    pub fn to_csv_fields(&self) -> [String; 5] {
        [
            self.id.to_string(),
            side_to_field(self.side).to_string(),
            order_type_to_field(self.order_type).to_string(),
            format_decimal(self.quantity),
            match self.price {
                Some(p) => format_decimal(p),
                None => String::new(),
            },
        ]
    }

    pub fn from_csv_fields(fields: &[&str]) -> Result<Self, CsvError> {
        if fields.len() != 5 {
            return Err(CsvError::FieldCount {
                expected: 5,
                got: fields.len(),
            });
        }
        let id: OrderId = fields[0].parse()?;
        let side = side_from_field(fields[1])?;
        let order_type = order_type_from_field(fields[2])?;
        let quantity = parse_decimal(fields[3])?;
        let price = if fields[4].is_empty() {
            None
        } else {
            Some(parse_decimal(fields[4])?)
        };
        Ok(Self {
            id,
            side,
            order_type,
            price,
            quantity,
        })
    }
}

impl ExecutionReport {
    pub fn to_csv_fields(&self) -> [String; 7] {
        [
            self.order_id.to_string(),
            side_to_field(self.side).to_string(),
            execution_type_to_field(self.execution_type).to_string(),
            format_decimal(self.order_size),
            format_decimal(self.last_quantity),
            format_decimal(self.cumulative_quantity),
            match self.price {
                Some(p) => format_decimal(p),
                None => String::new(),
            },
        ]
    }

    pub fn from_csv_fields(fields: &[&str]) -> Result<Self, CsvError> {
        if fields.len() != 7 {
            return Err(CsvError::FieldCount {
                expected: 7,
                got: fields.len(),
            });
        }
        let order_id: OrderId = fields[0].parse()?;
        let side = side_from_field(fields[1])?;
        let execution_type = execution_type_from_field(fields[2])?;
        let order_size = parse_decimal(fields[3])?;
        let last_quantity = parse_decimal(fields[4])?;
        let cumulative_quantity = parse_decimal(fields[5])?;
        let price = match (execution_type, fields[6]) {
            (ExecutionType::Cancel, "") => None,
            (ExecutionType::Cancel, p) => Some(parse_decimal(p)?),
            (_, "") => return Err(CsvError::MissingPrice),
            (_, p) => Some(parse_decimal(p)?),
        };
        Ok(Self {
            order_id,
            side,
            execution_type,
            order_size,
            last_quantity,
            cumulative_quantity,
            price,
        })
    }
}
