/// Errors from validating an incoming order before it enters the matching
/// core.
///
/// A rejected order produces no execution report and no trace event
/// (spec.md §4.2 step 1, §7): it is skipped by the caller exactly as if it
/// had failed CSV parsing at the boundary.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RejectedOrder {
    #[error("order quantity must be positive")]
    NonPositiveQuantity,
    #[error("limit order must specify a price")]
    LimitMissingPrice,
}

/// Internal invariant violations.
///
/// spec.md §4.2 and §7 classify these as fatal: "the engine must not
/// attempt to heal state". This crate never returns one of these from a
/// `Result` — every site that can detect one of these conditions panics
/// immediately via `assert!(condition, "{}", EngineFault::Variant)`, so
/// the variant's `Display` string becomes the panic message verbatim. A
/// driver that wraps matching in `std::panic::catch_unwind` and downcasts
/// the payload to `&str`/`String` sees exactly one of these three
/// messages for a genuine invariant violation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineFault {
    #[error("fill quantity exceeds remaining quantity")]
    NegativeRemaining,
    #[error("book is crossed after submission completed")]
    CrossedBook,
    #[error("ring slot released twice")]
    DoubleRelease,
}

/// Errors from the drain's trace sink.
///
/// Never propagated to the engine thread: the drain loop catches these,
/// logs one diagnostic, and downgrades to a null sink (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("failed to open trace sink at {path}: {source}")]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to trace sink: {0}")]
    Write(#[source] std::io::Error),
}
