use std::path::PathBuf;

/// Where the drain writes formatted trace lines.
///
/// `None` discards all trace output; the engine still claims/publishes
/// ring slots exactly as if tracing were live (so benchmarking with
/// `output = none` measures the ring's overhead honestly), it is the
/// drain's sink that becomes a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    File(PathBuf),
    None,
}

/// Read-only-after-construction configuration for the engine and drain.
///
/// Parsing this from a config file or CLI flags is the out-of-scope
/// driver's job (spec.md §1, §6); this crate only consumes the already
///-parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where formatted trace lines are written.
    pub output: OutputMode,
    /// Number of price levels per side rendered in a SNAPSHOT event.
    pub snapshot_levels: usize,
    /// Emit a SNAPSHOT every `snapshot_interval` processed orders.
    pub snapshot_interval: u64,
    /// When false, `submit` never claims a ring slot: matching runs with
    /// zero instrumentation overhead.
    pub emit: bool,
    /// Ring buffer capacity. Must be a power of two.
    pub ring_capacity: usize,
    /// Drain buffer high-water mark, in bytes, before an eager flush.
    pub flush_high_water: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputMode::None,
            snapshot_levels: 5,
            snapshot_interval: 1,
            emit: true,
            ring_capacity: 4096,
            flush_high_water: 64 * 1024,
        }
    }
}

impl Config {
    /// A config with tracing fully disabled, for callers that only care
    /// about matching throughput.
    pub fn untraced() -> Self {
        Self {
            emit: false,
            ..Self::default()
        }
    }
}
