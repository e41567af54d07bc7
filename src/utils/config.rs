//! Configuration and constants for ingestion, statistics and output.

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Raw counters emitted by the runtime are 32-bit and wrap silently
pub const COUNTER_WRAP: f64 = 4_294_967_296.0;

/// Color assigned to intervals without an explicit COLOR description
pub const DEFAULT_COLOR: &str = "none";

/// Divisor applied to absolute times until a TIME command says otherwise
pub const DEFAULT_TICKS_PER_SEC: f64 = 1.0;

/// Clock rate of an owner that never received SPEED/MEMSPEED
pub const DEFAULT_CLOCKS_PER_SEC: u64 = 1;

/// Name given to the implicit owner when a trace has no CPU command
pub const DEFAULT_OWNER_NAME: &str = "CPU0";

/// Rows shown by the text summary unless told otherwise
pub const DEFAULT_SUMMARY_ROWS: usize = 10;
