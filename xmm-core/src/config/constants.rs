//! Default values for engine configuration
//!
//! Used by the serde `default = ...` hooks in [`super::types`].

use rust_decimal::Decimal;

// ===== QUOTING =====

/// Crossing tolerance: a crossing fires when the normalized distance exceeds `1 - EPSILON`
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// Partially filled orders count down this many decision cycles
pub const DEFAULT_ORDER_TTL: i64 = 100;

/// Minimum microseconds between two quoting cycles
/// Default: 0 (every eligible depth update)
pub const DEFAULT_SAMPLING_INTERVAL_US: u64 = 0;

/// Decimal places kept when converting an f64 quote level to a price
pub const LEVEL_DECIMAL_PLACES: u32 = 9;

// ===== RISK =====

/// Aggressive order price offset, in multiples of the current leg spread
pub const DEFAULT_LIQUIDATION_SPREAD_OFFSET: Decimal = Decimal::ONE;

/// Hedge order price offset, in multiples of the current leg spread
pub const DEFAULT_HEDGE_SPREAD_OFFSET: Decimal = Decimal::ONE;

// ===== RATE LIMITING =====

/// Short window: 1 second
pub const DEFAULT_SHORT_WINDOW_US: u64 = 1_000_000;
pub const DEFAULT_SHORT_WINDOW_LIMIT: u64 = 10;

/// Long window: 1 minute
pub const DEFAULT_LONG_WINDOW_US: u64 = 60_000_000;
pub const DEFAULT_LONG_WINDOW_LIMIT: u64 = 300;

// ===== ACCOUNT =====

/// Balance/position refresh cadence; 0 disables periodic refresh
pub const DEFAULT_ACCOUNT_REFRESH_INTERVAL_US: u64 = 0;
