//! Quoting strategy
//!
//! The crossing model turns sampled top-of-book prices of both legs into a
//! theoretical price, per-leg quote levels and order sizes. Placement and
//! cancellation are driven by the engine from the committed levels.

pub mod crossing;

pub use crossing::{order_size, quote_levels, Crossing, QuoteLevels, QuoterState, SignalPrices};
