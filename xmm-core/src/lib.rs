//! xmm Core - Dual-Leg Cross-Venue Market Maker
//!
//! The decision core of a two-leg market making engine. It consumes market
//! data and execution events for two correlated instruments, possibly on
//! different venues with different contract conventions, and produces the
//! order actions of a crossing-model quoting strategy with inventory limits
//! and a drawdown kill switch.
//!
//! ## Architecture
//! - **Single owner**: one [`Engine`] owns both legs, the quoter, the risk
//!   manager and the rate limiter; no locks
//! - **Event queue**: simulator answers and hedges are queued, not recursed
//! - **Same code path** in LIVE, PAPER and BACKTEST; only the request channel differs
//! - **Exact arithmetic**: prices, sizes and balances are `Decimal`
//!
//! ## Modules
//! - `core`: ids, sides, statuses, the order state machine, conditions
//! - `config`: serde configuration and validation
//! - `data`: inbound events and correlation tags
//! - `orderbook`: L2 book snapshots
//! - `leg`: per-leg state and balance accounting
//! - `strategy`: the crossing model
//! - `risk`: inventory limits, kill switch, rate limiter
//! - `execution`: requests, matching simulator, journal
//! - `engine`: the event dispatcher

pub mod config;
pub mod core;
pub mod data;
pub mod engine;
pub mod execution;
pub mod leg;
pub mod orderbook;
pub mod risk;
pub mod strategy;
pub mod testing;
pub mod utils;

pub use crate::config::EngineConfig;
pub use crate::core::{
    Condition, LegId, OrderId, OrderPurpose, OrderStatus, PerLeg, Side, TradingMode,
};
pub use crate::data::{CorrelationTag, Event, EventPayload};
pub use crate::engine::{Engine, EngineStats};
pub use crate::execution::{Channel, Request, RoutedRequest};

// Re-export error types
pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::{LegId, OrderId, OrderPurpose, OrderStatus, Side, TradingMode};
    pub use crate::data::{Action, CorrelationTag, Event, EventPayload};
    pub use crate::engine::{Clock, Engine, EngineStats, ManualClock, SystemClock};
    pub use crate::execution::{Channel, MemorySink, RecordSink, Request, RoutedRequest};
    pub use crate::{Error, Result};
}
