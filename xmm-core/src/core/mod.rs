//! Core domain types
//!
//! - `types`: leg/side identifiers, order ids and statuses, top of book
//! - `order_fsm`: order lifecycle transitions
//! - `errors`: transition errors and the logged condition taxonomy

pub mod errors;
pub mod order_fsm;
pub mod types;

pub use errors::{Condition, ConditionKind, OrderError, TagParseError};
pub use order_fsm::{FillOutcome, Order};
pub use types::{
    InstrumentType, LegId, Liquidity, OrderId, OrderPurpose, OrderStatus, PerLeg, PerSide, Side,
    TopOfBook, TradingMode,
};
