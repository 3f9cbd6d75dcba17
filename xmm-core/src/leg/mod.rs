//! Per-leg state store
//!
//! - `state`: open orders, balances, books and acknowledgement bookkeeping
//! - `accounting`: the linear/inverse × unit/contract × buy/sell balance table

pub mod accounting;
pub mod state;

pub use accounting::{BalanceDelta, ContractTerms, FeeCurrency};
pub use state::{
    AppliedFill, CancelAck, FeeCharge, FillTotals, LegError, LegState, TakerOrder, UpdateOutcome,
};
