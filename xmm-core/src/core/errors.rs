//! Error and condition types
//!
//! [`OrderError`] rejects an invalid lifecycle transition. [`Condition`] is
//! the taxonomy of recoverable situations the dispatcher logs and counts;
//! none of them ever escapes event processing.

use super::{LegId, OrderId, OrderStatus, Side};
use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid order lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("fill quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("fill price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("order {id} is already {status}")]
    Terminal { id: OrderId, status: OrderStatus },

    #[error("order {id} cannot move from {from} to {to}")]
    Regression {
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Failure to parse a correlation identifier at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
    #[error("correlation id '{0}' has no '#' separator")]
    MissingSeparator(String),

    #[error("unknown leg '{0}'")]
    UnknownLeg(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// Recoverable conditions raised while processing events
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Condition {
    /// Cancel or fill acknowledgement for an order that is no longer tracked
    #[error("stale acknowledgement on {leg} {side}: got {ack_id}, tracking {tracked}")]
    StaleAcknowledgment {
        leg: LegId,
        side: Side,
        ack_id: OrderId,
        tracked: String,
    },

    #[error("no open order on {leg} {side} for {operation}")]
    MissingOpenOrder {
        leg: LegId,
        side: Side,
        operation: &'static str,
    },

    #[error("rate limit breached, {suppressed} suppressed on {leg}")]
    RateLimitBreach {
        leg: LegId,
        suppressed: &'static str,
    },

    #[error("book exhausted on {leg} {side} with {remaining} left to fill")]
    BookDepletion {
        leg: LegId,
        side: Side,
        remaining: Decimal,
    },

    #[error("{action} on {leg} failed: {message}")]
    ExchangeResponseError {
        leg: LegId,
        action: String,
        message: String,
    },

    #[error("drawdown kill switch: peak {peak}, total {total}, limit {limit}")]
    DrawdownKillSwitch {
        peak: Decimal,
        total: Decimal,
        limit: Decimal,
    },
}

impl Condition {
    /// Short stable name, used as a counter key
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::StaleAcknowledgment { .. } => ConditionKind::StaleAcknowledgment,
            Condition::MissingOpenOrder { .. } => ConditionKind::MissingOpenOrder,
            Condition::RateLimitBreach { .. } => ConditionKind::RateLimitBreach,
            Condition::BookDepletion { .. } => ConditionKind::BookDepletion,
            Condition::ExchangeResponseError { .. } => ConditionKind::ExchangeResponseError,
            Condition::DrawdownKillSwitch { .. } => ConditionKind::DrawdownKillSwitch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    StaleAcknowledgment,
    MissingOpenOrder,
    RateLimitBreach,
    BookDepletion,
    ExchangeResponseError,
    DrawdownKillSwitch,
}
