use crate::core::{LegId, OrderId, OrderPurpose, Side};
use crate::data::{Action, CorrelationTag};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outbound request produced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    CreateOrder {
        leg: LegId,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        /// Reject instead of taking liquidity
        post_only: bool,
        client_order_id: String,
        purpose: OrderPurpose,
    },
    CancelOrder {
        leg: LegId,
        side: Side,
        order_id: OrderId,
    },
    CancelAllOpenOrders {
        leg: LegId,
    },
    GetAccountBalances {
        leg: LegId,
    },
    GetAccountPositions {
        leg: LegId,
    },
    GetInstrument {
        leg: LegId,
    },
}

impl Request {
    pub fn leg(&self) -> LegId {
        match self {
            Request::CreateOrder { leg, .. }
            | Request::CancelOrder { leg, .. }
            | Request::CancelAllOpenOrders { leg }
            | Request::GetAccountBalances { leg }
            | Request::GetAccountPositions { leg }
            | Request::GetInstrument { leg } => *leg,
        }
    }

    /// Correlation tag the response will carry
    pub fn tag(&self) -> CorrelationTag {
        let action = match self {
            Request::CreateOrder { side, purpose, .. } => Action::create(*purpose, *side),
            Request::CancelOrder { side, .. } => Action::CancelOrder { side: *side },
            Request::CancelAllOpenOrders { .. } => Action::CancelOpenOrders,
            Request::GetAccountBalances { .. } => Action::GetAccountBalances,
            Request::GetAccountPositions { .. } => Action::GetAccountPositions,
            Request::GetInstrument { .. } => Action::GetInstrument,
        };
        CorrelationTag::new(action, self.leg())
    }

    /// Create, cancel and cancel-all are subject to the rate limiter's breach gate
    #[inline]
    pub fn is_order_action(&self) -> bool {
        matches!(
            self,
            Request::CreateOrder { .. }
                | Request::CancelOrder { .. }
                | Request::CancelAllOpenOrders { .. }
        )
    }
}

/// Transport a request is handed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Rest,
    Websocket,
    /// Answered by the local matching simulator
    Simulated,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Rest => write!(f, "REST"),
            Channel::Websocket => write!(f, "WEBSOCKET"),
            Channel::Simulated => write!(f, "SIMULATED"),
        }
    }
}

/// An admitted request with its transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedRequest {
    pub channel: Channel,
    pub request: Request,
}

impl RoutedRequest {
    #[inline]
    pub fn tag(&self) -> CorrelationTag {
        self.request.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_tags() {
        let create = Request::CreateOrder {
            leg: LegId::B,
            side: Side::Sell,
            price: dec!(53),
            quantity: dec!(1),
            post_only: true,
            client_order_id: "xmm-1".to_string(),
            purpose: OrderPurpose::Quote,
        };
        assert_eq!(create.tag().to_string(), "CREATE_ORDER_SELL#prodB");
        assert!(create.is_order_action());

        let hedge = Request::CreateOrder {
            leg: LegId::A,
            side: Side::Buy,
            price: dec!(103),
            quantity: dec!(1),
            post_only: false,
            client_order_id: "xmm-2".to_string(),
            purpose: OrderPurpose::Hedge,
        };
        assert_eq!(hedge.tag().to_string(), "HEDGE_ORDER_BUY#prodA");

        let query = Request::GetAccountBalances { leg: LegId::A };
        assert_eq!(query.tag().to_string(), "GET_ACCOUNT_BALANCES#prodA");
        assert!(!query.is_order_action());
        assert!(Request::CancelAllOpenOrders { leg: LegId::A }.is_order_action());
    }
}
