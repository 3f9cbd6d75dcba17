//! Inbound event model
//!
//! The transport decodes venue messages into [`Event`]s; the engine never
//! sees wire formats. Responses to requests carry `Result<_, ExchangeError>`
//! so a venue rejection is data, not a panic.

use super::tags::CorrelationTag;
use crate::config::Instrument;
use crate::core::{LegId, OrderId, OrderStatus, Side};
use crate::leg::FeeCharge;
use crate::orderbook::Level;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error reported by a venue in answer to a request
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("exchange error {code}: {message}")]
pub struct ExchangeError {
    pub code: i64,
    pub message: String,
}

impl ExchangeError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Acknowledged order as reported by the venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub cumulative_filled: Decimal,
    pub status: OrderStatus,
}

/// Single-order cancel acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub order_id: OrderId,
}

/// Public trade print (also used for aggregated trades)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicTrade {
    pub price: Decimal,
    pub size: Decimal,
    /// Aggressor side when the venue reports it
    #[serde(default)]
    pub aggressor: Option<Side>,
}

/// Fill of one of our orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateTrade {
    pub trade_id: String,
    pub order_id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub is_maker: bool,
    /// Venue-reported fee; the configured schedule is used when absent
    #[serde(default)]
    pub fee: Option<FeeCharge>,
}

/// Venue-pushed order status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub cumulative_filled: Decimal,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionReport {
    pub instrument: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub channel: String,
    pub subscribed: bool,
}

/// Event body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    MarketDepth { bids: Vec<Level>, asks: Vec<Level> },
    PublicTrade(PublicTrade),
    AggTrade(PublicTrade),
    PrivateTrade(PrivateTrade),
    OrderUpdate(OrderUpdate),
    CreateOrderResponse(Result<OrderAck, ExchangeError>),
    CancelOrderResponse(Result<CancelResponse, ExchangeError>),
    /// Ids of the orders the venue cancelled
    CancelOpenOrdersResponse(Result<Vec<OrderId>, ExchangeError>),
    GetAccountBalancesResponse(Result<Vec<Balance>, ExchangeError>),
    GetAccountPositionsResponse(Result<Vec<PositionReport>, ExchangeError>),
    GetInstrumentResponse(Result<Instrument, ExchangeError>),
    SessionStatus(SessionStatus),
    SubscriptionStatus(SubscriptionStatus),
}

impl EventPayload {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::MarketDepth { .. } => "market_depth",
            EventPayload::PublicTrade(_) => "trade",
            EventPayload::AggTrade(_) => "agg_trade",
            EventPayload::PrivateTrade(_) => "private_trade",
            EventPayload::OrderUpdate(_) => "order_update",
            EventPayload::CreateOrderResponse(_) => "create_order_response",
            EventPayload::CancelOrderResponse(_) => "cancel_order_response",
            EventPayload::CancelOpenOrdersResponse(_) => "cancel_open_orders_response",
            EventPayload::GetAccountBalancesResponse(_) => "get_account_balances_response",
            EventPayload::GetAccountPositionsResponse(_) => "get_account_positions_response",
            EventPayload::GetInstrumentResponse(_) => "get_instrument_response",
            EventPayload::SessionStatus(_) => "session_status",
            EventPayload::SubscriptionStatus(_) => "subscription_status",
        }
    }
}

/// One inbound event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event timestamp in microseconds; the logical clock in BACKTEST
    pub time_us: u64,
    pub tag: Option<CorrelationTag>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(time_us: u64, tag: Option<CorrelationTag>, payload: EventPayload) -> Self {
        Self {
            time_us,
            tag,
            payload,
        }
    }

    pub fn tagged(time_us: u64, tag: CorrelationTag, payload: EventPayload) -> Self {
        Self::new(time_us, Some(tag), payload)
    }

    #[inline]
    pub fn leg(&self) -> Option<LegId> {
        self.tag.map(|t| t.leg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Action;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_leg_comes_from_tag() {
        let event = Event::tagged(
            5,
            CorrelationTag::new(Action::MarketDepth, LegId::B),
            EventPayload::MarketDepth {
                bids: vec![Level::new(dec!(50), dec!(1))],
                asks: vec![],
            },
        );
        assert_eq!(event.leg(), Some(LegId::B));
        assert_eq!(event.payload.kind(), "market_depth");

        let untagged = Event::new(
            5,
            None,
            EventPayload::SessionStatus(SessionStatus {
                connected: true,
                detail: String::new(),
            }),
        );
        assert_eq!(untagged.leg(), None);
    }

    #[test]
    fn test_response_json_shape() {
        let payload = EventPayload::CancelOrderResponse(Err(ExchangeError::new(-2011, "unknown order")));
        let json = serde_json::to_string(&payload).unwrap();
        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert!(json.contains("unknown order"));
    }
}
