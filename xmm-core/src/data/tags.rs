//! Correlation tags
//!
//! Every request leaves with a tag naming the action and the leg, and every
//! response or stream message comes back carrying one. On the wire a tag is
//! `ACTION#prodA`; it is parsed once at the boundary into [`CorrelationTag`].

use crate::core::{LegId, OrderPurpose, Side, TagParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a correlated message is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    CreateOrder { side: Side },
    HedgeOrder { side: Side },
    LiquidationOrder { side: Side },
    CancelOrder { side: Side },
    CancelOpenOrders,
    GetAccountBalances,
    GetAccountPositions,
    GetInstrument,
    MarketDepth,
    Trade,
    AggTrade,
    PrivateTrade,
    OrderUpdate,
}

impl Action {
    /// Tag action for an order create of the given purpose
    pub fn create(purpose: OrderPurpose, side: Side) -> Action {
        match purpose {
            OrderPurpose::Quote => Action::CreateOrder { side },
            OrderPurpose::Hedge => Action::HedgeOrder { side },
            OrderPurpose::Liquidation => Action::LiquidationOrder { side },
        }
    }

    /// Side carried by order actions
    pub fn side(self) -> Option<Side> {
        match self {
            Action::CreateOrder { side }
            | Action::HedgeOrder { side }
            | Action::LiquidationOrder { side }
            | Action::CancelOrder { side } => Some(side),
            _ => None,
        }
    }

    /// Purpose of an order create action
    pub fn purpose(self) -> Option<OrderPurpose> {
        match self {
            Action::CreateOrder { .. } => Some(OrderPurpose::Quote),
            Action::HedgeOrder { .. } => Some(OrderPurpose::Hedge),
            Action::LiquidationOrder { .. } => Some(OrderPurpose::Liquidation),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateOrder { side } => write!(f, "CREATE_ORDER_{}", side),
            Action::HedgeOrder { side } => write!(f, "HEDGE_ORDER_{}", side),
            Action::LiquidationOrder { side } => write!(f, "LIQUIDATION_ORDER_{}", side),
            Action::CancelOrder { side } => write!(f, "CANCEL_ORDER_{}", side),
            Action::CancelOpenOrders => write!(f, "CANCEL_OPEN_ORDERS"),
            Action::GetAccountBalances => write!(f, "GET_ACCOUNT_BALANCES"),
            Action::GetAccountPositions => write!(f, "GET_ACCOUNT_POSITIONS"),
            Action::GetInstrument => write!(f, "GET_INSTRUMENT"),
            Action::MarketDepth => write!(f, "MARKET_DEPTH"),
            Action::Trade => write!(f, "TRADE"),
            Action::AggTrade => write!(f, "AGG_TRADE"),
            Action::PrivateTrade => write!(f, "PRIVATE_TRADE"),
            Action::OrderUpdate => write!(f, "ORDER_UPDATE"),
        }
    }
}

impl FromStr for Action {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sided = |prefix: &str| -> Option<Side> {
            match s.strip_prefix(prefix)? {
                "BUY" => Some(Side::Buy),
                "SELL" => Some(Side::Sell),
                _ => None,
            }
        };

        let action = match s {
            "CANCEL_OPEN_ORDERS" => Action::CancelOpenOrders,
            "GET_ACCOUNT_BALANCES" => Action::GetAccountBalances,
            "GET_ACCOUNT_POSITIONS" => Action::GetAccountPositions,
            "GET_INSTRUMENT" => Action::GetInstrument,
            "MARKET_DEPTH" => Action::MarketDepth,
            "TRADE" => Action::Trade,
            "AGG_TRADE" => Action::AggTrade,
            "PRIVATE_TRADE" => Action::PrivateTrade,
            "ORDER_UPDATE" => Action::OrderUpdate,
            _ => {
                if let Some(side) = sided("CREATE_ORDER_") {
                    Action::CreateOrder { side }
                } else if let Some(side) = sided("HEDGE_ORDER_") {
                    Action::HedgeOrder { side }
                } else if let Some(side) = sided("LIQUIDATION_ORDER_") {
                    Action::LiquidationOrder { side }
                } else if let Some(side) = sided("CANCEL_ORDER_") {
                    Action::CancelOrder { side }
                } else {
                    return Err(TagParseError::UnknownAction(s.to_string()));
                }
            }
        };
        Ok(action)
    }
}

/// Structured correlation identifier `{action, leg}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationTag {
    pub action: Action,
    pub leg: LegId,
}

impl CorrelationTag {
    pub fn new(action: Action, leg: LegId) -> Self {
        Self { action, leg }
    }
}

impl fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.action, self.leg)
    }
}

impl FromStr for CorrelationTag {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (action, leg) = s
            .split_once('#')
            .ok_or_else(|| TagParseError::MissingSeparator(s.to_string()))?;
        let leg = match leg {
            "prodA" => LegId::A,
            "prodB" => LegId::B,
            other => return Err(TagParseError::UnknownLeg(other.to_string())),
        };
        Ok(Self {
            action: action.parse()?,
            leg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        let tag = CorrelationTag::new(Action::CreateOrder { side: Side::Buy }, LegId::A);
        assert_eq!(tag.to_string(), "CREATE_ORDER_BUY#prodA");

        let tag = CorrelationTag::new(Action::CancelOpenOrders, LegId::B);
        assert_eq!(tag.to_string(), "CANCEL_OPEN_ORDERS#prodB");
    }

    #[test]
    fn test_tag_parse() {
        let tag: CorrelationTag = "CANCEL_ORDER_SELL#prodB".parse().unwrap();
        assert_eq!(tag.leg, LegId::B);
        assert_eq!(tag.action, Action::CancelOrder { side: Side::Sell });
        assert_eq!(tag.action.side(), Some(Side::Sell));

        let tag: CorrelationTag = "LIQUIDATION_ORDER_BUY#prodA".parse().unwrap();
        assert_eq!(tag.action.purpose(), Some(OrderPurpose::Liquidation));
    }

    #[test]
    fn test_every_action_parses_back() {
        let actions = [
            Action::CreateOrder { side: Side::Sell },
            Action::HedgeOrder { side: Side::Buy },
            Action::LiquidationOrder { side: Side::Sell },
            Action::CancelOrder { side: Side::Buy },
            Action::CancelOpenOrders,
            Action::GetAccountBalances,
            Action::GetAccountPositions,
            Action::GetInstrument,
            Action::MarketDepth,
            Action::Trade,
            Action::AggTrade,
            Action::PrivateTrade,
            Action::OrderUpdate,
        ];
        for action in actions {
            let parsed: Action = action.to_string().parse().unwrap();
            assert_eq!(parsed, action);
        }
    }

    #[test]
    fn test_tag_parse_errors() {
        assert_eq!(
            "CREATE_ORDER_BUY".parse::<CorrelationTag>(),
            Err(TagParseError::MissingSeparator("CREATE_ORDER_BUY".to_string()))
        );
        assert_eq!(
            "CREATE_ORDER_BUY#prodC".parse::<CorrelationTag>(),
            Err(TagParseError::UnknownLeg("prodC".to_string()))
        );
        assert_eq!(
            "CREATE_ORDER_HOLD#prodA".parse::<CorrelationTag>(),
            Err(TagParseError::UnknownAction("CREATE_ORDER_HOLD".to_string()))
        );
    }
}
