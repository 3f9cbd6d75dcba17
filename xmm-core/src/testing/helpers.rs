//! Test data builders
//!
//! Two reference legs and a configuration built on them, plus shorthands for
//! the inbound events a test feeds the engine.

use crate::config::{
    DispatcherConfig, EngineConfig, FeeSchedule, HedgeConfig, LegConfig,
    RateLimitConfig, RiskConfig, StrategyConfig,
};
use crate::core::{InstrumentType, LegId, OrderId, OrderStatus, PerLeg, Side, TradingMode};
use crate::data::{
    Action, Balance, CancelResponse, CorrelationTag, Event, EventPayload, OrderAck, OrderUpdate,
    PrivateTrade, PublicTrade,
};
use crate::orderbook::Level;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Linear, unit-denominated BTCUSDT perpetual
pub fn linear_leg() -> LegConfig {
    LegConfig {
        venue: "binance-usds-futures".to_string(),
        instrument: "BTCUSDT".to_string(),
        instrument_type: InstrumentType::Linear,
        contract_denominated: false,
        base_asset: Some("BTC".to_string()),
        quote_asset: Some("USDT".to_string()),
        price_increment: Some(dec!(0.5)),
        quantity_increment: Some(dec!(0.001)),
        fees: FeeSchedule {
            maker_rate: dec!(0.0002),
            taker_rate: dec!(0.0004),
            ..FeeSchedule::default()
        },
        initial_base_balance: Decimal::ZERO,
        initial_quote_balance: Decimal::ZERO,
        websocket_execution: false,
    }
}

/// Inverse swap quoted in 1 USD contracts, fees charged in BTC
pub fn inverse_contract_leg() -> LegConfig {
    LegConfig {
        venue: "okx".to_string(),
        instrument: "BTC-USD-SWAP".to_string(),
        instrument_type: InstrumentType::Inverse,
        contract_denominated: true,
        base_asset: Some("BTC".to_string()),
        quote_asset: Some("USD".to_string()),
        price_increment: Some(dec!(0.5)),
        quantity_increment: Some(dec!(1)),
        fees: FeeSchedule {
            maker_rate: dec!(0.0002),
            taker_rate: dec!(0.0005),
            maker_buyer_fee_asset: Some("BTC".to_string()),
            maker_seller_fee_asset: Some("BTC".to_string()),
            taker_buyer_fee_asset: Some("BTC".to_string()),
            taker_seller_fee_asset: Some("BTC".to_string()),
        },
        initial_base_balance: Decimal::ZERO,
        initial_quote_balance: Decimal::ZERO,
        websocket_execution: true,
    }
}

/// BACKTEST configuration over [`linear_leg`] and [`inverse_contract_leg`]
///
/// `s = t = (1, -1)`, margin 2, stepback 1. A flat book of A 100/101 and
/// B 50/51 puts the theoretical price at 50.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        mode: TradingMode::Backtest,
        legs: PerLeg::new(linear_leg(), inverse_contract_leg()),
        strategy: StrategyConfig {
            signal_vector: [1.0, -1.0],
            trading_vector: [1.0, -1.0],
            margin: 2.0,
            stepback: 1.0,
            epsilon: 1e-5,
            typical_order_size: dec!(100),
            nc2l: 3,
            order_ttl: 10,
            hedge: HedgeConfig::default(),
        },
        risk: RiskConfig {
            max_drawdown: dec!(50),
            liquidation_spread_offset: Decimal::ONE,
        },
        rate_limit: RateLimitConfig::unlimited(),
        dispatcher: DispatcherConfig::default(),
    }
}

pub fn tag(action: Action, leg: LegId) -> CorrelationTag {
    CorrelationTag::new(action, leg)
}

/// One-level book
pub fn depth(time_us: u64, leg: LegId, bid: Decimal, ask: Decimal) -> Event {
    Event::tagged(
        time_us,
        tag(Action::MarketDepth, leg),
        EventPayload::MarketDepth {
            bids: vec![Level::new(bid, dec!(100))],
            asks: vec![Level::new(ask, dec!(100))],
        },
    )
}

pub fn public_trade(time_us: u64, leg: LegId, price: Decimal, size: Decimal) -> Event {
    Event::tagged(
        time_us,
        tag(Action::Trade, leg),
        EventPayload::PublicTrade(PublicTrade {
            price,
            size,
            aggressor: None,
        }),
    )
}

pub fn create_ack(
    time_us: u64,
    leg: LegId,
    side: Side,
    order_id: &str,
    price: Decimal,
    quantity: Decimal,
) -> Event {
    Event::tagged(
        time_us,
        tag(Action::CreateOrder { side }, leg),
        EventPayload::CreateOrderResponse(Ok(OrderAck {
            order_id: OrderId::from(order_id),
            client_order_id: format!("client-{}", order_id),
            side,
            price,
            quantity,
            cumulative_filled: Decimal::ZERO,
            status: OrderStatus::New,
        })),
    )
}

pub fn cancel_ack(time_us: u64, leg: LegId, side: Side, order_id: &str) -> Event {
    Event::tagged(
        time_us,
        tag(Action::CancelOrder { side }, leg),
        EventPayload::CancelOrderResponse(Ok(CancelResponse {
            order_id: OrderId::from(order_id),
        })),
    )
}

pub fn cancel_all_ack(time_us: u64, leg: LegId, cancelled: &[&str]) -> Event {
    Event::tagged(
        time_us,
        tag(Action::CancelOpenOrders, leg),
        EventPayload::CancelOpenOrdersResponse(Ok(cancelled
            .iter()
            .map(|id| OrderId::from(*id))
            .collect())),
    )
}

/// Maker fill without a venue-reported fee
pub fn maker_fill(
    time_us: u64,
    leg: LegId,
    side: Side,
    order_id: &str,
    price: Decimal,
    size: Decimal,
) -> Event {
    Event::tagged(
        time_us,
        tag(Action::PrivateTrade, leg),
        EventPayload::PrivateTrade(PrivateTrade {
            trade_id: format!("trade-{}", order_id),
            order_id: OrderId::from(order_id),
            client_order_id: format!("client-{}", order_id),
            side,
            price,
            size,
            is_maker: true,
            fee: None,
        }),
    )
}

pub fn order_update(
    time_us: u64,
    leg: LegId,
    side: Side,
    order_id: &str,
    status: OrderStatus,
) -> Event {
    Event::tagged(
        time_us,
        tag(Action::OrderUpdate, leg),
        EventPayload::OrderUpdate(OrderUpdate {
            order_id: OrderId::from(order_id),
            client_order_id: format!("client-{}", order_id),
            side,
            price: Decimal::ZERO,
            quantity: Decimal::ZERO,
            cumulative_filled: Decimal::ZERO,
            status,
        }),
    )
}

pub fn balances(time_us: u64, leg: LegId, rows: &[(&str, Decimal)]) -> Event {
    Event::tagged(
        time_us,
        tag(Action::GetAccountBalances, leg),
        EventPayload::GetAccountBalancesResponse(Ok(rows
            .iter()
            .map(|(asset, quantity)| Balance {
                asset: asset.to_string(),
                quantity: *quantity,
            })
            .collect())),
    )
}
