//! Matching simulator for PAPER and BACKTEST
//!
//! Stands in for the venues: answers every request with the events a venue
//! would send back, so the engine runs the same code path in every mode.
//!
//! ## Matching rules
//!
//! ```text
//! create     ack, then book sweep against the simulator's copy of the book:
//!            first contra level crossing the limit fills the whole remaining
//!            at that level's price (taker)
//!            no crossing level: rest (non-post-only also warns BookDepletion)
//! trade      every resting buy with limit >= print, sell with limit <= print,
//!            fills its whole remaining at its own limit
//! cancel     response + ORDER_UPDATE(CANCELED)
//! queries    answered from the engine's leg state
//! ```
//!
//! Every synthesized fill is a `PrivateTrade` followed by an
//! `OrderUpdate(FILLED)`, with the fee computed from the taker schedule.

use super::types::Request;
use crate::core::{Condition, LegId, Liquidity, OrderId, OrderPurpose, OrderStatus, PerLeg, Side};
use crate::data::{
    Action, Balance, CancelResponse, CorrelationTag, Event, EventPayload, ExchangeError, OrderAck,
    OrderUpdate, PositionReport, PrivateTrade,
};
use crate::leg::LegState;
use crate::orderbook::{L2OrderBook, Level};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Venue error code for an unknown order
const UNKNOWN_ORDER: i64 = -2011;
/// Venue error code for a malformed request
const INVALID_REQUEST: i64 = -1013;

/// An order resting in the simulated venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub purpose: OrderPurpose,
}

/// Events and conditions produced by one simulator call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationOutput {
    pub events: Vec<Event>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorStats {
    pub orders_accepted: u64,
    pub orders_rejected: u64,
    pub fills: u64,
    pub cancels: u64,
}

/// Local stand-in for both venues
#[derive(Debug, Clone, Default)]
pub struct MatchingSimulator {
    books: PerLeg<L2OrderBook>,
    resting: PerLeg<Vec<RestingOrder>>,
    next_order_id: u64,
    next_trade_id: u64,
    stats: SimulatorStats,
}

impl MatchingSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book(&self, leg: LegId) -> &L2OrderBook {
        &self.books[leg]
    }

    pub fn resting(&self, leg: LegId) -> &[RestingOrder] {
        &self.resting[leg]
    }

    pub fn stats(&self) -> SimulatorStats {
        self.stats
    }

    /// Refresh the simulator's copy of a leg's book
    pub fn on_depth(&mut self, leg: LegId, bids: &[Level], asks: &[Level]) {
        self.books[leg].replace(bids, asks);
    }

    /// Market sweep on a public trade print
    pub fn on_trade(
        &mut self,
        leg: LegId,
        trade_price: Decimal,
        time_us: u64,
        state: &LegState,
    ) -> SimulationOutput {
        let mut out = SimulationOutput::default();

        let (hit, kept): (Vec<RestingOrder>, Vec<RestingOrder>) =
            std::mem::take(&mut self.resting[leg])
                .into_iter()
                .partition(|o| match o.side {
                    Side::Buy => o.price >= trade_price,
                    Side::Sell => o.price <= trade_price,
                });
        self.resting[leg] = kept;

        for order in hit {
            debug!(
                "{} {}: trade at {} fills resting {} at {}",
                leg, order.side, trade_price, order.order_id, order.price
            );
            let price = order.price;
            self.fill(&mut out, leg, &order, price, true, time_us, state);
        }
        out
    }

    /// Answer one request
    pub fn submit(&mut self, request: &Request, time_us: u64, state: &LegState) -> SimulationOutput {
        let mut out = SimulationOutput::default();
        let tag = request.tag();

        match request {
            Request::CreateOrder {
                leg,
                side,
                price,
                quantity,
                post_only,
                client_order_id,
                purpose,
            } => {
                if *quantity <= Decimal::ZERO || *price <= Decimal::ZERO {
                    self.stats.orders_rejected += 1;
                    out.events.push(Event::tagged(
                        time_us,
                        tag,
                        EventPayload::CreateOrderResponse(Err(ExchangeError::new(
                            INVALID_REQUEST,
                            format!("invalid price {} or quantity {}", price, quantity),
                        ))),
                    ));
                    return out;
                }

                self.next_order_id += 1;
                let order = RestingOrder {
                    order_id: OrderId::new(format!("sim-{}", self.next_order_id)),
                    client_order_id: client_order_id.clone(),
                    side: *side,
                    price: *price,
                    quantity: *quantity,
                    purpose: *purpose,
                };
                self.stats.orders_accepted += 1;
                out.events.push(Event::tagged(
                    time_us,
                    tag,
                    EventPayload::CreateOrderResponse(Ok(OrderAck {
                        order_id: order.order_id.clone(),
                        client_order_id: order.client_order_id.clone(),
                        side: order.side,
                        price: order.price,
                        quantity: order.quantity,
                        cumulative_filled: Decimal::ZERO,
                        status: OrderStatus::New,
                    })),
                ));

                let crossing = self.books[*leg]
                    .contra_levels(*side)
                    .next()
                    .filter(|level| match side {
                        Side::Buy => level.price <= *price,
                        Side::Sell => level.price >= *price,
                    });

                match crossing {
                    Some(level) => self.fill(&mut out, *leg, &order, level.price, false, time_us, state),
                    None => {
                        if !post_only {
                            let condition = Condition::BookDepletion {
                                leg: *leg,
                                side: *side,
                                remaining: order.quantity,
                            };
                            warn!("{}", condition);
                            out.conditions.push(condition);
                        }
                        self.resting[*leg].push(order);
                    }
                }
            }

            Request::CancelOrder { leg, side, order_id } => {
                let position = self.resting[*leg]
                    .iter()
                    .position(|o| &o.order_id == order_id && o.side == *side);
                match position {
                    Some(idx) => {
                        let order = self.resting[*leg].remove(idx);
                        self.stats.cancels += 1;
                        out.events.push(Event::tagged(
                            time_us,
                            tag,
                            EventPayload::CancelOrderResponse(Ok(CancelResponse {
                                order_id: order.order_id.clone(),
                            })),
                        ));
                        out.events.push(cancel_update(*leg, &order, time_us));
                    }
                    None => out.events.push(Event::tagged(
                        time_us,
                        tag,
                        EventPayload::CancelOrderResponse(Err(ExchangeError::new(
                            UNKNOWN_ORDER,
                            format!("unknown order {}", order_id),
                        ))),
                    )),
                }
            }

            Request::CancelAllOpenOrders { leg } => {
                let cancelled = std::mem::take(&mut self.resting[*leg]);
                self.stats.cancels += cancelled.len() as u64;
                out.events.push(Event::tagged(
                    time_us,
                    tag,
                    EventPayload::CancelOpenOrdersResponse(Ok(cancelled
                        .iter()
                        .map(|o| o.order_id.clone())
                        .collect())),
                ));
                out.events
                    .extend(cancelled.iter().map(|o| cancel_update(*leg, o, time_us)));
            }

            Request::GetAccountBalances { .. } => {
                let payload = match state.instrument() {
                    Some(instrument) => Ok(vec![
                        Balance {
                            asset: instrument.base_asset.clone(),
                            quantity: state.base_balance,
                        },
                        Balance {
                            asset: instrument.quote_asset.clone(),
                            quantity: state.quote_balance,
                        },
                    ]),
                    None => Err(ExchangeError::new(INVALID_REQUEST, "instrument not resolved")),
                };
                out.events.push(Event::tagged(
                    time_us,
                    tag,
                    EventPayload::GetAccountBalancesResponse(payload),
                ));
            }

            Request::GetAccountPositions { .. } => {
                out.events.push(Event::tagged(
                    time_us,
                    tag,
                    EventPayload::GetAccountPositionsResponse(Ok(vec![PositionReport {
                        instrument: state.config().instrument.clone(),
                        quantity: state.position,
                    }])),
                ));
            }

            Request::GetInstrument { .. } => {
                let payload = state
                    .instrument()
                    .cloned()
                    .ok_or_else(|| ExchangeError::new(INVALID_REQUEST, "unknown instrument"));
                out.events.push(Event::tagged(
                    time_us,
                    tag,
                    EventPayload::GetInstrumentResponse(payload),
                ));
            }
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn fill(
        &mut self,
        out: &mut SimulationOutput,
        leg: LegId,
        order: &RestingOrder,
        price: Decimal,
        is_maker: bool,
        time_us: u64,
        state: &LegState,
    ) {
        self.next_trade_id += 1;
        self.stats.fills += 1;
        let fee = state.scheduled_fee(order.side, order.quantity, price, Liquidity::Taker);

        out.events.push(Event::tagged(
            time_us,
            CorrelationTag::new(Action::PrivateTrade, leg),
            EventPayload::PrivateTrade(PrivateTrade {
                trade_id: format!("sim-trade-{}", self.next_trade_id),
                order_id: order.order_id.clone(),
                client_order_id: order.client_order_id.clone(),
                side: order.side,
                price,
                size: order.quantity,
                is_maker,
                fee,
            }),
        ));
        out.events.push(Event::tagged(
            time_us,
            CorrelationTag::new(Action::OrderUpdate, leg),
            EventPayload::OrderUpdate(OrderUpdate {
                order_id: order.order_id.clone(),
                client_order_id: order.client_order_id.clone(),
                side: order.side,
                price: order.price,
                quantity: order.quantity,
                cumulative_filled: order.quantity,
                status: OrderStatus::Filled,
            }),
        ));
    }
}

fn cancel_update(leg: LegId, order: &RestingOrder, time_us: u64) -> Event {
    Event::tagged(
        time_us,
        CorrelationTag::new(Action::OrderUpdate, leg),
        EventPayload::OrderUpdate(OrderUpdate {
            order_id: order.order_id.clone(),
            client_order_id: order.client_order_id.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            cumulative_filled: Decimal::ZERO,
            status: OrderStatus::Canceled,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::linear_leg;
    use rust_decimal_macros::dec;

    fn setup() -> (MatchingSimulator, LegState) {
        let mut sim = MatchingSimulator::new();
        sim.on_depth(
            LegId::A,
            &[Level::new(dec!(100), dec!(5)), Level::new(dec!(99), dec!(5))],
            &[Level::new(dec!(101), dec!(5)), Level::new(dec!(102), dec!(5))],
        );
        (sim, LegState::new(LegId::A, linear_leg()))
    }

    fn create(side: Side, price: Decimal, post_only: bool) -> Request {
        Request::CreateOrder {
            leg: LegId::A,
            side,
            price,
            quantity: dec!(2),
            post_only,
            client_order_id: "c1".to_string(),
            purpose: OrderPurpose::Quote,
        }
    }

    #[test]
    fn test_post_only_quote_rests_quietly() {
        let (mut sim, state) = setup();
        let out = sim.submit(&create(Side::Buy, dec!(99.5), true), 1, &state);

        assert_eq!(out.events.len(), 1);
        assert!(matches!(
            out.events[0].payload,
            EventPayload::CreateOrderResponse(Ok(_))
        ));
        assert!(out.conditions.is_empty());
        assert_eq!(sim.resting(LegId::A).len(), 1);
    }

    #[test]
    fn test_crossing_create_fills_at_level_price() {
        let (mut sim, state) = setup();
        let out = sim.submit(&create(Side::Buy, dec!(102), false), 1, &state);

        assert_eq!(out.events.len(), 3);
        match &out.events[1].payload {
            EventPayload::PrivateTrade(trade) => {
                assert_eq!(trade.price, dec!(101));
                assert_eq!(trade.size, dec!(2));
                assert!(!trade.is_maker);
                // taker 4 bps on 202 notional
                assert_eq!(trade.fee.as_ref().unwrap().quantity, dec!(0.0808));
            }
            other => panic!("expected private trade, got {:?}", other),
        }
        assert!(matches!(
            &out.events[2].payload,
            EventPayload::OrderUpdate(u) if u.status == OrderStatus::Filled
        ));
        assert!(sim.resting(LegId::A).is_empty());
    }

    #[test]
    fn test_non_crossing_taker_warns_book_depletion() {
        let (mut sim, state) = setup();
        let out = sim.submit(&create(Side::Sell, dec!(105), false), 1, &state);
        assert!(matches!(out.conditions[0], Condition::BookDepletion { .. }));
        assert_eq!(sim.resting(LegId::A).len(), 1);
    }

    #[test]
    fn test_trade_sweeps_resting_orders_at_their_limit() {
        let (mut sim, state) = setup();
        sim.submit(&create(Side::Buy, dec!(99.5), true), 1, &state);
        sim.submit(&create(Side::Sell, dec!(103), true), 1, &state);

        let out = sim.on_trade(LegId::A, dec!(99), 2, &state);
        assert_eq!(out.events.len(), 2);
        match &out.events[0].payload {
            EventPayload::PrivateTrade(trade) => {
                assert_eq!(trade.side, Side::Buy);
                assert_eq!(trade.price, dec!(99.5));
                assert!(trade.is_maker);
            }
            other => panic!("expected private trade, got {:?}", other),
        }
        assert_eq!(sim.resting(LegId::A).len(), 1);
        assert_eq!(sim.resting(LegId::A)[0].side, Side::Sell);
    }

    #[test]
    fn test_cancel_all_reports_every_order() {
        let (mut sim, state) = setup();
        sim.submit(&create(Side::Buy, dec!(99.5), true), 1, &state);
        sim.submit(&create(Side::Sell, dec!(103), true), 1, &state);

        let out = sim.submit(&Request::CancelAllOpenOrders { leg: LegId::A }, 2, &state);
        assert_eq!(out.events.len(), 3);
        match &out.events[0].payload {
            EventPayload::CancelOpenOrdersResponse(Ok(ids)) => assert_eq!(ids.len(), 2),
            other => panic!("expected cancel-all response, got {:?}", other),
        }
        assert!(sim.resting(LegId::A).is_empty());
    }

    #[test]
    fn test_cancel_unknown_order_is_an_error() {
        let (mut sim, state) = setup();
        let out = sim.submit(
            &Request::CancelOrder {
                leg: LegId::A,
                side: Side::Buy,
                order_id: OrderId::from("nope"),
            },
            1,
            &state,
        );
        assert!(matches!(
            &out.events[0].payload,
            EventPayload::CancelOrderResponse(Err(e)) if e.code == UNKNOWN_ORDER
        ));
    }

    #[test]
    fn test_balance_query_reads_leg_state() {
        let (mut sim, state) = setup();
        let out = sim.submit(&Request::GetAccountBalances { leg: LegId::A }, 1, &state);
        match &out.events[0].payload {
            EventPayload::GetAccountBalancesResponse(Ok(balances)) => {
                assert_eq!(balances[0].asset, "BTC");
                assert_eq!(balances[1].asset, "USDT");
                assert_eq!(balances[1].quantity, Decimal::ZERO);
            }
            other => panic!("expected balances, got {:?}", other),
        }
    }
}
