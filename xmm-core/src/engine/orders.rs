//! Execution events: acknowledgements, fills, order updates and hedges

use super::{Engine, HedgeInstruction, Queued};
use crate::core::{
    Condition, LegId, Liquidity, Order, OrderId, OrderPurpose, OrderStatus, Side,
};
use crate::data::{CancelResponse, CorrelationTag, ExchangeError, OrderAck, OrderUpdate, PrivateTrade};
use crate::execution::journal::{JournalRecord, OrderUpdateRow, PrivateTradeRow};
use crate::execution::types::Request;
use crate::leg::{CancelAck, LegError, UpdateOutcome};
use crate::risk::aggressive_price;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

impl Engine {
    pub(super) fn on_create_response(
        &mut self,
        tag: CorrelationTag,
        result: Result<OrderAck, ExchangeError>,
    ) {
        let leg = tag.leg;
        let (Some(side), Some(purpose)) = (tag.action.side(), tag.action.purpose()) else {
            warn!("Create response carries non-create tag {}", tag);
            return;
        };

        let ack = match result {
            Ok(ack) => ack,
            Err(e) => {
                if purpose.is_resting() {
                    self.legs[leg].mark_create_failed(side);
                }
                self.raise(Condition::ExchangeResponseError {
                    leg,
                    action: tag.action.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        if ack.side != side {
            warn!("{}: ack for {} reports side {}", tag, ack.order_id, ack.side);
        }
        if ack.status == OrderStatus::Canceled {
            debug!("{}: order {} was not accepted", tag, ack.order_id);
            if purpose.is_resting() {
                self.legs[leg].mark_create_failed(side);
            }
            return;
        }

        // Fills are applied from trade confirmations, never from the ack
        if ack.cumulative_filled > Decimal::ZERO {
            debug!(
                "{}: ack for {} reports {} {} filled, waiting for trades",
                tag, ack.order_id, ack.status, ack.cumulative_filled
            );
        }
        let order = Order::new(
            ack.order_id,
            ack.client_order_id,
            side,
            ack.price,
            ack.quantity,
            self.config.strategy.order_ttl,
        );
        debug!("{} {}: {} {} @ {} acknowledged", leg, side, order.id, order.quantity, order.price);
        if purpose.is_resting() {
            self.legs[leg].apply_create_ack(side, order);
        } else {
            self.legs[leg].apply_taker_ack(purpose, order);
        }
    }

    pub(super) fn on_cancel_response(
        &mut self,
        tag: CorrelationTag,
        result: Result<CancelResponse, ExchangeError>,
    ) {
        let leg = tag.leg;
        let Some(side) = tag.action.side() else {
            warn!("Cancel response carries non-cancel tag {}", tag);
            return;
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.legs[leg].mark_cancel_failed(side);
                self.raise(Condition::ExchangeResponseError {
                    leg,
                    action: tag.action.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        match self.legs[leg].apply_cancel_ack(side, &response.order_id) {
            CancelAck::Cleared(order) => debug!("{} {}: order {} cancelled", leg, side, order.id),
            CancelAck::Duplicate => {
                debug!("{} {}: repeated cancel ack for {}", leg, side, response.order_id)
            }
            CancelAck::Stale { tracked } => self.raise(Condition::StaleAcknowledgment {
                leg,
                side,
                ack_id: response.order_id,
                tracked: tracked.to_string(),
            }),
            CancelAck::Missing => self.raise(Condition::MissingOpenOrder {
                leg,
                side,
                operation: "cancel acknowledgement",
            }),
        }
    }

    /// Cancel-all answered: place the committed quotes once nothing is in flight
    pub(super) fn on_cancel_all_response(
        &mut self,
        tag: CorrelationTag,
        result: Result<Vec<OrderId>, ExchangeError>,
    ) {
        let leg = tag.leg;
        self.legs[leg].finish_cancel_all();

        match result {
            Ok(cancelled) => debug!("{}: cancel-all removed {} orders", leg, cancelled.len()),
            Err(e) => {
                self.raise(Condition::ExchangeResponseError {
                    leg,
                    action: tag.action.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        }

        if self.legs[leg].cancel_in_flight() {
            debug!("{}: another cancel still in flight, quotes wait", leg);
            return;
        }
        self.place_quotes(leg);
    }

    pub(super) fn on_private_trade(&mut self, leg: LegId, trade: PrivateTrade) {
        let liquidity = if trade.is_maker {
            Liquidity::Maker
        } else {
            Liquidity::Taker
        };

        let applied = self.legs[leg].apply_fill(
            trade.side,
            &trade.order_id,
            trade.size,
            trade.price,
            liquidity,
            trade.fee.clone(),
        );

        match applied {
            Ok(fill) => {
                self.stats.fills += 1;
                info!(
                    "{} {}: {:?} fill {} @ {} on {} ({})",
                    leg, trade.side, fill.purpose, fill.absorbed, trade.price, trade.order_id,
                    fill.order.status()
                );

                let row = PrivateTradeRow {
                    time_us: self.now_us,
                    leg,
                    trade_id: trade.trade_id,
                    order_id: trade.order_id,
                    client_order_id: trade.client_order_id,
                    side: trade.side,
                    price: trade.price,
                    size: fill.absorbed,
                    is_maker: trade.is_maker,
                    purpose: fill.purpose,
                    fee_quantity: fill.fee.as_ref().map(|f| f.quantity),
                    fee_asset: fill.fee.as_ref().map(|f| f.asset.clone()),
                    position_a: self.legs.a.position,
                    position_b: self.legs.b.position,
                };
                self.sink.record(&JournalRecord::PrivateTrade(row));

                if fill.purpose == OrderPurpose::Quote && self.config.strategy.hedge.enabled {
                    self.queue.push_back(Queued::Hedge(HedgeInstruction {
                        filled_leg: leg,
                        side: trade.side,
                        absorbed: fill.absorbed,
                        order_quantity: fill.order.quantity,
                    }));
                }
            }
            Err(LegError::Condition(condition)) => self.raise(condition),
            Err(e) => warn!(
                "{}: fill {} on order {} not applied: {}",
                leg, trade.trade_id, trade.order_id, e
            ),
        }

        self.check_drawdown();
    }

    pub(super) fn on_order_update(&mut self, leg: LegId, update: OrderUpdate) {
        self.sink.record(&JournalRecord::OrderUpdate(OrderUpdateRow {
            time_us: self.now_us,
            leg,
            order_id: update.order_id.clone(),
            client_order_id: update.client_order_id.clone(),
            side: update.side,
            price: update.price,
            quantity: update.quantity,
            remaining: (update.quantity - update.cumulative_filled).max(Decimal::ZERO),
            cumulative_filled: update.cumulative_filled,
            status: update.status,
        }));

        match self.legs[leg].apply_order_update(update.side, &update.order_id, update.status) {
            Ok(UpdateOutcome::Canceled(order)) => {
                debug!("{} {}: order {} cancelled by venue", leg, update.side, order.id)
            }
            Ok(UpdateOutcome::Unchanged) => {}
            Ok(UpdateOutcome::Untracked) => {
                debug!("{} {}: update for untracked order {}", leg, update.side, update.order_id)
            }
            Err(e) => warn!("{} {}: {}", leg, update.side, e),
        }
    }

    /// Taker order on the other leg for the filled fraction of a quote
    pub(super) fn hedge(&mut self, instruction: HedgeInstruction) {
        let target = instruction.filled_leg.other();
        let side = if self.quoter.legs_opposed() {
            instruction.side.opposite()
        } else {
            instruction.side
        };

        if self.risk.is_triggered() {
            return;
        }
        if self.limiter.is_breached() {
            self.raise(Condition::RateLimitBreach {
                leg: target,
                suppressed: "hedge",
            });
            return;
        }
        if instruction.order_quantity <= Decimal::ZERO {
            return;
        }

        let state = &self.legs[target];
        let (Some(terms), Some(instrument)) = (state.terms(), state.instrument()) else {
            warn!("{}: instrument unresolved, hedge skipped", target);
            return;
        };
        let fraction = instruction.absorbed / instruction.order_quantity;
        let quantity = terms.round_size_down(fraction * self.quoter.order_size(target));
        if quantity <= Decimal::ZERO {
            debug!("{}: hedge size rounds to zero", target);
            return;
        }
        let Some(price) = aggressive_price(
            &state.live_top(),
            side,
            self.config.strategy.hedge.spread_offset,
            instrument.price_increment,
        ) else {
            warn!("{}: no two-sided book, hedge skipped", target);
            return;
        };

        info!(
            "{} {}: hedging {} fill on {} with {} @ {}",
            target, side, instruction.absorbed, instruction.filled_leg, quantity, price
        );
        self.stats.hedges += 1;
        let client_order_id = self.next_client_id(target);
        self.submit(vec![Request::CreateOrder {
            leg: target,
            side,
            price,
            quantity,
            post_only: false,
            client_order_id,
            purpose: OrderPurpose::Hedge,
        }]);
    }
}
