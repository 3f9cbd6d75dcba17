//! Market data handling and the quoting cycle

use super::Engine;
use crate::core::{Condition, LegId, OrderPurpose, Side};
use crate::data::PublicTrade;
use crate::execution::types::Request;
use crate::orderbook::Level;
use rust_decimal::Decimal;
use tracing::{debug, trace};

impl Engine {
    pub(super) fn on_depth(&mut self, leg: LegId, bids: &[Level], asks: &[Level]) {
        self.legs[leg].apply_depth(bids, asks);
        if let Some(simulator) = self.simulator.as_mut() {
            simulator.on_depth(leg, bids, asks);
        }
        trace!("{}: top {:?}", leg, self.legs[leg].live_top());

        if self.cycle_due() {
            self.run_quote_cycle();
        }
    }

    pub(super) fn on_public_trade(&mut self, leg: LegId, trade: PublicTrade) {
        trace!("{}: trade {} @ {}", leg, trade.size, trade.price);
        let output = match self.simulator.as_mut() {
            Some(simulator) => simulator.on_trade(leg, trade.price, self.now_us, &self.legs[leg]),
            None => return,
        };
        self.absorb(output);
    }

    /// Whether a depth update may run the quoting cycle
    fn cycle_due(&self) -> bool {
        if self.cycle_ran || self.risk.is_triggered() {
            return false;
        }
        let interval = self.config.dispatcher.sampling_interval_us;
        if self.now_us.saturating_sub(self.last_sample_us) < interval {
            return false;
        }
        let ready = LegId::ALL.iter().all(|&leg| {
            let state = &self.legs[leg];
            state.live_top().is_two_sided() && state.instrument().is_some()
        });
        ready
            && LegId::ALL
                .iter()
                .any(|&leg| self.legs[leg].top_changed_since_sample())
    }

    fn run_quote_cycle(&mut self) {
        self.cycle_ran = true;
        self.last_sample_us = self.now_us;
        self.stats.quote_cycles += 1;

        for leg in LegId::ALL {
            self.legs[leg].sample_top();
        }
        let tops = self.legs.map(|_, state| state.sampled_top());
        let increments = self.legs.map(|_, state| {
            state
                .instrument()
                .map(|i| i.price_increment)
                .unwrap_or(Decimal::ZERO)
        });

        if self.quoter.update(&tops, &increments).is_some() {
            self.stats.crossings += 1;
        }
        self.quoter.update_sizes(&self.legs);
        for leg in LegId::ALL {
            let flags = self
                .risk
                .inventory_flags(&self.legs[leg], self.quoter.order_size(leg));
            if flags != self.quoter.limits(leg) {
                debug!("{}: inventory flags now {:?}", leg, flags);
            }
            self.quoter.set_limits(leg, flags);
        }

        let mut requests = Vec::new();
        for leg in LegId::ALL {
            self.requote(leg, &mut requests);
        }
        self.submit(requests);

        for leg in LegId::ALL {
            self.legs[leg].tick_ttls();
        }
        self.check_drawdown();
    }

    /// Cancel-and-requote decision for one leg
    ///
    /// The cancel-all acknowledgement places the new quotes. A leg with a
    /// cancel already in flight only commits the levels.
    fn requote(&mut self, leg: LegId, requests: &mut Vec<Request>) {
        if !self.quoter.needs_requote(leg, &self.legs[leg]) {
            return;
        }
        if self.limiter.is_breached() {
            self.raise(Condition::RateLimitBreach {
                leg,
                suppressed: "requote",
            });
            return;
        }

        let levels = self.quoter.current_levels(leg);
        if self.legs[leg].cancel_in_flight() {
            debug!("{}: cancel in flight, committing {:?}", leg, levels);
        } else {
            debug!("{}: requoting at {:?}", leg, levels);
            requests.push(Request::CancelAllOpenOrders { leg });
        }
        self.quoter.commit(leg);
    }

    /// Post-only creates at the committed levels on idle, allowed sides
    pub(super) fn place_quotes(&mut self, leg: LegId) {
        if self.risk.is_triggered() {
            return;
        }
        let levels = self.quoter.committed_levels(leg);
        let size = self.quoter.order_size(leg);
        let limits = self.quoter.limits(leg);
        if size <= Decimal::ZERO {
            debug!("{}: order size rounds to zero, nothing quoted", leg);
            return;
        }

        let mut requests = Vec::new();
        for side in Side::BOTH {
            let Some(price) = levels.get(side) else {
                continue;
            };
            if !limits.allows(side) {
                debug!("{} {}: inventory limit reached, not quoting", leg, side);
                continue;
            }
            if !self.legs[leg].side_is_idle(side) {
                continue;
            }
            let client_order_id = self.next_client_id(leg);
            requests.push(Request::CreateOrder {
                leg,
                side,
                price,
                quantity: size,
                post_only: true,
                client_order_id,
                purpose: OrderPurpose::Quote,
            });
        }
        self.submit(requests);
    }
}
