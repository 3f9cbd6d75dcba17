//! Drawdown kill switch and the liquidation sequence

use super::Engine;
use crate::core::{LegId, OrderPurpose};
use crate::execution::types::Request;
use tracing::{info, warn};

impl Engine {
    /// Compare the total balance to its peak; liquidate on a breach
    ///
    /// While the rate limiter is breached the liquidation waits for the next
    /// event that finds it clear.
    pub(super) fn check_drawdown(&mut self) {
        if self.halted || self.pending_liquidation.is_some() {
            return;
        }
        let Some(condition) = self.risk.check_drawdown(&self.legs) else {
            return;
        };
        let reason = condition.to_string();
        self.raise(condition);

        if self.limiter.is_breached() {
            warn!("Rate limit breached, liquidation deferred");
            self.pending_liquidation = Some(reason);
        } else {
            self.liquidate(reason);
        }
    }

    /// Cancel everything, flatten both legs with taker orders, halt
    pub(super) fn liquidate(&mut self, reason: String) {
        self.risk.trigger(reason);
        self.stats.liquidations += 1;

        let mut requests: Vec<Request> = LegId::ALL
            .iter()
            .map(|&leg| Request::CancelAllOpenOrders { leg })
            .collect();

        for leg in LegId::ALL {
            let Some(order) = self.risk.plan_liquidation(&self.legs[leg]) else {
                info!("{}: flat, nothing to liquidate", leg);
                continue;
            };
            info!(
                "{} {}: liquidating {} @ {}",
                leg, order.side, order.quantity, order.price
            );
            let client_order_id = self.next_client_id(leg);
            requests.push(Request::CreateOrder {
                leg,
                side: order.side,
                price: order.price,
                quantity: order.quantity,
                post_only: false,
                client_order_id,
                purpose: OrderPurpose::Liquidation,
            });
        }

        self.submit(requests);
        self.halted = true;
        warn!("Engine halted after liquidation");
    }
}
