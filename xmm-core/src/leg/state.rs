//! Mutable per-leg state
//!
//! Holds the resting quote per side, in-flight aggressive orders, balances,
//! position, book snapshots and the bookkeeping needed to reconcile
//! asynchronous acknowledgements.
//!
//! ## Acknowledgement rules
//!
//! ```text
//! create ack   -> install as the side's open order (overwrites)
//! cancel ack   -> clear only when the id matches the tracked order
//!                 repeated ack for the last cancelled id: duplicate
//!                 any other id: stale, state untouched
//! fill         -> must reference the tracked order (or an in-flight taker)
//! order update -> only CANCELED is applied; fills come from trades
//! ```

use super::accounting::{fee_currency, BalanceDelta, ContractTerms, FeeCurrency};
use crate::config::{Instrument, LegConfig};
use crate::core::{
    Condition, LegId, Liquidity, Order, OrderError, OrderId, OrderPurpose, OrderStatus, PerSide,
    Side, TopOfBook,
};
use crate::orderbook::{L2OrderBook, Level};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Running fill totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillTotals {
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
    pub base_fees: Decimal,
    pub quote_fees: Decimal,
    pub trade_count: u64,
}

/// Fee quantity and the asset it is charged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCharge {
    pub quantity: Decimal,
    pub asset: String,
}

/// An aggressive order waiting for its fills
#[derive(Debug, Clone, PartialEq)]
pub struct TakerOrder {
    pub purpose: OrderPurpose,
    pub order: Order,
}

/// Effect of a fill that was applied
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFill {
    /// Order state after the fill
    pub order: Order,
    pub purpose: OrderPurpose,
    pub absorbed: Decimal,
    pub delta: BalanceDelta,
    pub fee: Option<FeeCharge>,
}

/// Result of a cancel acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub enum CancelAck {
    Cleared(Order),
    Duplicate,
    Stale { tracked: OrderId },
    Missing,
}

/// Result of a venue order update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Canceled(Order),
    Unchanged,
    Untracked,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LegError {
    #[error(transparent)]
    Condition(#[from] Condition),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("instrument metadata for {0} is not resolved yet")]
    InstrumentUnresolved(LegId),
}

enum Slot {
    Resting,
    Taker(usize),
}

/// Mutable state of one leg
#[derive(Debug, Clone)]
pub struct LegState {
    leg: LegId,
    config: LegConfig,
    instrument: Option<Instrument>,

    open: PerSide<Option<Order>>,
    takers: Vec<TakerOrder>,

    pub base_balance: Decimal,
    pub quote_balance: Decimal,
    /// Signed position in order quantity units
    pub position: Decimal,

    book: L2OrderBook,
    live_top: TopOfBook,
    sampled_top: TopOfBook,

    totals: FillTotals,

    pending_cancels: PerSide<u32>,
    pending_creates: PerSide<u32>,
    last_cancelled: PerSide<Option<OrderId>>,
}

impl LegState {
    pub fn new(leg: LegId, config: LegConfig) -> Self {
        let instrument = config.instrument_override();
        Self {
            leg,
            base_balance: config.initial_base_balance,
            quote_balance: config.initial_quote_balance,
            config,
            instrument,
            open: PerSide::default(),
            takers: Vec::new(),
            position: Decimal::ZERO,
            book: L2OrderBook::new(),
            live_top: TopOfBook::default(),
            sampled_top: TopOfBook::default(),
            totals: FillTotals::default(),
            pending_cancels: PerSide::default(),
            pending_creates: PerSide::default(),
            last_cancelled: PerSide::default(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn leg(&self) -> LegId {
        self.leg
    }

    #[inline]
    pub fn config(&self) -> &LegConfig {
        &self.config
    }

    #[inline]
    pub fn instrument(&self) -> Option<&Instrument> {
        self.instrument.as_ref()
    }

    pub fn set_instrument(&mut self, instrument: Instrument) {
        self.instrument = Some(instrument);
    }

    /// Contract conventions; `None` until the instrument is resolved
    pub fn terms(&self) -> Option<ContractTerms> {
        self.instrument.as_ref().map(|i| {
            ContractTerms::new(
                self.config.instrument_type,
                self.config.contract_denominated,
                i.quantity_increment,
            )
        })
    }

    #[inline]
    pub fn open_order(&self, side: Side) -> Option<&Order> {
        self.open[side].as_ref()
    }

    pub fn takers(&self) -> &[TakerOrder] {
        &self.takers
    }

    #[inline]
    pub fn book(&self) -> &L2OrderBook {
        &self.book
    }

    #[inline]
    pub fn live_top(&self) -> TopOfBook {
        self.live_top
    }

    #[inline]
    pub fn sampled_top(&self) -> TopOfBook {
        self.sampled_top
    }

    #[inline]
    pub fn totals(&self) -> FillTotals {
        self.totals
    }

    #[inline]
    pub fn pending_cancels(&self, side: Side) -> u32 {
        self.pending_cancels[side]
    }

    #[inline]
    pub fn pending_creates(&self, side: Side) -> u32 {
        self.pending_creates[side]
    }

    pub fn last_cancelled(&self, side: Side) -> Option<&OrderId> {
        self.last_cancelled[side].as_ref()
    }

    /// Nothing resting or in flight on `side`
    pub fn side_is_idle(&self, side: Side) -> bool {
        self.open[side].is_none()
            && self.pending_creates[side] == 0
            && self.pending_cancels[side] == 0
    }

    /// A cancel on either side is still waiting for its acknowledgement
    pub fn cancel_in_flight(&self) -> bool {
        self.pending_cancels.buy > 0 || self.pending_cancels.sell > 0
    }

    // ========================================================================
    // Market data
    // ========================================================================

    /// Replace the book snapshot and refresh the live top of book
    pub fn apply_depth(&mut self, bids: &[Level], asks: &[Level]) {
        self.book.replace(bids, asks);
        self.live_top = self.book.top();
    }

    /// Whether the live top-of-book prices moved since the last sample
    pub fn top_changed_since_sample(&self) -> bool {
        self.live_top.prices_differ(&self.sampled_top)
    }

    /// Copy the live top of book into the sampled snapshot
    pub fn sample_top(&mut self) {
        self.sampled_top = self.live_top;
    }

    // ========================================================================
    // Order lifecycle
    // ========================================================================

    /// A create request for a resting quote was sent
    pub fn mark_create_sent(&mut self, side: Side) {
        self.pending_creates[side] += 1;
    }

    /// A create request for a resting quote was answered with an error
    pub fn mark_create_failed(&mut self, side: Side) {
        self.pending_creates[side] = self.pending_creates[side].saturating_sub(1);
    }

    /// Install an acknowledged quote as the side's open order
    ///
    /// Returns the reference it replaced, if any. A terminal order is never
    /// installed.
    pub fn apply_create_ack(&mut self, side: Side, order: Order) -> Option<Order> {
        self.pending_creates[side] = self.pending_creates[side].saturating_sub(1);
        if order.status().is_terminal() {
            debug!("{} {}: order {} already {}", self.leg, side, order.id, order.status());
            return None;
        }
        let installed = order.id.clone();
        let previous = self.open[side].replace(order);
        if let Some(prev) = &previous {
            debug!(
                "{} {}: order {} replaces reference to {} ({})",
                self.leg,
                side,
                installed,
                prev.id,
                prev.status()
            );
        }
        previous
    }

    /// Track an acknowledged hedge or liquidation order
    pub fn apply_taker_ack(&mut self, purpose: OrderPurpose, order: Order) {
        if order.status().is_terminal() {
            debug!("{}: {:?} order {} already {}", self.leg, purpose, order.id, order.status());
            return;
        }
        self.takers.push(TakerOrder { purpose, order });
    }

    /// A cancel for the side's open order was sent
    pub fn mark_cancel_sent(&mut self, side: Side) {
        self.pending_cancels[side] += 1;
    }

    /// A single-order cancel was answered with an error
    pub fn mark_cancel_failed(&mut self, side: Side) {
        self.pending_cancels[side] = self.pending_cancels[side].saturating_sub(1);
    }

    /// Apply a single-order cancel acknowledgement
    pub fn apply_cancel_ack(&mut self, side: Side, ack_id: &OrderId) -> CancelAck {
        self.pending_cancels[side] = self.pending_cancels[side].saturating_sub(1);

        match self.open[side].take() {
            Some(mut order) if &order.id == ack_id => {
                if let Err(e) = order.cancel() {
                    debug!("{} {}: {}", self.leg, side, e);
                }
                self.last_cancelled[side] = Some(order.id.clone());
                CancelAck::Cleared(order)
            }
            Some(order) => {
                let tracked = order.id.clone();
                self.open[side] = Some(order);
                CancelAck::Stale { tracked }
            }
            None if self.last_cancelled[side].as_ref() == Some(ack_id) => CancelAck::Duplicate,
            None => CancelAck::Missing,
        }
    }

    /// Drop both open references ahead of a cancel-all request
    ///
    /// The cleared ids become the sides' last-cancelled ids.
    pub fn begin_cancel_all(&mut self) -> Vec<Order> {
        let mut cleared = Vec::new();
        for side in Side::BOTH {
            self.pending_cancels[side] += 1;
            if let Some(order) = self.open[side].take() {
                self.last_cancelled[side] = Some(order.id.clone());
                cleared.push(order);
            }
        }
        cleared
    }

    /// A cancel-all request was answered (success or failure)
    pub fn finish_cancel_all(&mut self) {
        for side in Side::BOTH {
            self.pending_cancels[side] = self.pending_cancels[side].saturating_sub(1);
        }
    }

    /// Apply a trade confirmation for one of this leg's orders
    pub fn apply_fill(
        &mut self,
        side: Side,
        order_id: &OrderId,
        filled_qty: Decimal,
        price: Decimal,
        liquidity: Liquidity,
        reported_fee: Option<FeeCharge>,
    ) -> Result<AppliedFill, LegError> {
        if price <= Decimal::ZERO {
            return Err(OrderError::NonPositivePrice(price).into());
        }
        let terms = self.terms().ok_or(LegError::InstrumentUnresolved(self.leg))?;
        let slot = self.locate(side, order_id)?;

        let (outcome, order, purpose) = match slot {
            Slot::Resting => {
                let Some(order) = self.open[side].as_mut() else {
                    return Err(self.missing(side, "fill").into());
                };
                let outcome = order.apply_fill(filled_qty)?;
                let snapshot = order.clone();
                if outcome.status.is_terminal() {
                    self.open[side] = None;
                }
                (outcome, snapshot, OrderPurpose::Quote)
            }
            Slot::Taker(idx) => {
                let taker = &mut self.takers[idx];
                let outcome = taker.order.apply_fill(filled_qty)?;
                let snapshot = taker.order.clone();
                let purpose = taker.purpose;
                if outcome.status.is_terminal() {
                    self.takers.remove(idx);
                }
                (outcome, snapshot, purpose)
            }
        };

        if !outcome.excess.is_zero() {
            warn!(
                "{} {}: fill of {} on order {} exceeds remaining by {}",
                self.leg, side, filled_qty, order_id, outcome.excess
            );
        }

        let absorbed = outcome.absorbed;
        let delta = terms.fill_delta(side, absorbed, price);
        self.base_balance += delta.base;
        self.quote_balance += delta.quote;
        self.position += side.sign() * absorbed;

        self.totals.base_volume += terms.base_amount(absorbed, price);
        self.totals.quote_volume += terms.quote_amount(absorbed, price);
        self.totals.trade_count += 1;

        let fee = match reported_fee {
            Some(fee) => Some(fee),
            None => self.scheduled_fee(side, absorbed, price, liquidity),
        };
        if let Some(fee) = &fee {
            self.charge_fee(fee);
        }

        Ok(AppliedFill {
            order,
            purpose,
            absorbed,
            delta,
            fee,
        })
    }

    /// Fee owed under the configured schedule
    pub fn scheduled_fee(
        &self,
        side: Side,
        size: Decimal,
        price: Decimal,
        liquidity: Liquidity,
    ) -> Option<FeeCharge> {
        let instrument = self.instrument.as_ref()?;
        let terms = self.terms()?;
        let fees = &self.config.fees;
        let asset = fees
            .fee_asset(liquidity, side)
            .unwrap_or(instrument.quote_asset.as_str());

        let Some(currency) = fee_currency(Some(asset), instrument) else {
            warn!(
                "{}: fee asset {} matches neither {} nor {}",
                self.leg, asset, instrument.base_asset, instrument.quote_asset
            );
            return None;
        };

        Some(FeeCharge {
            quantity: terms.fee_amount(currency, size, price, fees.rate(liquidity)),
            asset: asset.to_string(),
        })
    }

    fn charge_fee(&mut self, fee: &FeeCharge) {
        let Some(instrument) = self.instrument.as_ref() else {
            return;
        };
        match fee_currency(Some(&fee.asset), instrument) {
            Some(FeeCurrency::Base) => {
                self.base_balance -= fee.quantity;
                self.totals.base_fees += fee.quantity;
            }
            Some(FeeCurrency::Quote) => {
                self.quote_balance -= fee.quantity;
                self.totals.quote_fees += fee.quantity;
            }
            None => warn!(
                "{}: fee of {} {} not charged, asset is not part of {}",
                self.leg, fee.quantity, fee.asset, self.config.instrument
            ),
        }
    }

    /// Apply a venue-reported order status
    pub fn apply_order_update(
        &mut self,
        side: Side,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<UpdateOutcome, OrderError> {
        if status != OrderStatus::Canceled {
            let tracked = match self.find(side, order_id) {
                Some(Slot::Resting) => self.open[side].as_ref(),
                Some(Slot::Taker(idx)) => self.takers.get(idx).map(|t| &t.order),
                None => None,
            };
            return match tracked {
                Some(order) => order.check_reported(status).map(|_| UpdateOutcome::Unchanged),
                None => Ok(UpdateOutcome::Untracked),
            };
        }

        match self.find(side, order_id) {
            Some(Slot::Resting) => match self.open[side].take() {
                Some(mut order) => {
                    order.cancel()?;
                    self.last_cancelled[side] = Some(order.id.clone());
                    Ok(UpdateOutcome::Canceled(order))
                }
                None => Ok(UpdateOutcome::Untracked),
            },
            Some(Slot::Taker(idx)) => {
                let mut taker = self.takers.remove(idx);
                taker.order.cancel()?;
                Ok(UpdateOutcome::Canceled(taker.order))
            }
            None => Ok(UpdateOutcome::Untracked),
        }
    }

    /// Count down TTLs of partially filled quotes
    pub fn tick_ttls(&mut self) {
        for side in Side::BOTH {
            if let Some(order) = self.open[side].as_mut() {
                order.tick_ttl();
                if order.status() == OrderStatus::PartiallyFilled && order.ttl() == 0 {
                    debug!("{} {}: order {} ttl expired", self.leg, side, order.id);
                }
            }
        }
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Overwrite the balance of `asset`; returns false when the asset is not traded here
    pub fn set_balance(&mut self, asset: &str, quantity: Decimal) -> bool {
        let Some(instrument) = self.instrument.as_ref() else {
            return false;
        };
        if asset == instrument.base_asset {
            self.base_balance = quantity;
            true
        } else if asset == instrument.quote_asset {
            self.quote_balance = quantity;
            true
        } else {
            false
        }
    }

    /// Mark-to-market value in quote terms
    pub fn mark_to_market(&self, mid: Decimal) -> Decimal {
        self.base_balance * mid + self.quote_balance
    }

    fn find(&self, side: Side, order_id: &OrderId) -> Option<Slot> {
        if self.open[side].as_ref().map(|o| &o.id) == Some(order_id) {
            return Some(Slot::Resting);
        }
        self.takers
            .iter()
            .position(|t| &t.order.id == order_id)
            .map(Slot::Taker)
    }

    fn locate(&self, side: Side, order_id: &OrderId) -> Result<Slot, Condition> {
        if let Some(slot) = self.find(side, order_id) {
            return Ok(slot);
        }
        match (&self.open[side], &self.last_cancelled[side]) {
            (Some(tracked), _) => Err(Condition::StaleAcknowledgment {
                leg: self.leg,
                side,
                ack_id: order_id.clone(),
                tracked: tracked.id.to_string(),
            }),
            (None, Some(cancelled)) if cancelled == order_id => {
                Err(Condition::StaleAcknowledgment {
                    leg: self.leg,
                    side,
                    ack_id: order_id.clone(),
                    tracked: "none".to_string(),
                })
            }
            (None, _) => Err(self.missing(side, "fill")),
        }
    }

    fn missing(&self, side: Side, operation: &'static str) -> Condition {
        Condition::MissingOpenOrder {
            leg: self.leg,
            side,
            operation,
        }
    }
}
