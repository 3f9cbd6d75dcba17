//! Risk Management
//!
//! Inventory limit flags per leg, the drawdown kill switch and the
//! liquidation plan it triggers, plus the request admission limiter.
//!
//! ## Layers
//!
//! ```text
//! Quoting Engine → Inventory Flags → Rate Limiter → transport
//!                  upper: no buys    short window
//!                  lower: no sells   long window
//!
//! every cycle / balance update / fill → Kill Switch (peak drawdown)
//!                                        └─ cancel-all both legs
//!                                        └─ one taker order per leg
//! ```

use crate::config::{RiskConfig, StrategyConfig};
use crate::core::{Condition, LegId, PerLeg, Side, TopOfBook};
use crate::leg::accounting::round_to_step;
use crate::leg::LegState;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

pub mod inventory;
pub mod kill_switch;
pub mod rate_limiter;

pub use inventory::InventoryFlags;
pub use kill_switch::{KillSwitch, KillSwitchState};
pub use rate_limiter::{RateLimiter, Window};

/// One aggressive order flattening a leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationOrder {
    pub leg: LegId,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Inventory limits and the drawdown kill switch
#[derive(Debug, Clone)]
pub struct RiskManager {
    kill_switch: KillSwitch,
    max_inventory: PerLeg<Decimal>,
    liquidation_offset: Decimal,
}

impl RiskManager {
    pub fn new(risk: &RiskConfig, strategy: &StrategyConfig) -> Self {
        let max_inventory = PerLeg::from_fn(|leg| {
            let component = Decimal::from_f64(strategy.trading_vector[leg.index()])
                .unwrap_or(Decimal::ZERO);
            inventory::max_inventory(strategy.typical_order_size, strategy.nc2l, component)
        });

        info!(
            "Initialized RiskManager: max inventory A={} B={}, max drawdown={}",
            max_inventory.a, max_inventory.b, risk.max_drawdown
        );

        Self {
            kill_switch: KillSwitch::new(risk.max_drawdown),
            max_inventory,
            liquidation_offset: risk.liquidation_spread_offset,
        }
    }

    pub fn max_inventory(&self, leg: LegId) -> Decimal {
        self.max_inventory[leg]
    }

    /// Limit flags for a leg given the size of its next quote
    ///
    /// A leg without a mid price or resolved instrument keeps both flags clear.
    pub fn inventory_flags(&self, state: &LegState, order_size: Decimal) -> InventoryFlags {
        let (Some(terms), Some(mid)) = (state.terms(), state.live_top().mid_price()) else {
            return InventoryFlags::default();
        };
        inventory::evaluate(
            &terms,
            self.max_inventory[state.leg()],
            state.base_balance,
            state.quote_balance,
            order_size,
            mid,
        )
    }

    /// Sum of both legs' mark-to-market balances; `None` without both mids
    pub fn total_balance(legs: &PerLeg<LegState>) -> Option<Decimal> {
        let mid_a = legs.a.live_top().mid_price()?;
        let mid_b = legs.b.live_top().mid_price()?;
        Some(legs.a.mark_to_market(mid_a) + legs.b.mark_to_market(mid_b))
    }

    /// Update the peak and report a drawdown breach
    pub fn check_drawdown(&mut self, legs: &PerLeg<LegState>) -> Option<Condition> {
        if self.kill_switch.is_triggered() {
            return None;
        }
        let total = Self::total_balance(legs)?;
        let condition = self.kill_switch.observe(total);
        if condition.is_none() {
            debug!("Total balance {} (peak {:?})", total, self.kill_switch.peak());
        }
        condition
    }

    /// Latch the kill switch
    pub fn trigger(&mut self, reason: impl Into<String>) {
        self.kill_switch.trigger(reason);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.kill_switch.is_triggered()
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    /// Aggressive order flattening a leg's quote-equivalent inventory
    ///
    /// Inverse legs read inventory from the quote balance; other legs use
    /// `-base * mid`. A positive value is bought back, a negative one sold.
    pub fn plan_liquidation(&self, state: &LegState) -> Option<LiquidationOrder> {
        let terms = state.terms()?;
        let instrument = state.instrument()?;
        let top = state.live_top();
        let mid = top.mid_price()?;

        let inventory = if terms.is_inverse() {
            state.quote_balance
        } else {
            -state.base_balance * mid
        };
        if inventory.is_zero() {
            return None;
        }

        let side = if inventory > Decimal::ZERO {
            Side::Buy
        } else {
            Side::Sell
        };
        let quantity = terms.size_for_quote_amount(inventory.abs(), mid);
        if quantity <= Decimal::ZERO {
            debug!("{}: inventory {} rounds to zero size", state.leg(), inventory);
            return None;
        }
        let price = aggressive_price(&top, side, self.liquidation_offset, instrument.price_increment)?;

        Some(LiquidationOrder {
            leg: state.leg(),
            side,
            quantity,
            price,
        })
    }
}

/// Price guaranteed to cross the book: best opposite price pushed
/// `offset × spread` further in the adverse direction, rounded away from the book
pub fn aggressive_price(
    top: &TopOfBook,
    side: Side,
    offset: Decimal,
    price_increment: Decimal,
) -> Option<Decimal> {
    let spread = top.spread()?;
    let price = match side {
        Side::Buy => round_to_step(
            top.ask_price? + offset * spread,
            price_increment,
            RoundingStrategy::ToPositiveInfinity,
        ),
        Side::Sell => round_to_step(
            top.bid_price? - offset * spread,
            price_increment,
            RoundingStrategy::ToNegativeInfinity,
        ),
    };
    Some(price.max(price_increment))
}
