//! Crossing model
//!
//! The two legs are projected onto the signal vector `s`. A theoretical price
//! `θ` with a band of half-width `margin` separates a buy region from a sell
//! region in (priceA, priceB) space:
//!
//! ```text
//!   s·p = θ + margin   upper line: buyB from bidA, sellA from askB
//!   s·p = θ - margin   lower line: sellB from askA, buyA from bidB
//! ```
//!
//! When the executable signal leaves the band, `θ` steps toward it by a
//! whole number of `stepback`s and the relative position counter moves one
//! notch in the opposite direction.
//!
//! Signals and levels are computed in `f64`. Levels are converted to
//! `Decimal`, trimmed to [`LEVEL_DECIMAL_PLACES`] and rounded to the leg's
//! price increment: sells up, buys down.

use crate::config::constants::LEVEL_DECIMAL_PLACES;
use crate::config::StrategyConfig;
use crate::core::{LegId, PerLeg, Side, TopOfBook};
use crate::leg::accounting::round_to_step;
use crate::leg::{ContractTerms, LegState};
use crate::risk::InventoryFlags;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::num::FpCategory;
use tracing::{debug, info};

/// Buy and sell quote prices of one leg; `None` when absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLevels {
    pub buy: Option<Decimal>,
    pub sell: Option<Decimal>,
}

impl QuoteLevels {
    #[inline]
    pub fn get(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }
}

/// Direction in which the theoretical price moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossing {
    Upward,
    Downward,
}

/// Executable signal prices for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPrices {
    /// `s0·askA + s1·bidB`
    pub upper: f64,
    /// `s0·bidA + s1·askB`
    pub lower: f64,
}

/// Crossing model state
#[derive(Debug, Clone)]
pub struct QuoterState {
    signal_vector: [f64; 2],
    trading_vector: [f64; 2],
    margin: f64,
    stepback: f64,
    epsilon: f64,
    typical_order_size: Decimal,
    nc2l: i64,

    theoretical_price: f64,
    relative_position: i64,

    current: PerLeg<QuoteLevels>,
    committed: PerLeg<QuoteLevels>,
    sizes: PerLeg<Decimal>,
    limits: PerLeg<InventoryFlags>,
}

impl QuoterState {
    pub fn new(config: &StrategyConfig) -> Self {
        info!(
            "Initialized crossing model: s=({}, {}), t=({}, {}), margin={}, stepback={}",
            config.signal_vector[0],
            config.signal_vector[1],
            config.trading_vector[0],
            config.trading_vector[1],
            config.margin,
            config.stepback
        );

        Self {
            signal_vector: config.signal_vector,
            trading_vector: config.trading_vector,
            margin: config.margin,
            stepback: config.stepback,
            epsilon: config.epsilon,
            typical_order_size: config.typical_order_size,
            nc2l: i64::from(config.nc2l),
            theoretical_price: 0.0,
            relative_position: 0,
            current: PerLeg::default(),
            committed: PerLeg::default(),
            sizes: PerLeg::default(),
            limits: PerLeg::default(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn theoretical_price(&self) -> f64 {
        self.theoretical_price
    }

    #[inline]
    pub fn relative_position(&self) -> i64 {
        self.relative_position
    }

    pub fn signal_vector(&self) -> [f64; 2] {
        self.signal_vector
    }

    pub fn trading_vector(&self) -> [f64; 2] {
        self.trading_vector
    }

    pub fn current_levels(&self, leg: LegId) -> QuoteLevels {
        self.current[leg]
    }

    pub fn committed_levels(&self, leg: LegId) -> QuoteLevels {
        self.committed[leg]
    }

    pub fn order_size(&self, leg: LegId) -> Decimal {
        self.sizes[leg]
    }

    pub fn limits(&self, leg: LegId) -> InventoryFlags {
        self.limits[leg]
    }

    pub fn set_limits(&mut self, leg: LegId, flags: InventoryFlags) {
        self.limits[leg] = flags;
    }

    /// Whether the trading vector components have opposite signs
    pub fn legs_opposed(&self) -> bool {
        (self.trading_vector[0] < 0.0) != (self.trading_vector[1] < 0.0)
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    /// Signal prices of a sample; `None` unless both books are two-sided
    pub fn signal_prices(&self, tops: &PerLeg<TopOfBook>) -> Option<SignalPrices> {
        let [s0, s1] = self.signal_vector;
        let ask_a = tops.a.ask_price?.to_f64()?;
        let bid_a = tops.a.bid_price?.to_f64()?;
        let ask_b = tops.b.ask_price?.to_f64()?;
        let bid_b = tops.b.bid_price?.to_f64()?;
        Some(SignalPrices {
            upper: s0 * ask_a + s1 * bid_b,
            lower: s0 * bid_a + s1 * ask_b,
        })
    }

    /// Move the theoretical price for a new sample and refresh the current levels
    pub fn update(
        &mut self,
        tops: &PerLeg<TopOfBook>,
        price_increments: &PerLeg<Decimal>,
    ) -> Option<Crossing> {
        let signals = self.signal_prices(tops)?;
        let crossing = self.observe(signals);
        self.current = quote_levels(
            self.signal_vector,
            self.theoretical_price,
            self.margin,
            tops,
            price_increments,
        );
        debug!(
            "theo={} pos={} A={:?} B={:?}",
            self.theoretical_price, self.relative_position, self.current.a, self.current.b
        );
        crossing
    }

    /// Apply the crossing rules to one pair of signal prices
    pub fn observe(&mut self, signals: SignalPrices) -> Option<Crossing> {
        if self.theoretical_price.classify() == FpCategory::Zero {
            self.theoretical_price = (signals.upper + signals.lower) / 2.0;
            info!("Theoretical price initialized at {}", self.theoretical_price);
        }

        let theta = self.theoretical_price;
        let threshold = 1.0 - self.epsilon;
        let slack = self.epsilon * self.margin;

        if (signals.upper - theta) / self.margin > threshold {
            let steps = ((signals.upper - theta - self.margin + slack) / self.stepback).ceil();
            self.theoretical_price = theta + steps * self.stepback;
            self.relative_position = (self.relative_position - 1).max(-self.nc2l);
            info!(
                "Upward crossing: theo {} -> {}, relative position {}",
                theta, self.theoretical_price, self.relative_position
            );
            Some(Crossing::Upward)
        } else if (theta - signals.lower) / self.margin > threshold {
            let steps = ((theta - signals.lower - self.margin + slack) / self.stepback).ceil();
            self.theoretical_price = theta - steps * self.stepback;
            self.relative_position = (self.relative_position + 1).min(self.nc2l);
            info!(
                "Downward crossing: theo {} -> {}, relative position {}",
                theta, self.theoretical_price, self.relative_position
            );
            Some(Crossing::Downward)
        } else {
            None
        }
    }

    /// Recompute per-leg order sizes from the sampled mid prices
    pub fn update_sizes(&mut self, legs: &PerLeg<LegState>) {
        for leg in LegId::ALL {
            let state = &legs[leg];
            self.sizes[leg] = match (state.terms(), state.sampled_top().mid_price()) {
                (Some(terms), Some(mid)) => order_size(
                    self.typical_order_size,
                    self.trading_vector[leg.index()],
                    &terms,
                    mid,
                ),
                _ => Decimal::ZERO,
            };
        }
    }

    /// Whether a leg must be cancelled and requoted
    ///
    /// True when a level moved away from the committed one, or when an allowed
    /// side has a level but nothing resting and nothing in flight.
    pub fn needs_requote(&self, leg: LegId, state: &LegState) -> bool {
        if self.current[leg] != self.committed[leg] {
            return true;
        }
        let size = self.sizes[leg];
        Side::BOTH.into_iter().any(|side| {
            self.current[leg].get(side).is_some()
                && self.limits[leg].allows(side)
                && size > Decimal::ZERO
                && state.side_is_idle(side)
        })
    }

    /// Adopt the current levels of a leg as the ones to quote
    pub fn commit(&mut self, leg: LegId) {
        self.committed[leg] = self.current[leg];
    }
}

/// Quote levels of both legs for a theoretical price
///
/// Each level is the point on the band line whose other coordinate is the
/// opposite leg's best price. Non-positive or non-finite levels are absent.
pub fn quote_levels(
    signal_vector: [f64; 2],
    theoretical_price: f64,
    margin: f64,
    tops: &PerLeg<TopOfBook>,
    price_increments: &PerLeg<Decimal>,
) -> PerLeg<QuoteLevels> {
    let [s0, s1] = signal_vector;
    let lower = theoretical_price - margin;
    let upper = theoretical_price + margin;

    // s0*x + s1*y = c, solved for one coordinate
    let b_on = |c: f64, a: f64| (c - s0 * a) / s1;
    let a_on = |c: f64, b: f64| (c - s1 * b) / s0;

    let f = |price: Option<Decimal>| price.and_then(|p| p.to_f64());
    let (bid_a, ask_a) = (f(tops.a.bid_price), f(tops.a.ask_price));
    let (bid_b, ask_b) = (f(tops.b.bid_price), f(tops.b.ask_price));

    PerLeg {
        a: QuoteLevels {
            buy: bid_b.and_then(|b| to_price(a_on(lower, b), price_increments.a, Side::Buy)),
            sell: ask_b.and_then(|b| to_price(a_on(upper, b), price_increments.a, Side::Sell)),
        },
        b: QuoteLevels {
            buy: bid_a.and_then(|a| to_price(b_on(upper, a), price_increments.b, Side::Buy)),
            sell: ask_a.and_then(|a| to_price(b_on(lower, a), price_increments.b, Side::Sell)),
        },
    }
}

/// Per-leg order size for a typical quote-currency amount
///
/// `typical × |t|`, divided by mid unless the leg is inverse or
/// contract-denominated, then rounded down to a tradable size.
pub fn order_size(
    typical_order_size: Decimal,
    trading_component: f64,
    terms: &ContractTerms,
    mid: Decimal,
) -> Decimal {
    let weight = Decimal::from_f64(trading_component.abs()).unwrap_or(Decimal::ZERO);
    terms.size_for_quote_amount(typical_order_size * weight, mid)
}

fn to_price(level: f64, increment: Decimal, side: Side) -> Option<Decimal> {
    if !level.is_finite() {
        return None;
    }
    let value = Decimal::from_f64(level)?.round_dp(LEVEL_DECIMAL_PLACES);
    let strategy = match side {
        Side::Sell => RoundingStrategy::ToPositiveInfinity,
        Side::Buy => RoundingStrategy::ToNegativeInfinity,
    };
    let price = round_to_step(value, increment, strategy);
    (price > Decimal::ZERO).then_some(price)
}
