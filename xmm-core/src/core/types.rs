//! Shared domain types
//!
//! Leg and side identifiers, order identifiers and statuses, instrument
//! conventions, top-of-book values, and the small per-leg / per-side
//! containers the rest of the crate is built on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

// ============================================================================
// Leg / Side
// ============================================================================

/// One of the two correlated instruments traded as a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegId {
    A,
    B,
}

impl LegId {
    pub const ALL: [LegId; 2] = [LegId::A, LegId::B];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            LegId::A => 0,
            LegId::B => 1,
        }
    }

    #[inline]
    pub fn other(self) -> LegId {
        match self {
            LegId::A => LegId::B,
            LegId::B => LegId::A,
        }
    }

    /// Wire name used in correlation identifiers
    pub fn as_str(self) -> &'static str {
        match self {
            LegId::A => "prodA",
            LegId::B => "prodB",
        }
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Buy, Side::Sell];

    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for buys, -1 for sells
    #[inline]
    pub fn sign(self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether a fill added liquidity (maker) or removed it (taker)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Liquidity {
    Maker,
    Taker,
}

// ============================================================================
// Per-leg / per-side containers
// ============================================================================

/// A value held for each leg, indexed by [`LegId`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerLeg<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerLeg<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    pub fn from_fn(mut f: impl FnMut(LegId) -> T) -> Self {
        Self {
            a: f(LegId::A),
            b: f(LegId::B),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(LegId, &T) -> U) -> PerLeg<U> {
        PerLeg {
            a: f(LegId::A, &self.a),
            b: f(LegId::B, &self.b),
        }
    }
}

impl<T> Index<LegId> for PerLeg<T> {
    type Output = T;

    fn index(&self, leg: LegId) -> &T {
        match leg {
            LegId::A => &self.a,
            LegId::B => &self.b,
        }
    }
}

impl<T> IndexMut<LegId> for PerLeg<T> {
    fn index_mut(&mut self, leg: LegId) -> &mut T {
        match leg {
            LegId::A => &mut self.a,
            LegId::B => &mut self.b,
        }
    }
}

/// A value held for each side, indexed by [`Side`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub buy: T,
    pub sell: T,
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Buy => &self.buy,
            Side::Sell => &self.sell,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Buy => &mut self.buy,
            Side::Sell => &mut self.sell,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Venue-assigned order identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Order status
///
/// Progression is monotonic: `New -> PartiallyFilled -> Filled`, or
/// `{New, PartiallyFilled} -> Canceled`. `Filled` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }

    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Position in the lifecycle; terminal states share the top rank
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::PartiallyFilled => 1,
            OrderStatus::Filled | OrderStatus::Canceled => 2,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
        };
        f.write_str(s)
    }
}

/// Why an order was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPurpose {
    /// Resting post-only quote; occupies the leg's slot for its side
    Quote,
    /// Aggressive order completing a spread after a quote fill
    Hedge,
    /// Aggressive order flattening inventory after the kill switch
    Liquidation,
}

impl OrderPurpose {
    #[inline]
    pub fn is_resting(self) -> bool {
        self == OrderPurpose::Quote
    }
}

// ============================================================================
// Instruments / modes
// ============================================================================

/// Contract convention: whether P&L accrues in quote (linear) or base (inverse) terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    Linear,
    Inverse,
}

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingMode {
    Live,
    Paper,
    Backtest,
}

impl TradingMode {
    /// Whether orders are matched by the local simulator
    #[inline]
    pub fn is_simulated(self) -> bool {
        matches!(self, TradingMode::Paper | TradingMode::Backtest)
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Live => write!(f, "LIVE"),
            TradingMode::Paper => write!(f, "PAPER"),
            TradingMode::Backtest => write!(f, "BACKTEST"),
        }
    }
}

// ============================================================================
// Top of book
// ============================================================================

/// Best bid/ask price and size; `None` when that side of the book is empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub bid_price: Option<Decimal>,
    pub bid_size: Option<Decimal>,
    pub ask_price: Option<Decimal>,
    pub ask_size: Option<Decimal>,
}

impl TopOfBook {
    /// Both sides present
    pub fn is_two_sided(&self) -> bool {
        self.bid_price.is_some() && self.ask_price.is_some()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.bid_price, self.ask_price) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.bid_price, self.ask_price) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Whether either price differs from `other`; sizes are ignored
    pub fn prices_differ(&self, other: &TopOfBook) -> bool {
        self.bid_price != other.bid_price || self.ask_price != other.ask_price
    }
}
