//! L2 Orderbook - price-level snapshot per leg
//!
//! Stores the levels delivered by the latest depth update:
//! - bids keyed by price, iterated best (highest) first
//! - asks keyed by price, iterated best (lowest) first
//!
//! ## Design
//!
//! - Exact `Decimal` prices and sizes
//! - Zero-size levels are dropped on load
//! - The book is a snapshot: every update replaces both sides

use crate::core::{Side, TopOfBook};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
}

impl Level {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// L2 Orderbook snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct L2OrderBook {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl L2OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from raw levels
    pub fn from_levels(bids: &[Level], asks: &[Level]) -> Self {
        let mut book = Self::new();
        book.replace(bids, asks);
        book
    }

    /// Replace both sides with the given levels
    pub fn replace(&mut self, bids: &[Level], asks: &[Level]) {
        self.bids = collect_side(bids);
        self.asks = collect_side(asks);
    }

    #[inline]
    pub fn best_bid(&self) -> Option<Level> {
        self.bids
            .iter()
            .next_back()
            .map(|(price, size)| Level::new(*price, *size))
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Level> {
        self.asks
            .iter()
            .next()
            .map(|(price, size)| Level::new(*price, *size))
    }

    /// Best bid/ask prices and sizes
    pub fn top(&self) -> TopOfBook {
        let bid = self.best_bid();
        let ask = self.best_ask();
        TopOfBook {
            bid_price: bid.map(|l| l.price),
            bid_size: bid.map(|l| l.size),
            ask_price: ask.map(|l| l.price),
            ask_size: ask.map(|l| l.size),
        }
    }

    /// Bid levels, best first
    pub fn bid_levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.bids
            .iter()
            .rev()
            .map(|(price, size)| Level::new(*price, *size))
    }

    /// Ask levels, best first
    pub fn ask_levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.asks
            .iter()
            .map(|(price, size)| Level::new(*price, *size))
    }

    /// Levels an aggressive order on `side` would trade against, best first:
    /// asks for a buy, bids for a sell
    pub fn contra_levels(&self, side: Side) -> Box<dyn Iterator<Item = Level> + '_> {
        match side {
            Side::Buy => Box::new(self.ask_levels()),
            Side::Sell => Box::new(self.bid_levels()),
        }
    }

    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Best bid at or above best ask
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }
}

fn collect_side(levels: &[Level]) -> BTreeMap<Decimal, Decimal> {
    levels
        .iter()
        .filter(|l| l.size > Decimal::ZERO && l.price > Decimal::ZERO)
        .map(|l| (l.price, l.size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> L2OrderBook {
        L2OrderBook::from_levels(
            &[
                Level::new(dec!(99), dec!(2)),
                Level::new(dec!(100), dec!(1)),
                Level::new(dec!(98), dec!(0)),
            ],
            &[
                Level::new(dec!(102), dec!(3)),
                Level::new(dec!(101), dec!(1.5)),
            ],
        )
    }

    #[test]
    fn test_best_levels() {
        let book = sample();
        assert_eq!(book.best_bid(), Some(Level::new(dec!(100), dec!(1))));
        assert_eq!(book.best_ask(), Some(Level::new(dec!(101), dec!(1.5))));
        assert_eq!(book.bid_depth(), 2, "zero-size level is dropped");
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_level_ordering() {
        let book = sample();
        let bids: Vec<_> = book.bid_levels().map(|l| l.price).collect();
        let asks: Vec<_> = book.ask_levels().map(|l| l.price).collect();
        assert_eq!(bids, vec![dec!(100), dec!(99)]);
        assert_eq!(asks, vec![dec!(101), dec!(102)]);

        let buy_side: Vec<_> = book.contra_levels(Side::Buy).map(|l| l.price).collect();
        assert_eq!(buy_side, asks);
    }

    #[test]
    fn test_replace_is_a_snapshot() {
        let mut book = sample();
        book.replace(&[Level::new(dec!(50), dec!(1))], &[]);
        assert_eq!(book.top().bid_price, Some(dec!(50)));
        assert_eq!(book.top().ask_price, None);
        assert!(!book.top().is_two_sided());
    }
}
