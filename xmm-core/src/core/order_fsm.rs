//! Order State Machine
//!
//! Runtime lifecycle for a single order. Every mutation goes through a
//! transition method that keeps `remaining == quantity - cumulative_filled`
//! and refuses to move a terminal order.
//!
//! # State Diagram
//!
//! ```text
//!        ┌─────────┐
//!        │   New   │──────────────┐
//!        └────┬────┘              │
//!             │ fill < remaining  │ cancel
//!             ▼                   ▼
//!   ┌─────────────────┐     ┌───────────┐
//!   │ PartiallyFilled │────▶│ Canceled  │
//!   └────────┬────────┘     └───────────┘
//!            │ fill == remaining  (terminal)
//!            ▼
//!      ┌──────────┐
//!      │  Filled  │
//!      └──────────┘
//!       (terminal)
//! ```
//!
//! A fill larger than the remaining quantity is absorbed up to the remaining
//! quantity; the excess is reported back to the caller rather than rejected.

use super::errors::OrderError;
use super::{OrderId, OrderStatus, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A live order as tracked by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    cumulative_filled: Decimal,
    remaining: Decimal,
    status: OrderStatus,
    /// Decision cycles left while partially filled; expiry has no effect
    ttl: i64,
}

/// Result of applying a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Quantity actually absorbed by the order
    pub absorbed: Decimal,
    /// Part of the reported fill beyond the remaining quantity
    pub excess: Decimal,
    pub status: OrderStatus,
}

impl Order {
    /// Create an order in `New` state
    pub fn new(
        id: OrderId,
        client_order_id: impl Into<String>,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        ttl: i64,
    ) -> Self {
        Self {
            id,
            client_order_id: client_order_id.into(),
            side,
            price,
            quantity,
            cumulative_filled: Decimal::ZERO,
            remaining: quantity,
            status: OrderStatus::New,
            ttl,
        }
    }

    #[inline]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    #[inline]
    pub fn cumulative_filled(&self) -> Decimal {
        self.cumulative_filled
    }

    #[inline]
    pub fn remaining(&self) -> Decimal {
        self.remaining
    }

    #[inline]
    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Absorb `filled_qty` up to the remaining quantity
    pub fn apply_fill(&mut self, filled_qty: Decimal) -> Result<FillOutcome, OrderError> {
        if filled_qty <= Decimal::ZERO {
            return Err(OrderError::NonPositiveQuantity(filled_qty));
        }
        self.ensure_active()?;

        let absorbed = filled_qty.min(self.remaining);
        self.cumulative_filled += absorbed;
        self.remaining = self.quantity - self.cumulative_filled;
        self.status = if self.remaining.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };

        Ok(FillOutcome {
            absorbed,
            excess: filled_qty - absorbed,
            status: self.status,
        })
    }

    /// Move to `Canceled`
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.status = OrderStatus::Canceled;
        Ok(())
    }

    /// Check a venue-reported status against the tracked one
    ///
    /// Fill quantities, and the status they imply, come from trade
    /// confirmations only, so a report never changes the order. A report
    /// behind the tracked status is a regression.
    pub fn check_reported(&self, reported: OrderStatus) -> Result<(), OrderError> {
        if reported.rank() < self.status.rank() {
            return Err(OrderError::Regression {
                id: self.id.clone(),
                from: self.status,
                to: reported,
            });
        }
        Ok(())
    }

    /// Count down one decision cycle while partially filled
    pub fn tick_ttl(&mut self) {
        if self.status == OrderStatus::PartiallyFilled {
            self.ttl -= 1;
        }
    }

    fn ensure_active(&self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::Terminal {
                id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(qty: Decimal) -> Order {
        Order::new(OrderId::from("1"), "c1", Side::Buy, dec!(100), qty, 3)
    }

    #[test]
    fn test_partial_then_full_fill() {
        let mut o = order(dec!(2));

        let first = o.apply_fill(dec!(0.5)).unwrap();
        assert_eq!(first.absorbed, dec!(0.5));
        assert_eq!(o.status(), OrderStatus::PartiallyFilled);
        assert_eq!(o.remaining(), dec!(1.5));

        let second = o.apply_fill(dec!(1.5)).unwrap();
        assert_eq!(second.status, OrderStatus::Filled);
        assert_eq!(o.remaining(), Decimal::ZERO);
        assert_eq!(o.cumulative_filled(), dec!(2));
    }

    #[test]
    fn test_oversized_fill_absorbed_up_to_remaining() {
        let mut o = order(dec!(1));
        let outcome = o.apply_fill(dec!(3)).unwrap();
        assert_eq!(outcome.absorbed, dec!(1));
        assert_eq!(outcome.excess, dec!(2));
        assert_eq!(o.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_rejects_zero_fill() {
        let mut o = order(dec!(1));
        assert_eq!(
            o.apply_fill(Decimal::ZERO),
            Err(OrderError::NonPositiveQuantity(Decimal::ZERO))
        );
        assert_eq!(o.status(), OrderStatus::New);
    }

    #[test]
    fn test_terminal_orders_are_frozen() {
        let mut o = order(dec!(1));
        o.cancel().unwrap();
        assert!(o.apply_fill(dec!(1)).is_err());
        assert!(o.cancel().is_err());
        assert!(o.check_reported(OrderStatus::New).is_err());
        assert_eq!(o.status(), OrderStatus::Canceled);
    }

    #[test]
    fn test_status_never_regresses() {
        let mut o = order(dec!(2));
        o.apply_fill(dec!(1)).unwrap();
        let err = o.check_reported(OrderStatus::New).unwrap_err();
        assert!(matches!(err, OrderError::Regression { .. }));
        assert_eq!(o.status(), OrderStatus::PartiallyFilled);
        assert_eq!(o.check_reported(OrderStatus::PartiallyFilled), Ok(()));
        assert_eq!(o.check_reported(OrderStatus::Filled), Ok(()));
        assert_eq!(o.status(), OrderStatus::PartiallyFilled, "reports never move the status");
    }

    #[test]
    fn test_ttl_only_counts_partial_fills() {
        let mut o = order(dec!(2));
        o.tick_ttl();
        assert_eq!(o.ttl(), 3);

        o.apply_fill(dec!(1)).unwrap();
        o.tick_ttl();
        o.tick_ttl();
        o.tick_ttl();
        o.tick_ttl();
        assert_eq!(o.ttl(), -1);
        assert!(o.is_active());
    }
}
