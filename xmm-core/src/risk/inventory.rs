//! Inventory limits
//!
//! Each leg may carry at most `typical_order_size × nc2l × |trading component|`
//! of quote-equivalent inventory. The test asks whether one more order of the
//! current size would cross that bound:
//!
//! ```text
//! non-inverse  upper: -max >= quote - amount*mid     (amount in underlying units)
//!              lower:  max <= quote + amount*mid
//! inverse      upper:  max <= base*mid + amount      (amount in quote units)
//!              lower: -max >= base*mid - amount
//! ```
//!
//! `upper` blocks new buy quotes and `lower` blocks new sell quotes. Neither
//! flag ever cancels a resting order.

use crate::core::Side;
use crate::leg::ContractTerms;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-leg inventory limit flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFlags {
    pub upper_limit_reached: bool,
    pub lower_limit_reached: bool,
}

impl InventoryFlags {
    /// Whether a new quote on `side` may be placed
    #[inline]
    pub fn allows(&self, side: Side) -> bool {
        match side {
            Side::Buy => !self.upper_limit_reached,
            Side::Sell => !self.lower_limit_reached,
        }
    }
}

/// Inventory bound of a leg in quote terms
pub fn max_inventory(typical_order_size: Decimal, nc2l: u32, trading_component: Decimal) -> Decimal {
    typical_order_size * Decimal::from(nc2l) * trading_component.abs()
}

/// Evaluate the limit flags for one leg
pub fn evaluate(
    terms: &ContractTerms,
    max_inventory: Decimal,
    base_balance: Decimal,
    quote_balance: Decimal,
    order_size: Decimal,
    mid: Decimal,
) -> InventoryFlags {
    let amount = terms.units(order_size);
    if terms.is_inverse() {
        let exposure = base_balance * mid;
        InventoryFlags {
            upper_limit_reached: max_inventory <= exposure + amount,
            lower_limit_reached: -max_inventory >= exposure - amount,
        }
    } else {
        let notional = amount * mid;
        InventoryFlags {
            upper_limit_reached: -max_inventory >= quote_balance - notional,
            lower_limit_reached: max_inventory <= quote_balance + notional,
        }
    }
}
