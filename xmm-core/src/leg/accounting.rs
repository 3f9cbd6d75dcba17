//! Balance and fee accounting for fills
//!
//! Every fill moves base and quote balances according to a 2×2×2 table:
//!
//! ```text
//!                       unit-denominated          contract-denominated
//!   LINEAR   BUY   base += q        quote -= p*q   q := q * increment, then same
//!            SELL  base -= q        quote += p*q
//!   INVERSE  BUY   base += q/p      quote -= q     q := q * increment, then same
//!            SELL  base -= q/p      quote += q
//! ```
//!
//! Fees use the same base/quote amounts: a fee charged in the base asset is
//! `base_amount * rate`, one charged in the quote asset is `quote_amount * rate`.

use crate::config::Instrument;
use crate::core::{InstrumentType, Side};
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

/// Numeric conventions of a leg's contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractTerms {
    pub instrument_type: InstrumentType,
    pub contract_denominated: bool,
    pub quantity_increment: Decimal,
}

/// Signed balance change produced by a fill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub base: Decimal,
    pub quote: Decimal,
}

/// Which balance a fee is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeCurrency {
    Base,
    Quote,
}

impl ContractTerms {
    pub fn new(
        instrument_type: InstrumentType,
        contract_denominated: bool,
        quantity_increment: Decimal,
    ) -> Self {
        Self {
            instrument_type,
            contract_denominated,
            quantity_increment,
        }
    }

    #[inline]
    pub fn is_inverse(&self) -> bool {
        self.instrument_type == InstrumentType::Inverse
    }

    /// Order quantity converted to underlying units
    #[inline]
    pub fn units(&self, size: Decimal) -> Decimal {
        if self.contract_denominated {
            size * self.quantity_increment
        } else {
            size
        }
    }

    /// Base-asset amount of a fill (unsigned)
    pub fn base_amount(&self, size: Decimal, price: Decimal) -> Decimal {
        let units = self.units(size);
        match self.instrument_type {
            InstrumentType::Linear => units,
            InstrumentType::Inverse => {
                if price.is_zero() {
                    Decimal::ZERO
                } else {
                    units / price
                }
            }
        }
    }

    /// Quote-asset amount of a fill (unsigned)
    pub fn quote_amount(&self, size: Decimal, price: Decimal) -> Decimal {
        let units = self.units(size);
        match self.instrument_type {
            InstrumentType::Linear => units * price,
            InstrumentType::Inverse => units,
        }
    }

    /// Balance change of a fill before fees
    pub fn fill_delta(&self, side: Side, size: Decimal, price: Decimal) -> BalanceDelta {
        let sign = side.sign();
        BalanceDelta {
            base: sign * self.base_amount(size, price),
            quote: -sign * self.quote_amount(size, price),
        }
    }

    /// Fee owed on a fill, in the given currency
    pub fn fee_amount(
        &self,
        currency: FeeCurrency,
        size: Decimal,
        price: Decimal,
        rate: Decimal,
    ) -> Decimal {
        match currency {
            FeeCurrency::Base => self.base_amount(size, price) * rate,
            FeeCurrency::Quote => self.quote_amount(size, price) * rate,
        }
    }

    /// Order quantity for a quote-currency amount at `mid`
    ///
    /// Only linear unit-denominated legs divide by mid. Inverse and
    /// contract-denominated legs take the amount as the quantity. Rounded
    /// down to the quantity increment (unit) or whole contracts (contract).
    pub fn size_for_quote_amount(&self, quote_amount: Decimal, mid: Decimal) -> Decimal {
        let size = if self.sized_in_base() {
            if mid.is_zero() {
                return Decimal::ZERO;
            }
            quote_amount / mid
        } else {
            quote_amount
        };
        self.round_size_down(size)
    }

    /// Linear unit-denominated: quantities are base-asset units
    #[inline]
    fn sized_in_base(&self) -> bool {
        self.instrument_type == InstrumentType::Linear && !self.contract_denominated
    }

    /// Round toward zero to the quantity increment (unit) or whole contracts
    pub fn round_size_down(&self, size: Decimal) -> Decimal {
        let step = if self.contract_denominated {
            Decimal::ONE
        } else {
            self.quantity_increment
        };
        round_to_step(size, step, RoundingStrategy::ToZero)
    }
}

/// Resolve the balance a fee asset is charged against
///
/// A missing asset means quote. An asset matching neither side of the
/// instrument yields `None`.
pub fn fee_currency(asset: Option<&str>, instrument: &Instrument) -> Option<FeeCurrency> {
    match asset {
        None => Some(FeeCurrency::Quote),
        Some(a) if a == instrument.base_asset => Some(FeeCurrency::Base),
        Some(a) if a == instrument.quote_asset => Some(FeeCurrency::Quote),
        Some(_) => None,
    }
}

/// Round `value` to a multiple of `step` with the given strategy
pub fn round_to_step(value: Decimal, step: Decimal, strategy: RoundingStrategy) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    (value / step).round_dp_with_strategy(0, strategy) * step
}
