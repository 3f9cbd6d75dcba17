//! Drawdown Kill Switch
//!
//! Tracks the running peak of total mark-to-market balance and trips once
//! the absolute drop from that peak exceeds the configured maximum.
//!
//! ```text
//! total: 1000 ──▶ peak 1000
//! total:  990 ──▶ drawdown 10   (limit 50) armed
//! total:  940 ──▶ drawdown 60 > 50         TRIGGERED (sticky)
//! ```
//!
//! The threshold is absolute, in quote currency, not a fraction of the peak.
//! Once triggered the switch never re-arms; the engine stops processing
//! events until it is rebuilt.

use crate::core::Condition;
use rust_decimal::Decimal;
use tracing::{error, info};

/// Kill switch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSwitchState {
    /// Normal operation
    Armed,
    /// Liquidation issued; terminal
    Triggered,
}

/// Peak-drawdown tracker with a sticky trigger
#[derive(Debug, Clone)]
pub struct KillSwitch {
    state: KillSwitchState,
    peak: Option<Decimal>,
    max_drawdown: Decimal,
    shutdown_reason: Option<String>,
}

impl KillSwitch {
    pub fn new(max_drawdown: Decimal) -> Self {
        Self {
            state: KillSwitchState::Armed,
            peak: None,
            max_drawdown,
            shutdown_reason: None,
        }
    }

    /// Feed a new total balance
    ///
    /// Updates the peak and returns the drawdown condition when the limit is
    /// exceeded while still armed. Does not latch; see [`KillSwitch::trigger`].
    pub fn observe(&mut self, total: Decimal) -> Option<Condition> {
        if self.is_triggered() {
            return None;
        }
        let peak = match self.peak {
            Some(peak) if peak >= total => peak,
            _ => {
                self.peak = Some(total);
                total
            }
        };
        if peak - total > self.max_drawdown {
            Some(Condition::DrawdownKillSwitch {
                peak,
                total,
                limit: self.max_drawdown,
            })
        } else {
            None
        }
    }

    /// Latch the switch
    pub fn trigger(&mut self, reason: impl Into<String>) {
        if self.is_triggered() {
            info!("Kill switch already triggered");
            return;
        }
        let reason = reason.into();
        error!("KILL SWITCH TRIGGERED: {}", reason);
        self.state = KillSwitchState::Triggered;
        self.shutdown_reason = Some(reason);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.state == KillSwitchState::Triggered
    }

    pub fn state(&self) -> KillSwitchState {
        self.state
    }

    pub fn peak(&self) -> Option<Decimal> {
        self.peak
    }

    pub fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }

    pub fn shutdown_reason(&self) -> Option<&str> {
        self.shutdown_reason.as_deref()
    }
}
