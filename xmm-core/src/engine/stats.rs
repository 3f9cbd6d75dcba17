use crate::core::ConditionKind;
use serde::{Deserialize, Serialize};

/// Per-kind condition counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCounts {
    pub stale_acknowledgment: u64,
    pub missing_open_order: u64,
    pub rate_limit_breach: u64,
    pub book_depletion: u64,
    pub exchange_response_error: u64,
    pub drawdown_kill_switch: u64,
}

impl ConditionCounts {
    pub fn bump(&mut self, kind: ConditionKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: ConditionKind) -> u64 {
        match kind {
            ConditionKind::StaleAcknowledgment => self.stale_acknowledgment,
            ConditionKind::MissingOpenOrder => self.missing_open_order,
            ConditionKind::RateLimitBreach => self.rate_limit_breach,
            ConditionKind::BookDepletion => self.book_depletion,
            ConditionKind::ExchangeResponseError => self.exchange_response_error,
            ConditionKind::DrawdownKillSwitch => self.drawdown_kill_switch,
        }
    }

    pub fn total(&self) -> u64 {
        self.stale_acknowledgment
            + self.missing_open_order
            + self.rate_limit_breach
            + self.book_depletion
            + self.exchange_response_error
            + self.drawdown_kill_switch
    }

    fn slot(&mut self, kind: ConditionKind) -> &mut u64 {
        match kind {
            ConditionKind::StaleAcknowledgment => &mut self.stale_acknowledgment,
            ConditionKind::MissingOpenOrder => &mut self.missing_open_order,
            ConditionKind::RateLimitBreach => &mut self.rate_limit_breach,
            ConditionKind::BookDepletion => &mut self.book_depletion,
            ConditionKind::ExchangeResponseError => &mut self.exchange_response_error,
            ConditionKind::DrawdownKillSwitch => &mut self.drawdown_kill_switch,
        }
    }
}

/// Engine statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Events dispatched, including simulator output
    pub events_processed: u64,
    /// Events dropped after the kill switch fired
    pub events_ignored: u64,
    /// Events that needed a correlation tag and had none
    pub untagged_events: u64,
    pub quote_cycles: u64,
    pub crossings: u64,
    pub fills: u64,
    pub hedges: u64,
    pub requests_admitted: u64,
    pub requests_dropped: u64,
    pub liquidations: u64,
    pub conditions: ConditionCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_counts() {
        let mut counts = ConditionCounts::default();
        counts.bump(ConditionKind::StaleAcknowledgment);
        counts.bump(ConditionKind::StaleAcknowledgment);
        counts.bump(ConditionKind::BookDepletion);
        assert_eq!(counts.get(ConditionKind::StaleAcknowledgment), 2);
        assert_eq!(counts.get(ConditionKind::RateLimitBreach), 0);
        assert_eq!(counts.total(), 3);
    }
}
