//! Persisted rows
//!
//! The engine emits one [`JournalRecord`] per private trade, order update,
//! balance, position and end-of-run summary. Where the rows end up is the
//! embedding process's business; it plugs in a [`RecordSink`].

use crate::core::{LegId, OrderId, OrderPurpose, OrderStatus, Side, TradingMode};
use crate::engine::EngineStats;
use crate::leg::FillTotals;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateTradeRow {
    pub time_us: u64,
    pub leg: LegId,
    pub trade_id: String,
    pub order_id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub is_maker: bool,
    pub purpose: OrderPurpose,
    pub fee_quantity: Option<Decimal>,
    pub fee_asset: Option<String>,
    /// Positions of both legs after the fill
    pub position_a: Decimal,
    pub position_b: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdateRow {
    pub time_us: u64,
    pub leg: LegId,
    pub order_id: OrderId,
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub remaining: Decimal,
    pub cumulative_filled: Decimal,
    pub status: OrderStatus,
}

/// Leg balances after an account balance response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub time_us: u64,
    pub leg: LegId,
    pub base_balance: Decimal,
    pub quote_balance: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRow {
    pub time_us: u64,
    pub leg: LegId,
    pub quantity: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

/// Final state of one leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSummary {
    pub leg: LegId,
    pub venue: String,
    pub instrument: String,
    pub base_balance: Decimal,
    pub quote_balance: Decimal,
    pub position: Decimal,
    pub totals: FillTotals,
}

/// End-of-run summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub time_us: u64,
    pub mode: TradingMode,
    pub theoretical_price: f64,
    pub relative_position: i64,
    pub total_balance: Option<Decimal>,
    pub peak_balance: Option<Decimal>,
    pub shutdown_reason: Option<String>,
    pub legs: Vec<LegSummary>,
    pub stats: EngineStats,
}

/// One persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum JournalRecord {
    PrivateTrade(PrivateTradeRow),
    OrderUpdate(OrderUpdateRow),
    Balance(BalanceRow),
    Position(PositionRow),
    Summary(SummaryRow),
}

/// Destination for persisted rows
pub trait RecordSink: Send {
    fn record(&mut self, record: &JournalRecord);

    fn flush(&mut self) {}
}

/// Discards every row
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn record(&mut self, _record: &JournalRecord) {}
}

/// Logs every row as JSON at `info` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn record(&mut self, record: &JournalRecord) {
        match serde_json::to_string(record) {
            Ok(json) => info!(target: "xmm::journal", "{}", json),
            Err(e) => error!("Failed to serialize journal record: {}", e),
        }
    }
}

/// Keeps rows in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<JournalRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row recorded so far
    pub fn records(&self) -> Vec<JournalRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn record(&mut self, record: &JournalRecord) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn record(&mut self, record: &JournalRecord) {
        match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(e) = writeln!(self.writer, "{}", json) {
                    error!("Failed to write journal record: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize journal record: {}", e),
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            error!("Failed to flush journal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balance_row() -> JournalRecord {
        JournalRecord::Balance(BalanceRow {
            time_us: 7,
            leg: LegId::B,
            base_balance: dec!(0.5),
            quote_balance: dec!(-12),
            best_bid: Some(dec!(50)),
            best_ask: None,
        })
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.record(&balance_row());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0], balance_row());
    }

    #[test]
    fn test_json_lines_sink_writes_tagged_rows() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&balance_row());
        sink.flush();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let line = out.lines().next().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["record"], "balance");
        assert_eq!(value["leg"], "B");
        assert!(value["best_ask"].is_null());

        let back: JournalRecord = serde_json::from_str(line).unwrap();
        assert_eq!(back, balance_row());
    }
}
