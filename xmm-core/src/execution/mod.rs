//! Outbound side of the engine
//!
//! - `types`: requests, channels and routed requests
//! - `simulated`: the matching simulator answering requests in PAPER and BACKTEST
//! - `journal`: persisted rows and the sinks that receive them

pub mod journal;
pub mod simulated;
pub mod types;

pub use journal::{
    JournalRecord, JsonLinesSink, MemorySink, NullSink, RecordSink, SummaryRow, TracingSink,
};
pub use simulated::{MatchingSimulator, RestingOrder, SimulationOutput, SimulatorStats};
pub use types::{Channel, Request, RoutedRequest};
