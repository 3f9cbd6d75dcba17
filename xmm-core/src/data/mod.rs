//! Event model
//!
//! - `events`: inbound [`Event`] and its payloads
//! - `tags`: the `{action, leg}` correlation tag carried by requests and responses

pub mod events;
pub mod tags;

pub use events::{
    Balance, CancelResponse, Event, EventPayload, ExchangeError, OrderAck, OrderUpdate,
    PositionReport, PrivateTrade, PublicTrade, SessionStatus, SubscriptionStatus,
};
pub use tags::{Action, CorrelationTag};
