//! Local order-book snapshots
//!
//! One [`L2OrderBook`] per leg, replaced wholesale on every depth update.

pub mod l2_book;

pub use l2_book::{L2OrderBook, Level};
