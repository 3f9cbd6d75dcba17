//! Test helpers shared by unit tests, integration tests and benches

pub mod helpers;

pub use helpers::*;
