//! Durable CSV table of [`market_core::MetricsRecord`] rows keyed by symbol.

mod error;
mod store;

pub use error::StoreError;
pub use store::{MetricsStore, UpsertOutcome};
