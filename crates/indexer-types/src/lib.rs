//! Core domain types for the order indexer.
//!
//! This crate defines the asset model, order aggregates, exchange-history
//! events and the event bus shared by the other indexer crates.

pub mod asset;
pub mod data;
pub mod events;
pub mod history;
pub mod order;

pub use asset::*;
pub use data::*;
pub use events::*;
pub use history::*;
pub use order::*;
