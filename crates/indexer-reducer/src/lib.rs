//! The event-reduction engine.
//!
//! Merges the on-chain exchange-history stream and the off-chain order
//! version stream per identity hash and folds them into one authoritative
//! `Order` snapshot, enriched with live balance stock and USD prices and
//! persisted under optimistic concurrency.

use alloy_primitives::B256;
use indexer_storage::StorageError;
use thiserror::Error;

pub mod nonce;
pub mod reduce;
#[cfg(test)]
mod testutil;
pub mod update;

pub use nonce::ChangeNonceListener;
pub use reduce::{OrderReduceService, ReducerSettings, EMPTY_ORDER_HASH};
pub use update::OrderUpdateService;

/// Errors raised while reducing or mutating orders.
#[derive(Debug, Error)]
pub enum ReduceError {
	/// A direct mutation referenced a hash with no stored order.
	#[error("order {0} not found")]
	OrderNotFound(B256),
	/// Only orphan log events exist for the hash; log events alone never
	/// create a tradable order.
	#[error("order {0} is not reducible: no order version observed")]
	NotReducible(B256),
	/// The optimistic save loop kept losing write races.
	#[error("gave up saving order {hash} after {attempts} conflicting attempts")]
	TooManyConflicts { hash: B256, attempts: u32 },
	/// A nonce notification produced a non-positive invalidation target.
	#[error("invalid maker nonce target {0}")]
	InvalidNonce(u64),
	#[error(transparent)]
	Storage(#[from] StorageError),
}
