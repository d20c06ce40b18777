//! Persistence interfaces for the order indexer.
//!
//! Repositories are trait objects so the reduction engine stays agnostic
//! of the backing store. The in-memory backends in
//! [`implementations::memory`] keep hashes in ordered maps, which gives
//! the `hashes greater than X` cursor used by sweep jobs.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use indexer_types::{LogEvent, Order, OrderVersion};
use thiserror::Error;
use uuid::Uuid;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The requested record does not exist.
	#[error("not found")]
	NotFound,
	/// An optimistic-concurrency save lost a write race.
	#[error("version conflict: stored {stored:?}, attempted {attempted:?}")]
	VersionConflict {
		stored: Option<u64>,
		attempted: Option<u64>,
	},
	/// The storage backend failed.
	#[error("backend error: {0}")]
	Backend(String),
}

/// Versioned store of reduced order snapshots, keyed by identity hash.
#[async_trait]
pub trait OrderRepository: Send + Sync {
	/// Saves a snapshot if its version counter matches the stored one.
	///
	/// A fresh order must carry `version: None`; the stored copy gets the
	/// next counter value. A mismatch returns
	/// [`StorageError::VersionConflict`] and leaves the store untouched.
	async fn save(&self, order: Order) -> Result<Order, StorageError>;

	async fn find_by_hash(&self, hash: B256) -> Result<Option<Order>, StorageError>;

	/// Hashes of foreign-exchange orders of `maker` whose embedded nonce
	/// lies in `[from_incl, to_excl)`.
	async fn find_open_sea_hashes_by_maker_and_nonce(
		&self,
		maker: Address,
		from_incl: u64,
		to_excl: u64,
	) -> Result<Vec<B256>, StorageError>;
}

/// Append-only store of signed order versions.
#[async_trait]
pub trait OrderVersionRepository: Send + Sync {
	/// Inserts a version; saving the same id again is a no-op.
	async fn save(&self, version: OrderVersion) -> Result<(), StorageError>;

	async fn exists(&self, id: Uuid) -> Result<bool, StorageError>;

	/// Retracts a version materialized from a since-reverted chain event.
	async fn delete(&self, id: Uuid) -> Result<(), StorageError>;

	/// All versions sharing a hash, ascending by creation time.
	async fn find_by_hash(&self, hash: B256) -> Result<Vec<OrderVersion>, StorageError>;

	/// Distinct hashes strictly greater than the cursor, ascending.
	async fn find_hashes_greater_than(&self, from: B256) -> Result<Vec<B256>, StorageError>;
}

/// Store of decoded exchange log events.
#[async_trait]
pub trait ExchangeHistoryRepository: Send + Sync {
	/// Inserts or replaces an event by id; replay of the same record is
	/// idempotent, a changed status overwrites the previous delivery.
	async fn save(&self, event: LogEvent) -> Result<(), StorageError>;

	/// All events for a hash in `(block_number, log_index)` order.
	async fn find_by_hash(&self, hash: B256) -> Result<Vec<LogEvent>, StorageError>;

	/// Distinct hashes strictly greater than the cursor, ascending.
	async fn find_hashes_greater_than(&self, from: B256) -> Result<Vec<B256>, StorageError>;
}
