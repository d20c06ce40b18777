//! In-memory storage backends.
//!
//! Ordered maps keep the hash keyspace sorted so cursor queries come for
//! free; suitable for tests and single-process deployments.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use indexer_types::{LogEvent, Order, OrderType, OrderVersion};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
	ExchangeHistoryRepository, OrderRepository, OrderVersionRepository, StorageError,
};

#[derive(Default)]
pub struct InMemoryOrderRepository {
	orders: RwLock<BTreeMap<B256, Order>>,
}

impl InMemoryOrderRepository {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
	async fn save(&self, order: Order) -> Result<Order, StorageError> {
		let mut orders = self.orders.write().await;
		let stored_version = orders.get(&order.hash).and_then(|stored| stored.version);
		if stored_version != order.version {
			return Err(StorageError::VersionConflict {
				stored: stored_version,
				attempted: order.version,
			});
		}
		let saved = Order {
			version: Some(stored_version.map_or(0, |v| v + 1)),
			..order
		};
		orders.insert(saved.hash, saved.clone());
		Ok(saved)
	}

	async fn find_by_hash(&self, hash: B256) -> Result<Option<Order>, StorageError> {
		Ok(self.orders.read().await.get(&hash).cloned())
	}

	async fn find_open_sea_hashes_by_maker_and_nonce(
		&self,
		maker: Address,
		from_incl: u64,
		to_excl: u64,
	) -> Result<Vec<B256>, StorageError> {
		let orders = self.orders.read().await;
		Ok(orders
			.values()
			.filter(|order| order.order_type == OrderType::OpenSeaV1 && order.maker == maker)
			.filter(|order| {
				order
					.data
					.open_sea_nonce()
					.is_some_and(|nonce| nonce >= from_incl && nonce < to_excl)
			})
			.map(|order| order.hash)
			.collect())
	}
}

#[derive(Default)]
pub struct InMemoryOrderVersionRepository {
	by_hash: RwLock<BTreeMap<B256, Vec<OrderVersion>>>,
	hash_by_id: RwLock<HashMap<Uuid, B256>>,
}

impl InMemoryOrderVersionRepository {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl OrderVersionRepository for InMemoryOrderVersionRepository {
	async fn save(&self, version: OrderVersion) -> Result<(), StorageError> {
		let mut ids = self.hash_by_id.write().await;
		if ids.contains_key(&version.id) {
			return Ok(());
		}
		ids.insert(version.id, version.hash);
		let mut by_hash = self.by_hash.write().await;
		let versions = by_hash.entry(version.hash).or_default();
		versions.push(version);
		versions.sort_by_key(|v| v.created_at);
		Ok(())
	}

	async fn exists(&self, id: Uuid) -> Result<bool, StorageError> {
		Ok(self.hash_by_id.read().await.contains_key(&id))
	}

	async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
		let mut ids = self.hash_by_id.write().await;
		let Some(hash) = ids.remove(&id) else {
			return Ok(());
		};
		let mut by_hash = self.by_hash.write().await;
		if let Some(versions) = by_hash.get_mut(&hash) {
			versions.retain(|v| v.id != id);
			if versions.is_empty() {
				by_hash.remove(&hash);
			}
		}
		Ok(())
	}

	async fn find_by_hash(&self, hash: B256) -> Result<Vec<OrderVersion>, StorageError> {
		Ok(self
			.by_hash
			.read()
			.await
			.get(&hash)
			.cloned()
			.unwrap_or_default())
	}

	async fn find_hashes_greater_than(&self, from: B256) -> Result<Vec<B256>, StorageError> {
		Ok(self
			.by_hash
			.read()
			.await
			.range((Excluded(from), Unbounded))
			.map(|(hash, _)| *hash)
			.collect())
	}
}

#[derive(Default)]
pub struct InMemoryExchangeHistoryRepository {
	by_hash: RwLock<BTreeMap<B256, Vec<LogEvent>>>,
}

impl InMemoryExchangeHistoryRepository {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl ExchangeHistoryRepository for InMemoryExchangeHistoryRepository {
	async fn save(&self, event: LogEvent) -> Result<(), StorageError> {
		let mut by_hash = self.by_hash.write().await;
		let events = by_hash.entry(event.order_hash()).or_default();
		events.retain(|e| e.id != event.id);
		events.push(event);
		events.sort_by_key(|e| (e.block_number, e.log_index));
		Ok(())
	}

	async fn find_by_hash(&self, hash: B256) -> Result<Vec<LogEvent>, StorageError> {
		Ok(self
			.by_hash
			.read()
			.await
			.get(&hash)
			.cloned()
			.unwrap_or_default())
	}

	async fn find_hashes_greater_than(&self, from: B256) -> Result<Vec<B256>, StorageError> {
		Ok(self
			.by_hash
			.read()
			.await
			.range((Excluded(from), Unbounded))
			.map(|(hash, _)| *hash)
			.collect())
	}
}
