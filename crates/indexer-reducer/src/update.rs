//! Direct order mutation paths and the downstream notification hook.

use std::sync::Arc;

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use indexer_oracles::{AssetBalanceService, PriceUpdateService};
use indexer_storage::{OrderRepository, StorageError};
use indexer_types::{EventBus, IndexerEvent, Order};

use crate::{OrderReduceService, ReduceError, ReducerSettings};

/// Entry point used by consumers and jobs to retrigger order state.
///
/// Every successful persist publishes an [`IndexerEvent::OrderUpdated`]
/// notification for downstream order/activity publishers.
pub struct OrderUpdateService {
	reducer: Arc<OrderReduceService>,
	orders: Arc<dyn OrderRepository>,
	balances: Arc<AssetBalanceService>,
	prices: Arc<PriceUpdateService>,
	event_bus: EventBus,
	settings: ReducerSettings,
}

impl OrderUpdateService {
	pub fn new(
		reducer: Arc<OrderReduceService>,
		orders: Arc<dyn OrderRepository>,
		balances: Arc<AssetBalanceService>,
		prices: Arc<PriceUpdateService>,
		event_bus: EventBus,
		settings: ReducerSettings,
	) -> Self {
		Self {
			reducer,
			orders,
			balances,
			prices,
			event_bus,
			settings,
		}
	}

	/// Full reduction of a hash. An irreducible hash (log events without
	/// any version) is a no-op rather than an error.
	pub async fn update(&self, order_hash: B256) -> Result<Option<Order>, ReduceError> {
		match self.reducer.update_order(order_hash).await {
			Ok(order) => {
				self.publish(&order);
				Ok(Some(order))
			}
			Err(ReduceError::NotReducible(hash)) => {
				debug!(hash = %hash, "skipping irreducible order");
				Ok(None)
			}
			Err(e) => Err(e),
		}
	}

	/// Recomputes the stock of an already-reduced order from a fresh
	/// balance without replaying its history.
	pub async fn update_make_stock(&self, order_hash: B256) -> Result<Order, ReduceError> {
		let mut attempts = 0;
		loop {
			attempts += 1;
			let order = self
				.orders
				.find_by_hash(order_hash)
				.await?
				.ok_or(ReduceError::OrderNotFound(order_hash))?;
			let balance = self.balances.make_balance(&order).await;
			let updated = order.with_make_balance(balance, self.settings.protocol_fee_bps);
			match self.orders.save(updated).await {
				Ok(saved) => {
					info!(hash = %saved.hash, make_stock = %saved.make_stock, "updated make stock");
					self.publish(&saved);
					return Ok(saved);
				}
				Err(StorageError::VersionConflict { .. })
					if attempts < self.settings.max_save_attempts =>
				{
					debug!(hash = %order_hash, attempts, "stock save conflict, retrying");
				}
				Err(StorageError::VersionConflict { .. }) => {
					return Err(ReduceError::TooManyConflicts {
						hash: order_hash,
						attempts,
					});
				}
				Err(e) => return Err(e.into()),
			}
		}
	}

	/// Refreshes the USD fields of a stored order without a full reduce.
	pub async fn update_order_price(
		&self,
		order_hash: B256,
		at: DateTime<Utc>,
	) -> Result<Order, ReduceError> {
		let mut attempts = 0;
		loop {
			attempts += 1;
			let order = self
				.orders
				.find_by_hash(order_hash)
				.await?
				.ok_or(ReduceError::OrderNotFound(order_hash))?;
			let Some(usd) = self
				.prices
				.assets_usd_value(&order.make, &order.take, at)
				.await
			else {
				// Stale-but-present values win over nulls.
				return Ok(order);
			};
			match self.orders.save(order.with_usd_value(usd)).await {
				Ok(saved) => {
					self.publish(&saved);
					return Ok(saved);
				}
				Err(StorageError::VersionConflict { .. })
					if attempts < self.settings.max_save_attempts =>
				{
					debug!(hash = %order_hash, attempts, "price save conflict, retrying");
				}
				Err(StorageError::VersionConflict { .. }) => {
					return Err(ReduceError::TooManyConflicts {
						hash: order_hash,
						attempts,
					});
				}
				Err(e) => return Err(e.into()),
			}
		}
	}

	fn publish(&self, order: &Order) {
		self.event_bus.publish(IndexerEvent::OrderUpdated {
			order: Box::new(order.clone()),
		});
	}
}
