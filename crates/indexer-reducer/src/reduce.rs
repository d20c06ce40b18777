//! Per-hash reduction: replay every stored input through the fold and
//! persist the resulting snapshot.

use std::collections::BTreeSet;
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use indexer_config::IndexerConfig;
use indexer_hash::hash_key_with_data;
use indexer_oracles::{AssetBalanceService, MakerNonceSource, PriceNormalizer, PriceUpdateService};
use indexer_storage::{
	ExchangeHistoryRepository, OrderRepository, OrderVersionRepository, StorageError,
};
use indexer_types::{
	Asset, AssetType, ExchangeHistory, LogEvent, LogStatus, Order, OrderData, OrderType,
	OrderVersion, Platform, PriceHistoryRecord, MAX_PRICE_HISTORIES,
};

use crate::ReduceError;

/// Sentinel hash of the fold seed; a fold that never sees an order
/// version ends on it and is not persisted.
pub const EMPTY_ORDER_HASH: B256 = B256::ZERO;

/// Tunables of the reduction engine, extracted from the loaded config.
#[derive(Debug, Clone)]
pub struct ReducerSettings {
	pub protocol_fee_bps: u64,
	pub open_sea_nonce_offset: u64,
	pub max_save_attempts: u32,
}

impl ReducerSettings {
	pub fn from_config(config: &IndexerConfig) -> Self {
		Self {
			protocol_fee_bps: config.fees.protocol_bps,
			open_sea_nonce_offset: config.exchange.open_sea_nonce_offset,
			max_save_attempts: config.reduce.max_save_attempts,
		}
	}
}

/// Explicit fold seed: a zero-value order under the sentinel hash.
fn empty_order() -> Order {
	Order {
		maker: Address::ZERO,
		taker: None,
		make: Asset::new(AssetType::Eth, U256::ZERO),
		take: Asset::new(AssetType::Eth, U256::ZERO),
		order_type: OrderType::RaribleV2,
		fill: U256::ZERO,
		cancelled: false,
		make_stock: U256::ZERO,
		salt: U256::ZERO,
		start: None,
		end: None,
		data: OrderData::RaribleV2DataV1 {
			payouts: vec![],
			origin_fees: vec![],
		},
		signature: None,
		created_at: DateTime::UNIX_EPOCH,
		last_update_at: DateTime::UNIX_EPOCH,
		pending: vec![],
		make_price_usd: None,
		take_price_usd: None,
		make_usd: None,
		take_usd: None,
		price_history: vec![],
		platform: Platform::Rarible,
		hash: EMPTY_ORDER_HASH,
		version: None,
	}
}

/// One input of the fold, from either stream.
enum OrderUpdate {
	Version(OrderVersion),
	Log(LogEvent),
}

impl OrderUpdate {
	/// Global total order over both streams: by timestamp, with versions
	/// sorting before log events of the same instant (intent precedes
	/// settlement), then by block position.
	fn sort_key(&self) -> (DateTime<Utc>, u8, u64, u64) {
		match self {
			OrderUpdate::Version(version) => (version.created_at, 0, 0, 0),
			OrderUpdate::Log(event) => {
				(event.history.date(), 1, event.block_number, event.log_index)
			}
		}
	}
}

/// Reduces the full stored history of an order hash into a snapshot.
pub struct OrderReduceService {
	history: Arc<dyn ExchangeHistoryRepository>,
	orders: Arc<dyn OrderRepository>,
	versions: Arc<dyn OrderVersionRepository>,
	balances: Arc<AssetBalanceService>,
	prices: Arc<PriceUpdateService>,
	normalizer: Arc<PriceNormalizer>,
	nonces: Arc<dyn MakerNonceSource>,
	settings: ReducerSettings,
}

impl OrderReduceService {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		history: Arc<dyn ExchangeHistoryRepository>,
		orders: Arc<dyn OrderRepository>,
		versions: Arc<dyn OrderVersionRepository>,
		balances: Arc<AssetBalanceService>,
		prices: Arc<PriceUpdateService>,
		normalizer: Arc<PriceNormalizer>,
		nonces: Arc<dyn MakerNonceSource>,
		settings: ReducerSettings,
	) -> Self {
		Self {
			history,
			orders,
			versions,
			balances,
			prices,
			normalizer,
			nonces,
			settings,
		}
	}

	/// Reduces one hash and persists the result, retrying the whole
	/// read-fold-save cycle on optimistic-lock conflicts.
	pub async fn update_order(&self, order_hash: B256) -> Result<Order, ReduceError> {
		let mut attempts = 0;
		loop {
			attempts += 1;
			let reduced = self.reduce(order_hash).await?;
			match self.orders.save(reduced).await {
				Ok(saved) => {
					info!(
						hash = %saved.hash,
						make_stock = %saved.make_stock,
						fill = %saved.fill,
						cancelled = saved.cancelled,
						"updated order"
					);
					return Ok(saved);
				}
				Err(StorageError::VersionConflict { .. })
					if attempts < self.settings.max_save_attempts =>
				{
					debug!(hash = %order_hash, attempts, "save conflict, re-reducing");
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

	/// Backfill sweep: reduces every hash greater than the cursor seen in
	/// either input store. Safe to run concurrently with live triggers
	/// since re-reducing a current order is a no-op write.
	pub async fn update_from(&self, from_hash: B256) -> Result<usize, ReduceError> {
		let mut hashes: BTreeSet<B256> = self
			.versions
			.find_hashes_greater_than(from_hash)
			.await?
			.into_iter()
			.collect();
		hashes.extend(self.history.find_hashes_greater_than(from_hash).await?);

		info!(from = %from_hash, count = hashes.len(), "sweeping order hashes");
		let mut updated = 0;
		for hash in hashes {
			match self.update_order(hash).await {
				Ok(_) => updated += 1,
				Err(ReduceError::NotReducible(_)) => {}
				Err(e) => warn!(hash = %hash, error = %e, "sweep reduction failed"),
			}
		}
		Ok(updated)
	}

	async fn reduce(&self, order_hash: B256) -> Result<Order, ReduceError> {
		let log_events = self.history.find_by_hash(order_hash).await?;
		self.materialize_on_chain_versions(&log_events).await?;
		let versions = self.versions.find_by_hash(order_hash).await?;

		let mut updates: Vec<OrderUpdate> = versions
			.into_iter()
			.map(OrderUpdate::Version)
			.chain(log_events.into_iter().map(OrderUpdate::Log))
			.collect();
		updates.sort_by_key(OrderUpdate::sort_key);

		let mut order = empty_order();
		for update in updates {
			order = self.apply(order, update).await;
		}
		if order.hash == EMPTY_ORDER_HASH {
			info!(
				hash = %order_hash,
				"order not reduced: only log events, no order versions"
			);
			return Err(ReduceError::NotReducible(order_hash));
		}

		// Carry the stored version counter so the save detects races.
		order.version = self
			.orders
			.find_by_hash(order_hash)
			.await?
			.and_then(|stored| stored.version);

		if self.nonce_is_stale(&order).await {
			order.cancelled = true;
		}

		let (balance, usd) = tokio::join!(
			self.balances.make_balance(&order),
			self.prices
				.assets_usd_value(&order.make, &order.take, Utc::now())
		);
		let mut order = order.with_make_balance(balance, self.settings.protocol_fee_bps);
		if let Some(usd) = usd {
			order = order.with_usd_value(usd);
		}
		Ok(order)
	}

	/// Persists the order versions embedded in confirmed on-chain order
	/// events and retracts the ones whose event is no longer confirmed.
	async fn materialize_on_chain_versions(
		&self,
		log_events: &[LogEvent],
	) -> Result<(), ReduceError> {
		for event in log_events {
			let ExchangeHistory::OnChainOrder(on_chain) = &event.history else {
				continue;
			};
			if event.status == LogStatus::Confirmed {
				if !self.versions.exists(on_chain.order.id).await? {
					self.verify_version_hash(&on_chain.order);
					self.versions.save(on_chain.order.clone()).await?;
				}
			} else {
				self.versions.delete(on_chain.order.id).await?;
			}
		}
		Ok(())
	}

	fn verify_version_hash(&self, version: &OrderVersion) {
		match hash_key_with_data(
			version.maker,
			&version.make.asset_type,
			&version.take.asset_type,
			version.salt,
			&version.data,
		) {
			Ok(expected) if expected != version.hash => warn!(
				hash = %version.hash,
				expected = %expected,
				"on-chain order version hash does not match its key fields"
			),
			Err(e) => debug!(hash = %version.hash, error = %e, "version hash not verifiable"),
			_ => {}
		}
	}

	async fn apply(&self, accumulator: Order, update: OrderUpdate) -> Order {
		match update {
			OrderUpdate::Version(version) => self.apply_version(accumulator, version).await,
			OrderUpdate::Log(event) => self.apply_log(accumulator, event).await,
		}
	}

	/// A version replaces the trading fields and keeps everything the
	/// chain has accumulated so far.
	async fn apply_version(&self, accumulator: Order, version: OrderVersion) -> Order {
		let price_history = self.updated_price_history(&accumulator, &version).await;
		let created_at = if accumulator.created_at == DateTime::UNIX_EPOCH {
			version.created_at
		} else {
			accumulator.created_at
		};
		Order {
			maker: version.maker,
			taker: version.taker,
			make: version.make,
			take: version.take,
			order_type: version.order_type,
			salt: version.salt,
			start: version.start,
			end: version.end,
			data: version.data,
			signature: version.signature,
			make_price_usd: version.make_price_usd,
			take_price_usd: version.take_price_usd,
			make_usd: version.make_usd,
			take_usd: version.take_usd,
			platform: version.platform,
			hash: version.hash,

			created_at,
			last_update_at: accumulator.last_update_at.max(version.created_at),
			price_history,

			fill: accumulator.fill,
			cancelled: accumulator.cancelled,
			make_stock: accumulator.make_stock,
			pending: accumulator.pending,
			version: accumulator.version,
		}
	}

	async fn apply_log(&self, accumulator: Order, event: LogEvent) -> Order {
		match event.status {
			LogStatus::Pending => {
				let mut pending = accumulator.pending.clone();
				pending.push(event.history);
				Order {
					pending,
					..accumulator
				}
			}
			LogStatus::Confirmed => match event.history {
				ExchangeHistory::Match(side_match) => Order {
					fill: accumulator.fill.saturating_add(side_match.fill),
					last_update_at: accumulator.last_update_at.max(side_match.date),
					..accumulator
				},
				ExchangeHistory::Cancel(cancel) => Order {
					cancelled: true,
					last_update_at: accumulator.last_update_at.max(cancel.date),
					..accumulator
				},
				// On-chain orders can be re-opened under the same hash, so
				// the fold restarts from the seed instead of updating
				// incrementally.
				ExchangeHistory::OnChainOrder(on_chain) => {
					self.apply_version(empty_order(), on_chain.order).await
				}
			},
			LogStatus::Reverted | LogStatus::Dropped | LogStatus::Inactive => accumulator,
		}
	}

	/// A new price record is appended only when the traded amounts
	/// actually changed; the list keeps the newest records first.
	async fn updated_price_history(
		&self,
		previous: &Order,
		version: &OrderVersion,
	) -> Vec<PriceHistoryRecord> {
		if previous.make == version.make && previous.take == version.take {
			return previous.price_history.clone();
		}
		let record = PriceHistoryRecord {
			date: version.created_at,
			make_value: self.normalizer.normalize(&version.make).await,
			take_value: self.normalizer.normalize(&version.take).await,
		};
		let mut records = Vec::with_capacity(previous.price_history.len() + 1);
		records.push(record);
		records.extend(previous.price_history.iter().cloned());
		records.truncate(MAX_PRICE_HISTORIES);
		records
	}

	/// Foreign-exchange orders signed under an out-of-date nonce are
	/// cancelled in the fold result itself, so nonce invalidation flows
	/// through the same reduce path as every other transition.
	async fn nonce_is_stale(&self, order: &Order) -> bool {
		if order.order_type != OrderType::OpenSeaV1 {
			return false;
		}
		let Some(order_nonce) = order.data.open_sea_nonce() else {
			return false;
		};
		match self.nonces.maker_nonce(order.maker).await {
			Ok(Some(current)) => {
				order_nonce < current.saturating_add(self.settings.open_sea_nonce_offset)
			}
			Ok(None) => false,
			Err(e) => {
				warn!(maker = %order.maker, error = %e, "maker nonce lookup failed");
				false
			}
		}
	}
}
