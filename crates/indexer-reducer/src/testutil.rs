//! Shared fixtures for the engine tests: in-memory stores plus stub
//! oracles with settable balances and nonces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use indexer_oracles::{
	AssetBalanceService, BalanceOracle, MakerNonceSource, OracleError, PriceNormalizer,
	PriceUpdateService, TokenDecimalsSource, UsdRateSource,
};
use indexer_storage::implementations::memory::{
	InMemoryExchangeHistoryRepository, InMemoryOrderRepository, InMemoryOrderVersionRepository,
};
use indexer_storage::{ExchangeHistoryRepository, OrderVersionRepository};
use indexer_types::{
	Asset, AssetType, EventBus, ExchangeHistory, LogEvent, LogStatus, OnChainOrder, OpenSeaFeeMethod,
	OpenSeaHowToCall, OpenSeaSaleKind, OpenSeaSide, OpenSeaV1Data, OrderCancel, OrderData,
	OrderSide, OrderSideMatch, OrderType, OrderVersion, Platform,
};

use crate::{OrderReduceService, OrderUpdateService, ReducerSettings};

pub const MAKER: Address = Address::repeat_byte(0xaa);
pub const TAKER: Address = Address::repeat_byte(0xbb);

pub struct StubBalance {
	value: RwLock<U256>,
}

impl StubBalance {
	pub fn new(value: u64) -> Arc<Self> {
		Arc::new(Self {
			value: RwLock::new(U256::from(value)),
		})
	}

	pub async fn set(&self, value: u64) {
		*self.value.write().await = U256::from(value);
	}
}

#[async_trait]
impl BalanceOracle for StubBalance {
	async fn balance(&self, _owner: Address, _asset_type: &AssetType) -> Result<U256, OracleError> {
		Ok(*self.value.read().await)
	}
}

pub struct StubRates(pub Option<Decimal>);

#[async_trait]
impl UsdRateSource for StubRates {
	async fn usd_rate(
		&self,
		_asset_type: &AssetType,
		_at: DateTime<Utc>,
	) -> Result<Decimal, OracleError> {
		self.0
			.ok_or_else(|| OracleError::Unavailable("no rates".into()))
	}
}

pub struct StubNonces {
	nonces: RwLock<HashMap<Address, u64>>,
}

impl StubNonces {
	pub fn empty() -> Arc<Self> {
		Arc::new(Self {
			nonces: RwLock::new(HashMap::new()),
		})
	}

	pub async fn set(&self, maker: Address, nonce: u64) {
		self.nonces.write().await.insert(maker, nonce);
	}
}

#[async_trait]
impl MakerNonceSource for StubNonces {
	async fn maker_nonce(&self, maker: Address) -> Result<Option<u64>, OracleError> {
		Ok(self.nonces.read().await.get(&maker).copied())
	}
}

pub struct NoDecimals;

#[async_trait]
impl TokenDecimalsSource for NoDecimals {
	async fn decimals(&self, _token: Address) -> Option<u8> {
		None
	}
}

pub struct Harness {
	pub history: Arc<InMemoryExchangeHistoryRepository>,
	pub orders: Arc<InMemoryOrderRepository>,
	pub versions: Arc<InMemoryOrderVersionRepository>,
	pub balance: Arc<StubBalance>,
	pub balances: Arc<AssetBalanceService>,
	pub prices: Arc<PriceUpdateService>,
	pub normalizer: Arc<PriceNormalizer>,
	pub nonces: Arc<StubNonces>,
	pub event_bus: EventBus,
	pub reducer: Arc<OrderReduceService>,
	pub updater: Arc<OrderUpdateService>,
}

pub fn settings() -> ReducerSettings {
	settings_with_offset(0)
}

pub fn settings_with_offset(open_sea_nonce_offset: u64) -> ReducerSettings {
	ReducerSettings {
		protocol_fee_bps: 0,
		open_sea_nonce_offset,
		max_save_attempts: 5,
	}
}

pub fn harness(balance: u64) -> Harness {
	build_harness(balance, None, 0)
}

pub fn harness_with_rate(balance: u64, rate: Option<Decimal>) -> Harness {
	build_harness(balance, rate, 0)
}

pub fn harness_with_offset(balance: u64, open_sea_nonce_offset: u64) -> Harness {
	build_harness(balance, None, open_sea_nonce_offset)
}

fn build_harness(balance: u64, rate: Option<Decimal>, open_sea_nonce_offset: u64) -> Harness {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();

	let history = Arc::new(InMemoryExchangeHistoryRepository::new());
	let orders = Arc::new(InMemoryOrderRepository::new());
	let versions = Arc::new(InMemoryOrderVersionRepository::new());
	let balance = StubBalance::new(balance);
	let nonces = StubNonces::empty();

	let call_timeout = Duration::from_secs(1);
	let balances = Arc::new(AssetBalanceService::new(balance.clone(), call_timeout));
	let normalizer = Arc::new(PriceNormalizer::new(Arc::new(NoDecimals)));
	let prices = Arc::new(PriceUpdateService::new(
		Arc::new(StubRates(rate)),
		normalizer.clone(),
		call_timeout,
	));

	let reducer = Arc::new(OrderReduceService::new(
		history.clone(),
		orders.clone(),
		versions.clone(),
		balances.clone(),
		prices.clone(),
		normalizer.clone(),
		nonces.clone(),
		settings_with_offset(open_sea_nonce_offset),
	));
	let event_bus = EventBus::new(64);
	let updater = Arc::new(OrderUpdateService::new(
		reducer.clone(),
		orders.clone(),
		balances.clone(),
		prices.clone(),
		event_bus.clone(),
		settings_with_offset(open_sea_nonce_offset),
	));

	Harness {
		history,
		orders,
		versions,
		balance,
		balances,
		prices,
		normalizer,
		nonces,
		event_bus,
		reducer,
		updater,
	}
}

pub fn ts(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn erc20(seed: u8, value: u64) -> Asset {
	Asset::new(
		AssetType::Erc20 {
			token: Address::repeat_byte(seed),
		},
		U256::from(value),
	)
}

pub fn erc1155(seed: u8, value: u64) -> Asset {
	Asset::new(
		AssetType::Erc1155 {
			token: Address::repeat_byte(seed),
			token_id: U256::from(10),
		},
		U256::from(value),
	)
}

pub fn v2_data() -> OrderData {
	OrderData::RaribleV2DataV1 {
		payouts: vec![],
		origin_fees: vec![],
	}
}

pub fn version(hash: B256, make: Asset, take: Asset, created_secs: i64) -> OrderVersion {
	OrderVersion {
		id: Uuid::new_v4(),
		hash,
		maker: MAKER,
		taker: None,
		make,
		take,
		order_type: OrderType::RaribleV2,
		salt: U256::from(10),
		start: None,
		end: None,
		data: v2_data(),
		signature: None,
		created_at: ts(created_secs),
		platform: Platform::Rarible,
		make_price_usd: None,
		take_price_usd: None,
		make_usd: None,
		take_usd: None,
	}
}

pub fn open_sea_version(hash: B256, nonce: u64, created_secs: i64) -> OrderVersion {
	let data = OrderData::OpenSeaV1(OpenSeaV1Data {
		exchange: Address::repeat_byte(0xee),
		maker_relayer_fee: U256::ZERO,
		taker_relayer_fee: U256::ZERO,
		maker_protocol_fee: U256::ZERO,
		taker_protocol_fee: U256::ZERO,
		fee_recipient: Address::ZERO,
		fee_method: OpenSeaFeeMethod::SplitFee,
		side: OpenSeaSide::Sell,
		sale_kind: OpenSeaSaleKind::FixedPrice,
		how_to_call: OpenSeaHowToCall::Call,
		call_data: Default::default(),
		replacement_pattern: Default::default(),
		static_target: Address::ZERO,
		static_extra_data: Default::default(),
		extra: U256::ZERO,
		nonce: Some(nonce),
	});
	OrderVersion {
		order_type: OrderType::OpenSeaV1,
		platform: Platform::OpenSea,
		data,
		..version(hash, erc20(1, 10), erc1155(2, 1), created_secs)
	}
}

pub fn match_event(
	hash: B256,
	fill: u64,
	block: u64,
	date_secs: i64,
	status: LogStatus,
) -> LogEvent {
	LogEvent {
		id: Uuid::new_v4(),
		block_number: block,
		log_index: 0,
		status,
		history: ExchangeHistory::Match(OrderSideMatch {
			hash,
			counter_hash: B256::repeat_byte(0xcc),
			side: OrderSide::Left,
			maker: MAKER,
			taker: TAKER,
			make: erc20(1, 10),
			take: erc20(2, 5),
			fill: U256::from(fill),
			date: ts(date_secs),
		}),
	}
}

pub fn cancel_event(hash: B256, block: u64, date_secs: i64, status: LogStatus) -> LogEvent {
	LogEvent {
		id: Uuid::new_v4(),
		block_number: block,
		log_index: 0,
		status,
		history: ExchangeHistory::Cancel(OrderCancel {
			hash,
			maker: MAKER,
			make: None,
			take: None,
			date: ts(date_secs),
		}),
	}
}

pub fn on_chain_event(
	order: OrderVersion,
	block: u64,
	date_secs: i64,
	status: LogStatus,
) -> LogEvent {
	LogEvent {
		id: Uuid::new_v4(),
		block_number: block,
		log_index: 0,
		status,
		history: ExchangeHistory::OnChainOrder(OnChainOrder {
			order,
			date: ts(date_secs),
		}),
	}
}

pub async fn store_version(harness: &Harness, version: &OrderVersion) {
	harness.versions.save(version.clone()).await.unwrap();
}

pub async fn store_event(harness: &Harness, event: &LogEvent) {
	harness.history.save(event.clone()).await.unwrap();
}
