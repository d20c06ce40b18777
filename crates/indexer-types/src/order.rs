//! Order aggregates and the make-stock arithmetic.
//!
//! `Order` is the reduced snapshot keyed by the identity hash;
//! `OrderVersion` is an immutable signed intent. Stock calculation is kept
//! here as pure functions so the reduction engine and direct mutation
//! paths share one implementation.

use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Asset, AssetType, ExchangeHistory, OrderData};

/// Maximum number of retained price-history records per order.
pub const MAX_PRICE_HISTORIES: usize = 20;

/// Protocol variant an order belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
	RaribleV1,
	RaribleV2,
	OpenSeaV1,
	CryptoPunks,
}

/// Trading platform the order originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
	Rarible,
	OpenSea,
	CryptoPunks,
}

/// Which side of the exchange the fee is charged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeSide {
	Make,
	Take,
	None,
}

/// Fee-bearing side for an asset-type pairing. Native coin, then
/// fungible tokens, then ERC-1155 take precedence, make side first.
pub fn get_fee_side(make: &AssetType, take: &AssetType) -> FeeSide {
	match (make, take) {
		(AssetType::Eth, _) => FeeSide::Make,
		(_, AssetType::Eth) => FeeSide::Take,
		(AssetType::Erc20 { .. }, _) => FeeSide::Make,
		(_, AssetType::Erc20 { .. }) => FeeSide::Take,
		(AssetType::Erc1155 { .. }, _) => FeeSide::Make,
		(_, AssetType::Erc1155 { .. }) => FeeSide::Take,
		_ => FeeSide::None,
	}
}

/// USD valuations of both order sides as of some instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUsdValue {
	pub make_price_usd: Option<Decimal>,
	pub take_price_usd: Option<Decimal>,
	pub make_usd: Option<Decimal>,
	pub take_usd: Option<Decimal>,
}

/// One normalized price observation, newest records first in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryRecord {
	pub date: DateTime<Utc>,
	pub make_value: Decimal,
	pub take_value: Decimal,
}

/// Reduced snapshot of an order, keyed by its identity hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub maker: Address,
	pub taker: Option<Address>,

	pub make: Asset,
	pub take: Asset,

	pub order_type: OrderType,

	/// Cumulative filled amount; measured on the take side unless the
	/// order data sets the make-fill basis.
	pub fill: U256,
	pub cancelled: bool,

	/// Derived tradable remainder of the make side; always recomputed by
	/// the reduction engine, never asserted by callers.
	pub make_stock: U256,

	pub salt: U256,
	pub start: Option<u64>,
	pub end: Option<u64>,
	pub data: OrderData,
	pub signature: Option<Bytes>,

	pub created_at: DateTime<Utc>,
	pub last_update_at: DateTime<Utc>,

	/// Exchange-history entries observed but not yet confirmed.
	pub pending: Vec<ExchangeHistory>,

	pub make_price_usd: Option<Decimal>,
	pub take_price_usd: Option<Decimal>,
	pub make_usd: Option<Decimal>,
	pub take_usd: Option<Decimal>,
	pub price_history: Vec<PriceHistoryRecord>,

	pub platform: Platform,

	pub hash: B256,

	/// Optimistic-concurrency counter managed by the order repository.
	pub version: Option<u64>,
}

impl Order {
	pub fn is_bid(&self) -> bool {
		self.take.asset_type.is_nft()
	}

	pub fn fee_side(&self) -> FeeSide {
		get_fee_side(&self.make.asset_type, &self.take.asset_type)
	}

	/// Recomputes `make_stock` against a freshly observed balance.
	pub fn with_make_balance(self, make_balance: U256, protocol_fee_bps: u64) -> Order {
		let fee_side = self.fee_side();
		let make_stock = calculate_make_stock(
			self.make.value,
			self.take.value,
			self.fill,
			&self.data,
			make_balance,
			protocol_fee_bps,
			fee_side,
			self.cancelled,
		);
		Order { make_stock, ..self }
	}

	pub fn with_usd_value(self, usd: OrderUsdValue) -> Order {
		Order {
			make_price_usd: usd.make_price_usd,
			take_price_usd: usd.take_price_usd,
			make_usd: usd.make_usd,
			take_usd: usd.take_usd,
			..self
		}
	}
}

/// Immutable off-chain-submitted (or on-chain-decoded) order intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderVersion {
	pub id: Uuid,
	pub hash: B256,
	pub maker: Address,
	pub taker: Option<Address>,
	pub make: Asset,
	pub take: Asset,
	pub order_type: OrderType,
	pub salt: U256,
	pub start: Option<u64>,
	pub end: Option<u64>,
	pub data: OrderData,
	pub signature: Option<Bytes>,
	pub created_at: DateTime<Utc>,
	pub platform: Platform,
	pub make_price_usd: Option<Decimal>,
	pub take_price_usd: Option<Decimal>,
	pub make_usd: Option<Decimal>,
	pub take_usd: Option<Decimal>,
}

impl OrderVersion {
	pub fn is_bid(&self) -> bool {
		self.take.asset_type.is_nft()
	}

	pub fn with_usd_value(self, usd: OrderUsdValue) -> OrderVersion {
		OrderVersion {
			make_price_usd: usd.make_price_usd,
			take_price_usd: usd.take_price_usd,
			make_usd: usd.make_usd,
			take_usd: usd.take_usd,
			..self
		}
	}
}

/// Tradable remainder of the make side given nominal amounts, cumulative
/// fill, the fee schedule, an observed balance and cancellation state.
#[allow(clippy::too_many_arguments)]
pub fn calculate_make_stock(
	make_value: U256,
	take_value: U256,
	fill: U256,
	data: &OrderData,
	make_balance: U256,
	protocol_fee_bps: u64,
	fee_side: FeeSide,
	cancelled: bool,
) -> U256 {
	let (make, _take) = calculate_remaining(make_value, take_value, fill, data, cancelled);
	let fee = if fee_side == FeeSide::Make {
		U256::from(data.total_fee_bps(protocol_fee_bps))
	} else {
		U256::ZERO
	};

	let base = U256::from(10_000u64);
	// The balance must cover principal plus fees before it is compared to
	// the remaining make amount.
	let fee_adjusted_balance = mul_div(make_balance, base, fee + base);
	let rounded_make_balance = calculate_rounded_make_balance(
		make_value,
		take_value,
		fee_adjusted_balance,
	);
	make.min(rounded_make_balance)
}

/// Remaining (make, take) amounts after fill. Truncating division; the
/// remainder dust stays on the maker's side.
fn calculate_remaining(
	make_value: U256,
	take_value: U256,
	fill: U256,
	data: &OrderData,
	cancelled: bool,
) -> (U256, U256) {
	if cancelled {
		return (U256::ZERO, U256::ZERO);
	}
	if data.is_make_fill() {
		let make = make_value.saturating_sub(fill);
		let take = mul_div(make, take_value, make_value);
		(make, take)
	} else {
		let take = take_value.saturating_sub(fill);
		let make = mul_div(take, make_value, take_value);
		(make, take)
	}
}

/// Converts a balance to make units via the take side, reproducing the
/// two-step truncation of the settlement contract.
fn calculate_rounded_make_balance(
	make_value: U256,
	take_value: U256,
	make_balance: U256,
) -> U256 {
	let max_take = mul_div(make_balance, take_value, make_value);
	mul_div(make_value, max_take, take_value)
}

/// `a * b / d` with truncation, zero when `d` is zero. Falls back to a
/// quotient/remainder split when the product exceeds 256 bits.
fn mul_div(a: U256, b: U256, d: U256) -> U256 {
	if d.is_zero() {
		return U256::ZERO;
	}
	match a.checked_mul(b) {
		Some(product) => product / d,
		None => {
			let q = a / d;
			let r = a % d;
			q.saturating_mul(b)
				.saturating_add(r.saturating_mul(b) / d)
		}
	}
}
