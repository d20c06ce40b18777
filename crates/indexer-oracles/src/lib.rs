//! External oracle interfaces and the enrichment services built on them.
//!
//! Balance and USD lookups are blocking calls to remote services, so every
//! wrapper here bounds them with a timeout and degrades to a conservative
//! default instead of blocking a reduction: a failed balance reads as zero
//! stock, a failed rate skips the price annotation.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use indexer_types::{Asset, AssetType, Order, OrderUsdValue};

/// Errors surfaced by oracle calls.
#[derive(Debug, Error)]
pub enum OracleError {
	/// The oracle could not produce a value.
	#[error("oracle value unavailable: {0}")]
	Unavailable(String),
	/// The call exceeded its deadline.
	#[error("oracle call timed out")]
	Timeout,
}

/// Balance-query capability for arbitrary (owner, asset) pairs.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
	async fn balance(&self, owner: Address, asset_type: &AssetType) -> Result<U256, OracleError>;
}

/// USD rate for one whole unit of an asset at a given instant.
#[async_trait]
pub trait UsdRateSource: Send + Sync {
	async fn usd_rate(
		&self,
		asset_type: &AssetType,
		at: DateTime<Utc>,
	) -> Result<Decimal, OracleError>;
}

/// Current foreign-exchange nonce of a maker, when one has been observed.
#[async_trait]
pub trait MakerNonceSource: Send + Sync {
	async fn maker_nonce(&self, maker: Address) -> Result<Option<u64>, OracleError>;
}

/// Decimal places of a fungible token.
#[async_trait]
pub trait TokenDecimalsSource: Send + Sync {
	async fn decimals(&self, token: Address) -> Option<u8>;
}

const DEFAULT_ERC20_DECIMALS: u8 = 18;

/// Make-side balance resolution per asset class.
pub struct AssetBalanceService {
	oracle: Arc<dyn BalanceOracle>,
	call_timeout: Duration,
}

impl AssetBalanceService {
	pub fn new(oracle: Arc<dyn BalanceOracle>, call_timeout: Duration) -> Self {
		Self {
			oracle,
			call_timeout,
		}
	}

	/// Balance backing the make side of an order.
	///
	/// Lazy assets are backed by their mintable amount and collection or
	/// placeholder types are unbounded; everything else asks the oracle.
	pub async fn make_balance(&self, order: &Order) -> U256 {
		match &order.make.asset_type {
			AssetType::Erc721Lazy { .. } => U256::from(1),
			AssetType::Erc1155Lazy { supply, .. } => *supply,
			AssetType::Collection { .. } | AssetType::GenerativeArt { .. } => U256::MAX,
			asset_type => {
				match tokio::time::timeout(
					self.call_timeout,
					self.oracle.balance(order.maker, asset_type),
				)
				.await
				{
					Ok(Ok(balance)) => balance,
					Ok(Err(e)) => {
						warn!(
							maker = %order.maker,
							hash = %order.hash,
							error = %e,
							"balance lookup failed, assuming zero"
						);
						U256::ZERO
					}
					Err(_) => {
						warn!(
							maker = %order.maker,
							hash = %order.hash,
							"balance lookup timed out, assuming zero"
						);
						U256::ZERO
					}
				}
			}
		}
	}
}

/// Scales raw 256-bit amounts into human units.
pub struct PriceNormalizer {
	decimals: Arc<dyn TokenDecimalsSource>,
}

impl PriceNormalizer {
	pub fn new(decimals: Arc<dyn TokenDecimalsSource>) -> Self {
		Self { decimals }
	}

	pub async fn normalize(&self, asset: &Asset) -> Decimal {
		let decimals = match &asset.asset_type {
			AssetType::Eth => DEFAULT_ERC20_DECIMALS,
			AssetType::Erc20 { token } => self
				.decimals
				.decimals(*token)
				.await
				.unwrap_or(DEFAULT_ERC20_DECIMALS),
			_ => 0,
		};
		to_decimal(asset.value, u32::from(decimals))
	}
}

fn to_decimal(value: U256, scale: u32) -> Decimal {
	match i128::try_from(value) {
		Ok(v) => Decimal::try_from_i128_with_scale(v, scale).unwrap_or(Decimal::MAX),
		Err(_) => {
			let scaled = value / U256::from(10u64).pow(U256::from(scale));
			i128::try_from(scaled)
				.ok()
				.and_then(|v| Decimal::try_from_i128_with_scale(v, 0).ok())
				.unwrap_or(Decimal::MAX)
		}
	}
}

/// USD valuation of an order's two sides "as of now".
pub struct PriceUpdateService {
	rates: Arc<dyn UsdRateSource>,
	normalizer: Arc<PriceNormalizer>,
	call_timeout: Duration,
}

impl PriceUpdateService {
	pub fn new(
		rates: Arc<dyn UsdRateSource>,
		normalizer: Arc<PriceNormalizer>,
		call_timeout: Duration,
	) -> Self {
		Self {
			rates,
			normalizer,
			call_timeout,
		}
	}

	/// USD values for (make, take); `None` when the payment-side rate is
	/// unavailable so callers keep their previous values.
	pub async fn assets_usd_value(
		&self,
		make: &Asset,
		take: &Asset,
		at: DateTime<Utc>,
	) -> Option<OrderUsdValue> {
		let make_value = self.normalizer.normalize(make).await;
		let take_value = self.normalizer.normalize(take).await;

		if take.asset_type.is_nft() {
			// Bid: the make side carries the payment asset.
			let rate = self.rate(&make.asset_type, at).await?;
			let make_usd = rate.checked_mul(make_value)?;
			let take_price_usd = if take_value.is_zero() {
				None
			} else {
				make_usd.checked_div(take_value)
			};
			Some(OrderUsdValue {
				make_usd: Some(make_usd),
				take_price_usd,
				make_price_usd: None,
				take_usd: None,
			})
		} else {
			// Sale (or currency swap): the take side carries the payment.
			let rate = self.rate(&take.asset_type, at).await?;
			let take_usd = rate.checked_mul(take_value)?;
			let make_price_usd = if make_value.is_zero() {
				None
			} else {
				take_usd.checked_div(make_value)
			};
			Some(OrderUsdValue {
				take_usd: Some(take_usd),
				make_price_usd,
				make_usd: None,
				take_price_usd: None,
			})
		}
	}

	async fn rate(&self, asset_type: &AssetType, at: DateTime<Utc>) -> Option<Decimal> {
		match tokio::time::timeout(self.call_timeout, self.rates.usd_rate(asset_type, at)).await {
			Ok(Ok(rate)) => Some(rate),
			Ok(Err(e)) => {
				warn!(error = %e, "usd rate lookup failed, skipping price update");
				None
			}
			Err(_) => {
				warn!("usd rate lookup timed out, skipping price update");
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use indexer_types::{OrderData, OrderType, Platform};

	struct FixedBalance(U256);

	#[async_trait]
	impl BalanceOracle for FixedBalance {
		async fn balance(
			&self,
			_owner: Address,
			_asset_type: &AssetType,
		) -> Result<U256, OracleError> {
			Ok(self.0)
		}
	}

	struct FailingBalance;

	#[async_trait]
	impl BalanceOracle for FailingBalance {
		async fn balance(
			&self,
			_owner: Address,
			_asset_type: &AssetType,
		) -> Result<U256, OracleError> {
			Err(OracleError::Unavailable("node down".into()))
		}
	}

	struct NoDecimals;

	#[async_trait]
	impl TokenDecimalsSource for NoDecimals {
		async fn decimals(&self, _token: Address) -> Option<u8> {
			None
		}
	}

	struct FixedRate(Decimal);

	#[async_trait]
	impl UsdRateSource for FixedRate {
		async fn usd_rate(
			&self,
			_asset_type: &AssetType,
			_at: DateTime<Utc>,
		) -> Result<Decimal, OracleError> {
			Ok(self.0)
		}
	}

	fn order_with_make(asset_type: AssetType) -> Order {
		let now = Utc::now();
		Order {
			maker: Address::repeat_byte(0xaa),
			taker: None,
			make: Asset::new(asset_type, U256::from(1)),
			take: Asset::new(
				AssetType::Erc20 {
					token: Address::repeat_byte(2),
				},
				U256::from(5),
			),
			order_type: OrderType::RaribleV2,
			fill: U256::ZERO,
			cancelled: false,
			make_stock: U256::ZERO,
			salt: U256::from(1),
			start: None,
			end: None,
			data: OrderData::RaribleV2DataV1 {
				payouts: vec![],
				origin_fees: vec![],
			},
			signature: None,
			created_at: now,
			last_update_at: now,
			pending: vec![],
			make_price_usd: None,
			take_price_usd: None,
			make_usd: None,
			take_usd: None,
			price_history: vec![],
			platform: Platform::Rarible,
			hash: alloy_primitives::B256::repeat_byte(1),
			version: None,
		}
	}

	#[tokio::test]
	async fn test_lazy_assets_skip_the_oracle() {
		let service = AssetBalanceService::new(Arc::new(FailingBalance), Duration::from_secs(1));

		let lazy_721 = order_with_make(AssetType::Erc721Lazy {
			token: Address::repeat_byte(1),
			token_id: U256::from(1),
		});
		assert_eq!(service.make_balance(&lazy_721).await, U256::from(1));

		let lazy_1155 = order_with_make(AssetType::Erc1155Lazy {
			token: Address::repeat_byte(1),
			token_id: U256::from(1),
			supply: U256::from(40),
		});
		assert_eq!(service.make_balance(&lazy_1155).await, U256::from(40));

		let collection = order_with_make(AssetType::Collection {
			token: Address::repeat_byte(1),
		});
		assert_eq!(service.make_balance(&collection).await, U256::MAX);
	}

	#[tokio::test]
	async fn test_failed_balance_degrades_to_zero() {
		let service = AssetBalanceService::new(Arc::new(FailingBalance), Duration::from_secs(1));
		let order = order_with_make(AssetType::Erc20 {
			token: Address::repeat_byte(1),
		});
		assert_eq!(service.make_balance(&order).await, U256::ZERO);
	}

	#[tokio::test]
	async fn test_oracle_balance_is_used() {
		let service = AssetBalanceService::new(
			Arc::new(FixedBalance(U256::from(75))),
			Duration::from_secs(1),
		);
		let order = order_with_make(AssetType::Erc20 {
			token: Address::repeat_byte(1),
		});
		assert_eq!(service.make_balance(&order).await, U256::from(75));
	}

	#[tokio::test]
	async fn test_normalizer_scales_by_decimals() {
		let normalizer = PriceNormalizer::new(Arc::new(NoDecimals));
		let eth = Asset::new(AssetType::Eth, U256::from(1_500_000_000_000_000_000u64));
		assert_eq!(normalizer.normalize(&eth).await, Decimal::new(15, 1));

		let nft = Asset::new(
			AssetType::Erc1155 {
				token: Address::repeat_byte(1),
				token_id: U256::from(1),
			},
			U256::from(3),
		);
		assert_eq!(normalizer.normalize(&nft).await, Decimal::from(3));
	}

	#[tokio::test]
	async fn test_sale_valuation_prices_the_take_side() {
		let normalizer = Arc::new(PriceNormalizer::new(Arc::new(NoDecimals)));
		let service = PriceUpdateService::new(
			Arc::new(FixedRate(Decimal::from(2))),
			normalizer,
			Duration::from_secs(1),
		);

		let make = Asset::new(
			AssetType::Erc721 {
				token: Address::repeat_byte(1),
				token_id: U256::from(1),
			},
			U256::from(1),
		);
		let take = Asset::new(AssetType::Eth, U256::from(2_000_000_000_000_000_000u64));

		let usd = service
			.assets_usd_value(&make, &take, Utc::now())
			.await
			.unwrap();
		assert_eq!(usd.take_usd, Some(Decimal::from(4)));
		assert_eq!(usd.make_price_usd, Some(Decimal::from(4)));
		assert_eq!(usd.make_usd, None);
	}
}
