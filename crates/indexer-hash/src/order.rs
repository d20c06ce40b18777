//! Per-protocol order identity and signature-message hashes.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use indexer_types::{Asset, AssetType, OrderData, OrderType};

use crate::{
	asset::{asset_hash, asset_type_hash},
	data::{data_version, encode_order_data},
	HashError,
};

/// Well-known salt of orders synthesized from punk marketplace events.
pub const CRYPTO_PUNKS_SALT: U256 = U256::ZERO;

fn order_typehash() -> B256 {
	keccak256(
		b"Order(address maker,Asset makeAsset,address taker,Asset takeAsset,uint256 salt,\
uint256 start,uint256 end,bytes4 dataType,bytes data)\
Asset(AssetType assetType,uint256 value)AssetType(bytes4 assetClass,bytes data)",
	)
}

/// Identity hash: the primary key all indexer components join on.
pub fn hash_key(maker: Address, make_type: &AssetType, take_type: &AssetType, salt: U256) -> B256 {
	let encoded = (
		maker,
		asset_type_hash(make_type),
		asset_type_hash(take_type),
		salt,
	)
		.abi_encode();
	keccak256(encoded)
}

/// Identity hash with the data commitment appended for make-fill orders.
///
/// Orders carrying the V2 data layout occupy a distinct key space so that
/// changing the fill basis can never collide with a V1-keyed order.
pub fn hash_key_with_data(
	maker: Address,
	make_type: &AssetType,
	take_type: &AssetType,
	salt: U256,
	data: &OrderData,
) -> Result<B256, HashError> {
	match data {
		OrderData::RaribleV2DataV2 { .. } => {
			let encoded_data = encode_order_data(data)?;
			let encoded = (
				maker,
				asset_type_hash(make_type),
				asset_type_hash(take_type),
				salt,
				keccak256(encoded_data),
			)
				.abi_encode();
			Ok(keccak256(encoded))
		}
		_ => Ok(hash_key(maker, make_type, take_type, salt)),
	}
}

/// Signature-message hash for the order's protocol variant.
#[allow(clippy::too_many_arguments)]
pub fn protocol_hash(
	maker: Address,
	make: &Asset,
	taker: Option<Address>,
	take: &Asset,
	salt: U256,
	start: Option<u64>,
	end: Option<u64>,
	data: &OrderData,
	order_type: OrderType,
) -> Result<B256, HashError> {
	match order_type {
		OrderType::RaribleV1 => exchange_v1_hash(maker, make, take, salt, data),
		OrderType::RaribleV2 => exchange_v2_hash(maker, make, taker, take, salt, start, end, data),
		OrderType::OpenSeaV1 => {
			open_sea_v1_hash(maker, make, taker, take, salt, start, end, data)
		}
		OrderType::CryptoPunks => Ok(hash_key(
			maker,
			&make.asset_type,
			&take.asset_type,
			CRYPTO_PUNKS_SALT,
		)),
	}
}

/// Legacy (V1) hash over the simplified asset scheme.
///
/// Only assets representable in the legacy scheme are accepted; anything
/// else fails with a typed error rather than being coerced.
pub fn exchange_v1_hash(
	maker: Address,
	make: &Asset,
	take: &Asset,
	salt: U256,
	data: &OrderData,
) -> Result<B256, HashError> {
	let make_legacy = make.asset_type.to_legacy().ok_or_else(|| {
		HashError::UnsupportedAsset(format!("make asset {:?} has no legacy form", make.asset_type))
	})?;
	let take_legacy = take.asset_type.to_legacy().ok_or_else(|| {
		HashError::UnsupportedAsset(format!("take asset {:?} has no legacy form", take.asset_type))
	})?;
	let fee = match data {
		OrderData::Legacy { fee } => *fee,
		_ => {
			return Err(HashError::UnsupportedOrderData(
				"legacy hash requires legacy order data".into(),
			))
		}
	};

	let order_key = (
		maker,
		salt,
		(
			make_legacy.token,
			make_legacy.token_id,
			U256::from(make_legacy.class.code()),
		),
		(
			take_legacy.token,
			take_legacy.token_id,
			U256::from(take_legacy.class.code()),
		),
	);
	let encoded = (order_key, make.value, take.value, U256::from(fee)).abi_encode();
	Ok(keccak256(encoded))
}

/// Hex form of the legacy hash, as signed by wallets in personal-sign flows.
pub fn legacy_message(
	maker: Address,
	make: &Asset,
	take: &Asset,
	salt: U256,
	data: &OrderData,
) -> Result<String, HashError> {
	Ok(hex::encode(exchange_v1_hash(maker, make, take, salt, data)?))
}

/// EIP-712 struct hash of a V2 order.
#[allow(clippy::too_many_arguments)]
pub fn exchange_v2_hash(
	maker: Address,
	make: &Asset,
	taker: Option<Address>,
	take: &Asset,
	salt: U256,
	start: Option<u64>,
	end: Option<u64>,
	data: &OrderData,
) -> Result<B256, HashError> {
	let version = data_version(data).ok_or_else(|| {
		HashError::UnsupportedOrderData("V2 hash requires a versioned data layout".into())
	})?;
	let encoded_data = encode_order_data(data)?;
	let encoded = (
		order_typehash(),
		maker,
		asset_hash(make),
		taker.unwrap_or(Address::ZERO),
		asset_hash(take),
		salt,
		U256::from(start.unwrap_or(0)),
		U256::from(end.unwrap_or(0)),
		version,
		keccak256(encoded_data),
	)
		.abi_encode();
	Ok(keccak256(encoded))
}

/// Hash in the foreign exchange's own wire format.
///
/// The byte layout must match what that exchange's contract verifies, so
/// fields are concatenated in its exact order rather than ABI-encoded.
#[allow(clippy::too_many_arguments)]
pub fn open_sea_v1_hash(
	maker: Address,
	make: &Asset,
	taker: Option<Address>,
	take: &Asset,
	salt: U256,
	start: Option<u64>,
	end: Option<u64>,
	data: &OrderData,
) -> Result<B256, HashError> {
	let os = match data {
		OrderData::OpenSeaV1(os) => os,
		_ => {
			return Err(HashError::UnsupportedOrderData(
				"foreign hash requires foreign order data".into(),
			))
		}
	};
	let nft_type = if make.asset_type.is_nft() {
		&make.asset_type
	} else if take.asset_type.is_nft() {
		&take.asset_type
	} else {
		return Err(HashError::UnsupportedAsset(
			"no NFT side in exchange pair".into(),
		));
	};
	let payment = if !make.asset_type.is_nft() {
		make
	} else if !take.asset_type.is_nft() {
		take
	} else {
		return Err(HashError::UnsupportedAsset(
			"no payment side in exchange pair".into(),
		));
	};

	let mut buf: Vec<u8> = Vec::new();
	buf.extend_from_slice(os.exchange.as_slice());
	buf.extend_from_slice(maker.as_slice());
	buf.extend_from_slice(taker.unwrap_or(Address::ZERO).as_slice());
	buf.extend_from_slice(&os.maker_relayer_fee.to_be_bytes::<32>());
	buf.extend_from_slice(&os.taker_relayer_fee.to_be_bytes::<32>());
	buf.extend_from_slice(&os.maker_protocol_fee.to_be_bytes::<32>());
	buf.extend_from_slice(&os.taker_protocol_fee.to_be_bytes::<32>());
	buf.extend_from_slice(os.fee_recipient.as_slice());
	buf.push(os.fee_method.code());
	buf.push(os.side.code());
	buf.push(os.sale_kind.code());
	buf.extend_from_slice(nft_type.token().as_slice());
	buf.push(os.how_to_call.code());
	buf.extend_from_slice(&os.call_data);
	buf.extend_from_slice(&os.replacement_pattern);
	buf.extend_from_slice(os.static_target.as_slice());
	buf.extend_from_slice(&os.static_extra_data);
	buf.extend_from_slice(payment.asset_type.token().as_slice());
	buf.extend_from_slice(&payment.value.to_be_bytes::<32>());
	buf.extend_from_slice(&os.extra.to_be_bytes::<32>());
	buf.extend_from_slice(&U256::from(start.unwrap_or(0)).to_be_bytes::<32>());
	buf.extend_from_slice(&U256::from(end.unwrap_or(0)).to_be_bytes::<32>());
	buf.extend_from_slice(&salt.to_be_bytes::<32>());
	Ok(keccak256(buf))
}

/// Widens a narrow NFT type to its collection-scoped form.
pub fn to_collection_form(asset_type: &AssetType) -> AssetType {
	match asset_type {
		AssetType::Erc721 { token, .. }
		| AssetType::Erc1155 { token, .. }
		| AssetType::Erc721Lazy { token, .. }
		| AssetType::Erc1155Lazy { token, .. } => AssetType::Collection { token: *token },
		AssetType::CryptoPunks { market, .. } => AssetType::Collection { token: *market },
		other => other.clone(),
	}
}

/// Key of a stored order reconciled against the asset types observed in an
/// on-chain match.
///
/// A collection offer commits to the collection-level type, while the match
/// event reports the narrow token that actually traded; each side scoped to
/// a collection in the stored order is widened back before hashing.
#[allow(clippy::too_many_arguments)]
pub fn reconcile_match_hash(
	maker: Address,
	order_make: &AssetType,
	order_take: &AssetType,
	observed_make: &AssetType,
	observed_take: &AssetType,
	salt: U256,
	data: &OrderData,
) -> Result<B256, HashError> {
	let make = if matches!(order_make, AssetType::Collection { .. }) {
		to_collection_form(observed_make)
	} else {
		observed_make.clone()
	};
	let take = if matches!(order_take, AssetType::Collection { .. }) {
		to_collection_form(observed_take)
	} else {
		observed_take.clone()
	};
	hash_key_with_data(maker, &make, &take, salt, data)
}
