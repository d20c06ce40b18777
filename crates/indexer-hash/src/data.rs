//! ABI codec for V2 order data payloads.
//!
//! Encoding is canonical; decoding additionally accepts the historical
//! mis-encoded V1 layout that shipped in early exchange transactions
//! (parameter-style tuple instead of a single struct value).

use alloy_primitives::{aliases::U96, keccak256, FixedBytes, U256};
use alloy_sol_types::{sol, SolValue};
use indexer_types::{OrderData, Part};

use crate::HashError;

sol! {
	struct PartSol {
		address account;
		uint96 value;
	}

	struct OrderDataV1Sol {
		PartSol[] payouts;
		PartSol[] originFees;
	}

	struct OrderDataV2Sol {
		PartSol[] payouts;
		PartSol[] originFees;
		bool isMakeFill;
	}
}

/// bytes4 tag of the V1 data layout.
pub fn data_v1_tag() -> FixedBytes<4> {
	FixedBytes::<4>::from_slice(&keccak256(b"V1")[..4])
}

/// bytes4 tag of the V2 data layout.
pub fn data_v2_tag() -> FixedBytes<4> {
	FixedBytes::<4>::from_slice(&keccak256(b"V2")[..4])
}

/// Canonical single-struct encoding starts with this offset word.
const CANONICAL_V1_PREFIX: U256 = U256::from_limbs([0x20, 0, 0, 0]);
/// The mis-encoded historical layout's first head word.
const WRONG_V1_PREFIX: U256 = U256::from_limbs([0x40, 0, 0, 0]);

fn to_part_sol(part: &Part) -> PartSol {
	PartSol {
		account: part.account,
		value: U96::from(part.value),
	}
}

fn from_part_sol(part: &PartSol) -> Result<Part, HashError> {
	let value = u64::try_from(part.value)
		.map_err(|_| HashError::UnsupportedOrderData("part value exceeds u64".into()))?;
	Ok(Part::new(part.account, value))
}

/// Wire version tag of a data variant, when one exists.
pub fn data_version(data: &OrderData) -> Option<FixedBytes<4>> {
	match data {
		OrderData::RaribleV2DataV1 { .. } => Some(data_v1_tag()),
		OrderData::RaribleV2DataV2 { .. } => Some(data_v2_tag()),
		_ => None,
	}
}

/// Canonical ABI encoding of a V2 data payload.
pub fn encode_order_data(data: &OrderData) -> Result<Vec<u8>, HashError> {
	match data {
		OrderData::RaribleV2DataV1 {
			payouts,
			origin_fees,
		} => Ok(OrderDataV1Sol {
			payouts: payouts.iter().map(to_part_sol).collect(),
			originFees: origin_fees.iter().map(to_part_sol).collect(),
		}
		.abi_encode()),
		OrderData::RaribleV2DataV2 {
			payouts,
			origin_fees,
			is_make_fill,
		} => Ok(OrderDataV2Sol {
			payouts: payouts.iter().map(to_part_sol).collect(),
			originFees: origin_fees.iter().map(to_part_sol).collect(),
			isMakeFill: *is_make_fill,
		}
		.abi_encode()),
		other => Err(HashError::UnsupportedOrderData(format!(
			"no wire encoding for {:?}",
			other
		))),
	}
}

/// Decodes a versioned data payload from its on-chain bytes.
pub fn decode_order_data(version: FixedBytes<4>, bytes: &[u8]) -> Result<OrderData, HashError> {
	if version == data_v1_tag() {
		decode_v1(bytes)
	} else if version == data_v2_tag() {
		let decoded = OrderDataV2Sol::abi_decode(bytes, false)
			.map_err(|e| HashError::UnsupportedOrderData(e.to_string()))?;
		Ok(OrderData::RaribleV2DataV2 {
			payouts: parts(&decoded.payouts)?,
			origin_fees: parts(&decoded.originFees)?,
			is_make_fill: decoded.isMakeFill,
		})
	} else {
		Err(HashError::UnsupportedOrderData(format!(
			"unknown data version 0x{}",
			hex::encode(version)
		)))
	}
}

fn decode_v1(bytes: &[u8]) -> Result<OrderData, HashError> {
	if bytes.len() < 32 {
		return Err(HashError::UnsupportedOrderData(
			"data payload shorter than one word".into(),
		));
	}
	let prefix = U256::from_be_slice(&bytes[..32]);
	let (payouts, origin_fees) = if prefix == CANONICAL_V1_PREFIX {
		let decoded = OrderDataV1Sol::abi_decode(bytes, false)
			.map_err(|e| HashError::UnsupportedOrderData(e.to_string()))?;
		(decoded.payouts, decoded.originFees)
	} else if prefix == WRONG_V1_PREFIX {
		let (payouts, origin_fees) =
			<(Vec<PartSol>, Vec<PartSol>)>::abi_decode_params(bytes, false)
				.map_err(|e| HashError::UnsupportedOrderData(e.to_string()))?;
		(payouts, origin_fees)
	} else {
		return Err(HashError::UnsupportedOrderData(format!(
			"unsupported data encode prefix 0x{:x}",
			prefix
		)));
	};
	Ok(OrderData::RaribleV2DataV1 {
		payouts: parts(&payouts)?,
		origin_fees: parts(&origin_fees)?,
	})
}

fn parts(raw: &[PartSol]) -> Result<Vec<Part>, HashError> {
	raw.iter().map(from_part_sol).collect()
}
