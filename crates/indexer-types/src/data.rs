//! Per-protocol order data: fee and payout schedules.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A fee or payout receiver with its share in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
	pub account: Address,
	pub value: u64,
}

impl Part {
	pub fn new(account: Address, value: u64) -> Self {
		Self { account, value }
	}
}

/// Fee/payout schedule attached to an order, one variant per protocol
/// version. The variant must match the order's protocol type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderData {
	/// Legacy V1 schedule: a single fee in basis points.
	Legacy { fee: u64 },
	/// V2 schedule: origin fees plus payouts.
	RaribleV2DataV1 {
		payouts: Vec<Part>,
		origin_fees: Vec<Part>,
	},
	/// V2 schedule with the fill basis flag: when `is_make_fill` is set,
	/// fill is measured on the make side instead of the take side.
	RaribleV2DataV2 {
		payouts: Vec<Part>,
		origin_fees: Vec<Part>,
		is_make_fill: bool,
	},
	/// Foreign-exchange passthrough; verified by a third-party contract
	/// and carrying no protocol fee.
	OpenSeaV1(OpenSeaV1Data),
	/// Marker for orders synthesized from punk marketplace events.
	CryptoPunks,
}

impl OrderData {
	/// Whether fill accumulates on the make side.
	pub fn is_make_fill(&self) -> bool {
		matches!(
			self,
			OrderData::RaribleV2DataV2 {
				is_make_fill: true,
				..
			}
		)
	}

	/// Total fee in basis points charged on the fee-bearing side.
	///
	/// Legacy orders carry their own flat fee; V2 orders pay the protocol
	/// fee plus all origin fees; foreign and punk orders pay nothing here.
	pub fn total_fee_bps(&self, protocol_fee_bps: u64) -> u64 {
		match self {
			OrderData::Legacy { fee } => *fee,
			OrderData::RaribleV2DataV1 { origin_fees, .. }
			| OrderData::RaribleV2DataV2 { origin_fees, .. } => origin_fees
				.iter()
				.fold(protocol_fee_bps, |acc, part| acc + part.value),
			OrderData::OpenSeaV1(_) | OrderData::CryptoPunks => 0,
		}
	}

	/// The maker's foreign-exchange nonce, when this data carries one.
	pub fn open_sea_nonce(&self) -> Option<u64> {
		match self {
			OrderData::OpenSeaV1(data) => data.nonce,
			_ => None,
		}
	}
}

/// Wire-format order data of the foreign (Wyvern-style) exchange.
///
/// Field set and ordering follow that exchange's own hashing scheme; the
/// hash must byte-match what its contract verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSeaV1Data {
	pub exchange: Address,
	pub maker_relayer_fee: U256,
	pub taker_relayer_fee: U256,
	pub maker_protocol_fee: U256,
	pub taker_protocol_fee: U256,
	pub fee_recipient: Address,
	pub fee_method: OpenSeaFeeMethod,
	pub side: OpenSeaSide,
	pub sale_kind: OpenSeaSaleKind,
	pub how_to_call: OpenSeaHowToCall,
	pub call_data: Bytes,
	pub replacement_pattern: Bytes,
	pub static_target: Address,
	pub static_extra_data: Bytes,
	pub extra: U256,
	pub nonce: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSeaFeeMethod {
	ProtocolFee,
	SplitFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSeaSide {
	Buy,
	Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSeaSaleKind {
	FixedPrice,
	DutchAuction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSeaHowToCall {
	Call,
	DelegateCall,
}

impl OpenSeaFeeMethod {
	pub fn code(&self) -> u8 {
		*self as u8
	}
}

impl OpenSeaSide {
	pub fn code(&self) -> u8 {
		*self as u8
	}
}

impl OpenSeaSaleKind {
	pub fn code(&self) -> u8 {
		*self as u8
	}
}

impl OpenSeaHowToCall {
	pub fn code(&self) -> u8 {
		*self as u8
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_total_fee_bps() {
		assert_eq!(OrderData::Legacy { fee: 250 }.total_fee_bps(3000), 250);

		let data = OrderData::RaribleV2DataV1 {
			payouts: vec![],
			origin_fees: vec![
				Part::new(Address::repeat_byte(1), 1500),
				Part::new(Address::repeat_byte(2), 1500),
			],
		};
		assert_eq!(data.total_fee_bps(0), 3000);
		assert_eq!(data.total_fee_bps(3000), 6000);

		assert_eq!(OrderData::CryptoPunks.total_fee_bps(3000), 0);
	}

	#[test]
	fn test_make_fill_flag() {
		let v1 = OrderData::RaribleV2DataV1 {
			payouts: vec![],
			origin_fees: vec![],
		};
		assert!(!v1.is_make_fill());

		let v2 = OrderData::RaribleV2DataV2 {
			payouts: vec![],
			origin_fees: vec![],
			is_make_fill: true,
		};
		assert!(v2.is_make_fill());
	}
}
