//! Asset model: typed descriptors of what is being exchanged.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Closed set of asset classes tradable on the exchange.
///
/// Two asset types are equal iff their structural hashes are equal; the
/// hashing itself lives in `indexer-hash` so that this crate stays free of
/// ABI machinery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
	/// The chain's native coin.
	Eth,
	/// A fungible ERC-20 token.
	Erc20 { token: Address },
	/// A minted ERC-721 token.
	Erc721 { token: Address, token_id: U256 },
	/// A minted ERC-1155 token.
	Erc1155 { token: Address, token_id: U256 },
	/// An ERC-721 token that is minted lazily on first transfer.
	Erc721Lazy { token: Address, token_id: U256 },
	/// An ERC-1155 token that is minted lazily on first transfer.
	Erc1155Lazy {
		token: Address,
		token_id: U256,
		supply: U256,
	},
	/// A collection-wide offer: any token of the collection matches.
	Collection { token: Address },
	/// A punk traded on its own marketplace contract.
	CryptoPunks { market: Address, punk_id: U256 },
	/// Non-transactable placeholder, never matched on-chain.
	GenerativeArt { token: Address },
}

impl AssetType {
	/// Whether this side of an exchange carries the NFT.
	pub fn is_nft(&self) -> bool {
		!matches!(self, AssetType::Eth | AssetType::Erc20 { .. })
	}

	/// Contract address backing the asset; zero for the native coin.
	pub fn token(&self) -> Address {
		match self {
			AssetType::Eth => Address::ZERO,
			AssetType::Erc20 { token }
			| AssetType::Erc721 { token, .. }
			| AssetType::Erc1155 { token, .. }
			| AssetType::Erc721Lazy { token, .. }
			| AssetType::Erc1155Lazy { token, .. }
			| AssetType::Collection { token }
			| AssetType::GenerativeArt { token } => *token,
			AssetType::CryptoPunks { market, .. } => *market,
		}
	}

	/// Projection onto the legacy (V1) asset scheme.
	///
	/// Lazy, collection and placeholder types have no legacy form.
	pub fn to_legacy(&self) -> Option<LegacyAssetType> {
		let (token, token_id, class) = match self {
			AssetType::Eth => (Address::ZERO, U256::ZERO, LegacyAssetClass::Eth),
			AssetType::Erc20 { token } => (*token, U256::ZERO, LegacyAssetClass::Erc20),
			AssetType::Erc721 { token, token_id } => (*token, *token_id, LegacyAssetClass::Erc721),
			AssetType::Erc1155 { token, token_id } => {
				(*token, *token_id, LegacyAssetClass::Erc1155)
			}
			_ => return None,
		};
		Some(LegacyAssetType {
			token,
			token_id,
			class,
		})
	}
}

/// Asset classes representable by the legacy (V1) exchange contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyAssetClass {
	Eth,
	Erc20,
	Erc1155,
	Erc721,
}

impl LegacyAssetClass {
	/// Numeric code used by the legacy contract's tuple encoding.
	pub fn code(&self) -> u8 {
		match self {
			LegacyAssetClass::Eth => 0,
			LegacyAssetClass::Erc20 => 1,
			LegacyAssetClass::Erc1155 => 2,
			LegacyAssetClass::Erc721 => 3,
		}
	}
}

/// Simplified asset descriptor in the legacy contract's scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAssetType {
	pub token: Address,
	pub token_id: U256,
	pub class: LegacyAssetClass,
}

/// An asset type together with a 256-bit quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
	pub asset_type: AssetType,
	pub value: U256,
}

impl Asset {
	pub fn new(asset_type: AssetType, value: U256) -> Self {
		Self { asset_type, value }
	}
}
