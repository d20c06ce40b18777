//! Structural hashing of asset types and assets.
//!
//! Follows the typed commitment scheme of the V2 exchange: an asset type
//! commits to `(assetClass, keccak256(classData))`, so the hash is
//! injective over each variant's defining fields.

use alloy_primitives::{keccak256, FixedBytes, B256};
use alloy_sol_types::SolValue;
use indexer_types::{Asset, AssetType};

fn class_id(name: &str) -> FixedBytes<4> {
	FixedBytes::<4>::from_slice(&keccak256(name.as_bytes())[..4])
}

fn asset_type_typehash() -> B256 {
	keccak256(b"AssetType(bytes4 assetClass,bytes data)")
}

fn asset_typehash() -> B256 {
	keccak256(b"Asset(AssetType assetType,uint256 value)")
}

/// bytes4 class selector of an asset type.
pub fn asset_class(asset_type: &AssetType) -> FixedBytes<4> {
	match asset_type {
		AssetType::Eth => class_id("ETH"),
		AssetType::Erc20 { .. } => class_id("ERC20"),
		AssetType::Erc721 { .. } => class_id("ERC721"),
		AssetType::Erc1155 { .. } => class_id("ERC1155"),
		AssetType::Erc721Lazy { .. } => class_id("ERC721_LAZY"),
		AssetType::Erc1155Lazy { .. } => class_id("ERC1155_LAZY"),
		AssetType::Collection { .. } => class_id("COLLECTION"),
		AssetType::CryptoPunks { .. } => class_id("CRYPTO_PUNKS"),
		AssetType::GenerativeArt { .. } => class_id("GEN_ART"),
	}
}

/// ABI encoding of the variant's defining fields.
fn class_data(asset_type: &AssetType) -> Vec<u8> {
	match asset_type {
		AssetType::Eth => Vec::new(),
		AssetType::Erc20 { token }
		| AssetType::Collection { token }
		| AssetType::GenerativeArt { token } => token.abi_encode(),
		AssetType::Erc721 { token, token_id }
		| AssetType::Erc1155 { token, token_id }
		| AssetType::Erc721Lazy { token, token_id } => (*token, *token_id).abi_encode(),
		AssetType::Erc1155Lazy {
			token,
			token_id,
			supply,
		} => (*token, *token_id, *supply).abi_encode(),
		AssetType::CryptoPunks { market, punk_id } => (*market, *punk_id).abi_encode(),
	}
}

/// Structural hash of an asset type.
pub fn asset_type_hash(asset_type: &AssetType) -> B256 {
	let encoded = (
		asset_type_typehash(),
		asset_class(asset_type),
		keccak256(class_data(asset_type)),
	)
		.abi_encode();
	keccak256(encoded)
}

/// Structural hash of an asset (type plus value).
pub fn asset_hash(asset: &Asset) -> B256 {
	let encoded = (asset_typehash(), asset_type_hash(&asset.asset_type), asset.value).abi_encode();
	keccak256(encoded)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, U256};

	#[test]
	fn test_hash_is_deterministic() {
		let ty = AssetType::Erc721 {
			token: Address::repeat_byte(0x11),
			token_id: U256::from(42),
		};
		assert_eq!(asset_type_hash(&ty), asset_type_hash(&ty.clone()));
	}

	#[test]
	fn test_hash_distinguishes_variants() {
		let token = Address::repeat_byte(0x11);
		let token_id = U256::from(42);
		let erc721 = AssetType::Erc721 { token, token_id };
		let erc1155 = AssetType::Erc1155 { token, token_id };
		let lazy = AssetType::Erc721Lazy { token, token_id };
		let collection = AssetType::Collection { token };

		let hashes = [
			asset_type_hash(&erc721),
			asset_type_hash(&erc1155),
			asset_type_hash(&lazy),
			asset_type_hash(&collection),
			asset_type_hash(&AssetType::Eth),
		];
		for (i, a) in hashes.iter().enumerate() {
			for b in hashes.iter().skip(i + 1) {
				assert_ne!(a, b);
			}
		}
	}

	#[test]
	fn test_hash_distinguishes_fields() {
		let token = Address::repeat_byte(0x11);
		let a = AssetType::Erc721 {
			token,
			token_id: U256::from(1),
		};
		let b = AssetType::Erc721 {
			token,
			token_id: U256::from(2),
		};
		assert_ne!(asset_type_hash(&a), asset_type_hash(&b));
	}

	#[test]
	fn test_asset_hash_includes_value() {
		let ty = AssetType::Erc20 {
			token: Address::repeat_byte(0x22),
		};
		let one = Asset::new(ty.clone(), U256::from(1));
		let two = Asset::new(ty, U256::from(2));
		assert_ne!(asset_hash(&one), asset_hash(&two));
	}
}
