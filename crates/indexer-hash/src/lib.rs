//! Order identity and signature-message hashing.
//!
//! The identity hash is the primary key every other indexer component
//! joins on, so all four protocol variants must be pure, deterministic
//! and stable. Structural asset hashing and the order-data ABI codec
//! live here as well, keeping `indexer-types` free of ABI machinery.

use thiserror::Error;

pub mod asset;
pub mod data;
pub mod order;

pub use asset::{asset_class, asset_hash, asset_type_hash};
pub use data::{data_v1_tag, data_v2_tag, data_version, decode_order_data, encode_order_data};
pub use order::{
	exchange_v1_hash, exchange_v2_hash, hash_key, hash_key_with_data, legacy_message,
	open_sea_v1_hash, protocol_hash, reconcile_match_hash, to_collection_form,
	CRYPTO_PUNKS_SALT,
};

/// Errors raised while hashing or transcoding order data.
#[derive(Debug, Error)]
pub enum HashError {
	/// The asset type cannot be expressed in the requested scheme.
	#[error("unsupported asset type: {0}")]
	UnsupportedAsset(String),
	/// The order data variant or byte encoding is not recognized.
	#[error("unsupported order data: {0}")]
	UnsupportedOrderData(String),
}
