//! Nonce-based bulk invalidation for the foreign exchange.
//!
//! A maker bumping its on-chain nonce mass-cancels every order signed
//! under the previous value. The listener only fans out re-reductions;
//! the cancellation itself happens inside the reduce path, which checks
//! each order's embedded nonce against the maker's current one.

use std::sync::Arc;

use alloy_primitives::Address;
use tracing::info;

use indexer_storage::OrderRepository;

use crate::{OrderUpdateService, ReduceError};

pub struct ChangeNonceListener {
	orders: Arc<dyn OrderRepository>,
	updater: Arc<OrderUpdateService>,
	nonce_offset: u64,
}

impl ChangeNonceListener {
	pub fn new(
		orders: Arc<dyn OrderRepository>,
		updater: Arc<OrderUpdateService>,
		nonce_offset: u64,
	) -> Self {
		Self {
			orders,
			updater,
			nonce_offset,
		}
	}

	/// Re-reduces exactly the orders invalidated by the maker's new
	/// nonce; returns how many were updated.
	pub async fn on_new_maker_nonce(
		&self,
		maker: Address,
		new_nonce: u64,
	) -> Result<usize, ReduceError> {
		let fixed_nonce = new_nonce.saturating_add(self.nonce_offset);
		if fixed_nonce == 0 {
			return Err(ReduceError::InvalidNonce(fixed_nonce));
		}
		info!(maker = %maker, nonce = fixed_nonce, "new maker nonce detected");

		let hashes = self
			.orders
			.find_open_sea_hashes_by_maker_and_nonce(maker, fixed_nonce - 1, fixed_nonce)
			.await?;

		let mut updated = 0;
		for hash in hashes {
			if self.updater.update(hash).await?.is_some() {
				updated += 1;
			}
		}
		Ok(updated)
	}
}
