//! Exchange-history events decoded from the blockchain log stream.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Asset, OrderVersion};

/// Delivery status of a decoded log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStatus {
	Pending,
	Confirmed,
	Reverted,
	Dropped,
	Inactive,
}

/// Which side of a match this order was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
	Left,
	Right,
}

/// A fill of this order against a counter-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSideMatch {
	pub hash: B256,
	pub counter_hash: B256,
	pub side: OrderSide,
	pub maker: Address,
	pub taker: Address,
	pub make: Asset,
	pub take: Asset,
	/// Amount filled by this match, measured on the order's fill basis.
	pub fill: U256,
	pub date: DateTime<Utc>,
}

/// An on-chain cancellation of this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancel {
	pub hash: B256,
	pub maker: Address,
	pub make: Option<Asset>,
	pub take: Option<Asset>,
	pub date: DateTime<Utc>,
}

/// An order created (or re-opened) directly on-chain; carries the
/// materialized version decoded from the transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainOrder {
	pub order: OrderVersion,
	pub date: DateTime<Utc>,
}

/// Closed set of exchange-history payloads folded by the reduction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeHistory {
	Match(OrderSideMatch),
	Cancel(OrderCancel),
	OnChainOrder(OnChainOrder),
}

impl ExchangeHistory {
	/// Identity hash of the order this payload belongs to.
	pub fn hash(&self) -> B256 {
		match self {
			ExchangeHistory::Match(m) => m.hash,
			ExchangeHistory::Cancel(c) => c.hash,
			ExchangeHistory::OnChainOrder(o) => o.order.hash,
		}
	}

	pub fn date(&self) -> DateTime<Utc> {
		match self {
			ExchangeHistory::Match(m) => m.date,
			ExchangeHistory::Cancel(c) => c.date,
			ExchangeHistory::OnChainOrder(o) => o.date,
		}
	}
}

/// One record of the append-only, multi-status log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
	pub id: Uuid,
	pub block_number: u64,
	pub log_index: u64,
	pub status: LogStatus,
	pub history: ExchangeHistory,
}

impl LogEvent {
	pub fn order_hash(&self) -> B256 {
		self.history.hash()
	}
}
