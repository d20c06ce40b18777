//! Downstream notification bus for completed reductions.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::Order;

/// Events published by the indexer after a successful state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexerEvent {
	/// A reduction completed and the snapshot was persisted.
	OrderUpdated { order: Box<Order> },
}

pub struct EventBus {
	sender: broadcast::Sender<IndexerEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<IndexerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event; absence of subscribers is not an error.
	pub fn publish(&self, event: IndexerEvent) {
		let _ = self.sender.send(event);
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
