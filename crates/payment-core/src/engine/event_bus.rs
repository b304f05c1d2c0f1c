//! Broadcast channel for payment progress events.
//!
//! Every state machine publishes here; any number of observers subscribe.
//! Publishing never blocks and succeeds with no subscribers attached.

use payment_types::PaymentEvent;
use tokio::sync::broadcast;

/// Event bus for progress events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<PaymentEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event and returns the number of subscribers reached.
	pub fn publish(&self, event: PaymentEvent) -> usize {
		self.sender.send(event).unwrap_or(0)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
