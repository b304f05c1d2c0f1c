//! Handlers that drive one payment through a settlement protocol.
//!
//! Each handler owns the state record of the payment it executes, validates
//! every phase change against the transition tables and publishes progress on
//! the event bus. Cancellation is per run: callers pass the [`StopHandle`] of
//! the payment they may want to stop.

pub mod bridge;
pub mod order;

pub use bridge::{BridgeSettings, BridgeTransferHandler};
pub use order::SignedOrderHandler;

use crate::monitoring::StopHandle;
use crate::PaymentError;

/// Fails with [`PaymentError::Cancelled`] once `stop` has been triggered.
pub(crate) fn ensure_running(stop: &StopHandle) -> Result<(), PaymentError> {
	if stop.is_stopped() {
		return Err(PaymentError::Cancelled);
	}
	Ok(())
}
