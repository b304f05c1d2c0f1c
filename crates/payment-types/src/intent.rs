//! Transfer intents supplied by callers.
//!
//! An intent describes what the caller wants moved and where. It is consumed
//! by exactly one execution run and never mutated by it.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when an intent is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
	#[error("Transfer amount must be positive")]
	ZeroAmount,
	#[error("Recipient address must not be zero")]
	ZeroRecipient,
}

/// A request to move `amount` of `source_token` on the source chain to
/// `recipient` as `destination_token` on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
	pub source_chain_id: u64,
	pub destination_chain_id: u64,
	pub source_token: Address,
	pub destination_token: Address,
	/// Amount in the smallest unit of the source token.
	pub amount: U256,
	pub recipient: Address,
	/// Paying account. Filled from the signer when absent.
	#[serde(default)]
	pub sender: Option<Address>,
	/// Opaque payload forwarded to the destination hook.
	#[serde(default)]
	pub hook_data: Bytes,
	/// Free text attached to signed orders.
	#[serde(default)]
	pub note: Option<String>,
}

impl TransferIntent {
	/// Creates a validated intent.
	pub fn new(
		source_chain_id: u64,
		source_token: Address,
		destination_chain_id: u64,
		destination_token: Address,
		amount: U256,
		recipient: Address,
	) -> Result<Self, IntentError> {
		let intent = Self {
			source_chain_id,
			destination_chain_id,
			source_token,
			destination_token,
			amount,
			recipient,
			sender: None,
			hook_data: Bytes::new(),
			note: None,
		};
		intent.validate()?;
		Ok(intent)
	}

	pub fn with_sender(mut self, sender: Address) -> Self {
		self.sender = Some(sender);
		self
	}

	pub fn with_hook_data(mut self, hook_data: Bytes) -> Self {
		self.hook_data = hook_data;
		self
	}

	pub fn with_note(mut self, note: impl Into<String>) -> Self {
		self.note = Some(note.into());
		self
	}

	/// Checks the intent invariants.
	///
	/// Intents built through [`TransferIntent::new`] are already valid; this
	/// is for intents that arrive deserialized.
	pub fn validate(&self) -> Result<(), IntentError> {
		if self.amount.is_zero() {
			return Err(IntentError::ZeroAmount);
		}
		if self.recipient == Address::ZERO {
			return Err(IntentError::ZeroRecipient);
		}
		Ok(())
	}
}
