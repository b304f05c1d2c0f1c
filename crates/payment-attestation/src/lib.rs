//! Attestation lookups for burn-and-mint transfers.
//!
//! After a burn confirms, the attestation service certifies the burn message.
//! This crate fetches the service's view of a burn transaction and reduces it
//! to one of three answers: not indexed yet, pending, or complete with the
//! message and attestation bytes needed to mint.

use async_trait::async_trait;
use payment_types::{without_0x_prefix, Attestation, Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod implementations {
	pub mod iris;
}

/// Status string the service reports for a certified message.
pub const COMPLETE_STATUS: &str = "complete";

/// Errors that can occur while talking to the attestation service.
#[derive(Debug, Error)]
pub enum AttestationError {
	/// The service throttled the request.
	#[error("Rate limited: {0}")]
	RateLimited(String),
	/// Non-success HTTP status other than 404 and 429.
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },
	/// Transport failure before a response arrived.
	#[error("Network error: {0}")]
	Network(String),
	/// The response body could not be interpreted.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// One message entry as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationMessage {
	pub status: String,
	/// Hex-encoded message bytes.
	#[serde(default)]
	pub message: Option<String>,
	/// Hex-encoded attestation signature(s).
	#[serde(default)]
	pub attestation: Option<String>,
}

/// Response body of the messages endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
	#[serde(default)]
	pub messages: Vec<AttestationMessage>,
}

/// The reduced view of a burn's attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatus {
	/// The service has not indexed the burn yet.
	NotFound,
	/// Known but not complete; carries the reported status.
	Pending(String),
	/// A single complete message.
	Complete(Attestation),
}

/// Interface implemented by attestation service clients.
#[async_trait]
pub trait AttestationInterface: Send + Sync {
	/// Fetches the messages emitted by `tx_hash` on the chain with `source_domain`.
	///
	/// Returns `Ok(None)` when the service answers 404.
	async fn fetch_messages(
		&self,
		source_domain: u32,
		tx_hash: &str,
	) -> Result<Option<Vec<AttestationMessage>>, AttestationError>;
}

/// Service wrapping an attestation client.
pub struct AttestationService {
	implementation: Box<dyn AttestationInterface>,
}

impl AttestationService {
	pub fn new(implementation: Box<dyn AttestationInterface>) -> Self {
		Self { implementation }
	}

	/// Checks the attestation of a burn once.
	///
	/// Only a response holding exactly one message whose status is `complete`
	/// counts as complete; every other shape is reported as pending.
	pub async fn check(
		&self,
		source_domain: u32,
		tx_hash: &str,
	) -> Result<AttestationStatus, AttestationError> {
		let messages = match self
			.implementation
			.fetch_messages(source_domain, tx_hash)
			.await?
		{
			Some(messages) => messages,
			None => return Ok(AttestationStatus::NotFound),
		};

		match messages.as_slice() {
			[single] if single.status == COMPLETE_STATUS => {
				let message = decode_field(single.message.as_deref(), "message")?;
				let attestation = decode_field(single.attestation.as_deref(), "attestation")?;
				Ok(AttestationStatus::Complete(Attestation {
					message,
					attestation,
				}))
			},
			[single] => Ok(AttestationStatus::Pending(single.status.clone())),
			[] => Ok(AttestationStatus::Pending("no messages".to_string())),
			many => Ok(AttestationStatus::Pending(format!(
				"{} messages",
				many.len()
			))),
		}
	}
}

fn decode_field(value: Option<&str>, name: &str) -> Result<Bytes, AttestationError> {
	let value = value.ok_or_else(|| {
		AttestationError::InvalidResponse(format!("complete message without {}", name))
	})?;
	hex::decode(without_0x_prefix(value))
		.map(Bytes::from)
		.map_err(|e| AttestationError::InvalidResponse(format!("{} is not hex: {}", name, e)))
}
