//! Signed-order state and relayer payloads.
//!
//! Orders are built by an external order-construction service, signed by the
//! paying account as EIP-712 typed data and then handed to a relayer network
//! whose status strings are surfaced to callers unchanged.

use crate::transfer::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle phases of a signed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderPhase {
	Idle,
	Preparing,
	Signing,
	Submitting,
	Pending,
	Executed,
	Failed,
	Cancelled,
	Error,
}

impl OrderPhase {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderPhase::Executed | OrderPhase::Failed | OrderPhase::Cancelled | OrderPhase::Error
		)
	}

	/// Maps a relayer status string to the terminal phase it denotes, if any.
	pub fn from_relayer_status(status: &str) -> Option<OrderPhase> {
		match status.to_ascii_lowercase().as_str() {
			"executed" => Some(OrderPhase::Executed),
			"failed" => Some(OrderPhase::Failed),
			"cancelled" | "canceled" => Some(OrderPhase::Cancelled),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			OrderPhase::Idle => "idle",
			OrderPhase::Preparing => "preparing",
			OrderPhase::Signing => "signing",
			OrderPhase::Submitting => "submitting",
			OrderPhase::Pending => "pending",
			OrderPhase::Executed => "executed",
			OrderPhase::Failed => "failed",
			OrderPhase::Cancelled => "cancelled",
			OrderPhase::Error => "error",
		}
	}
}

impl fmt::Display for OrderPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// State of one signed-order run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
	pub phase: OrderPhase,
	pub order_hash: Option<String>,
	pub signature: Option<String>,
	/// Last status reported by the relayer, verbatim.
	pub poll_status: Option<String>,
	/// Number of status polls performed.
	pub poll_attempts: u32,
	pub error_message: Option<String>,
	pub logs: Vec<LogEntry>,
}

impl OrderState {
	pub fn new() -> Self {
		Self {
			phase: OrderPhase::Idle,
			order_hash: None,
			signature: None,
			poll_status: None,
			poll_attempts: 0,
			error_message: None,
			logs: Vec::new(),
		}
	}

	/// Appends a log line tagged with the current phase and returns it.
	pub fn log(&mut self, message: impl Into<String>) -> &LogEntry {
		self.logs.push(LogEntry::new(self.phase.as_str(), message));
		&self.logs[self.logs.len() - 1]
	}
}

impl Default for OrderState {
	fn default() -> Self {
		Self::new()
	}
}

/// Typed-data fields as returned by the order service. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTypedData {
	#[serde(default)]
	pub domain: Option<Value>,
	#[serde(default)]
	pub types: Option<Value>,
	#[serde(default)]
	pub message: Option<Value>,
}

impl UnsignedTypedData {
	/// Returns the signable payload when domain, types and message are all present.
	pub fn complete(&self) -> Option<TypedDataPayload> {
		let is_present = |v: &Option<Value>| v.as_ref().is_some_and(|v| !v.is_null());
		if !(is_present(&self.domain) && is_present(&self.types) && is_present(&self.message)) {
			return None;
		}
		Some(TypedDataPayload {
			domain: self.domain.clone()?,
			types: self.types.clone()?,
			message: self.message.clone()?,
			primary_type: None,
		})
	}
}

/// A complete EIP-712 payload ready for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
	pub domain: Value,
	pub types: Value,
	pub message: Value,
	/// Struct type being signed. Inferred from `types` when absent.
	#[serde(default)]
	pub primary_type: Option<String>,
}

/// An unsigned order produced by the order-construction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedOrder {
	#[serde(default)]
	pub order_hash: String,
	pub src_chain_id: u64,
	#[serde(default)]
	pub order_struct: Value,
	#[serde(default)]
	pub quote_id: Option<String>,
	#[serde(default)]
	pub secret_hashes: Vec<String>,
	#[serde(default)]
	pub extension: Option<String>,
	#[serde(default)]
	pub data_to_sign: UnsignedTypedData,
}
