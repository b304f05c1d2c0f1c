//! Burn-and-mint transfer state.
//!
//! The state record is owned by exactly one state machine run. Phase changes
//! are validated by the machine that owns it; this module only describes the
//! shape of the record and its append-only log.

use crate::delivery::TransactionHash;
use alloy_primitives::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phases of a burn-and-mint transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferPhase {
	Idle,
	Approving,
	Burning,
	AwaitingAttestation,
	Minting,
	Completed,
	Error,
}

impl TransferPhase {
	/// Whether the phase accepts no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, TransferPhase::Completed | TransferPhase::Error)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			TransferPhase::Idle => "idle",
			TransferPhase::Approving => "approving",
			TransferPhase::Burning => "burning",
			TransferPhase::AwaitingAttestation => "awaiting-attestation",
			TransferPhase::Minting => "minting",
			TransferPhase::Completed => "completed",
			TransferPhase::Error => "error",
		}
	}
}

impl fmt::Display for TransferPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One timestamped, step-tagged line of a run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	pub timestamp: DateTime<Utc>,
	pub step: String,
	pub message: String,
}

impl LogEntry {
	pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			timestamp: Utc::now(),
			step: step.into(),
			message: message.into(),
		}
	}
}

impl fmt::Display for LogEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"[{}] {}: {}",
			self.timestamp.format("%H:%M:%S"),
			self.step,
			self.message
		)
	}
}

/// Message and signature released by the attestation service for a burn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
	pub message: Bytes,
	pub attestation: Bytes,
}

/// State of one burn-and-mint transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferState {
	pub id: String,
	pub phase: TransferPhase,
	pub logs: Vec<LogEntry>,
	pub approval_tx_hash: Option<TransactionHash>,
	pub burn_tx_hash: Option<TransactionHash>,
	pub attestation: Option<Attestation>,
	pub mint_tx_hash: Option<TransactionHash>,
	pub error_message: Option<String>,
}

impl TransferState {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			phase: TransferPhase::Idle,
			logs: Vec::new(),
			approval_tx_hash: None,
			burn_tx_hash: None,
			attestation: None,
			mint_tx_hash: None,
			error_message: None,
		}
	}

	/// Appends a log line tagged with the current phase and returns it.
	pub fn log(&mut self, message: impl Into<String>) -> &LogEntry {
		let step = self.phase.as_str();
		self.logs.push(LogEntry::new(step, message));
		&self.logs[self.logs.len() - 1]
	}
}
