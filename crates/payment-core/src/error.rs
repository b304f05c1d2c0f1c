//! Error taxonomy shared by both settlement protocols.
//!
//! Every failure a payment can hit is a [`PaymentError`]. Callers branch on its
//! [`ErrorKind`] rather than on individual variants.

use payment_account::AccountError;
use payment_attestation::AttestationError;
use payment_delivery::DeliveryError;
use payment_order::OrderServiceError;
use payment_storage::StorageError;
use payment_types::{IntentError, OrderPhase, RegistryError, TransferPhase, U256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a payment failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Unsupported chain or route, invalid intent or settings. Never retried.
	Configuration,
	/// Rate limits, unavailable services, not-yet-indexed data.
	Transient,
	/// The account holder declined a signature.
	UserRejected,
	/// A transaction reverted or could not be paid for.
	ContractExecution,
	/// A polling loop ran out of attempts or time.
	ProtocolTimeout,
	/// Stopped through the stop handle.
	Cancelled,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ErrorKind::Configuration => "configuration",
			ErrorKind::Transient => "transient",
			ErrorKind::UserRejected => "user-rejected",
			ErrorKind::ContractExecution => "contract-execution",
			ErrorKind::ProtocolTimeout => "protocol-timeout",
			ErrorKind::Cancelled => "cancelled",
		};
		f.write_str(name)
	}
}

/// Errors that can occur while routing or executing a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(u64),
	#[error("No protocol supports a transfer from chain {source_chain} to chain {destination_chain}")]
	UnsupportedRoute {
		source_chain: u64,
		destination_chain: u64,
	},
	#[error("Invalid intent: {0}")]
	InvalidIntent(#[from] IntentError),
	#[error("Malformed order: {0}")]
	MalformedOrder(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Invalid transfer transition from {from} to {to}")]
	InvalidTransferTransition { from: TransferPhase, to: TransferPhase },
	#[error("Invalid order transition from {from} to {to}")]
	InvalidOrderTransition { from: OrderPhase, to: OrderPhase },
	#[error("User rejected the request: {0}")]
	UserRejected(String),
	#[error("Signing failed: {0}")]
	Signing(String),
	#[error("Contract execution failed: {0}")]
	ContractExecution(String),
	#[error("Insufficient gas on destination: recipient holds {balance} wei, needs {required} wei")]
	InsufficientGas { balance: U256, required: U256 },
	#[error("Attestation not available after {}s", .0.as_secs())]
	AttestationTimeout(Duration),
	#[error("Order status still open after {attempts} polls")]
	PollingTimeout { attempts: u32 },
	#[error("Cancelled")]
	Cancelled,
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	#[error("Attestation service error: {0}")]
	Attestation(#[from] AttestationError),
	#[error("Order service error: {0}")]
	OrderService(#[from] OrderServiceError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

impl PaymentError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			PaymentError::UnsupportedChain(_)
			| PaymentError::UnsupportedRoute { .. }
			| PaymentError::InvalidIntent(_)
			| PaymentError::MalformedOrder(_)
			| PaymentError::Config(_)
			| PaymentError::InvalidTransferTransition { .. }
			| PaymentError::InvalidOrderTransition { .. }
			| PaymentError::Signing(_) => ErrorKind::Configuration,
			PaymentError::UserRejected(_) => ErrorKind::UserRejected,
			PaymentError::ContractExecution(_) | PaymentError::InsufficientGas { .. } => {
				ErrorKind::ContractExecution
			},
			PaymentError::AttestationTimeout(_) | PaymentError::PollingTimeout { .. } => {
				ErrorKind::ProtocolTimeout
			},
			PaymentError::Cancelled => ErrorKind::Cancelled,
			PaymentError::Delivery(DeliveryError::TransactionFailed(_)) => {
				ErrorKind::ContractExecution
			},
			PaymentError::Delivery(DeliveryError::NoProviderAvailable(_)) => {
				ErrorKind::Configuration
			},
			PaymentError::Delivery(_)
			| PaymentError::Attestation(_)
			| PaymentError::OrderService(_)
			| PaymentError::Storage(_) => ErrorKind::Transient,
		}
	}

	/// Whether retrying the failed step may succeed.
	pub fn is_retryable(&self) -> bool {
		self.kind() == ErrorKind::Transient
	}
}

impl From<RegistryError> for PaymentError {
	fn from(err: RegistryError) -> Self {
		match err {
			RegistryError::UnsupportedChain(chain_id) => PaymentError::UnsupportedChain(chain_id),
		}
	}
}

impl From<AccountError> for PaymentError {
	fn from(err: AccountError) -> Self {
		match err {
			AccountError::UserRejected(reason) => PaymentError::UserRejected(reason),
			AccountError::InvalidTypedData(reason) => PaymentError::MalformedOrder(reason),
			other => PaymentError::Signing(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_kinds() {
		assert_eq!(
			PaymentError::UnsupportedRoute {
				source_chain: 1,
				destination_chain: 2
			}
			.kind(),
			ErrorKind::Configuration
		);
		assert_eq!(
			PaymentError::from(AccountError::UserRejected("no".into())).kind(),
			ErrorKind::UserRejected
		);
		assert_eq!(
			PaymentError::Delivery(DeliveryError::TransactionFailed("reverted".into())).kind(),
			ErrorKind::ContractExecution
		);
		assert_eq!(
			PaymentError::PollingTimeout { attempts: 30 }.kind(),
			ErrorKind::ProtocolTimeout
		);
		assert_eq!(PaymentError::Cancelled.kind(), ErrorKind::Cancelled);
	}

	#[test]
	fn test_only_transient_errors_are_retryable() {
		assert!(PaymentError::Attestation(AttestationError::RateLimited(String::new()))
			.is_retryable());
		assert!(!PaymentError::MalformedOrder("missing domain".into()).is_retryable());
		assert!(!PaymentError::InsufficientGas {
			balance: U256::ZERO,
			required: U256::from(1)
		}
		.is_retryable());
	}

	#[test]
	fn test_registry_error_conversion() {
		let err: PaymentError = RegistryError::UnsupportedChain(5).into();
		assert!(matches!(err, PaymentError::UnsupportedChain(5)));
	}
}
