//! Account management for the payment system.
//!
//! This module defines the signing capability the state machines depend on:
//! the paying address, EIP-712 typed-data signatures for orders and the
//! best-effort wallet chain switch used before minting.

use async_trait::async_trait;
use payment_types::{Address, SecretString, TypedDataPayload};
use thiserror::Error;
use tokio::sync::Mutex;

pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The account holder declined to sign.
	#[error("User rejected the request: {0}")]
	UserRejected(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The payload cannot be interpreted as EIP-712 typed data.
	#[error("Invalid typed data: {0}")]
	InvalidTypedData(String),
	/// The account cannot switch chains.
	#[error("Chain switch unsupported: {0}")]
	ChainSwitchUnsupported(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Interface implemented by account backends.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs EIP-712 typed data and returns the 65-byte signature as 0x-prefixed hex.
	async fn sign_typed_data(&self, payload: &TypedDataPayload) -> Result<String, AccountError>;

	/// Asks the wallet to operate on `chain_id`.
	async fn switch_chain(&self, chain_id: u64) -> Result<(), AccountError> {
		Err(AccountError::ChainSwitchUnsupported(format!(
			"cannot switch to chain {}",
			chain_id
		)))
	}

	/// Returns the private key used by the chain client to send transactions.
	fn get_private_key(&self) -> SecretString;
}

/// Signature of the factory functions account backends expose.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Returns every account backend by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::NAME, local::create_account as AccountFactory)]
}

/// Service wrapping an account backend.
///
/// Signature requests are serialized: a wallet presents one prompt at a time,
/// so concurrent callers queue on an async mutex.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
	sign_lock: Mutex<()>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self {
			implementation,
			sign_lock: Mutex::new(()),
		}
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs typed data, waiting for any in-flight signature request first.
	pub async fn sign_typed_data(&self, payload: &TypedDataPayload) -> Result<String, AccountError> {
		let _guard = self.sign_lock.lock().await;
		self.implementation.sign_typed_data(payload).await
	}

	pub async fn switch_chain(&self, chain_id: u64) -> Result<(), AccountError> {
		self.implementation.switch_chain(chain_id).await
	}

	pub fn get_private_key(&self) -> SecretString {
		self.implementation.get_private_key()
	}
}
