//! Transaction delivery module for the payment system.
//!
//! This module handles every on-chain interaction a payment performs: allowance
//! reads, gas and fee estimation, transaction submission and confirmation
//! tracking. A single delivery backend serves all configured chains; calls are
//! routed by the chain id they carry.

use async_trait::async_trait;
use payment_types::{
	Address, Bytes, ContractCall, FeeEstimate, TransactionHash, TransactionReceipt, U256,
};
use std::sync::Arc;
use thiserror::Error;

pub mod contracts;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// No provider is configured for the chain.
	#[error("No provider available for chain {0}")]
	NoProviderAvailable(u64),
	/// A node answered with data that cannot be decoded.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// Trait defining the interface for transaction delivery backends.
///
/// Implementations sign with the configured account, so submissions only need
/// the call itself.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Submits a contract call and returns its transaction hash.
	async fn submit(&self, call: ContractCall) -> Result<TransactionHash, DeliveryError>;

	/// Waits until the transaction is included in a block.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Executes a read-only call against the latest block.
	async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> Result<Bytes, DeliveryError>;

	/// Native balance of `address` in wei.
	async fn get_native_balance(&self, chain_id: u64, address: Address)
		-> Result<U256, DeliveryError>;

	/// Estimates the gas a call consumes.
	async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, DeliveryError>;

	/// Current EIP-1559 fee parameters for the chain.
	async fn estimate_fees(&self, chain_id: u64) -> Result<FeeEstimate, DeliveryError>;
}

/// Service that manages transaction delivery across the configured chains.
#[derive(Clone)]
pub struct DeliveryService {
	implementation: Arc<dyn DeliveryInterface>,
}

impl DeliveryService {
	pub fn new(implementation: Arc<dyn DeliveryInterface>) -> Self {
		Self { implementation }
	}

	/// Reads the ERC-20 allowance `owner` grants `spender` on `token`.
	pub async fn get_allowance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, DeliveryError> {
		let result = self
			.implementation
			.call(chain_id, token, contracts::encode_allowance(&owner, &spender))
			.await?;

		contracts::decode_uint(&result).ok_or_else(|| {
			DeliveryError::InvalidResponse(format!(
				"allowance call returned {} bytes",
				result.len()
			))
		})
	}

	pub async fn get_native_balance(
		&self,
		chain_id: u64,
		address: Address,
	) -> Result<U256, DeliveryError> {
		self.implementation.get_native_balance(chain_id, address).await
	}

	pub async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, DeliveryError> {
		self.implementation.estimate_gas(call).await
	}

	pub async fn estimate_fees(&self, chain_id: u64) -> Result<FeeEstimate, DeliveryError> {
		self.implementation.estimate_fees(chain_id).await
	}

	/// Submits a call and waits for its receipt.
	///
	/// A reverted receipt is reported as [`DeliveryError::TransactionFailed`].
	pub async fn deliver(&self, call: ContractCall) -> Result<TransactionReceipt, DeliveryError> {
		let chain_id = call.chain_id;
		let hash = self.implementation.submit(call).await?;
		let receipt = self
			.implementation
			.wait_for_confirmation(&hash, chain_id)
			.await?;

		if !receipt.success {
			return Err(DeliveryError::TransactionFailed(format!(
				"transaction {} reverted in block {}",
				receipt.hash, receipt.block_number
			)));
		}

		Ok(receipt)
	}
}
