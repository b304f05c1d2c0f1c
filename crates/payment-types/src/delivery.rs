//! Transaction delivery types.
//!
//! This module defines types related to blockchain transaction submission
//! and confirmation, shared by the chain client and the state machines.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain transaction hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		Self(hash.to_vec())
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// A contract call ready to be estimated or submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
	pub chain_id: u64,
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	/// Explicit gas limit. Estimated by the provider when absent.
	pub gas_limit: Option<u64>,
	pub fees: Option<FeeEstimate>,
}

impl ContractCall {
	pub fn new(chain_id: u64, to: Address, data: Bytes) -> Self {
		Self {
			chain_id,
			to,
			data,
			value: U256::ZERO,
			gas_limit: None,
			fees: None,
		}
	}

	pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}

	pub fn with_fees(mut self, fees: FeeEstimate) -> Self {
		self.fees = Some(fees);
		self
	}
}

/// EIP-1559 fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
	pub max_fee_per_gas: u128,
	pub max_priority_fee_per_gas: u128,
}
