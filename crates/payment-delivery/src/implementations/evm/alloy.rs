//! Alloy-based delivery backend.
//!
//! One HTTP provider per configured network, each wrapping a wallet built from
//! the account's private key so submitted calls are signed locally.

use crate::{DeliveryError, DeliveryInterface};
use alloy::network::EthereumWallet;
use alloy::primitives::B256;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::{local::PrivateKeySigner, Signer};
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use payment_config::NetworksConfig;
use payment_types::{
	truncate_id, Address, Bytes, ContractCall, FeeEstimate, SecretString, TransactionHash,
	TransactionReceipt, U256,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Interval between receipt lookups while waiting for inclusion.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Upper bound on the wait for a receipt.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(600);

/// Alloy-based EVM delivery implementation.
///
/// Supports every configured network with a single instance; calls are routed
/// by their chain id.
pub struct AlloyDelivery {
	/// Providers keyed by chain id.
	providers: HashMap<u64, DynProvider>,
	/// Address the wallet signs for.
	sender: Address,
	receipt_poll_interval: Duration,
	receipt_timeout: Duration,
}

impl AlloyDelivery {
	/// Creates providers for every network in `networks`.
	pub fn new(networks: &NetworksConfig, signer: PrivateKeySigner) -> Result<Self, DeliveryError> {
		if networks.is_empty() {
			return Err(DeliveryError::Network(
				"At least one network must be configured".to_string(),
			));
		}

		let sender = signer.address();
		let mut providers = HashMap::new();

		for (chain_id, network) in networks {
			let url: Url = network.rpc_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", chain_id, e))
			})?;

			let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(*chain_id)));
			let provider = ProviderBuilder::new()
				.wallet(wallet)
				.connect_http(url)
				.erased();

			providers.insert(*chain_id, provider);
		}

		Ok(Self {
			providers,
			sender,
			receipt_poll_interval: RECEIPT_POLL_INTERVAL,
			receipt_timeout: RECEIPT_TIMEOUT,
		})
	}

	/// Overrides how receipts are awaited.
	pub fn with_receipt_policy(mut self, poll_interval: Duration, timeout: Duration) -> Self {
		self.receipt_poll_interval = poll_interval;
		self.receipt_timeout = timeout;
		self
	}

	/// Chains this instance has providers for.
	pub fn chain_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.providers.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	fn get_provider(&self, chain_id: u64) -> Result<&DynProvider, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}

	fn to_request(&self, call: &ContractCall) -> TransactionRequest {
		let mut request = TransactionRequest::default()
			.from(self.sender)
			.to(call.to)
			.input(call.data.clone().into())
			.value(call.value);

		if let Some(gas_limit) = call.gas_limit {
			request = request.gas_limit(gas_limit);
		}
		if let Some(fees) = call.fees {
			request = request
				.max_fee_per_gas(fees.max_fee_per_gas)
				.max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
		}
		request
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn submit(&self, call: ContractCall) -> Result<TransactionHash, DeliveryError> {
		let chain_id = call.chain_id;
		let provider = self.get_provider(chain_id)?;
		let request = self.to_request(&call);

		// The provider's wallet signs
		let pending_tx = provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = TransactionHash::from(*pending_tx.tx_hash());
		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			chain_id = chain_id,
			"Submitted transaction"
		);

		Ok(tx_hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		if hash.0.len() != 32 {
			return Err(DeliveryError::InvalidResponse(format!(
				"transaction hash must be 32 bytes, got {}",
				hash.0.len()
			)));
		}
		let tx_hash = B256::from_slice(&hash.0);
		let provider = self.get_provider(chain_id)?;
		let start_time = tokio::time::Instant::now();

		tracing::debug!(
			tx_hash = %truncate_id(&hash.to_string()),
			timeout_secs = self.receipt_timeout.as_secs(),
			"Waiting for receipt"
		);

		loop {
			if start_time.elapsed() > self.receipt_timeout {
				return Err(DeliveryError::Network(format!(
					"Timeout waiting for receipt of {} after {} seconds",
					hash,
					self.receipt_timeout.as_secs()
				)));
			}

			let receipt = match provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					// Not yet mined
					tokio::time::sleep(self.receipt_poll_interval).await;
					continue;
				},
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				},
			};

			let receipt = TransactionReceipt {
				hash: TransactionHash::from(receipt.transaction_hash),
				block_number: receipt.block_number.unwrap_or(0),
				success: receipt.status(),
			};
			tracing::info!(
				tx_hash = %truncate_id(&hash.to_string()),
				block = receipt.block_number,
				success = receipt.success,
				"Transaction included"
			);
			return Ok(receipt);
		}
	}

	async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let provider = self.get_provider(chain_id)?;
		let request = TransactionRequest::default().to(to).input(data.into());

		provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Call to {} failed: {}", to, e)))
	}

	async fn get_native_balance(
		&self,
		chain_id: u64,
		address: Address,
	) -> Result<U256, DeliveryError> {
		let provider = self.get_provider(chain_id)?;

		provider
			.get_balance(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, DeliveryError> {
		let provider = self.get_provider(call.chain_id)?;
		let request = self.to_request(call);

		provider
			.estimate_gas(request)
			.await
			.map_err(|e| DeliveryError::TransactionFailed(format!("Gas estimation failed: {}", e)))
	}

	async fn estimate_fees(&self, chain_id: u64) -> Result<FeeEstimate, DeliveryError> {
		let provider = self.get_provider(chain_id)?;

		let estimate = provider
			.estimate_eip1559_fees()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to estimate fees: {}", e)))?;

		Ok(FeeEstimate {
			max_fee_per_gas: estimate.max_fee_per_gas,
			max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
		})
	}
}

/// Factory function to create a delivery backend from the network table.
///
/// The private key is the one the account backend exposes.
pub fn create_delivery(
	networks: &NetworksConfig,
	private_key: &SecretString,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	let signer = private_key
		.with_exposed(PrivateKeySigner::from_str)
		.map_err(|e| DeliveryError::Network(format!("Invalid private key: {}", e)))?;

	Ok(Box::new(AlloyDelivery::new(networks, signer)?))
}
