//! In-memory collaborators for handler and engine tests.

use async_trait::async_trait;
use payment_account::implementations::local::LocalWallet;
use payment_account::AccountService;
use payment_attestation::{AttestationError, AttestationInterface, AttestationMessage};
use payment_delivery::contracts::{
	encode_approve, encode_deposit_for_burn_with_hook, encode_receive_message, BurnParams,
};
use payment_delivery::{DeliveryError, DeliveryInterface};
use payment_order::{
	FinalizeRequest, OrderServiceError, OrderServiceInterface, ProcessRequest, ProcessResponse,
	RouteRequest, RouteResponse, StatusResponse,
};
use payment_types::{
	Address, Bytes, ContractCall, FeeEstimate, PreparedOrder, SecretString, TransactionHash,
	TransactionReceipt, UnsignedTypedData, B256, U256,
};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn local_account() -> Arc<AccountService> {
	let wallet = LocalWallet::new(SecretString::from(ANVIL_KEY)).unwrap();
	Arc::new(AccountService::new(Box::new(wallet)))
}

fn selector(data: &[u8]) -> [u8; 4] {
	let mut out = [0u8; 4];
	out.copy_from_slice(&data[..4]);
	out
}

/// Chain double that tracks one allowance and records every submission.
pub struct FakeChain {
	pub allowance: Mutex<U256>,
	/// Whether approvals update the allowance.
	pub approval_sticks: bool,
	pub native_balance: U256,
	/// Number of upcoming mint submissions that revert.
	pub failing_mints: AtomicU32,
	pub revert_burn: bool,
	pub submitted: Mutex<Vec<ContractCall>>,
	reverted: Mutex<HashSet<Vec<u8>>>,
	counter: AtomicU32,
}

impl FakeChain {
	pub fn new() -> Self {
		Self {
			allowance: Mutex::new(U256::ZERO),
			approval_sticks: true,
			native_balance: U256::from(10u64).pow(U256::from(18)),
			failing_mints: AtomicU32::new(0),
			revert_burn: false,
			submitted: Mutex::new(Vec::new()),
			reverted: Mutex::new(HashSet::new()),
			counter: AtomicU32::new(0),
		}
	}

	pub fn with_allowance(self, allowance: U256) -> Self {
		*self.allowance.lock().unwrap() = allowance;
		self
	}

	pub fn approve_selector() -> [u8; 4] {
		selector(&encode_approve(Address::ZERO, U256::ZERO))
	}

	pub fn burn_selector() -> [u8; 4] {
		selector(&encode_deposit_for_burn_with_hook(&BurnParams {
			amount: U256::ZERO,
			destination_domain: 0,
			mint_recipient: Address::ZERO,
			burn_token: Address::ZERO,
			destination_caller: B256::ZERO,
			max_fee: U256::ZERO,
			min_finality_threshold: 0,
			hook_data: Bytes::new(),
		}))
	}

	pub fn mint_selector() -> [u8; 4] {
		selector(&encode_receive_message(&Bytes::new(), &Bytes::new()))
	}

	pub fn calls_with_selector(&self, wanted: [u8; 4]) -> Vec<ContractCall> {
		self.submitted
			.lock()
			.unwrap()
			.iter()
			.filter(|call| call.data.len() >= 4 && selector(&call.data) == wanted)
			.cloned()
			.collect()
	}
}

#[async_trait]
impl DeliveryInterface for FakeChain {
	async fn submit(&self, call: ContractCall) -> Result<TransactionHash, DeliveryError> {
		let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
		let hash = vec![n as u8; 32];
		let op = selector(&call.data);

		let reverts = if op == Self::approve_selector() {
			if self.approval_sticks {
				*self.allowance.lock().unwrap() = U256::from_be_slice(&call.data[36..68]);
			}
			false
		} else if op == Self::mint_selector() {
			self.failing_mints
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
				.is_ok()
		} else {
			self.revert_burn
		};
		if reverts {
			self.reverted.lock().unwrap().insert(hash.clone());
		}

		self.submitted.lock().unwrap().push(call);
		Ok(TransactionHash(hash))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		_chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		Ok(TransactionReceipt {
			hash: hash.clone(),
			block_number: 100,
			success: !self.reverted.lock().unwrap().contains(&hash.0),
		})
	}

	async fn call(&self, _chain_id: u64, _to: Address, _data: Bytes) -> Result<Bytes, DeliveryError> {
		let allowance = *self.allowance.lock().unwrap();
		Ok(Bytes::from(allowance.to_be_bytes::<32>().to_vec()))
	}

	async fn get_native_balance(
		&self,
		_chain_id: u64,
		_address: Address,
	) -> Result<U256, DeliveryError> {
		Ok(self.native_balance)
	}

	async fn estimate_gas(&self, _call: &ContractCall) -> Result<u64, DeliveryError> {
		Ok(200_000)
	}

	async fn estimate_fees(&self, _chain_id: u64) -> Result<FeeEstimate, DeliveryError> {
		Ok(FeeEstimate {
			max_fee_per_gas: 30_000_000_000,
			max_priority_fee_per_gas: 1_000_000_000,
		})
	}
}

type AttestationReply = Result<Option<Vec<AttestationMessage>>, AttestationError>;

/// Attestation double replaying scripted replies, then `Ok(None)`.
pub struct ScriptedAttestation {
	replies: Mutex<VecDeque<AttestationReply>>,
	pub calls: AtomicU32,
	/// Source domain of every lookup, in call order.
	pub domains: Mutex<Vec<u32>>,
}

impl ScriptedAttestation {
	pub fn new(replies: Vec<AttestationReply>) -> Self {
		Self {
			replies: Mutex::new(replies.into()),
			calls: AtomicU32::new(0),
			domains: Mutex::new(Vec::new()),
		}
	}

	pub fn message(status: &str) -> AttestationMessage {
		AttestationMessage {
			status: status.to_string(),
			message: Some("0x0102".to_string()),
			attestation: Some("0x0304".to_string()),
		}
	}

	/// 404, then pending, then complete.
	pub fn eventually_complete() -> Self {
		Self::new(vec![
			Ok(None),
			Ok(Some(vec![Self::message("pending_confirmations")])),
			Ok(Some(vec![Self::message("complete")])),
		])
	}
}

#[async_trait]
impl AttestationInterface for ScriptedAttestation {
	async fn fetch_messages(
		&self,
		source_domain: u32,
		_tx_hash: &str,
	) -> Result<Option<Vec<AttestationMessage>>, AttestationError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.domains.lock().unwrap().push(source_domain);
		self.replies.lock().unwrap().pop_front().unwrap_or(Ok(None))
	}
}

/// Shares one double between a service and the test body.
pub struct Shared<T>(pub Arc<T>);

#[async_trait]
impl<T: AttestationInterface> AttestationInterface for Shared<T> {
	async fn fetch_messages(
		&self,
		source_domain: u32,
		tx_hash: &str,
	) -> Result<Option<Vec<AttestationMessage>>, AttestationError> {
		self.0.fetch_messages(source_domain, tx_hash).await
	}
}

#[async_trait]
impl<T: OrderServiceInterface> OrderServiceInterface for Shared<T> {
	async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, OrderServiceError> {
		self.0.route(request).await
	}

	async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, OrderServiceError> {
		self.0.process(request).await
	}

	async fn finalize(&self, request: &FinalizeRequest) -> Result<(), OrderServiceError> {
		self.0.finalize(request).await
	}

	async fn status(&self, order_hash: &str) -> Result<StatusResponse, OrderServiceError> {
		self.0.status(order_hash).await
	}
}

type StatusReply = Result<StatusResponse, OrderServiceError>;

/// Order service double.
pub struct ScriptedOrderService {
	pub data_to_sign: UnsignedTypedData,
	/// Finalize answers 404 when set.
	pub finalize_not_found: bool,
	statuses: Mutex<VecDeque<StatusReply>>,
	pub status_calls: AtomicU32,
	pub finalized: Mutex<Vec<FinalizeRequest>>,
	pub processed: Mutex<Vec<ProcessRequest>>,
}

impl ScriptedOrderService {
	pub fn new(statuses: Vec<StatusReply>) -> Self {
		Self {
			data_to_sign: Self::typed_data(),
			finalize_not_found: false,
			statuses: Mutex::new(statuses.into()),
			status_calls: AtomicU32::new(0),
			finalized: Mutex::new(Vec::new()),
			processed: Mutex::new(Vec::new()),
		}
	}

	pub fn status(status: &str) -> StatusReply {
		Ok(StatusResponse {
			status: Some(status.to_string()),
		})
	}

	pub fn typed_data() -> UnsignedTypedData {
		UnsignedTypedData {
			domain: Some(json!({
				"name": "Limit Order Protocol",
				"version": "4",
				"chainId": 8453,
				"verifyingContract": "0x111111125421ca6dc452d289314280a0f8842a65"
			})),
			types: Some(json!({
				"EIP712Domain": [
					{"name": "name", "type": "string"},
					{"name": "version", "type": "string"},
					{"name": "chainId", "type": "uint256"},
					{"name": "verifyingContract", "type": "address"}
				],
				"Order": [
					{"name": "salt", "type": "uint256"},
					{"name": "maker", "type": "address"},
					{"name": "makingAmount", "type": "uint256"}
				]
			})),
			message: Some(json!({
				"salt": "42",
				"maker": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
				"makingAmount": "10000000"
			})),
		}
	}

	pub fn order(&self) -> PreparedOrder {
		PreparedOrder {
			order_hash: "0x5a1f00d0000000000000000000000000000000000000000000000000000000aa"
				.to_string(),
			src_chain_id: 8453,
			order_struct: json!({"salt": "42"}),
			quote_id: Some("quote-1".to_string()),
			secret_hashes: vec!["0x01".to_string()],
			extension: Some("0x".to_string()),
			data_to_sign: self.data_to_sign.clone(),
		}
	}
}

#[async_trait]
impl OrderServiceInterface for ScriptedOrderService {
	async fn route(&self, _request: &RouteRequest) -> Result<RouteResponse, OrderServiceError> {
		Ok(serde_json::from_value(json!({
			"routeType": "circle_cctp",
			"estimate": {"estimatedFee": "1", "estimatedDuration": 1200}
		}))
		.unwrap())
	}

	async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, OrderServiceError> {
		self.processed.lock().unwrap().push(request.clone());
		Ok(ProcessResponse {
			order_data: self.order(),
			order_hash: None,
		})
	}

	async fn finalize(&self, request: &FinalizeRequest) -> Result<(), OrderServiceError> {
		self.finalized.lock().unwrap().push(request.clone());
		if self.finalize_not_found {
			return Err(OrderServiceError::NotFound("no route".to_string()));
		}
		Ok(())
	}

	async fn status(&self, _order_hash: &str) -> Result<StatusResponse, OrderServiceError> {
		self.status_calls.fetch_add(1, Ordering::SeqCst);
		self.statuses
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Self::status("pending"))
	}
}
