//! Local private-key account.
//!
//! Signs in-process with a key loaded from configuration. There is no wallet
//! UI to switch, so chain switches always succeed.

use crate::{AccountError, AccountInterface};
use alloy::dyn_abi::TypedData;
use alloy::signers::{local::PrivateKeySigner, Signer};
use async_trait::async_trait;
use payment_types::{Address, SecretString, TypedDataPayload};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Configuration name of this backend.
pub const NAME: &str = "local";

const DOMAIN_TYPE: &str = "EIP712Domain";
const DEFAULT_PRIMARY_TYPE: &str = "Order";

/// Account backed by an in-memory private key.
pub struct LocalWallet {
	signer: PrivateKeySigner,
	private_key: SecretString,
}

impl LocalWallet {
	pub fn new(private_key: SecretString) -> Result<Self, AccountError> {
		let signer = private_key
			.with_exposed(PrivateKeySigner::from_str)
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;
		Ok(Self {
			signer,
			private_key,
		})
	}
}

/// Builds an alloy `TypedData` from a service payload.
///
/// The domain type entry is dropped since the domain struct is hashed from
/// `domain` directly. When no primary type is given, `Order` is used if
/// present, otherwise the single declared type.
pub fn to_typed_data(payload: &TypedDataPayload) -> Result<TypedData, AccountError> {
	let mut types: Map<String, Value> = payload
		.types
		.as_object()
		.cloned()
		.ok_or_else(|| AccountError::InvalidTypedData("types must be an object".into()))?;
	types.remove(DOMAIN_TYPE);

	let primary_type = match &payload.primary_type {
		Some(primary_type) => primary_type.clone(),
		None if types.contains_key(DEFAULT_PRIMARY_TYPE) => DEFAULT_PRIMARY_TYPE.to_string(),
		None if types.len() == 1 => types.keys().next().cloned().unwrap_or_default(),
		None => {
			return Err(AccountError::InvalidTypedData(
				"cannot infer primary type".into(),
			))
		},
	};

	let value = json!({
		"types": types,
		"primaryType": primary_type,
		"domain": payload.domain,
		"message": payload.message,
	});
	serde_json::from_value(value).map_err(|e| AccountError::InvalidTypedData(e.to_string()))
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_typed_data(&self, payload: &TypedDataPayload) -> Result<String, AccountError> {
		let typed_data = to_typed_data(payload)?;
		let hash = typed_data
			.eip712_signing_hash()
			.map_err(|e| AccountError::InvalidTypedData(e.to_string()))?;
		let signature = self
			.signer
			.sign_hash(&hash)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		tracing::debug!(signer = %self.signer.address(), "Signed typed data");
		Ok(format!("0x{}", hex::encode(signature.as_bytes())))
	}

	async fn switch_chain(&self, _chain_id: u64) -> Result<(), AccountError> {
		Ok(())
	}

	fn get_private_key(&self) -> SecretString {
		self.private_key.clone()
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key, with or without 0x prefix
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;

	Ok(Box::new(LocalWallet::new(SecretString::from(private_key))?))
}
