//! Client side of the order-construction and relay service.
//!
//! Signed-order payments are built by an external service: it quotes a route,
//! constructs the unsigned order with its EIP-712 payload, accepts the signed
//! order for relay and reports the relayer's status. This crate defines the
//! wire types of those endpoints and a service that builds them from intents.

use async_trait::async_trait;
use payment_types::{Address, PreparedOrder, RouteDecision, RouteQuote, TransferIntent, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

pub mod implementations {
	pub mod http;
}

/// Route type the service expects for signed-order processing.
pub const SIGNED_ORDER_ROUTE_TYPE: &str = "inch_fusion";

/// Errors returned by the order service client.
#[derive(Debug, Error)]
pub enum OrderServiceError {
	/// The service throttled the request.
	#[error("Rate limited: {0}")]
	RateLimited(String),
	/// The endpoint or resource does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Any other non-success status.
	#[error("HTTP {status}: {body}")]
	Http { status: u16, body: String },
	/// Transport failure before a response arrived.
	#[error("Network error: {0}")]
	Network(String),
	/// The response body could not be interpreted.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// Recipient preference entry sent with a route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientPreferencePayload {
	pub wallet_address: Address,
	pub chain_id: u64,
	pub token_address: Address,
}

/// Body of `POST /route`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
	pub source_chain_id: u64,
	pub source_token: Address,
	/// Amount in smallest units, as a decimal string.
	pub amount: String,
	pub target_chain_id: u64,
	pub target_token: Address,
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub recipient_preferences: Vec<RecipientPreferencePayload>,
}

/// Estimate block of a route response. Amount fields may be strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
	#[serde(default)]
	pub source_amount: Option<Value>,
	#[serde(default)]
	pub target_amount: Option<Value>,
	#[serde(default)]
	pub estimated_fee: Option<Value>,
	/// Seconds.
	#[serde(default)]
	pub estimated_duration: Option<u64>,
}

/// Response of `POST /route`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
	#[serde(default)]
	pub route_type: Option<String>,
	#[serde(default)]
	pub estimate: Option<RouteEstimate>,
}

impl RouteResponse {
	/// Extracts the fee and duration, when both are present and numeric.
	pub fn quote(&self) -> Option<RouteQuote> {
		let estimate = self.estimate.as_ref()?;
		Some(RouteQuote {
			estimated_fee: parse_amount(estimate.estimated_fee.as_ref()?)?,
			estimated_duration_seconds: estimate.estimated_duration?,
		})
	}
}

fn parse_amount(value: &Value) -> Option<U256> {
	match value {
		Value::String(s) => U256::from_str(s).ok(),
		Value::Number(n) => n.as_u64().map(U256::from),
		_ => None,
	}
}

/// Body of `POST /process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
	pub sender_address: Address,
	pub recipient_address: Address,
	pub source_chain_id: u64,
	pub source_token: Address,
	pub amount: String,
	pub target_chain_id: u64,
	pub target_token: Address,
	pub route_type: String,
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub note: Option<String>,
}

/// Response of `POST /process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
	pub order_data: PreparedOrder,
	#[serde(default)]
	pub order_hash: Option<String>,
}

/// Body of `POST /finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
	pub src_chain_id: u64,
	pub order_struct: Value,
	pub quote_id: Option<String>,
	pub secret_hashes: Vec<String>,
	pub signature: String,
	pub extension: Option<String>,
	pub order_hash: String,
}

impl FinalizeRequest {
	pub fn new(order: &PreparedOrder, signature: impl Into<String>) -> Self {
		Self {
			src_chain_id: order.src_chain_id,
			order_struct: order.order_struct.clone(),
			quote_id: order.quote_id.clone(),
			secret_hashes: order.secret_hashes.clone(),
			signature: signature.into(),
			extension: order.extension.clone(),
			order_hash: order.order_hash.clone(),
		}
	}
}

/// Response of `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusResponse {
	#[serde(default)]
	pub status: Option<String>,
}

/// Interface implemented by order service clients.
#[async_trait]
pub trait OrderServiceInterface: Send + Sync {
	async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, OrderServiceError>;

	async fn process(&self, request: &ProcessRequest)
		-> Result<ProcessResponse, OrderServiceError>;

	/// Hands a signed order to the relayer. A 404 is reported as `NotFound`.
	async fn finalize(&self, request: &FinalizeRequest) -> Result<(), OrderServiceError>;

	async fn status(&self, order_hash: &str) -> Result<StatusResponse, OrderServiceError>;
}

/// Service translating payment types into order service calls.
pub struct OrderService {
	implementation: Box<dyn OrderServiceInterface>,
}

impl OrderService {
	pub fn new(implementation: Box<dyn OrderServiceInterface>) -> Self {
		Self { implementation }
	}

	/// Asks the service to quote a decided route.
	pub async fn quote(
		&self,
		decision: &RouteDecision,
		intent: &TransferIntent,
	) -> Result<Option<RouteQuote>, OrderServiceError> {
		let request = RouteRequest {
			source_chain_id: decision.source_chain_id,
			source_token: intent.source_token,
			amount: intent.amount.to_string(),
			target_chain_id: decision.destination_chain_id,
			target_token: decision.destination_token,
			recipient_preferences: vec![RecipientPreferencePayload {
				wallet_address: decision.recipient,
				chain_id: decision.destination_chain_id,
				token_address: decision.destination_token,
			}],
		};
		let response = self.implementation.route(&request).await?;
		Ok(response.quote())
	}

	/// Requests an unsigned order for the intent.
	///
	/// The intent must carry the sender address.
	pub async fn prepare(&self, intent: &TransferIntent) -> Result<PreparedOrder, OrderServiceError> {
		let sender = intent.sender.ok_or_else(|| {
			OrderServiceError::InvalidResponse("intent has no sender address".to_string())
		})?;
		let request = ProcessRequest {
			sender_address: sender,
			recipient_address: intent.recipient,
			source_chain_id: intent.source_chain_id,
			source_token: intent.source_token,
			amount: intent.amount.to_string(),
			target_chain_id: intent.destination_chain_id,
			target_token: intent.destination_token,
			route_type: SIGNED_ORDER_ROUTE_TYPE.to_string(),
			note: intent.note.clone(),
		};

		let response = self.implementation.process(&request).await?;
		let mut order = response.order_data;
		if order.order_hash.is_empty() {
			order.order_hash = response.order_hash.ok_or_else(|| {
				OrderServiceError::InvalidResponse("response carries no order hash".to_string())
			})?;
		}
		Ok(order)
	}

	pub async fn finalize(
		&self,
		order: &PreparedOrder,
		signature: &str,
	) -> Result<(), OrderServiceError> {
		self.implementation
			.finalize(&FinalizeRequest::new(order, signature))
			.await
	}

	/// Current relayer status of an order, verbatim.
	pub async fn status(&self, order_hash: &str) -> Result<Option<String>, OrderServiceError> {
		Ok(self.implementation.status(order_hash).await?.status)
	}
}
