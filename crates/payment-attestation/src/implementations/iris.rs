//! HTTP client for the Iris attestation API.
//!
//! Queries `{base}/v2/messages/{sourceDomain}?transactionHash=<hash>`. A 404
//! means the burn is not indexed yet.

use crate::{AttestationError, AttestationInterface, AttestationMessage, MessagesResponse};
use async_trait::async_trait;
use payment_config::AttestationConfig;
use reqwest::{
	header::{HeaderMap, HeaderValue},
	Client, StatusCode,
};
use std::time::Duration;
use tracing::debug;

/// Attestation client over HTTP.
pub struct IrisAttestation {
	client: Client,
	base_url: String,
}

impl IrisAttestation {
	pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, AttestationError> {
		let mut headers = HeaderMap::new();
		headers.insert("Accept", HeaderValue::from_static("application/json"));

		let client = Client::builder()
			.default_headers(headers)
			.timeout(request_timeout)
			.build()
			.map_err(|e| AttestationError::Network(format!("Failed to build client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	fn messages_url(&self, source_domain: u32) -> String {
		format!("{}/v2/messages/{}", self.base_url, source_domain)
	}
}

/// Maps a non-success status and its body to an error.
pub(crate) fn classify_failure(status: StatusCode, body: String) -> AttestationError {
	if status == StatusCode::TOO_MANY_REQUESTS {
		AttestationError::RateLimited(body)
	} else {
		AttestationError::Http {
			status: status.as_u16(),
			body,
		}
	}
}

#[async_trait]
impl AttestationInterface for IrisAttestation {
	async fn fetch_messages(
		&self,
		source_domain: u32,
		tx_hash: &str,
	) -> Result<Option<Vec<AttestationMessage>>, AttestationError> {
		let url = self.messages_url(source_domain);
		let response = self
			.client
			.get(&url)
			.query(&[("transactionHash", tx_hash)])
			.send()
			.await
			.map_err(|e| AttestationError::Network(e.to_string()))?;

		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			debug!(source_domain, tx_hash, "Burn not indexed yet");
			return Ok(None);
		}
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(classify_failure(status, body));
		}

		let body: MessagesResponse = response.json().await.map_err(|e| {
			AttestationError::InvalidResponse(format!("Failed to parse messages: {}", e))
		})?;

		Ok(Some(body.messages))
	}
}

/// Factory function building the client from the `[attestation]` section.
pub fn create_attestation(
	config: &AttestationConfig,
) -> Result<Box<dyn AttestationInterface>, AttestationError> {
	let client = IrisAttestation::new(
		&config.api_url,
		Duration::from_secs(config.request_timeout_seconds),
	)?;
	Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_messages_url_trims_trailing_slash() {
		let client =
			IrisAttestation::new("https://iris-api-sandbox.circle.com/", Duration::from_secs(5))
				.unwrap();
		assert_eq!(
			client.messages_url(6),
			"https://iris-api-sandbox.circle.com/v2/messages/6"
		);
	}

	#[test]
	fn test_classify_failure() {
		assert!(matches!(
			classify_failure(StatusCode::TOO_MANY_REQUESTS, String::new()),
			AttestationError::RateLimited(_)
		));
		assert!(matches!(
			classify_failure(StatusCode::BAD_GATEWAY, "upstream".to_string()),
			AttestationError::Http { status: 502, .. }
		));
	}

	#[test]
	fn test_parse_messages_body() {
		let body = r#"{
			"messages": [{
				"status": "complete",
				"message": "0x0000",
				"attestation": "0x1111",
				"eventNonce": "12"
			}]
		}"#;
		let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
		assert_eq!(parsed.messages.len(), 1);
		assert_eq!(parsed.messages[0].status, "complete");
		assert_eq!(parsed.messages[0].attestation.as_deref(), Some("0x1111"));
	}

	#[test]
	fn test_parse_pending_message_without_payload() {
		let body = r#"{"messages":[{"status":"pending_confirmations"}]}"#;
		let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
		assert_eq!(parsed.messages[0].message, None);
	}

	#[test]
	fn test_factory_uses_config() {
		let config = AttestationConfig::default();
		assert!(create_attestation(&config).is_ok());
	}
}
