//! HTTP client for the order service.

use crate::{
	FinalizeRequest, OrderServiceError, OrderServiceInterface, ProcessRequest, ProcessResponse,
	RouteRequest, RouteResponse, StatusResponse,
};
use async_trait::async_trait;
use payment_config::OrderServiceConfig;
use reqwest::{
	header::{HeaderMap, HeaderValue, AUTHORIZATION},
	Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Order service client over HTTP.
pub struct HttpOrderService {
	client: Client,
	base_url: String,
}

impl HttpOrderService {
	pub fn new(
		base_url: &str,
		api_key: Option<&str>,
		request_timeout: Duration,
	) -> Result<Self, OrderServiceError> {
		let mut headers = HeaderMap::new();
		headers.insert("Content-Type", HeaderValue::from_static("application/json"));
		headers.insert("Accept", HeaderValue::from_static("application/json"));
		if let Some(key) = api_key {
			let mut value = HeaderValue::from_str(&format!("Bearer {}", key))
				.map_err(|e| OrderServiceError::Network(format!("Invalid API key: {}", e)))?;
			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		}

		let client = Client::builder()
			.default_headers(headers)
			.timeout(request_timeout)
			.build()
			.map_err(|e| OrderServiceError::Network(format!("Failed to build client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path)
	}
}

/// Maps a non-success status and its body to an error.
pub(crate) fn classify_failure(status: StatusCode, body: String) -> OrderServiceError {
	match status {
		StatusCode::TOO_MANY_REQUESTS => OrderServiceError::RateLimited(body),
		StatusCode::NOT_FOUND => OrderServiceError::NotFound(body),
		_ => OrderServiceError::Http {
			status: status.as_u16(),
			body,
		},
	}
}

async fn check_status(response: Response) -> Result<Response, OrderServiceError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	Err(classify_failure(status, body))
}

async fn parse_json<T: DeserializeOwned>(
	response: Response,
	endpoint: &str,
) -> Result<T, OrderServiceError> {
	let response = check_status(response).await?;
	response.json().await.map_err(|e| {
		OrderServiceError::InvalidResponse(format!("Failed to parse {} response: {}", endpoint, e))
	})
}

fn network(e: reqwest::Error) -> OrderServiceError {
	OrderServiceError::Network(e.to_string())
}

#[async_trait]
impl OrderServiceInterface for HttpOrderService {
	async fn route(&self, request: &RouteRequest) -> Result<RouteResponse, OrderServiceError> {
		let response = self
			.client
			.post(self.url("route"))
			.json(request)
			.send()
			.await
			.map_err(network)?;
		parse_json(response, "route").await
	}

	async fn process(
		&self,
		request: &ProcessRequest,
	) -> Result<ProcessResponse, OrderServiceError> {
		let response = self
			.client
			.post(self.url("process"))
			.json(request)
			.send()
			.await
			.map_err(network)?;
		parse_json(response, "process").await
	}

	async fn finalize(&self, request: &FinalizeRequest) -> Result<(), OrderServiceError> {
		let response = self
			.client
			.post(self.url("finalize"))
			.json(request)
			.send()
			.await
			.map_err(network)?;
		check_status(response).await?;
		debug!(order_hash = %request.order_hash, "Order accepted for relay");
		Ok(())
	}

	async fn status(&self, order_hash: &str) -> Result<StatusResponse, OrderServiceError> {
		let response = self
			.client
			.get(self.url("status"))
			.query(&[("orderHash", order_hash)])
			.send()
			.await
			.map_err(network)?;
		parse_json(response, "status").await
	}
}

/// Factory function building the client from the `[order_service]` section.
pub fn create_order_service(
	config: &OrderServiceConfig,
) -> Result<Box<dyn OrderServiceInterface>, OrderServiceError> {
	let client = match &config.api_key {
		Some(key) => key.with_exposed(|key| {
			HttpOrderService::new(
				&config.api_url,
				Some(key),
				Duration::from_secs(config.request_timeout_seconds),
			)
		})?,
		None => HttpOrderService::new(
			&config.api_url,
			None,
			Duration::from_secs(config.request_timeout_seconds),
		)?,
	};
	Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_url_joins_paths() {
		let client =
			HttpOrderService::new("http://localhost:3001/payment/", None, Duration::from_secs(5))
				.unwrap();
		assert_eq!(client.url("finalize"), "http://localhost:3001/payment/finalize");
	}

	#[test]
	fn test_classify_failure() {
		assert!(matches!(
			classify_failure(StatusCode::NOT_FOUND, String::new()),
			OrderServiceError::NotFound(_)
		));
		assert!(matches!(
			classify_failure(StatusCode::TOO_MANY_REQUESTS, String::new()),
			OrderServiceError::RateLimited(_)
		));
		assert!(matches!(
			classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
			OrderServiceError::Http { status: 500, .. }
		));
	}

	#[test]
	fn test_invalid_api_key_is_rejected() {
		let result =
			HttpOrderService::new("http://localhost", Some("bad\nkey"), Duration::from_secs(5));
		assert!(matches!(result, Err(OrderServiceError::Network(_))));
	}

	#[test]
	fn test_factory_uses_config() {
		let config = OrderServiceConfig::default();
		assert!(create_order_service(&config).is_ok());
	}
}
