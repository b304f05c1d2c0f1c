//! Configuration module for the cross-chain payment system.
//!
//! This module provides structures and utilities for managing payment service
//! configuration. It supports loading configuration from TOML files, resolving
//! environment variables and validating every section before use.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(feature = "testing")]
pub mod builders;
mod loader;

use payment_types::{Environment, SecretString};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the payment service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity and environment of this service instance.
	pub service: ServiceConfig,
	/// RPC endpoints keyed by chain id.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Configuration for account management.
	pub account: AccountConfig,
	/// Configuration for the archive storage backend.
	pub storage: StorageConfig,
	/// Attestation service endpoint and polling.
	#[serde(default)]
	pub attestation: AttestationConfig,
	/// Order-construction service endpoint and status polling.
	#[serde(default)]
	pub order_service: OrderServiceConfig,
	/// Burn-and-mint execution parameters.
	#[serde(default)]
	pub bridge: BridgeConfig,
	/// Backoff policy for rate-limited HTTP calls.
	#[serde(default)]
	pub retry: RetryConfig,
	/// Route selection parameters.
	#[serde(default)]
	pub routing: RoutingConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance.
	pub id: String,
	/// Network environment used to build the chain registry.
	#[serde(default)]
	pub environment: Environment,
}

/// Configuration for a single blockchain network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// The HTTP(S) RPC endpoint for blockchain interaction.
	pub rpc_url: String,
}

/// Networks configuration mapping chain IDs to their configurations.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes the networks table, whose chain ids arrive as string keys in TOML.
fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Attestation service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttestationConfig {
	/// Base URL of the attestation API.
	#[serde(default = "default_attestation_url")]
	pub api_url: String,
	#[serde(default = "default_attestation_poll_interval")]
	pub poll_interval_seconds: u64,
	/// Upper bound on the attestation wait. Zero waits until cancelled.
	#[serde(default = "default_attestation_timeout")]
	pub timeout_seconds: u64,
	#[serde(default = "default_request_timeout")]
	pub request_timeout_seconds: u64,
}

fn default_attestation_url() -> String {
	"https://iris-api-sandbox.circle.com".to_string()
}

fn default_attestation_poll_interval() -> u64 {
	5
}

/// Returns the default attestation wait of 30 minutes.
fn default_attestation_timeout() -> u64 {
	1800
}

fn default_request_timeout() -> u64 {
	30
}

impl Default for AttestationConfig {
	fn default() -> Self {
		Self {
			api_url: default_attestation_url(),
			poll_interval_seconds: default_attestation_poll_interval(),
			timeout_seconds: default_attestation_timeout(),
			request_timeout_seconds: default_request_timeout(),
		}
	}
}

impl AttestationConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}

	/// Attestation wait bound, `None` when unbounded.
	pub fn timeout(&self) -> Option<Duration> {
		(self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
	}
}

/// Order-construction service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderServiceConfig {
	/// Base URL of the order service API.
	#[serde(default = "default_order_service_url")]
	pub api_url: String,
	/// Optional API key sent as a bearer token.
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default = "default_order_poll_interval")]
	pub poll_interval_seconds: u64,
	#[serde(default = "default_max_poll_attempts")]
	pub max_poll_attempts: u32,
	#[serde(default = "default_request_timeout")]
	pub request_timeout_seconds: u64,
}

fn default_order_service_url() -> String {
	"http://localhost:3001/payment".to_string()
}

fn default_order_poll_interval() -> u64 {
	10
}

fn default_max_poll_attempts() -> u32 {
	30
}

impl Default for OrderServiceConfig {
	fn default() -> Self {
		Self {
			api_url: default_order_service_url(),
			api_key: None,
			poll_interval_seconds: default_order_poll_interval(),
			max_poll_attempts: default_max_poll_attempts(),
			request_timeout_seconds: default_request_timeout(),
		}
	}
}

impl OrderServiceConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}
}

/// Burn-and-mint execution parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	/// Minimum finality threshold requested on burn.
	#[serde(default = "default_finality_threshold")]
	pub finality_threshold: u32,
	/// Total mint attempts before the transfer fails.
	#[serde(default = "default_mint_max_attempts")]
	pub mint_max_attempts: u32,
	#[serde(default = "default_mint_retry_delay")]
	pub mint_retry_delay_seconds: u64,
	/// Native balance the recipient must hold on the destination chain, in wei.
	#[serde(default = "default_min_destination_gas")]
	pub min_destination_gas_wei: u64,
	/// Percentage added on top of the mint gas estimate.
	#[serde(default = "default_gas_buffer_percent")]
	pub gas_buffer_percent: u64,
}

fn default_finality_threshold() -> u32 {
	1000
}

fn default_mint_max_attempts() -> u32 {
	3
}

fn default_mint_retry_delay() -> u64 {
	5
}

/// Returns 0.01 native tokens expressed in wei.
fn default_min_destination_gas() -> u64 {
	10_000_000_000_000_000
}

fn default_gas_buffer_percent() -> u64 {
	50
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			finality_threshold: default_finality_threshold(),
			mint_max_attempts: default_mint_max_attempts(),
			mint_retry_delay_seconds: default_mint_retry_delay(),
			min_destination_gas_wei: default_min_destination_gas(),
			gas_buffer_percent: default_gas_buffer_percent(),
		}
	}
}

impl BridgeConfig {
	pub fn mint_retry_delay(&self) -> Duration {
		Duration::from_secs(self.mint_retry_delay_seconds)
	}
}

/// Backoff policy for rate-limited HTTP calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	#[serde(default = "default_retry_attempts")]
	pub max_attempts: u32,
	#[serde(default = "default_initial_delay_ms")]
	pub initial_delay_ms: u64,
	#[serde(default = "default_backoff_factor")]
	pub backoff_factor: f64,
	/// Wall-clock bound across all attempts.
	#[serde(default = "default_max_elapsed")]
	pub max_elapsed_seconds: u64,
}

fn default_retry_attempts() -> u32 {
	3
}

fn default_initial_delay_ms() -> u64 {
	1000
}

fn default_backoff_factor() -> f64 {
	2.0
}

fn default_max_elapsed() -> u64 {
	60
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: default_retry_attempts(),
			initial_delay_ms: default_initial_delay_ms(),
			backoff_factor: default_backoff_factor(),
			max_elapsed_seconds: default_max_elapsed(),
		}
	}
}

/// Route selection parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
	/// Chains the signed-order protocol can settle on.
	#[serde(default = "default_signed_order_chains")]
	pub signed_order_chains: Vec<u64>,
}

fn default_signed_order_chains() -> Vec<u64> {
	vec![1, 10, 56, 100, 137, 324, 8453, 42161, 43114, 59144]
}

impl Default for RoutingConfig {
	fn default() -> Self {
		Self {
			signed_order_chains: default_signed_order_chains(),
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse so earlier offsets stay valid
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Returns the RPC URL configured for a chain.
	pub fn rpc_url(&self, chain_id: u64) -> Option<&str> {
		self.networks.get(&chain_id).map(|n| n.rpc_url.as_str())
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if network.rpc_url.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have rpc_url",
					chain_id
				)));
			}
		}

		if !self
			.account
			.implementations
			.contains_key(&self.account.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}

		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if self.attestation.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"attestation.poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.order_service.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"order_service.poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.order_service.max_poll_attempts == 0 {
			return Err(ConfigError::Validation(
				"order_service.max_poll_attempts must be at least 1".into(),
			));
		}

		if self.bridge.mint_max_attempts == 0 {
			return Err(ConfigError::Validation(
				"bridge.mint_max_attempts must be at least 1".into(),
			));
		}
		if self.bridge.gas_buffer_percent > 500 {
			return Err(ConfigError::Validation(
				"bridge.gas_buffer_percent cannot exceed 500".into(),
			));
		}

		if self.retry.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"retry.max_attempts must be at least 1".into(),
			));
		}
		if self.retry.backoff_factor < 1.0 {
			return Err(ConfigError::Validation(
				"retry.backoff_factor must be at least 1.0".into(),
			));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[service]
id = "payments-test"

[networks.11155111]
rpc_url = "http://localhost:8545"

[networks.43113]
rpc_url = "http://localhost:8546"

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("PAYMENT_TEST_HOST", "localhost");
		std::env::set_var("PAYMENT_TEST_PORT", "8545");

		let input = "url = \"http://${PAYMENT_TEST_HOST}:${PAYMENT_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8545\"");

		std::env::remove_var("PAYMENT_TEST_HOST");
		std::env::remove_var("PAYMENT_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${PAYMENT_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${PAYMENT_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("PAYMENT_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.service.environment, Environment::Testnet);
		assert_eq!(config.rpc_url(43113), Some("http://localhost:8546"));
		assert_eq!(config.attestation.poll_interval(), Duration::from_secs(5));
		assert_eq!(
			config.attestation.timeout(),
			Some(Duration::from_secs(1800))
		);
		assert_eq!(config.order_service.max_poll_attempts, 30);
		assert_eq!(config.order_service.poll_interval(), Duration::from_secs(10));
		assert_eq!(config.bridge.finality_threshold, 1000);
		assert_eq!(config.bridge.mint_max_attempts, 3);
		assert_eq!(config.bridge.min_destination_gas_wei, 10_000_000_000_000_000);
		assert_eq!(config.bridge.gas_buffer_percent, 50);
		assert_eq!(config.retry.max_attempts, 3);
		assert_eq!(config.retry.initial_delay_ms, 1000);
		assert!(config.routing.signed_order_chains.contains(&137));
	}

	#[test]
	fn test_overrides_and_unbounded_attestation() {
		let config_str = format!("{}\n[attestation]\ntimeout_seconds = 0\n", BASE_CONFIG);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.attestation.timeout(), None);
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("PAYMENT_TEST_SERVICE_ID", "from-env");

		let config_str = BASE_CONFIG.replace("payments-test", "${PAYMENT_TEST_SERVICE_ID}");
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.id, "from-env");

		std::env::remove_var("PAYMENT_TEST_SERVICE_ID");
	}

	#[test]
	fn test_mainnet_environment() {
		let config_str = BASE_CONFIG.replace(
			"id = \"payments-test\"",
			"id = \"payments-test\"\nenvironment = \"mainnet\"",
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.environment, Environment::Mainnet);
	}

	#[test]
	fn test_missing_primary_storage_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"file\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'file' not found in implementations"));
	}

	#[test]
	fn test_zero_poll_attempts_rejected() {
		let config_str = format!("{}\n[order_service]\nmax_poll_attempts = 0\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("max_poll_attempts"));
	}

	#[test]
	fn test_invalid_chain_id_key_rejected() {
		let config_str = BASE_CONFIG.replace("[networks.43113]", "[networks.fuji]");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Invalid chain_id 'fuji'"));
	}
}
