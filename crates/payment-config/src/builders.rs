//! Configuration builder for test and development setups.

use crate::{
	AccountConfig, AttestationConfig, BridgeConfig, Config, NetworkConfig, OrderServiceConfig,
	RetryConfig, RoutingConfig, ServiceConfig, StorageConfig,
};
use payment_types::Environment;
use std::collections::HashMap;

/// Builds `Config` values with defaults suited to tests.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	environment: Environment,
	networks: Vec<(u64, String)>,
	attestation: AttestationConfig,
	order_service: OrderServiceConfig,
	bridge: BridgeConfig,
	retry: RetryConfig,
	routing: RoutingConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "test-payments".to_string(),
			environment: Environment::Testnet,
			networks: vec![
				(11155111, "http://localhost:8545".to_string()),
				(43113, "http://localhost:8546".to_string()),
			],
			attestation: AttestationConfig::default(),
			order_service: OrderServiceConfig::default(),
			bridge: BridgeConfig::default(),
			retry: RetryConfig::default(),
			routing: RoutingConfig::default(),
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = environment;
		self
	}

	pub fn network(mut self, chain_id: u64, rpc_url: impl Into<String>) -> Self {
		self.networks.push((chain_id, rpc_url.into()));
		self
	}

	pub fn attestation(mut self, attestation: AttestationConfig) -> Self {
		self.attestation = attestation;
		self
	}

	pub fn order_service(mut self, order_service: OrderServiceConfig) -> Self {
		self.order_service = order_service;
		self
	}

	pub fn bridge(mut self, bridge: BridgeConfig) -> Self {
		self.bridge = bridge;
		self
	}

	pub fn retry(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	pub fn routing(mut self, routing: RoutingConfig) -> Self {
		self.routing = routing;
		self
	}

	pub fn build(self) -> Config {
		let mut account_implementations = HashMap::new();
		let mut local = toml::map::Map::new();
		local.insert(
			"private_key".to_string(),
			toml::Value::String(
				"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
			),
		);
		account_implementations.insert("local".to_string(), toml::Value::Table(local));

		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Config {
			service: ServiceConfig {
				id: self.service_id,
				environment: self.environment,
			},
			networks: self
				.networks
				.into_iter()
				.map(|(chain_id, rpc_url)| (chain_id, NetworkConfig { rpc_url }))
				.collect(),
			account: AccountConfig {
				primary: "local".to_string(),
				implementations: account_implementations,
			},
			storage: StorageConfig {
				primary: "memory".to_string(),
				implementations: storage_implementations,
			},
			attestation: self.attestation,
			order_service: self.order_service,
			bridge: self.bridge,
			retry: self.retry,
			routing: self.routing,
		}
	}
}
