//! Builder pattern for constructing payment engines.
//!
//! Composes a [`PaymentEngine`] from configuration and factory functions for
//! each pluggable component: storage and account backends are chosen by name
//! from the configuration, the chain client, attestation client and order
//! service client are built from their configuration sections.

use crate::engine::{event_bus::EventBus, PaymentEngine};
use crate::handlers::{BridgeSettings, BridgeTransferHandler, SignedOrderHandler};
use crate::retry::RetryPolicy;
use payment_account::{AccountError, AccountInterface, AccountService};
use payment_attestation::{AttestationError, AttestationInterface, AttestationService};
use payment_config::{AttestationConfig, Config, NetworksConfig, OrderServiceConfig};
use payment_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use payment_order::{OrderService, OrderServiceError, OrderServiceInterface};
use payment_storage::{StorageError, StorageInterface, StorageService};
use payment_types::{ChainRegistry, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions needed to build a [`PaymentEngine`].
///
/// Storage and account factories are keyed by implementation name; the other
/// components have a single implementation each.
pub struct PaymentFactories<SF, AF, DF, ATF, OSF> {
	pub storage_factories: HashMap<String, SF>,
	pub account_factories: HashMap<String, AF>,
	pub delivery_factory: DF,
	pub attestation_factory: ATF,
	pub order_service_factory: OSF,
}

/// Builder for constructing a [`PaymentEngine`] with pluggable implementations.
pub struct PaymentBuilder {
	config: Config,
}

impl PaymentBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, failing on the first component that cannot be created.
	pub async fn build<SF, AF, DF, ATF, OSF>(
		self,
		factories: PaymentFactories<SF, AF, DF, ATF, OSF>,
	) -> Result<PaymentEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		DF: Fn(&NetworksConfig, &SecretString) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
		ATF: Fn(&AttestationConfig) -> Result<Box<dyn AttestationInterface>, AttestationError>,
		OSF: Fn(&OrderServiceConfig) -> Result<Box<dyn OrderServiceInterface>, OrderServiceError>,
	{
		let config = &self.config;

		let storage_name = &config.storage.primary;
		let storage_config = config.storage.implementations.get(storage_name).ok_or_else(|| {
			BuilderError::Config(format!("Primary storage '{}' is not configured", storage_name))
		})?;
		let storage_factory = factories.storage_factories.get(storage_name).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", storage_name))
		})?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			tracing::error!(component = "storage", implementation = %storage_name, error = %e, "Failed to create storage implementation");
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				storage_name, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");
		let storage = Arc::new(StorageService::new(storage_backend));

		let account_name = &config.account.primary;
		let account_config = config.account.implementations.get(account_name).ok_or_else(|| {
			BuilderError::Config(format!("Primary account '{}' is not configured", account_name))
		})?;
		let account_factory = factories.account_factories.get(account_name).ok_or_else(|| {
			BuilderError::MissingComponent(format!("account implementation '{}'", account_name))
		})?;
		let account_backend = account_factory(account_config).map_err(|e| {
			tracing::error!(component = "account", implementation = %account_name, error = %e, "Failed to create account implementation");
			BuilderError::Config(format!(
				"Failed to create account implementation '{}': {}",
				account_name, e
			))
		})?;
		let account = Arc::new(AccountService::new(account_backend));
		let address = account
			.get_address()
			.await
			.map_err(|e| BuilderError::Config(format!("Failed to get account address: {}", e)))?;
		tracing::info!(component = "account", implementation = %account_name, address = %address, "Loaded");

		let delivery_backend =
			(factories.delivery_factory)(&config.networks, &account.get_private_key()).map_err(|e| {
				tracing::error!(component = "delivery", error = %e, "Failed to create chain client");
				BuilderError::Config(format!("Failed to create chain client: {}", e))
			})?;
		let delivery = Arc::new(DeliveryService::new(Arc::from(delivery_backend)));
		let mut chains: Vec<u64> = config.networks.keys().copied().collect();
		chains.sort_unstable();
		tracing::info!(component = "delivery", networks = ?chains, "Loaded");

		let attestation_backend = (factories.attestation_factory)(&config.attestation).map_err(|e| {
			BuilderError::Config(format!("Failed to create attestation client: {}", e))
		})?;
		let attestation = Arc::new(AttestationService::new(attestation_backend));
		tracing::info!(component = "attestation", url = %config.attestation.api_url, "Loaded");

		let order_backend = (factories.order_service_factory)(&config.order_service).map_err(|e| {
			BuilderError::Config(format!("Failed to create order service client: {}", e))
		})?;
		let order_service = Arc::new(OrderService::new(order_backend));
		tracing::info!(component = "order_service", url = %config.order_service.api_url, "Loaded");

		let registry = Arc::new(ChainRegistry::new(config.service.environment));
		let event_bus = EventBus::new(1000);
		let retry = RetryPolicy::from(&config.retry);

		let bridge = BridgeTransferHandler::new(
			registry.clone(),
			delivery,
			attestation,
			account.clone(),
			event_bus.clone(),
			BridgeSettings::from_config(&config.bridge, &config.attestation),
			retry.clone(),
		);
		let orders = SignedOrderHandler::new(
			order_service.clone(),
			account,
			event_bus.clone(),
			config.order_service.poll_interval(),
			config.order_service.max_poll_attempts,
			retry,
		);

		Ok(PaymentEngine::new(
			self.config,
			registry,
			bridge,
			orders,
			order_service,
			storage,
			event_bus,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{FakeChain, ScriptedAttestation, ScriptedOrderService};
	use payment_config::builders::ConfigBuilder;
	use payment_types::Environment;

	fn fake_delivery(
		_: &NetworksConfig,
		_: &SecretString,
	) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
		Ok(Box::new(FakeChain::new()))
	}

	fn fake_attestation(
		_: &AttestationConfig,
	) -> Result<Box<dyn AttestationInterface>, AttestationError> {
		Ok(Box::new(ScriptedAttestation::new(vec![])))
	}

	fn fake_order_service(
		_: &OrderServiceConfig,
	) -> Result<Box<dyn OrderServiceInterface>, OrderServiceError> {
		Ok(Box::new(ScriptedOrderService::new(vec![])))
	}

	type Factories = PaymentFactories<
		payment_storage::StorageFactory,
		payment_account::AccountFactory,
		fn(&NetworksConfig, &SecretString) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
		fn(&AttestationConfig) -> Result<Box<dyn AttestationInterface>, AttestationError>,
		fn(&OrderServiceConfig) -> Result<Box<dyn OrderServiceInterface>, OrderServiceError>,
	>;

	fn factories() -> Factories {
		PaymentFactories {
			storage_factories: payment_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			account_factories: payment_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			delivery_factory: fake_delivery,
			attestation_factory: fake_attestation,
			order_service_factory: fake_order_service,
		}
	}

	#[tokio::test]
	async fn test_build_from_config() {
		let config = ConfigBuilder::new().environment(Environment::Mainnet).build();
		let engine = PaymentBuilder::new(config).build(factories()).await.unwrap();

		assert_eq!(engine.registry().environment(), Environment::Mainnet);
		assert_eq!(engine.config().service.id, "test-payments");
		assert_eq!(engine.registry().descriptor(1).unwrap().domain, 0);
	}

	#[tokio::test]
	async fn test_unknown_storage_is_rejected() {
		let mut config = ConfigBuilder::new().build();
		config.storage.primary = "redis".to_string();
		config
			.storage
			.implementations
			.insert("redis".to_string(), toml::Value::Table(Default::default()));

		let err = PaymentBuilder::new(config)
			.build(factories())
			.await
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(_)));
	}

	#[tokio::test]
	async fn test_invalid_account_key_is_rejected() {
		let mut config = ConfigBuilder::new().build();
		let mut local = toml::map::Map::new();
		local.insert("private_key".to_string(), toml::Value::String("0x1234".to_string()));
		config
			.account
			.implementations
			.insert("local".to_string(), toml::Value::Table(local));

		let err = PaymentBuilder::new(config)
			.build(factories())
			.await
			.err()
			.unwrap();
		assert!(matches!(err, BuilderError::Config(_)));
	}
}
