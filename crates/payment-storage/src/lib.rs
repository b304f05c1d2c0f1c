//! Archive storage for payment records.
//!
//! Terminal transfer and order states are written here once a run ends, so
//! that a payment's full log survives the process that executed it. Backends
//! are plain key-value stores; the service layer adds typed JSON access.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Namespaces records are archived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Burn-and-mint transfers, keyed by transfer id.
	Transfers,
	/// Signed orders, keyed by order hash.
	Orders,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Transfers => "transfers",
			StorageKey::Orders => "orders",
		}
	}
}

impl fmt::Display for StorageKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Low-level key-value interface implemented by storage backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists the keys that start with `prefix`.
	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Signature of the factory functions backends expose.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Returns every backend by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::NAME, file::create_storage as StorageFactory),
		(memory::NAME, memory::create_storage as StorageFactory),
	]
}

/// Typed storage on top of a backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: StorageKey, id: &str) -> String {
		format!("{}:{}", namespace.as_str(), id)
	}

	/// Serializes `data` as JSON and stores it under `namespace:id`.
	pub async fn store<T: Serialize>(
		&self,
		namespace: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	pub async fn remove(&self, namespace: StorageKey, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	pub async fn exists(&self, namespace: StorageKey, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Returns the ids stored in a namespace.
	pub async fn list(&self, namespace: StorageKey) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}:", namespace.as_str());
		let keys = self.backend.list_keys(&prefix).await?;
		Ok(keys
			.into_iter()
			.filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use payment_types::{TransferPhase, TransferState};

	#[tokio::test]
	async fn test_typed_round_trip_and_listing() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));

		let mut state = TransferState::new("transfer-1");
		state.phase = TransferPhase::Completed;
		state.log("Minted");

		service
			.store(StorageKey::Transfers, &state.id, &state)
			.await
			.unwrap();
		service
			.store(StorageKey::Orders, "0xabc", &"pending")
			.await
			.unwrap();

		let restored: TransferState = service
			.retrieve(StorageKey::Transfers, "transfer-1")
			.await
			.unwrap();
		assert_eq!(restored, state);

		let ids = service.list(StorageKey::Transfers).await.unwrap();
		assert_eq!(ids, vec!["transfer-1".to_string()]);
	}

	#[tokio::test]
	async fn test_retrieve_missing_and_wrong_type() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));

		let missing: Result<TransferState, _> =
			service.retrieve(StorageKey::Transfers, "nope").await;
		assert!(matches!(missing, Err(StorageError::NotFound)));

		service
			.store(StorageKey::Transfers, "bad", &42u32)
			.await
			.unwrap();
		let wrong: Result<TransferState, _> = service.retrieve(StorageKey::Transfers, "bad").await;
		assert!(matches!(wrong, Err(StorageError::Serialization(_))));
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["file", "memory"]);
	}
}
