//! File-based storage backend.
//!
//! Each record is a JSON file. The key namespace becomes a directory, so
//! `transfers:abc` is stored at `<storage_path>/transfers/abc.json`.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Configuration name of this backend.
pub const NAME: &str = "file";

const EXTENSION: &str = "json";

/// Storage that persists records as files under a base directory.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key to its file path, keeping ids filesystem-safe.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let (dir, id) = match key.split_once(':') {
			Some((namespace, id)) => (self.base_path.join(sanitize(namespace)), id),
			None => (self.base_path.clone(), key),
		};
		dir.join(format!("{}.{}", sanitize(id), EXTENSION))
	}
}

fn sanitize(segment: &str) -> String {
	segment.replace(['/', '\\', ':'], "_")
}

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.get_file_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await.map_err(backend_error)?;
		}

		// Write to a temp file then rename so readers never see partial records
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value).await.map_err(backend_error)?;
		fs::rename(&temp_path, &path).await.map_err(backend_error)?;

		tracing::debug!(key = %key, path = %path.display(), "Stored record");
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.get_file_path(key)).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(backend_error)
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let (namespace, id_prefix) = match prefix.split_once(':') {
			Some((namespace, rest)) => (Some(namespace), rest),
			None => (None, prefix),
		};
		let dir = match namespace {
			Some(namespace) => self.base_path.join(sanitize(namespace)),
			None => self.base_path.clone(),
		};

		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend_error(e)),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend_error)? {
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(EXTENSION)) {
				continue;
			}
			let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
				continue;
			};
			if !id.starts_with(id_prefix) {
				continue;
			}
			keys.push(match namespace {
				Some(namespace) => format!("{}:{}", namespace, id),
				None => id.to_string(),
			});
		}
		keys.sort();
		Ok(keys)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for records (default: "./data/payments")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = match config.get("storage_path") {
		None => "./data/payments",
		Some(value) => value.as_str().ok_or_else(|| {
			StorageError::Configuration("storage_path must be a string".to_string())
		})?,
	};

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}
