//! Storage module for the Orderly platform.
//!
//! This module provides the key-value persisted-state store the lifecycle
//! logic consumes as a collaborator. It supports different backend
//! implementations (in-memory for tests and development, file-based for
//! durable local state) behind a common interface, and exposes a typed
//! service layer with JSON serialization on top.
//!
//! The interface includes a compare-and-swap primitive so that callers can
//! enforce a conditional-update discipline on shared records, which is how
//! the rider-exclusivity rule is implemented at the persistence boundary.

use async_trait::async_trait;
use orderly_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
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
	/// Error that occurs when a conditional write loses against a
	/// concurrent writer.
	#[error("Conflict: stored value no longer matches the expected value")]
	Conflict,
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

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the platform. It provides basic key-value operations
/// plus prefix listing and an atomic compare-and-swap.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, creating or overwriting unconditionally.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Atomically replaces the value for `key` only if the stored bytes
	/// equal `expected`. Passing `None` for `expected` means the key must
	/// not exist yet.
	///
	/// Returns `StorageError::Conflict` when the comparison fails.
	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all keys starting with the given prefix.
	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used by the service to wire the configured backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic JSON serialization/deserialization. Keys are formed as
/// `namespace:id`.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
		serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.backend
			.set_bytes(&Self::key(namespace, id), Self::encode(data)?)
			.await
	}

	/// Stores a serializable value only if the key does not exist yet.
	pub async fn create<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.backend
			.compare_and_swap(&Self::key(namespace, id), None, Self::encode(data)?)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves and deserializes every value in a namespace.
	///
	/// Entries deleted between the listing and the read are skipped rather
	/// than surfaced as errors.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.list_keys(&prefix).await?;

		let mut values = Vec::with_capacity(keys.len());
		for key in keys {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => {
					let value = serde_json::from_slice(&bytes)
						.map_err(|e| StorageError::Serialization(e.to_string()))?;
					values.push(value);
				},
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(values)
	}

	/// Replaces an existing value only if it still matches `current`.
	///
	/// Both values are serialized and the swap happens atomically at the
	/// backend; a concurrent writer that got there first makes this fail
	/// with `StorageError::Conflict`.
	pub async fn update_if_matches<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		current: &T,
		next: &T,
	) -> Result<(), StorageError> {
		let expected = Self::encode(current)?;
		self.backend
			.compare_and_swap(
				&Self::key(namespace, id),
				Some(&expected),
				Self::encode(next)?,
			)
			.await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use serde::Deserialize;

	#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
	struct Record {
		id: String,
		count: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_typed_round_trip() {
		let service = service();
		let record = Record {
			id: "r1".into(),
			count: 3,
		};

		service.store("orders", "r1", &record).await.unwrap();
		let back: Record = service.retrieve("orders", "r1").await.unwrap();
		assert_eq!(back, record);

		service.remove("orders", "r1").await.unwrap();
		assert!(!service.exists("orders", "r1").await.unwrap());
	}

	#[tokio::test]
	async fn test_create_fails_on_existing_key() {
		let service = service();
		let record = Record {
			id: "r1".into(),
			count: 1,
		};

		service.create("orders", "r1", &record).await.unwrap();
		let result = service.create("orders", "r1", &record).await;
		assert!(matches!(result, Err(StorageError::Conflict)));
	}

	#[tokio::test]
	async fn test_update_if_matches_detects_stale_writer() {
		let service = service();
		let v1 = Record {
			id: "r1".into(),
			count: 1,
		};
		let v2 = Record {
			id: "r1".into(),
			count: 2,
		};
		let v3 = Record {
			id: "r1".into(),
			count: 3,
		};

		service.store("orders", "r1", &v1).await.unwrap();
		service
			.update_if_matches("orders", "r1", &v1, &v2)
			.await
			.unwrap();

		// Second writer still holds v1 and must lose
		let result = service.update_if_matches("orders", "r1", &v1, &v3).await;
		assert!(matches!(result, Err(StorageError::Conflict)));

		let stored: Record = service.retrieve("orders", "r1").await.unwrap();
		assert_eq!(stored, v2);
	}

	#[tokio::test]
	async fn test_retrieve_all_scopes_by_namespace() {
		let service = service();
		for i in 0..3 {
			let record = Record {
				id: format!("r{}", i),
				count: i,
			};
			service
				.store("orders", &record.id.clone(), &record)
				.await
				.unwrap();
		}
		service
			.store(
				"cart",
				"c1",
				&Record {
					id: "c1".into(),
					count: 9,
				},
			)
			.await
			.unwrap();

		let orders: Vec<Record> = service.retrieve_all("orders").await.unwrap();
		assert_eq!(orders.len(), 3);
	}
}
