//! File-based storage backend implementation.
//!
//! This module provides a filesystem implementation of the
//! StorageInterface trait, persisting each value as a JSON document under
//! a base directory. Namespaced keys (`orders:123`) map to one file per
//! record inside a per-namespace subdirectory, which keeps prefix listing
//! a plain directory read.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use orderly_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// File-based storage implementation.
///
/// Values are written atomically (temp file + rename). All mutations are
/// serialized through a single write lock so that compare-and-swap reads
/// and writes the same generation of a file.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Serializes mutating operations.
	write_lock: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			write_lock: Mutex::new(()),
		}
	}

	/// Converts a storage key to a filesystem path.
	///
	/// `namespace:id` becomes `<base>/<namespace>/<id>.json`; keys without
	/// a namespace live directly under the base directory. The id part is
	/// sanitized to be filesystem-safe.
	fn file_path(&self, key: &str) -> PathBuf {
		match key.split_once(':') {
			Some((namespace, id)) => {
				let safe_id = id.replace(['/', ':'], "_");
				self.base_path
					.join(namespace)
					.join(format!("{}.json", safe_id))
			},
			None => {
				let safe_key = key.replace(['/', ':'], "_");
				self.base_path.join(format!("{}.json", safe_key))
			},
		}
	}

	/// Reads the current bytes for a key, if the file exists.
	async fn read_current(&self, path: &PathBuf) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	/// Writes bytes atomically by writing to a temp file then renaming.
	async fn write_atomic(&self, path: &PathBuf, value: &[u8]) -> Result<(), StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);
		self.read_current(&path)
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let path = self.file_path(key);
		self.write_atomic(&path, &value).await
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		expected: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let path = self.file_path(key);

		let current = self.read_current(&path).await?;
		let matches = match (&current, expected) {
			(Some(stored), Some(expected)) => stored.as_slice() == expected,
			(None, None) => true,
			_ => false,
		};
		if !matches {
			return Err(StorageError::Conflict);
		}

		self.write_atomic(&path, &value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let path = self.file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.file_path(key).exists())
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let (dir, namespace, stem_prefix) = match prefix.split_once(':') {
			Some((namespace, rest)) => (
				self.base_path.join(namespace),
				Some(namespace.to_string()),
				rest.to_string(),
			),
			None => (self.base_path.clone(), None, prefix.to_string()),
		};

		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("json")) {
				continue;
			}
			let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};
			if !stem.starts_with(&stem_prefix) {
				continue;
			}
			match &namespace {
				Some(ns) => keys.push(format!("{}:{}", ns, stem)),
				None => keys.push(stem.to_string()),
			}
		}
		keys.sort();
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![], // No required fields
			vec![Field::new("storage_path", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}
