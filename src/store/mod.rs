//! Key-value store boundary
//!
//! Items are attribute maps addressed by table and partition key. Every
//! backend must apply `add` as a single atomic operation on its side, callers
//! never read-modify-write a counter themselves.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
#[cfg(feature = "rocksdb")]
use crate::encoding::DecodeError;

pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;

/// Attribute map of a stored record
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Partition key of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
  /// Name of the key attribute
  pub name: String,
  /// Value of the key attribute
  pub value: String,
}

impl Key {
  pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: value.into(),
    }
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.name, self.value)
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("table not found: {0}")]
  TableNotFound(String),

  /// The request was well formed but cannot be applied to the stored data,
  /// e.g. incrementing an attribute that does not exist.
  #[error("validation failed: {0}")]
  Validation(String),

  /// The backend could not serve the call at all.
  #[error("store unavailable: {0}")]
  Unavailable(String),

  #[cfg(feature = "rocksdb")]
  #[error("corrupted record: {0}")]
  Corrupted(#[from] DecodeError),

  #[cfg(feature = "rocksdb")]
  #[error("rocksdb error: {0}")]
  RocksDb(#[from] rocksdb::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
  /// Point lookup of a single record
  async fn get_item(&self, table: &str, key: &Key) -> Result<Option<Item>, StoreError>;

  /// Write a record, stamping the key attribute into it.
  ///
  /// With `if_absent` an existing record is left untouched and `false` is
  /// returned.
  async fn put_item(
    &self,
    table: &str,
    key: &Key,
    item: Item,
    if_absent: bool,
  ) -> Result<bool, StoreError>;

  /// Atomically apply `attribute = attribute + delta` and return the updated
  /// attributes only.
  async fn add(
    &self,
    table: &str,
    key: &Key,
    attribute: &str,
    delta: i64,
  ) -> Result<Option<Item>, StoreError>;
}

/// Open the backend selected by the configuration
pub fn open(config: &StoreConfig, tables: &[&str]) -> Result<Arc<dyn Store>, StoreError> {
  match config.backend {
    StoreBackend::Memory => {
      info!("Opening in-memory store with tables {:?}", tables);
      let store = MemoryStore::new();
      for table in tables {
        store.create_table(*table)?;
      }
      Ok(Arc::new(store))
    }
    #[cfg(feature = "rocksdb")]
    StoreBackend::RocksDb => {
      info!("Opening rocksdb store at {}", config.path);
      Ok(Arc::new(RocksStore::open(&config.path)?))
    }
    #[cfg(not(feature = "rocksdb"))]
    StoreBackend::RocksDb => Err(StoreError::Unavailable(
      "rocksdb backend requires the `rocksdb` feature".to_string(),
    )),
  }
}

/// Apply `delta` to an integer attribute of `item` in place.
///
/// Shared by the backends so they agree on what counts as a valid increment.
pub(crate) fn apply_add(
  item: &mut Item,
  key: &Key,
  attribute: &str,
  delta: i64,
) -> Result<Item, StoreError> {
  let current = match item.get(attribute) {
    Some(value) => value.as_i64().ok_or_else(|| {
      StoreError::Validation(format!(
        "attribute '{}' of {} is not an integer",
        attribute, key
      ))
    })?,
    None => {
      return Err(StoreError::Validation(format!(
        "attribute '{}' does not exist in {}",
        attribute, key
      )));
    }
  };

  let updated = current.checked_add(delta).ok_or_else(|| {
    StoreError::Validation(format!("attribute '{}' of {} overflows", attribute, key))
  })?;
  item.insert(attribute.to_string(), updated.into());

  let mut changed = Item::new();
  changed.insert(attribute.to_string(), updated.into());
  Ok(changed)
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;

  /// Store whose every call fails, standing in for a network outage
  pub struct FailingStore;

  #[async_trait]
  impl Store for FailingStore {
    async fn get_item(&self, _table: &str, _key: &Key) -> Result<Option<Item>, StoreError> {
      Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put_item(
      &self,
      _table: &str,
      _key: &Key,
      _item: Item,
      _if_absent: bool,
    ) -> Result<bool, StoreError> {
      Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn add(
      &self,
      _table: &str,
      _key: &Key,
      _attribute: &str,
      _delta: i64,
    ) -> Result<Option<Item>, StoreError> {
      Err(StoreError::Unavailable("connection refused".to_string()))
    }
  }

  /// Store that succeeds but never returns any data
  pub struct EmptyStore;

  #[async_trait]
  impl Store for EmptyStore {
    async fn get_item(&self, _table: &str, _key: &Key) -> Result<Option<Item>, StoreError> {
      Ok(None)
    }

    async fn put_item(
      &self,
      _table: &str,
      _key: &Key,
      _item: Item,
      _if_absent: bool,
    ) -> Result<bool, StoreError> {
      Ok(true)
    }

    async fn add(
      &self,
      _table: &str,
      _key: &Key,
      _attribute: &str,
      _delta: i64,
    ) -> Result<Option<Item>, StoreError> {
      Ok(None)
    }
  }
}
