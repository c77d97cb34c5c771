//! Counter store adapter
//!
//! Reads and increments the single like counter record. The new count always
//! comes back from the store's atomic update and is never computed here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CounterConfig;
use crate::store::{Item, Key, Store, StoreError};

/// Attribute holding the count
pub const LIKE_COUNT_ATTRIBUTE: &str = "like_count";

/// The counter record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
  /// Absent from update payloads, which only carry changed attributes
  #[serde(default)]
  pub id: String,
  pub like_count: i64,
}

#[derive(Debug, Error)]
pub enum CounterError {
  #[error("counter record {0} not found")]
  NotFound(Key),

  #[error("store returned no updated attributes for {0}")]
  NoUpdatedAttributes(Key),

  #[error("failed to decode counter record: {0}")]
  Decode(#[from] serde_json::Error),

  #[error(transparent)]
  Store(#[from] StoreError),
}

pub struct LikeCounter {
  store: Arc<dyn Store>,
  config: CounterConfig,
  key: Key,
}

impl LikeCounter {
  pub fn new(store: Arc<dyn Store>, config: CounterConfig) -> Self {
    let key = Key::new(config.key_name.clone(), config.record_id.clone());
    Self { store, config, key }
  }

  pub fn key(&self) -> &Key {
    &self.key
  }

  /// Fetch the current count
  pub async fn read(&self) -> Result<i64, CounterError> {
    let item = self
      .store
      .get_item(&self.config.table, &self.key)
      .await?
      .ok_or_else(|| CounterError::NotFound(self.key.clone()))?;

    let counter = decode(item)?;
    debug!("Read {} from {}", counter.like_count, self.key);
    Ok(counter.like_count)
  }

  /// Increment the count by one inside the store and return the new value
  pub async fn increment_and_get(&self) -> Result<i64, CounterError> {
    let updated = self
      .store
      .add(&self.config.table, &self.key, LIKE_COUNT_ATTRIBUTE, 1)
      .await?
      .ok_or_else(|| CounterError::NoUpdatedAttributes(self.key.clone()))?;

    let counter = decode(updated)?;
    debug!("Incremented {} to {}", self.key, counter.like_count);
    Ok(counter.like_count)
  }

  /// Seed the record with `initial` unless it already exists.
  ///
  /// Returns whether the record was written.
  pub async fn provision(&self, initial: i64) -> Result<bool, CounterError> {
    let mut item = Item::new();
    item.insert(LIKE_COUNT_ATTRIBUTE.to_string(), initial.into());

    let written = self
      .store
      .put_item(&self.config.table, &self.key, item, true)
      .await?;
    if written {
      info!("Provisioned {} in {} with count {}", self.key, self.config.table, initial);
    } else {
      info!("Counter {} already exists in {}", self.key, self.config.table);
    }
    Ok(written)
  }
}

fn decode(item: Item) -> Result<Counter, CounterError> {
  Ok(serde_json::from_value(serde_json::Value::Object(item))?)
}
