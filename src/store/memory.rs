use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Item, Key, Store, StoreError, apply_add};

type Table = HashMap<String, Item>;

/// In-memory key-value store
///
/// A single write lock covers each `add`, so concurrent increments are
/// serialized inside the store.
pub struct MemoryStore {
  tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
  /// Create a new store without any tables
  pub fn new() -> Self {
    Self {
      tables: RwLock::new(HashMap::new()),
    }
  }

  /// Create a table, a no-op if it already exists
  pub fn create_table(&self, name: impl Into<String>) -> Result<(), StoreError> {
    let mut tables = self.tables.write().map_err(|_| poisoned())?;
    tables.entry(name.into()).or_default();
    Ok(())
  }
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

fn poisoned() -> StoreError {
  StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl Store for MemoryStore {
  async fn get_item(&self, table: &str, key: &Key) -> Result<Option<Item>, StoreError> {
    let tables = self.tables.read().map_err(|_| poisoned())?;
    let rows = tables
      .get(table)
      .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
    Ok(rows.get(&key.value).cloned())
  }

  async fn put_item(
    &self,
    table: &str,
    key: &Key,
    mut item: Item,
    if_absent: bool,
  ) -> Result<bool, StoreError> {
    let mut tables = self.tables.write().map_err(|_| poisoned())?;
    let rows = tables
      .get_mut(table)
      .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

    if if_absent && rows.contains_key(&key.value) {
      return Ok(false);
    }

    item.insert(key.name.clone(), key.value.clone().into());
    rows.insert(key.value.clone(), item);
    Ok(true)
  }

  async fn add(
    &self,
    table: &str,
    key: &Key,
    attribute: &str,
    delta: i64,
  ) -> Result<Option<Item>, StoreError> {
    let mut tables = self.tables.write().map_err(|_| poisoned())?;
    let rows = tables
      .get_mut(table)
      .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

    let stored = rows
      .get_mut(&key.value)
      .ok_or_else(|| StoreError::Validation(format!("no record for {}", key)))?;

    apply_add(stored, key, attribute, delta).map(Some)
  }
}
