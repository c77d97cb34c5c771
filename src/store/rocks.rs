use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ErrorKind, OptimisticTransactionDB};
use tracing::{debug, warn};

use super::{Item, Key, Store, StoreError, apply_add};
use crate::encoding::StoredItem;

/// Attempts for a transaction that keeps losing write conflicts
const MAX_RETRIES: usize = 64;

/// RocksDB-backed store
///
/// Records live under a length-prefixed `(table, key)` address as encoded [`StoredItem`]s. Increments run
/// in optimistic transactions that are retried when another writer touched
/// the same record first.
pub struct RocksStore {
  db: Arc<OptimisticTransactionDB>,
}

impl RocksStore {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let db: OptimisticTransactionDB = OptimisticTransactionDB::open_default(path)?;
    Ok(Self { db: Arc::new(db) })
  }

  /// Length-prefixed `table`, `key.name` and `key.value`, so no two
  /// distinct addresses share a storage key.
  fn storage_key(table: &str, key: &Key) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + table.len() + key.name.len() + key.value.len());
    for part in [table, key.name.as_str(), key.value.as_str()] {
      buf.extend_from_slice(&(part.len() as u32).to_be_bytes());
      buf.extend_from_slice(part.as_bytes());
    }
    buf
  }

  /// Run blocking rocksdb work off the async executor
  async fn blocking<T, F>(&self, work: F) -> Result<T, StoreError>
  where
    T: Send + 'static,
    F: FnOnce(&OptimisticTransactionDB) -> Result<T, StoreError> + Send + 'static,
  {
    let db = Arc::clone(&self.db);
    tokio::task::spawn_blocking(move || work(&*db))
      .await
      .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
  }
}

fn is_conflict(err: &rocksdb::Error) -> bool {
  matches!(err.kind(), ErrorKind::Busy | ErrorKind::TryAgain)
}

fn decode(bytes: &[u8]) -> Result<Item, StoreError> {
  Ok(StoredItem::decode(bytes)?.attributes)
}

#[async_trait]
impl Store for RocksStore {
  async fn get_item(&self, table: &str, key: &Key) -> Result<Option<Item>, StoreError> {
    let storage_key = Self::storage_key(table, key);
    self
      .blocking(move |db| match db.get(&storage_key)? {
        Some(bytes) => decode(&bytes).map(Some),
        None => Ok(None),
      })
      .await
  }

  async fn put_item(
    &self,
    table: &str,
    key: &Key,
    mut item: Item,
    if_absent: bool,
  ) -> Result<bool, StoreError> {
    let storage_key = Self::storage_key(table, key);
    item.insert(key.name.clone(), key.value.clone().into());
    let encoded = StoredItem::new(item).encode()?;

    self
      .blocking(move |db| {
        let mut retries = 0;
        loop {
          let txn = db.transaction();
          if if_absent && txn.get_for_update(&storage_key, true)?.is_some() {
            return Ok(false);
          }
          txn.put(&storage_key, &encoded)?;

          match txn.commit() {
            Ok(()) => return Ok(true),
            Err(e) if is_conflict(&e) && retries < MAX_RETRIES => {
              retries += 1;
              debug!("put conflict, retrying ({}/{})", retries, MAX_RETRIES);
            }
            Err(e) => return Err(StoreError::RocksDb(e)),
          }
        }
      })
      .await
  }

  async fn add(
    &self,
    table: &str,
    key: &Key,
    attribute: &str,
    delta: i64,
  ) -> Result<Option<Item>, StoreError> {
    let storage_key = Self::storage_key(table, key);
    let key = key.clone();
    let attribute = attribute.to_string();

    self
      .blocking(move |db| {
        let mut retries = 0;
        loop {
          let txn = db.transaction();
          let bytes = txn
            .get_for_update(&storage_key, true)?
            .ok_or_else(|| StoreError::Validation(format!("no record for {}", key)))?;

          let mut record = StoredItem::decode(&bytes)?;
          let changed = apply_add(&mut record.attributes, &key, &attribute, delta)?;
          txn.put(&storage_key, record.encode()?)?;

          match txn.commit() {
            Ok(()) => return Ok(Some(changed)),
            Err(e) if is_conflict(&e) && retries < MAX_RETRIES => {
              retries += 1;
              debug!("add conflict on {}, retrying ({}/{})", key, retries, MAX_RETRIES);
            }
            Err(e) => {
              warn!("add on {} failed after {} retries: {}", key, retries, e);
              return Err(StoreError::RocksDb(e));
            }
          }
        }
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tempfile::{TempDir, tempdir};

  const TABLE: &str = "fixtures";

  /// Bind as `(_dir, store)` so the store drops before its directory
  async fn seeded(count: i64) -> (TempDir, RocksStore) {
    let dir = tempdir().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let mut item = Item::new();
    item.insert("like_count".to_string(), json!(count));
    store
      .put_item(TABLE, &Key::new("id", "likes"), item, false)
      .await
      .unwrap();
    (dir, store)
  }

  #[test]
  fn test_storage_keys_do_not_collide() {
    let nested_table = RocksStore::storage_key("a/b", &Key::new("id", "c"));
    let nested_key = RocksStore::storage_key("a", &Key::new("id", "b/c"));
    assert_ne!(nested_table, nested_key);

    let other_name = RocksStore::storage_key("a", &Key::new("pk", "c"));
    assert_ne!(RocksStore::storage_key("a", &Key::new("id", "c")), other_name);
  }

  #[tokio::test]
  async fn test_put_and_get() {
    let (_dir, store) = seeded(7).await;

    let stored = store
      .get_item(TABLE, &Key::new("id", "likes"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored["id"], json!("likes"));
    assert_eq!(stored["like_count"], json!(7));

    let missing = store.get_item(TABLE, &Key::new("id", "other")).await.unwrap();
    assert!(missing.is_none());
  }

  #[tokio::test]
  async fn test_tables_are_separate() {
    let (_dir, store) = seeded(7).await;

    let elsewhere = store
      .get_item("other-table", &Key::new("id", "likes"))
      .await
      .unwrap();
    assert!(elsewhere.is_none());
  }

  #[tokio::test]
  async fn test_put_if_absent_keeps_existing() {
    let (_dir, store) = seeded(7).await;

    let mut item = Item::new();
    item.insert("like_count".to_string(), json!(0));
    let written = store
      .put_item(TABLE, &Key::new("id", "likes"), item, true)
      .await
      .unwrap();
    assert!(!written);

    let stored = store
      .get_item(TABLE, &Key::new("id", "likes"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored["like_count"], json!(7));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_adds_are_not_lost() {
    let (_dir, store) = seeded(0).await;
    let store = Arc::new(store);

    let tasks: Vec<_> = (0..20)
      .map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
          store
            .add(TABLE, &Key::new("id", "likes"), "like_count", 1)
            .await
            .unwrap()
        })
      })
      .collect();
    for task in futures::future::join_all(tasks).await {
      task.unwrap();
    }

    let stored = store
      .get_item(TABLE, &Key::new("id", "likes"))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored["like_count"], json!(20));
  }

  #[tokio::test]
  async fn test_add_missing_record() {
    let dir = tempdir().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();

    let err = store
      .add(TABLE, &Key::new("id", "likes"), "like_count", 1)
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
  }
}
