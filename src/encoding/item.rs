//! Item record encoding/decoding for storage

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Item;

/// Item record structure for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
  /// Format version
  pub version: u8,
  /// Attributes of the record, key attribute included
  pub attributes: Item,
}

impl StoredItem {
  /// Wrap attributes in a record of the current version
  pub fn new(attributes: Item) -> Self {
    Self {
      version: super::CURRENT_VERSION,
      attributes,
    }
  }

  /// Serialize to bytes
  pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
    serde_json::to_vec(self).map_err(|e| DecodeError::InvalidData(e.to_string()))
  }

  /// Deserialize from bytes, rejecting records written by a newer format
  pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
    let record: StoredItem =
      serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidData(e.to_string()))?;

    if record.version > super::CURRENT_VERSION {
      return Err(DecodeError::UnsupportedVersion(record.version));
    }

    Ok(record)
  }
}

/// Errors that can occur during encoding or decoding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
  /// Input data is invalid or corrupted
  #[error("invalid record data: {0}")]
  InvalidData(String),
  /// Record was written by a newer format version
  #[error("unsupported record version {0}")]
  UnsupportedVersion(u8),
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn attributes() -> Item {
    json!({"id": "likes", "like_count": 42})
      .as_object()
      .cloned()
      .unwrap()
  }

  #[test]
  fn test_encode_decode() {
    let record = StoredItem::new(attributes());
    let encoded = record.encode().unwrap();
    let decoded = StoredItem::decode(&encoded).unwrap();

    assert_eq!(record, decoded);
    assert_eq!(decoded.version, crate::encoding::CURRENT_VERSION);
    assert_eq!(decoded.attributes["like_count"], json!(42));
  }

  #[test]
  fn test_decode_error_invalid_data() {
    assert!(matches!(
      StoredItem::decode(b""),
      Err(DecodeError::InvalidData(_))
    ));
    assert!(matches!(
      StoredItem::decode(b"garbage"),
      Err(DecodeError::InvalidData(_))
    ));
  }

  #[test]
  fn test_decode_rejects_newer_version() {
    let record = StoredItem {
      version: 42,
      attributes: attributes(),
    };
    let encoded = record.encode().unwrap();

    assert_eq!(
      StoredItem::decode(&encoded),
      Err(DecodeError::UnsupportedVersion(42))
    );
  }
}
