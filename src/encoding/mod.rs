//! Record encoding/decoding for storage
//!
//! Backends that persist raw bytes wrap every item in a versioned record so
//! the on-disk format can evolve.

pub mod item;

/// Current format version for all encoded records
pub const CURRENT_VERSION: u8 = 1;

pub use item::{DecodeError, StoredItem};
