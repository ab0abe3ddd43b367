//! Key-value store client abstraction
//!
//! The gateway only reads. [`StoreConnector`] opens one [`KvStore`]
//! connection per request, scoped to a single logical database; the
//! connection is dropped when the request finishes.

pub mod memory;
pub mod redis_client;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::error::StoreError;

pub use self::memory::{MemoryConnector, MemoryStore, MemoryValue};
pub use self::redis_client::RedisConnector;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Declared type of a key, as reported by the store's TYPE command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    /// Scalar string
    String,
    /// Ordered list
    List,
    /// Unordered set
    Set,
    /// Field map
    Hash,
    /// Score-ordered set
    ZSet,
    /// Key does not exist
    None,
    /// Any type the gateway does not read (stream, module types)
    Other(String),
}

impl KeyType {
    /// The store's name for this type.
    pub fn as_str(&self) -> &str {
        match self {
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::Hash => "hash",
            KeyType::ZSet => "zset",
            KeyType::None => "none",
            KeyType::Other(name) => name,
        }
    }
}

impl From<&str> for KeyType {
    fn from(name: &str) -> Self {
        match name {
            "string" => KeyType::String,
            "list" => KeyType::List,
            "set" => KeyType::Set,
            "hash" => KeyType::Hash,
            "zset" => KeyType::ZSet,
            "none" => KeyType::None,
            other => KeyType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for KeyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Read-only commands the gateway issues against one logical database.
#[async_trait]
pub trait KvStore: Send {
    /// Liveness probe.
    async fn ping(&mut self) -> StoreResult<()>;

    /// Every key in the database, in store order.
    async fn keys(&mut self) -> StoreResult<Vec<String>>;

    /// Type of a single key.
    async fn key_type(&mut self, key: &str) -> StoreResult<KeyType>;

    /// Types of many keys, in the order given.
    async fn key_types(&mut self, keys: &[String]) -> StoreResult<Vec<KeyType>> {
        let mut types = Vec::with_capacity(keys.len());
        for key in keys {
            types.push(self.key_type(key).await?);
        }
        Ok(types)
    }

    /// Whether the key exists.
    async fn exists(&mut self, key: &str) -> StoreResult<bool>;

    /// Full string value; `None` when the key vanished.
    async fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// Substring `[index, index]` of a string; empty when out of range.
    async fn get_range(&mut self, key: &str, index: i64) -> StoreResult<String>;

    /// Whole list.
    async fn list_range(&mut self, key: &str) -> StoreResult<Vec<String>>;

    /// List element at `index`; negative counts from the tail.
    async fn list_index(&mut self, key: &str, index: i64) -> StoreResult<Option<String>>;

    /// All set members.
    async fn set_members(&mut self, key: &str) -> StoreResult<Vec<String>>;

    /// Set membership test.
    async fn set_is_member(&mut self, key: &str, member: &str) -> StoreResult<bool>;

    /// Whole hash.
    async fn hash_get_all(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    /// One hash field.
    async fn hash_get(&mut self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Sorted-set members by ascending score.
    async fn sorted_set_members(&mut self, key: &str) -> StoreResult<Vec<String>>;

    /// 0-based ascending-score rank of a member.
    async fn sorted_set_rank(&mut self, key: &str, member: &str) -> StoreResult<Option<i64>>;

    /// Status report text for a section (`all` for everything).
    async fn info(&mut self, section: &str) -> StoreResult<String>;
}

/// Opens connections scoped to one logical database.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connects and selects `db`.
    async fn connect(&self, db: i64) -> StoreResult<Box<dyn KvStore>>;
}
