//! Key listing for `/<db>`

use serde::Serialize;

use crate::error::Result;
use crate::policy::AccessPolicy;
use crate::store::{KeyType, KvStore};

/// Maximum number of entries returned by one listing.
pub const LIST_KEY_LIMIT: usize = 1000;

/// One listed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyEntry {
    /// Key name
    pub key: String,
    /// Declared type
    #[serde(rename = "type")]
    pub key_type: KeyType,
}

/// Response body for `/<db>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyListing {
    /// Entries returned, `min(total, LIST_KEY_LIMIT)`
    pub count: usize,
    /// All exposed keys in the database
    pub total: usize,
    /// Exposed keys in store order, capped
    pub keys: Vec<KeyEntry>,
}

/// Enumerates the database, keeps exposed keys and types the first
/// [`LIST_KEY_LIMIT`] of them in one batch.
pub async fn list_keys(store: &mut dyn KvStore, policy: &AccessPolicy) -> Result<KeyListing> {
    let mut exposed: Vec<String> = store
        .keys()
        .await?
        .into_iter()
        .filter(|k| policy.is_key_exposed(k))
        .collect();

    let total = exposed.len();
    exposed.truncate(LIST_KEY_LIMIT);
    let types = store.key_types(&exposed).await?;

    let keys: Vec<KeyEntry> = exposed
        .into_iter()
        .zip(types)
        .map(|(key, key_type)| KeyEntry { key, key_type })
        .collect();

    Ok(KeyListing {
        count: keys.len(),
        total,
        keys,
    })
}
