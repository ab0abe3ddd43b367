//! In-memory store with Redis read semantics, for tests and offline runs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use super::{KeyType, KvStore, StoreConnector, StoreResult};
use crate::error::StoreError;

/// Number of logical databases a default Redis server offers.
pub const DEFAULT_DATABASES: i64 = 16;

const DEFAULT_INFO: &str = "# Server\r\n\
redis_version:7.2.4\r\n\
redis_mode:standalone\r\n\
os:Linux 6.1.0 x86_64\r\n\
uptime_in_seconds:3600\r\n\
\r\n\
# Clients\r\n\
connected_clients:1\r\n\
blocked_clients:0\r\n\
\r\n\
# Memory\r\n\
used_memory:1048576\r\n\
used_memory_human:1.00M\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=1,expires=0,avg_ttl=0\r\n";

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    /// Scalar string
    String(String),
    /// Ordered list
    List(Vec<String>),
    /// Unordered set
    Set(BTreeSet<String>),
    /// Field map
    Hash(BTreeMap<String, String>),
    /// Score-ordered set as (score, member)
    ZSet(Vec<(f64, String)>),
    /// A type the gateway does not read, by name
    Other(String),
}

impl MemoryValue {
    fn key_type(&self) -> KeyType {
        match self {
            MemoryValue::String(_) => KeyType::String,
            MemoryValue::List(_) => KeyType::List,
            MemoryValue::Set(_) => KeyType::Set,
            MemoryValue::Hash(_) => KeyType::Hash,
            MemoryValue::ZSet(_) => KeyType::ZSet,
            MemoryValue::Other(name) => KeyType::Other(name.clone()),
        }
    }
}

type Database = BTreeMap<String, MemoryValue>;

/// Connector over a fixed in-memory dataset. Built up front, read-only once shared.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    databases: Arc<HashMap<i64, Database>>,
    info: Arc<str>,
    unreachable: bool,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    /// Empty dataset with a canned status report.
    pub fn new() -> Self {
        Self {
            databases: Arc::new(HashMap::new()),
            info: Arc::from(DEFAULT_INFO),
            unreachable: false,
        }
    }

    /// Stores `value` under `key` in database `db`.
    pub fn with_value(mut self, db: i64, key: &str, value: MemoryValue) -> Self {
        Arc::make_mut(&mut self.databases)
            .entry(db)
            .or_default()
            .insert(key.to_string(), value);
        self
    }

    /// Stores a string.
    pub fn with_string(self, db: i64, key: &str, value: &str) -> Self {
        self.with_value(db, key, MemoryValue::String(value.to_string()))
    }

    /// Stores a list.
    pub fn with_list(self, db: i64, key: &str, items: &[&str]) -> Self {
        let items = items.iter().map(|s| s.to_string()).collect();
        self.with_value(db, key, MemoryValue::List(items))
    }

    /// Stores a set.
    pub fn with_set(self, db: i64, key: &str, members: &[&str]) -> Self {
        let members = members.iter().map(|s| s.to_string()).collect();
        self.with_value(db, key, MemoryValue::Set(members))
    }

    /// Stores a hash.
    pub fn with_hash(self, db: i64, key: &str, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        self.with_value(db, key, MemoryValue::Hash(fields))
    }

    /// Stores a sorted set from (score, member) pairs.
    pub fn with_sorted_set(self, db: i64, key: &str, entries: &[(f64, &str)]) -> Self {
        let mut entries: Vec<(f64, String)> =
            entries.iter().map(|(s, m)| (*s, m.to_string())).collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        self.with_value(db, key, MemoryValue::ZSet(entries))
    }

    /// Replaces the status report text.
    pub fn with_info(mut self, info: &str) -> Self {
        self.info = Arc::from(info);
        self
    }

    /// Makes every connection attempt fail with a transport error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, db: i64) -> StoreResult<Box<dyn KvStore>> {
        if self.unreachable {
            return Err(StoreError::Transport("Connection refused (os error 111)".to_string()));
        }
        if !(0..DEFAULT_DATABASES).contains(&db) {
            return Err(StoreError::Reply("ERR DB index is out of range".to_string()));
        }
        Ok(Box::new(MemoryStore {
            databases: Arc::clone(&self.databases),
            info: Arc::clone(&self.info),
            db,
        }))
    }
}

/// A connection to one database of a [`MemoryConnector`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    databases: Arc<HashMap<i64, Database>>,
    info: Arc<str>,
    db: i64,
}

impl MemoryStore {
    fn lookup(&self, key: &str) -> Option<&MemoryValue> {
        self.databases.get(&self.db).and_then(|d| d.get(key))
    }

    fn wrong_type() -> StoreError {
        StoreError::Reply(
            "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
        )
    }
}

/// Resolves a possibly negative index against `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn ping(&mut self) -> StoreResult<()> {
        Ok(())
    }

    async fn keys(&mut self) -> StoreResult<Vec<String>> {
        Ok(self
            .databases
            .get(&self.db)
            .map(|d| d.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn key_type(&mut self, key: &str) -> StoreResult<KeyType> {
        Ok(self.lookup(key).map(MemoryValue::key_type).unwrap_or(KeyType::None))
    }

    async fn exists(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.lookup(key).is_some())
    }

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(MemoryValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn get_range(&mut self, key: &str, index: i64) -> StoreResult<String> {
        match self.lookup(key) {
            None => Ok(String::new()),
            Some(MemoryValue::String(s)) => {
                let bytes = s.as_bytes();
                Ok(resolve_index(index, bytes.len())
                    .map(|i| String::from_utf8_lossy(&bytes[i..=i]).into_owned())
                    .unwrap_or_default())
            }
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn list_range(&mut self, key: &str) -> StoreResult<Vec<String>> {
        match self.lookup(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::List(items)) => Ok(items.clone()),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn list_index(&mut self, key: &str, index: i64) -> StoreResult<Option<String>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(MemoryValue::List(items)) => {
                Ok(resolve_index(index, items.len()).map(|i| items[i].clone()))
            }
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn set_members(&mut self, key: &str) -> StoreResult<Vec<String>> {
        match self.lookup(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn set_is_member(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        match self.lookup(key) {
            None => Ok(false),
            Some(MemoryValue::Set(members)) => Ok(members.contains(member)),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn hash_get_all(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        match self.lookup(key) {
            None => Ok(BTreeMap::new()),
            Some(MemoryValue::Hash(fields)) => Ok(fields.clone()),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn hash_get(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(MemoryValue::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn sorted_set_members(&mut self, key: &str) -> StoreResult<Vec<String>> {
        match self.lookup(key) {
            None => Ok(Vec::new()),
            Some(MemoryValue::ZSet(entries)) => Ok(entries.iter().map(|(_, m)| m.clone()).collect()),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn sorted_set_rank(&mut self, key: &str, member: &str) -> StoreResult<Option<i64>> {
        match self.lookup(key) {
            None => Ok(None),
            Some(MemoryValue::ZSet(entries)) => Ok(entries
                .iter()
                .position(|(_, m)| m == member)
                .map(|p| p as i64)),
            Some(_) => Err(Self::wrong_type()),
        }
    }

    async fn info(&mut self, section: &str) -> StoreResult<String> {
        if matches!(section, "all" | "default" | "everything") {
            return Ok(self.info.to_string());
        }
        // Redis answers an unknown section with an empty report.
        let mut out = String::new();
        let mut in_section = false;
        for line in self.info.split_inclusive('\n') {
            if let Some(name) = line.strip_prefix('#') {
                in_section = name.trim().eq_ignore_ascii_case(section);
            }
            if in_section {
                out.push_str(line);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(connector: &MemoryConnector, db: i64) -> Box<dyn KvStore> {
        match connector.connect(db).await {
            Ok(store) => store,
            Err(e) => panic!("connect failed: {}", e),
        }
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        let connector = MemoryConnector::new()
            .with_string(0, "key:1", "zero")
            .with_string(1, "key:1", "one");
        let mut db0 = store(&connector, 0).await;
        let mut db1 = store(&connector, 1).await;
        let mut db2 = store(&connector, 2).await;
        assert_eq!(db0.get("key:1").await.unwrap().as_deref(), Some("zero"));
        assert_eq!(db1.get("key:1").await.unwrap().as_deref(), Some("one"));
        assert!(!db2.exists("key:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_database() {
        let connector = MemoryConnector::new();
        assert!(connector.connect(16).await.is_err());
        assert!(connector.connect(-1).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_connector() {
        let connector = MemoryConnector::new().unreachable();
        let err = connector.connect(0).await.err().unwrap();
        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[tokio::test]
    async fn test_get_range_semantics() {
        let connector = MemoryConnector::new().with_string(0, "k", "Developer");
        let mut s = store(&connector, 0).await;
        assert_eq!(s.get_range("k", 0).await.unwrap(), "D");
        assert_eq!(s.get_range("k", 4).await.unwrap(), "l");
        assert_eq!(s.get_range("k", -1).await.unwrap(), "r");
        assert_eq!(s.get_range("k", 100).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_list_index_semantics() {
        let connector = MemoryConnector::new().with_list(0, "l", &["a", "b", "c"]);
        let mut s = store(&connector, 0).await;
        assert_eq!(s.list_index("l", 0).await.unwrap().as_deref(), Some("a"));
        assert_eq!(s.list_index("l", -1).await.unwrap().as_deref(), Some("c"));
        assert_eq!(s.list_index("l", 3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sorted_set_order_and_rank() {
        let connector = MemoryConnector::new().with_sorted_set(
            0,
            "z",
            &[(3.0, "c"), (1.0, "a"), (2.0, "b")],
        );
        let mut s = store(&connector, 0).await;
        assert_eq!(s.sorted_set_members("z").await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(s.sorted_set_rank("z", "c").await.unwrap(), Some(2));
        assert_eq!(s.sorted_set_rank("z", "x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_type_reply() {
        let connector = MemoryConnector::new().with_list(0, "l", &["a"]);
        let mut s = store(&connector, 0).await;
        assert!(matches!(s.get("l").await, Err(StoreError::Reply(_))));
    }

    #[tokio::test]
    async fn test_info_sections() {
        let connector = MemoryConnector::new();
        let mut s = store(&connector, 0).await;
        let all = s.info("all").await.unwrap();
        assert!(all.contains("# Server"));
        assert!(all.contains("# Keyspace"));

        let keyspace = s.info("keyspace").await.unwrap();
        assert!(keyspace.starts_with("# Keyspace"));
        assert!(!keyspace.contains("redis_version"));

        assert_eq!(s.info("nosuchsection").await.unwrap(), "");
    }
}
