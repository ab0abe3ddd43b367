//! Redis-backed store connections

use std::collections::BTreeMap;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, ConnectionInfo, IntoConnectionInfo};
use tracing::debug;

use super::{KeyType, KvStore, StoreConnector, StoreResult};
use crate::error::ConfigError;

/// Opens a fresh Redis connection per request, selecting the database
/// through the connection info.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    info: ConnectionInfo,
}

impl RedisConnector {
    /// Parses a `redis://` (or `rediss://`, `unix://`) URI.
    pub fn new(uri: &str) -> Result<Self, ConfigError> {
        if uri.is_empty() {
            return Err(ConfigError::MissingRedisUri);
        }
        let info = uri
            .into_connection_info()
            .map_err(|e| ConfigError::InvalidRedisUri(e.to_string()))?;
        Ok(Self { info })
    }

    /// Server address, for logging.
    pub fn addr(&self) -> String {
        self.info.addr.to_string()
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self, db: i64) -> StoreResult<Box<dyn KvStore>> {
        let mut info = self.info.clone();
        info.redis.db = db;
        let client = Client::open(info)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!(db, "opened redis connection");
        Ok(Box::new(RedisStore { conn }))
    }
}

/// One connection, bound to the database chosen at connect time.
///
/// Payloads are read as bytes and decoded lossily, so binary keys and
/// values never fail a request.
pub struct RedisStore {
    conn: MultiplexedConnection,
}

fn text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn texts(items: Vec<Vec<u8>>) -> Vec<String> {
    items.into_iter().map(text).collect()
}

#[async_trait]
impl KvStore for RedisStore {
    async fn ping(&mut self) -> StoreResult<()> {
        let _pong: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(())
    }

    async fn keys(&mut self) -> StoreResult<Vec<String>> {
        let keys: Vec<Vec<u8>> = redis::cmd("KEYS").arg("*").query_async(&mut self.conn).await?;
        Ok(texts(keys))
    }

    async fn key_type(&mut self, key: &str) -> StoreResult<KeyType> {
        let name: String = redis::cmd("TYPE").arg(key).query_async(&mut self.conn).await?;
        Ok(KeyType::from(name.as_str()))
    }

    async fn key_types(&mut self, keys: &[String]) -> StoreResult<Vec<KeyType>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("TYPE").arg(key);
        }
        let names: Vec<String> = pipe.query_async(&mut self.conn).await?;
        Ok(names.iter().map(|n| KeyType::from(n.as_str())).collect())
    }

    async fn exists(&mut self, key: &str) -> StoreResult<bool> {
        let count: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut self.conn).await?;
        Ok(count > 0)
    }

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut self.conn).await?;
        Ok(value.map(text))
    }

    async fn get_range(&mut self, key: &str, index: i64) -> StoreResult<String> {
        let value: Vec<u8> = redis::cmd("GETRANGE")
            .arg(key)
            .arg(index)
            .arg(index)
            .query_async(&mut self.conn)
            .await?;
        Ok(text(value))
    }

    async fn list_range(&mut self, key: &str) -> StoreResult<Vec<String>> {
        let items: Vec<Vec<u8>> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut self.conn)
            .await?;
        Ok(texts(items))
    }

    async fn list_index(&mut self, key: &str, index: i64) -> StoreResult<Option<String>> {
        let item: Option<Vec<u8>> = redis::cmd("LINDEX")
            .arg(key)
            .arg(index)
            .query_async(&mut self.conn)
            .await?;
        Ok(item.map(text))
    }

    async fn set_members(&mut self, key: &str) -> StoreResult<Vec<String>> {
        let members: Vec<Vec<u8>> =
            redis::cmd("SMEMBERS").arg(key).query_async(&mut self.conn).await?;
        Ok(texts(members))
    }

    async fn set_is_member(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        let found: bool = redis::cmd("SISMEMBER")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn)
            .await?;
        Ok(found)
    }

    async fn hash_get_all(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        let map: BTreeMap<Vec<u8>, Vec<u8>> =
            redis::cmd("HGETALL").arg(key).query_async(&mut self.conn).await?;
        Ok(map.into_iter().map(|(f, v)| (text(f), text(v))).collect())
    }

    async fn hash_get(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let value: Option<Vec<u8>> = redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut self.conn)
            .await?;
        Ok(value.map(text))
    }

    async fn sorted_set_members(&mut self, key: &str) -> StoreResult<Vec<String>> {
        let members: Vec<Vec<u8>> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut self.conn)
            .await?;
        Ok(texts(members))
    }

    async fn sorted_set_rank(&mut self, key: &str, member: &str) -> StoreResult<Option<i64>> {
        let rank: Option<i64> = redis::cmd("ZRANK")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn)
            .await?;
        Ok(rank)
    }

    async fn info(&mut self, section: &str) -> StoreResult<String> {
        let report: Vec<u8> = redis::cmd("INFO").arg(section).query_async(&mut self.conn).await?;
        Ok(text(report))
    }
}
