//! Value retrieval, dispatched on the key's declared type

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{GatewayError, Result};
use crate::store::{KeyType, KvStore};

/// Shaped value of a key or of one index/field inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A string, one character of it, a list element or a hash field
    Text(String),
    /// A whole list, set or sorted set
    Sequence(Vec<String>),
    /// Set membership test
    Membership(bool),
    /// A whole hash
    Map(BTreeMap<String, String>),
    /// Rank of a sorted-set member
    Rank(i64),
}

/// Response body for a successful key read: `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueResult {
    /// Declared type of the key
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Shaped value
    pub value: Value,
}

/// Interprets an index for string and list keys.
///
/// The literal `"0"` is always accepted. Anything else must parse to a
/// non-zero signed 64-bit integer, otherwise the caller passed a field name
/// where an index was required.
pub fn parse_index(raw: &str) -> Result<i64> {
    if raw == "0" {
        return Ok(0);
    }
    match raw.parse::<i64>() {
        Ok(index) if index != 0 => Ok(index),
        _ => Err(GatewayError::WrongTypeForIndex),
    }
}

/// Reads `key` (or one index/field inside it) from a connection already
/// scoped to the right database.
pub async fn read_value(
    store: &mut dyn KvStore,
    key: &str,
    index_or_field: Option<&str>,
) -> Result<ValueResult> {
    let key_type = store.key_type(key).await?;
    let index_or_field = index_or_field.filter(|s| !s.is_empty());

    let value = match (&key_type, index_or_field) {
        (KeyType::String, None) => {
            Value::Text(store.get(key).await?.ok_or(GatewayError::KeyNotFound)?)
        }
        (KeyType::List, None) => Value::Sequence(store.list_range(key).await?),
        (KeyType::Set, None) => Value::Sequence(store.set_members(key).await?),
        (KeyType::Hash, None) => Value::Map(store.hash_get_all(key).await?),
        (KeyType::ZSet, None) => Value::Sequence(store.sorted_set_members(key).await?),

        (KeyType::String, Some(raw)) => {
            let index = parse_index(raw)?;
            Value::Text(store.get_range(key, index).await?)
        }
        (KeyType::List, Some(raw)) => {
            let index = parse_index(raw)?;
            let item = store.list_index(key, index).await?;
            Value::Text(item.ok_or(GatewayError::MemberNotFound)?)
        }
        (KeyType::Set, Some(member)) => Value::Membership(store.set_is_member(key, member).await?),
        (KeyType::Hash, Some(field)) => {
            let found = store.hash_get(key, field).await?;
            Value::Text(found.ok_or(GatewayError::MemberNotFound)?)
        }
        (KeyType::ZSet, Some(member)) => {
            let rank = store.sorted_set_rank(key, member).await?;
            Value::Rank(rank.ok_or(GatewayError::MemberNotFound)?)
        }

        (KeyType::None | KeyType::Other(_), _) => return Err(GatewayError::NotImplemented),
    };

    Ok(ValueResult { key_type, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryConnector, MemoryValue, StoreConnector};

    fn fixture() -> MemoryConnector {
        MemoryConnector::new()
            .with_string(0, "str", "Developer")
            .with_list(0, "list", &["a", "b", "c"])
            .with_set(0, "set", &["x", "y"])
            .with_hash(0, "hash", &[("name", "alice"), ("age", "30")])
            .with_sorted_set(0, "zset", &[(10.0, "low"), (30.0, "high"), (20.0, "mid")])
            .with_value(0, "stream", MemoryValue::Other("stream".to_string()))
    }

    async fn read(key: &str, index: Option<&str>) -> Result<ValueResult> {
        let connector = fixture();
        let mut store = match connector.connect(0).await {
            Ok(store) => store,
            Err(e) => panic!("connect failed: {}", e),
        };
        read_value(store.as_mut(), key, index).await
    }

    #[test]
    fn test_parse_index_zero_exception() {
        assert_eq!(parse_index("0").unwrap(), 0);
        assert_eq!(parse_index("4").unwrap(), 4);
        assert_eq!(parse_index("-2").unwrap(), -2);
        assert_eq!(parse_index("+3").unwrap(), 3);
        for raw in ["abc", "00", "-0", "1.5", "", "99999999999999999999"] {
            assert!(
                matches!(parse_index(raw), Err(GatewayError::WrongTypeForIndex)),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_string_full_and_indexed() {
        let full = read("str", None).await.unwrap();
        assert_eq!(full.key_type, KeyType::String);
        assert_eq!(full.value, Value::Text("Developer".to_string()));

        assert_eq!(read("str", Some("0")).await.unwrap().value, Value::Text("D".to_string()));
        assert_eq!(read("str", Some("4")).await.unwrap().value, Value::Text("l".to_string()));
        assert_eq!(read("str", Some("-1")).await.unwrap().value, Value::Text("r".to_string()));
        assert!(matches!(
            read("str", Some("name")).await,
            Err(GatewayError::WrongTypeForIndex)
        ));
    }

    #[tokio::test]
    async fn test_list_full_and_indexed() {
        let full = read("list", None).await.unwrap();
        assert_eq!(
            full.value,
            Value::Sequence(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(read("list", Some("1")).await.unwrap().value, Value::Text("b".to_string()));
        assert!(matches!(read("list", Some("9")).await, Err(GatewayError::MemberNotFound)));
        assert!(matches!(
            read("list", Some("first")).await,
            Err(GatewayError::WrongTypeForIndex)
        ));
    }

    #[tokio::test]
    async fn test_set_membership() {
        assert_eq!(read("set", Some("x")).await.unwrap().value, Value::Membership(true));
        assert_eq!(read("set", Some("z")).await.unwrap().value, Value::Membership(false));
        match read("set", None).await.unwrap().value {
            Value::Sequence(mut members) => {
                members.sort();
                assert_eq!(members, vec!["x", "y"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hash_full_and_field() {
        let full = read("hash", None).await.unwrap();
        match full.value {
            Value::Map(map) => {
                assert_eq!(map.get("name").map(String::as_str), Some("alice"));
                assert_eq!(map.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(read("hash", Some("age")).await.unwrap().value, Value::Text("30".to_string()));
        assert!(matches!(read("hash", Some("nope")).await, Err(GatewayError::MemberNotFound)));
    }

    #[tokio::test]
    async fn test_sorted_set_members_and_rank() {
        let full = read("zset", None).await.unwrap();
        assert_eq!(full.key_type, KeyType::ZSet);
        assert_eq!(
            full.value,
            Value::Sequence(vec!["low".to_string(), "mid".to_string(), "high".to_string()])
        );
        assert_eq!(read("zset", Some("high")).await.unwrap().value, Value::Rank(2));
        assert!(matches!(read("zset", Some("nope")).await, Err(GatewayError::MemberNotFound)));
    }

    #[tokio::test]
    async fn test_unsupported_types() {
        assert!(matches!(read("stream", None).await, Err(GatewayError::NotImplemented)));
        assert!(matches!(read("stream", Some("1")).await, Err(GatewayError::NotImplemented)));
        assert!(matches!(read("missing", None).await, Err(GatewayError::NotImplemented)));
    }

    #[test]
    fn test_result_serialization() {
        let result = ValueResult {
            key_type: KeyType::Set,
            value: Value::Membership(true),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"type": "set", "value": true}));

        let result = ValueResult {
            key_type: KeyType::ZSet,
            value: Value::Rank(3),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"type": "zset", "value": 3}));
    }
}
