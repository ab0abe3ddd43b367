//! Request path parsing
//!
//! Turns `/info[/<section>]` and `/<db>[/<key>[/<index-or-field>]]` into a
//! [`RequestDescriptor`]. Keys (and index-or-field values) may contain `/`
//! when wrapped in backticks, e.g. ``/0/`key:/1`/`5` ``.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{GatewayError, Result};

/// Literal selector for status-report requests.
pub const INFO_SELECTOR: &str = "info";

/// What the first path segment addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `/info...`
    Info,
    /// `/<db>...`, integer text not yet validated
    Database(String),
}

/// Structured form of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// First segment
    pub selector: Selector,
    /// Key name, for database requests
    pub key: Option<String>,
    /// Index (string/list) or field/member (set/hash/zset)
    pub index_or_field: Option<String>,
    /// Lower-cased section name, for info requests
    pub info_section: Option<String>,
}

fn builtin(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern).unwrap_or_else(|e| unreachable!("built-in pattern {pattern}: {e}"))
    })
}

fn both_quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    builtin(&RE, "`(.+)`/`(.+)`")
}

fn key_quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    builtin(&RE, "`(.+)`/(.+)")
}

fn bare() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    builtin(&RE, "(.+)/(.+)")
}

/// Parses a path that already passed the shape check: starts with `/`, no
/// trailing `/`, and 1 to 3 segments after the leading slash.
pub fn parse_request_path(path: &str) -> Result<RequestDescriptor> {
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let Some((&first, rest)) = segments.split_first() else {
        return Err(GatewayError::BadUsage);
    };

    if first == INFO_SELECTOR {
        return match rest {
            [] => Ok(RequestDescriptor {
                selector: Selector::Info,
                key: None,
                index_or_field: None,
                info_section: None,
            }),
            [section] => Ok(RequestDescriptor {
                selector: Selector::Info,
                key: None,
                index_or_field: None,
                info_section: Some(section.to_lowercase()),
            }),
            _ => Err(GatewayError::BadUsage),
        };
    }

    let (key, index_or_field) = match rest {
        [] => (None, None),
        [key] => (Some(key.to_string()), None),
        [_, _] => {
            let (key, index) = split_key_and_index(&rest.join("/"))?;
            (Some(key), index)
        }
        _ => return Err(GatewayError::BadUsage),
    };

    Ok(RequestDescriptor {
        selector: Selector::Database(first.to_string()),
        key,
        index_or_field,
        info_section: None,
    })
}

/// Splits `key/index` into its parts, honouring backtick quoting.
///
/// With an even, non-zero number of backticks the quoted forms apply:
/// `` `k`/`i` ``, `` `k`/i `` or a fully quoted key `` `k/i` ``. Otherwise the
/// remainder splits at its last `/`.
pub fn split_key_and_index(rest: &str) -> Result<(String, Option<String>)> {
    let backticks = rest.matches('`').count();

    if backticks > 0 && backticks % 2 == 0 {
        if rest.len() >= 2 && rest.starts_with('`') && rest.ends_with('`') {
            if let Some(caps) = both_quoted().captures(rest) {
                return Ok((caps[1].to_string(), Some(caps[2].to_string())));
            }
            return Ok((rest[1..rest.len() - 1].to_string(), None));
        }
        return key_quoted()
            .captures(rest)
            .map(|caps| (caps[1].to_string(), Some(caps[2].to_string())))
            .ok_or(GatewayError::BadUsage);
    }

    // Odd backtick counts carry no usable quoting and fall through here.
    bare()
        .captures(rest)
        .map(|caps| (caps[1].to_string(), Some(caps[2].to_string())))
        .ok_or(GatewayError::BadUsage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(path: &str) -> (String, Option<String>, Option<String>) {
        let desc = parse_request_path(path).unwrap();
        match desc.selector {
            Selector::Database(sel) => (sel, desc.key, desc.index_or_field),
            Selector::Info => panic!("expected database selector for {}", path),
        }
    }

    #[test]
    fn test_database_only() {
        assert_eq!(db("/0"), ("0".to_string(), None, None));
    }

    #[test]
    fn test_non_numeric_selector_is_kept_raw() {
        assert_eq!(db("/abc"), ("abc".to_string(), None, None));
    }

    #[test]
    fn test_database_and_key() {
        assert_eq!(db("/3/key:1"), ("3".to_string(), Some("key:1".to_string()), None));
    }

    #[test]
    fn test_key_segment_used_verbatim() {
        assert_eq!(
            db("/0/`key:1`"),
            ("0".to_string(), Some("`key:1`".to_string()), None)
        );
    }

    #[test]
    fn test_key_and_index() {
        assert_eq!(
            db("/0/key:1/5"),
            ("0".to_string(), Some("key:1".to_string()), Some("5".to_string()))
        );
    }

    #[test]
    fn test_info_without_section() {
        let desc = parse_request_path("/info").unwrap();
        assert_eq!(desc.selector, Selector::Info);
        assert_eq!(desc.info_section, None);
    }

    #[test]
    fn test_info_section_lowercased() {
        let desc = parse_request_path("/info/KeySpace").unwrap();
        assert_eq!(desc.selector, Selector::Info);
        assert_eq!(desc.info_section.as_deref(), Some("keyspace"));
    }

    #[test]
    fn test_info_selector_case_sensitive() {
        let desc = parse_request_path("/INFO").unwrap();
        assert_eq!(desc.selector, Selector::Database("INFO".to_string()));
    }

    #[test]
    fn test_info_with_two_segments_rejected() {
        assert!(matches!(
            parse_request_path("/info/server/x"),
            Err(GatewayError::BadUsage)
        ));
    }

    #[test]
    fn test_split_bare() {
        assert_eq!(
            split_key_and_index("key:1/5").unwrap(),
            ("key:1".to_string(), Some("5".to_string()))
        );
    }

    #[test]
    fn test_split_key_quoted_index_bare() {
        assert_eq!(
            split_key_and_index("`key:1`/5").unwrap(),
            ("key:1".to_string(), Some("5".to_string()))
        );
    }

    #[test]
    fn test_split_both_quoted() {
        assert_eq!(
            split_key_and_index("`key:1`/`5`").unwrap(),
            ("key:1".to_string(), Some("5".to_string()))
        );
    }

    #[test]
    fn test_split_quoted_key_with_slash() {
        assert_eq!(
            split_key_and_index("`key:/1`").unwrap(),
            ("key:/1".to_string(), None)
        );
    }

    #[test]
    fn test_split_quoted_key_with_slash_and_quoted_field() {
        assert_eq!(
            split_key_and_index("`a/b`/`c/d`").unwrap(),
            ("a/b".to_string(), Some("c/d".to_string()))
        );
    }

    #[test]
    fn test_split_quoted_key_with_slash_and_bare_field() {
        assert_eq!(
            split_key_and_index("`a/b`/field").unwrap(),
            ("a/b".to_string(), Some("field".to_string()))
        );
    }

    #[test]
    fn test_split_odd_backticks_fall_through_to_last_slash() {
        assert_eq!(
            split_key_and_index("`a/b`c`").unwrap(),
            ("`a".to_string(), Some("b`c`".to_string()))
        );
        assert_eq!(
            split_key_and_index("ke`y/5").unwrap(),
            ("ke`y".to_string(), Some("5".to_string()))
        );
    }

    #[test]
    fn test_split_empty_key_rejected() {
        assert!(matches!(split_key_and_index("/5"), Err(GatewayError::BadUsage)));
    }

    #[test]
    fn test_split_unmatched_quoting_rejected() {
        assert!(matches!(split_key_and_index("a/b``"), Err(GatewayError::BadUsage)));
    }

    #[test]
    fn test_full_path_with_quoted_segments() {
        assert_eq!(
            db("/0/`key:/1`"),
            ("0".to_string(), Some("key:/1".to_string()), None)
        );
        assert_eq!(
            db("/0/`key:1`/`5`"),
            ("0".to_string(), Some("key:1".to_string()), Some("5".to_string()))
        );
    }
}
