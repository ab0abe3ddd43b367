//! Access policy: which logical databases and which key names are exposed

use std::collections::HashSet;
use std::ops::RangeInclusive;

use regex::Regex;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Parsed form of the database-exposure specifier (`*` or `1;3-9;12`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbExposure {
    /// `*`: every database is exposed
    All,
    /// Explicit singles and inclusive ranges
    Listed {
        /// Single database indices
        singles: HashSet<u64>,
        /// Inclusive ranges, kept unexpanded
        ranges: Vec<RangeInclusive<u64>>,
    },
}

impl DbExposure {
    /// Parses a specifier. Tokens are separated by `;`; each is `N` or `N-M`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        if spec == "*" {
            return Ok(DbExposure::All);
        }

        let mut singles = HashSet::new();
        let mut ranges = Vec::new();
        for token in spec.split(';') {
            let illegal = || ConfigError::InvalidDbExposed {
                token: token.to_string(),
            };
            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_db_index(start).ok_or_else(illegal)?;
                    let end = parse_db_index(end).ok_or_else(illegal)?;
                    if start == end {
                        singles.insert(start);
                    } else if start < end {
                        ranges.push(start..=end);
                    }
                }
                None => {
                    singles.insert(parse_db_index(token).ok_or_else(illegal)?);
                }
            }
        }
        Ok(DbExposure::Listed { singles, ranges })
    }

    /// Whether `db` is covered by the specifier.
    pub fn contains(&self, db: i64) -> bool {
        match self {
            DbExposure::All => true,
            DbExposure::Listed { singles, ranges } => {
                let Ok(db) = u64::try_from(db) else {
                    return false;
                };
                singles.contains(&db) || ranges.iter().any(|r| r.contains(&db))
            }
        }
    }
}

/// Digits only; rejects signs, whitespace and empty tokens.
fn parse_db_index(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Which key names may be read.
#[derive(Debug, Clone)]
pub enum KeyExposure {
    /// Every key name is exposed
    All,
    /// Key names partially matching the pattern are exposed
    Pattern(Regex),
}

/// Immutable access rules built once at startup and shared by all requests.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    databases: DbExposure,
    keys: KeyExposure,
}

impl AccessPolicy {
    /// Builds a policy from the raw configuration values.
    ///
    /// Exactly one of `key_pattern` (non-empty) and `expose_all_keys` must be
    /// given. The pattern is used as written, with no implicit anchors.
    pub fn new(db_spec: &str, key_pattern: &str, expose_all_keys: bool) -> Result<Self, ConfigError> {
        if db_spec.is_empty() {
            return Err(ConfigError::MissingDbExposed);
        }
        let databases = DbExposure::parse(db_spec)?;

        let compiled =
            Regex::new(key_pattern).map_err(|e| ConfigError::InvalidKeyPattern(e.to_string()))?;

        let keys = match (expose_all_keys, key_pattern.is_empty()) {
            (true, false) => return Err(ConfigError::ConflictingKeyPattern),
            (false, true) => return Err(ConfigError::MissingKeyPattern),
            (true, true) => KeyExposure::All,
            (false, false) => KeyExposure::Pattern(compiled),
        };

        match &databases {
            DbExposure::All => warn!("exposing ALL logical databases"),
            DbExposure::Listed { .. } => info!(db_exposed = %db_spec, "exposing logical database(s)"),
        }
        match &keys {
            KeyExposure::All => warn!("exposing ALL keys"),
            KeyExposure::Pattern(re) => info!(pattern = %re.as_str(), "exposing keys matching pattern"),
        }

        Ok(Self { databases, keys })
    }

    /// Whether requests may address logical database `db`.
    pub fn is_database_exposed(&self, db: i64) -> bool {
        self.databases.contains(db)
    }

    /// Whether `key` may be listed or read. Case-sensitive partial match.
    pub fn is_key_exposed(&self, key: &str) -> bool {
        match &self.keys {
            KeyExposure::All => true,
            KeyExposure::Pattern(re) => re.is_match(key),
        }
    }

    /// The parsed database exposure.
    pub fn databases(&self) -> &DbExposure {
        &self.databases
    }
}
