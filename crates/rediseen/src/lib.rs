#![warn(missing_docs)]

//! rediseen: read-only HTTP gateway exposing Redis contents as JSON

pub mod api;
pub mod banner;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod info;
pub mod lister;
pub mod path;
pub mod policy;
pub mod reader;
pub mod security;
pub mod store;

pub use api::Gateway;
pub use config::{GatewayConfig, GatewaySettings};
pub use error::{ConfigError, GatewayError, StoreError};
pub use policy::AccessPolicy;
pub use store::{KvStore, MemoryConnector, RedisConnector, StoreConnector};
