//! Error types for the rediseen gateway

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use thiserror::Error;

/// Usage message returned for malformed request paths.
pub const USAGE: &str = "Usage: /info, /info/<info_section>, /<db>, /<db>/<key>, \
/<db>/<key>/<index>, or /<db>/<key>/<field>";

/// Failures talking to the backing key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection could not be established or was lost
    #[error("{0}")]
    Transport(String),
    /// The store answered with an error reply
    #[error("{0}")]
    Reply(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            StoreError::Transport(e.to_string())
        } else {
            StoreError::Reply(e.to_string())
        }
    }
}

/// Startup configuration failures. These abort the process before serving.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// REDISEEN_REDIS_URI missing
    #[error("No valid Redis URI is provided (via environment variable REDISEEN_REDIS_URI)")]
    MissingRedisUri,
    /// REDISEEN_REDIS_URI does not parse
    #[error("Redis URI provided (via environment variable REDISEEN_REDIS_URI) is not valid (details: {0})")]
    InvalidRedisUri(String),
    /// REDISEEN_DB_EXPOSED missing
    #[error("REDISEEN_DB_EXPOSED is not configured")]
    MissingDbExposed,
    /// REDISEEN_DB_EXPOSED has an illegal token
    #[error("REDISEEN_DB_EXPOSED provided can not be parsed properly (details: illegal pattern `{token}`)")]
    InvalidDbExposed {
        /// The offending token
        token: String,
    },
    /// REDISEEN_KEY_PATTERN_EXPOSED does not compile
    #[error("REDISEEN_KEY_PATTERN_EXPOSED can not be compiled as regular expression. Details: {0}")]
    InvalidKeyPattern(String),
    /// Both a key pattern and expose-all were given
    #[error("You have specified both REDISEEN_KEY_PATTERN_EXPOSED and REDISEEN_KEY_PATTERN_EXPOSE_ALL=true, which is conflicting.")]
    ConflictingKeyPattern,
    /// Neither a key pattern nor expose-all was given
    #[error("You have not specified any key pattern to allow being accessed (environment variable REDISEEN_KEY_PATTERN_EXPOSED). To allow ALL keys to be accessed, set environment variable REDISEEN_KEY_PATTERN_EXPOSE_ALL=true")]
    MissingKeyPattern,
    /// Host/port do not form a bind address
    #[error("Invalid bind address `{0}`")]
    InvalidBindAddr(String),
    /// Startup ping failed
    #[error("Initial talking to Redis failed. Please check the URI provided. Details: {0}")]
    StoreUnreachable(#[source] StoreError),
    /// Config file could not be read or decoded
    #[error("Unable to load config file: {0}")]
    File(String),
}

/// Runtime errors surfaced to HTTP clients as `{"error": ...}` bodies.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or mismatched X-API-KEY
    #[error("unauthorized")]
    Unauthorized,
    /// Any method other than GET
    #[error("Method {method} is not allowed")]
    MethodNotAllowed {
        /// The rejected method
        method: String,
    },
    /// Malformed path shape
    #[error("{}", USAGE)]
    BadUsage,
    /// Selector is neither `info` nor an integer
    #[error("Provide an integer for DB")]
    NonIntegerDatabase,
    /// Index given for a string/list is not an integer
    #[error("wrong type for index/field")]
    WrongTypeForIndex,
    /// Status report section unknown to the store
    #[error("Exception while getting Redis Info. Details: invalid section `{section}` is given. Check /info for supported sections")]
    UnrecognizedInfoSection {
        /// The requested section
        section: String,
    },
    /// Unknown `format` query value on /info
    #[error("Unsupported format `{format}`. Use json, prometheus, or raw")]
    UnsupportedInfoFormat {
        /// The requested format
        format: String,
    },
    /// Database not in the exposure set
    #[error("DB {db} is not exposed")]
    DatabaseNotExposed {
        /// The rejected database index
        db: i64,
    },
    /// Key name rejected by the key pattern
    #[error("Key pattern is forbidden from access")]
    KeyPatternForbidden,
    /// Key does not exist
    #[error("Key provided does not exist.")]
    KeyNotFound,
    /// Index or field inside an existing key does not exist
    #[error("Index or field provided does not exist.")]
    MemberNotFound,
    /// Key type not handled
    #[error("not implemented")]
    NotImplemented,
    /// Store failure while serving a key or listing request
    #[error("{0}")]
    Store(#[from] StoreError),
    /// Store failure while serving a status report
    #[error("Exception while getting Redis Info. Details: {0}")]
    InfoStore(StoreError),
}

impl GatewayError {
    /// Maps the error to the HTTP status sent to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadUsage => StatusCode::BAD_REQUEST,
            GatewayError::NonIntegerDatabase => StatusCode::BAD_REQUEST,
            GatewayError::WrongTypeForIndex => StatusCode::BAD_REQUEST,
            GatewayError::UnrecognizedInfoSection { .. } => StatusCode::BAD_REQUEST,
            GatewayError::UnsupportedInfoFormat { .. } => StatusCode::BAD_REQUEST,
            GatewayError::DatabaseNotExposed { .. } => StatusCode::FORBIDDEN,
            GatewayError::KeyPatternForbidden => StatusCode::FORBIDDEN,
            GatewayError::KeyNotFound => StatusCode::NOT_FOUND,
            GatewayError::MemberNotFound => StatusCode::NOT_FOUND,
            GatewayError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            GatewayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InfoStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias using GatewayError as the error type.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_error() {
        let err = GatewayError::Unauthorized;
        assert_eq!(err.to_string(), "unauthorized");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_method_not_allowed_names_method() {
        let err = GatewayError::MethodNotAllowed {
            method: "DELETE".to_string(),
        };
        assert_eq!(err.to_string(), "Method DELETE is not allowed");
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_database_not_exposed_names_db() {
        let err = GatewayError::DatabaseNotExposed { db: 6 };
        assert_eq!(err.to_string(), "DB 6 is not exposed");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_bad_request_kinds() {
        assert_eq!(GatewayError::BadUsage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::NonIntegerDatabase.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::WrongTypeForIndex.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::UnrecognizedInfoSection {
                section: "nope".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_found_kinds() {
        assert_eq!(GatewayError::KeyNotFound.to_string(), "Key provided does not exist.");
        assert_eq!(GatewayError::KeyNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::MemberNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_errors_are_server_errors() {
        let err = GatewayError::from(StoreError::Transport("connection refused".to_string()));
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = GatewayError::InfoStore(StoreError::Reply("boom".to_string()));
        assert_eq!(err.to_string(), "Exception while getting Redis Info. Details: boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_implemented_error() {
        let err = GatewayError::NotImplemented;
        assert_eq!(err.to_string(), "not implemented");
        assert_eq!(err.status_code(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_into_response_json_body() {
        let response = GatewayError::KeyPatternForbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Key pattern is forbidden from access");
    }
}
