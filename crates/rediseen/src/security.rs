//! Shared-secret check and response hardening headers

use axum::http::{header, HeaderMap, HeaderValue};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Compares without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// True when no secret is configured or the request carries it exactly.
pub fn api_key_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|provided| constant_time_eq(provided, expected))
        .unwrap_or(false)
}

/// Adds `X-Content-Type-Options: nosniff` and `Cache-Control: no-store`.
pub async fn security_headers_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
