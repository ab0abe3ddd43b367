//! HTTP surface: one handler mounted at `/`
//!
//! Every request walks the same gates in order: shared secret, method,
//! path shape, then parsing and access policy, before the store is touched.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::banner;
use crate::error::{GatewayError, Result};
use crate::info::{self, InfoFormat, ALL_SECTIONS};
use crate::lister;
use crate::path::{parse_request_path, RequestDescriptor, Selector};
use crate::policy::AccessPolicy;
use crate::reader;
use crate::security;
use crate::store::StoreConnector;

#[derive(Debug, Default, Deserialize)]
struct InfoParams {
    format: Option<String>,
}

/// Shared request-handling state: immutable after startup.
#[derive(Clone)]
pub struct Gateway {
    policy: Arc<AccessPolicy>,
    connector: Arc<dyn StoreConnector>,
    api_key: Option<Arc<str>>,
}

impl Gateway {
    /// An empty `api_key` disables the shared-secret check.
    pub fn new(
        policy: AccessPolicy,
        connector: Arc<dyn StoreConnector>,
        api_key: Option<String>,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty()).map(Arc::from);
        if api_key.is_some() {
            info!("API is secured with X-API-KEY (to access, specify X-API-KEY in request header)");
        } else {
            warn!("API is NOT secured with X-API-KEY");
        }
        Self {
            policy: Arc::new(policy),
            connector,
            api_key,
        }
    }

    /// Single fallback route wrapped in the response-header layer.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .fallback(handle_request)
            .layer(axum::middleware::from_fn(
                security::security_headers_middleware,
            ))
            .with_state(self)
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let router = Arc::new(self).router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Serving at {}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        info!("Server stopped");
        Ok(())
    }

    async fn dispatch(&self, method: &Method, headers: &HeaderMap, uri: &Uri) -> Result<Response> {
        if !security::api_key_matches(self.api_key.as_deref(), headers) {
            warn!("Unauthorized request");
            return Err(GatewayError::Unauthorized);
        }

        if method != Method::GET {
            warn!(%method, "Method not allowed");
            return Err(GatewayError::MethodNotAllowed {
                method: method.to_string(),
            });
        }

        let path = urlencoding::decode(uri.path()).map_err(|_| GatewayError::BadUsage)?;
        if path == "/" {
            return Ok(welcome_response());
        }
        let segments = path.split('/').count();
        if path.ends_with('/') || !(2..=4).contains(&segments) {
            return Err(GatewayError::BadUsage);
        }

        let request = parse_request_path(&path)?;
        let db = match &request.selector {
            Selector::Info => None,
            Selector::Database(raw) => {
                Some(raw.parse::<i64>().map_err(|_| GatewayError::NonIntegerDatabase)?)
            }
        };
        match db {
            None => self.info(request, uri).await,
            Some(db) => self.database(db, request).await,
        }
    }

    async fn info(&self, request: RequestDescriptor, uri: &Uri) -> Result<Response> {
        let Query(params) =
            Query::<InfoParams>::try_from_uri(uri).map_err(|_| GatewayError::BadUsage)?;
        let format = match params.format.as_deref() {
            Some(raw) => raw.parse::<InfoFormat>()?,
            None => InfoFormat::default(),
        };
        let section = request.info_section.unwrap_or_else(|| ALL_SECTIONS.to_string());

        let mut store = self
            .connector
            .connect(0)
            .await
            .map_err(GatewayError::InfoStore)?;
        let report = store.info(&section).await.map_err(GatewayError::InfoStore)?;
        if report.trim().is_empty() {
            return Err(GatewayError::UnrecognizedInfoSection { section });
        }

        Ok(match format {
            InfoFormat::Json => Json(info::parse_sections(&report)).into_response(),
            InfoFormat::Prometheus => plain_text(info::to_prometheus(&report)),
            InfoFormat::Raw => plain_text(report),
        })
    }

    async fn database(&self, db: i64, request: RequestDescriptor) -> Result<Response> {
        if !self.policy.is_database_exposed(db) {
            return Err(GatewayError::DatabaseNotExposed { db });
        }

        let Some(key) = request.key else {
            let mut store = self.connector.connect(db).await?;
            let listing = lister::list_keys(store.as_mut(), &self.policy).await?;
            debug!(db, count = listing.count, total = listing.total, "listed keys");
            return Ok(Json(listing).into_response());
        };

        if !self.policy.is_key_exposed(&key) {
            return Err(GatewayError::KeyPatternForbidden);
        }

        let mut store = self.connector.connect(db).await?;
        if !store.exists(&key).await? {
            return Err(GatewayError::KeyNotFound);
        }

        match request.index_or_field.as_deref() {
            Some(index_or_field) => info!(db, key = %key, index_or_field, "Submit query"),
            None => info!(db, key = %key, "Submit query"),
        }
        let result =
            reader::read_value(store.as_mut(), &key, request.index_or_field.as_deref()).await?;
        Ok(Json(result).into_response())
    }
}

async fn handle_request(State(state): State<Arc<Gateway>>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    info!(
        method = %parts.method,
        remote = %remote,
        path = %parts.uri.path(),
        user_agent = %user_agent,
        "request"
    );

    match state.dispatch(&parts.method, &parts.headers, &parts.uri).await {
        Ok(response) => response,
        Err(e) => {
            debug!(status = %e.status_code(), error = %e, "request rejected");
            e.into_response()
        }
    }
}

fn welcome_response() -> Response {
    plain_text(banner::welcome())
}

fn plain_text(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
