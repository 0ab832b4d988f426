use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Query, Request, State},
    response::IntoResponse,
    routing::{get, post},
};
use deploy_auth::{Ed25519Verifier, UploadResponse, upload_path};
use http_body_util::LengthLimitError;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ReceiverConfig;
use crate::error::ReceiverError;
use crate::extract::ZipExtractor;
use crate::ledger::NonceLedger;
use crate::stats::UploadStats;
use crate::storage::UploadStore;
use crate::verifier::{RequestVerifier, unix_now};

const MIB: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub verifier: RequestVerifier,
    pub store: Arc<UploadStore>,
    pub stats: Arc<UploadStats>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(verifier: RequestVerifier, store: UploadStore, max_upload_bytes: usize) -> Self {
        Self {
            verifier,
            store: Arc::new(store),
            stats: Arc::new(UploadStats::default()),
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &ReceiverConfig) -> Result<Self, ReceiverError> {
        if config.security.public_key.trim().is_empty() {
            return Err(ReceiverError::Config(
                "security.public_key is not set".to_string(),
            ));
        }
        let signature_verifier = Ed25519Verifier::from_hex(&config.security.public_key)
            .map_err(|e| ReceiverError::Config(e.to_string()))?;
        let ledger = Arc::new(NonceLedger::new(config.security.timestamp_limit));

        Ok(Self::new(
            RequestVerifier::new(Arc::new(signature_verifier), ledger),
            UploadStore::new(config.paths.clone()).with_extractor(Arc::new(ZipExtractor)),
            config.max_upload_bytes(),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(|| async move { Json(json!({ "status": "ok" })) }))
        .route("/upload/{path_key}/{*file_name}", post(upload_handler))
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn run(config: ReceiverConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(
        %addr,
        paths = ?state.store.path_keys(),
        window_secs = state.verifier.window(),
        "deploy receiver listening"
    );

    serve(listener, state, shutdown_signal()).await
}

pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("serving HTTP")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping");
}

async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.stats.snapshot();
    Json(json!({
        "service": "Deploy Receiver",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "auth": "Ed25519",
        "paths": state.store.path_keys(),
        "total_uploads": stats.total_uploads,
        "total_bytes": stats.total_bytes,
        "failed_auth": stats.failed_auth,
        "last_upload": stats.last_upload,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub extract: Option<String>,
}

/// Authenticates first; neither the query nor the body is read until the
/// request is accepted.
async fn upload_handler(
    State(state): State<AppState>,
    Path((path_key, file_name)): Path<(String, String)>,
    request: Request,
) -> Result<Json<UploadResponse>, ReceiverError> {
    let client_ip = client_ip(&request);
    let url_path = upload_path(&path_key, &file_name);

    if let Err(err) = state.verifier.authenticate(request.headers(), &url_path) {
        state.stats.record_failed_auth();
        warn!(%client_ip, %url_path, reason = err.kind(), "authentication failed: {err}");
        return Err(err.into());
    }

    let Query(query) = Query::<UploadQuery>::try_from_uri(request.uri())
        .map_err(|rejection| ReceiverError::BadRequest(rejection.body_text()))
        .inspect_err(|e| warn!(%client_ip, %url_path, "{e}"))?;

    let target = state
        .store
        .resolve(&path_key, &file_name)
        .inspect_err(|e| warn!(%client_ip, %url_path, "{e}"))?;

    let data = axum::body::to_bytes(request.into_body(), state.max_upload_bytes)
        .await
        .map_err(|e| body_error(e, state.max_upload_bytes))
        .inspect_err(|e| warn!(%client_ip, %url_path, "{e}"))?;

    let extract = query.extract.as_deref() == Some("true");
    let stored = state
        .store
        .store(&target, &data, extract)
        .await
        .inspect_err(|e| error!(%client_ip, %url_path, "{e}"))?;

    state.stats.record_upload(stored.size, unix_now());
    info!(
        %client_ip,
        path = %stored.path.display(),
        size = stored.size,
        extracted = stored.extracted,
        "saved upload"
    );

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        path: stored.path.display().to_string(),
        size: stored.size,
        path_key,
        filename: file_name,
        extracted: stored.extracted,
        extract_dir: stored.extract_dir.map(|dir| dir.display().to_string()),
    }))
}

fn body_error(error: axum::Error, limit: usize) -> ReceiverError {
    let inner = error.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        ReceiverError::PayloadTooLarge {
            max_mb: (limit / MIB) as u64,
        }
    } else {
        ReceiverError::Body(inner.to_string())
    }
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn client_ip(request: &Request) -> String {
    let headers = request.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    if let Some(ip) = headers.get("x-real-ip").and_then(|value| value.to_str().ok()) {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/upload/web/a.txt");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let request = request_with(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&request), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_peer() {
        assert_eq!(client_ip(&request_with(&[("x-real-ip", "10.0.0.2")])), "10.0.0.2");

        let mut request = request_with(&[]);
        assert_eq!(client_ip(&request), "unknown");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5000))));
        assert_eq!(client_ip(&request), "192.0.2.1");
    }

    #[test]
    fn from_config_requires_public_key() {
        let err = AppState::from_config(&ReceiverConfig::default()).err().unwrap();
        assert!(matches!(err, ReceiverError::Config(_)));
    }

    #[test]
    fn from_config_rejects_malformed_public_key() {
        let mut config = ReceiverConfig::default();
        config.security.public_key = "not-hex".to_string();
        let err = AppState::from_config(&config).err().unwrap();
        assert!(matches!(err, ReceiverError::Config(msg) if msg.contains("public key")));
    }
}
