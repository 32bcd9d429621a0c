use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use axum::{
    Json, Router,
    extract::State,
    http::HeaderName,
    middleware,
    response::IntoResponse,
    routing::{any, get},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use platform_db::VacancyStore;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{auth, vacancy};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VacancyStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn VacancyStore>) -> Self {
        Self { store }
    }
}

#[derive(Clone, Debug)]
pub struct TlsFiles {
    pub certificate: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    host: String,
    port: u16,
    tls: Option<TlsFiles>,
}

impl ServeConfig {
    pub fn new(host: impl Into<String>, port: u16, tls: Option<TlsFiles>) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }

    pub fn tls(&self) -> Option<&TlsFiles> {
        self.tls.as_ref()
    }

    /// An empty host listens on every interface.
    async fn resolve(&self) -> anyhow::Result<SocketAddr> {
        let host = if self.host.trim().is_empty() {
            "0.0.0.0"
        } else {
            self.host.trim()
        };
        tokio::net::lookup_host((host, self.port))
            .await
            .with_context(|| format!("failed to resolve {host}:{}", self.port))?
            .next()
            .ok_or_else(|| anyhow!("no address for {host}:{}", self.port))
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let addr = config.resolve().await?;

    match config.tls() {
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(%addr, "vacancy server listening");
            axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server error")?;
        }
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.certificate, &tls.key)
                .await
                .with_context(|| {
                    format!(
                        "failed to load TLS material from {} and {}",
                        tls.certificate.display(),
                        tls.key.display()
                    )
                })?;
            let handle = Handle::new();
            tokio::spawn(shutdown_on_signal(handle.clone()));
            info!(%addr, "vacancy server listening with TLS");
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(router.into_make_service())
                .await
                .context("HTTPS server error")?;
        }
    }
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let vacancy_routes = Router::new()
        .route(vacancy::COLLECTION_PATH, any(vacancy::collection))
        .route(vacancy::ITEM_PREFIX, any(vacancy::item))
        .route(vacancy::ITEM_PATH, any(vacancy::item))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_permission,
        ));
    Router::new()
        .route("/health", get(health_handler))
        .merge(vacancy_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.store.ping().await.is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_on_signal(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}
