//! CaseForge Gateway
//!
//! Serves the case search site over the hosted case table.
//! Handles:
//! - Filtered, paginated search
//! - Case detail pages addressed by derived case id
//! - CSV export
//! - Observability (logging, metrics, health probes)

mod handlers;
mod middleware;
mod telemetry;
mod views;

use anyhow::Context;
use axum::{middleware::from_fn, routing::get, Router};
use caseforge_common::{
    config::AppConfig,
    db::{create_store, CaseRepository},
    metrics::{self, LATENCY_BUCKETS},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: CaseRepository,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = telemetry::init_tracing(&config.observability)?;

    info!(
        service = %config.observability.service_name,
        "Starting CaseForge gateway v{}",
        caseforge_common::VERSION
    );

    let config = Arc::new(config);

    // Initialize metrics
    let metrics = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)?
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    // Initialize case store
    let store = create_store(&config)?;
    let repo = CaseRepository::from_config(store, &config);

    let state = AppState {
        config: config.clone(),
        repo,
        metrics,
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        // Pages
        .route("/", get(handlers::search::index))
        .route("/case/{case_id}", get(handlers::cases::case_detail))
        .route("/export", get(handlers::export::export_cases))
        // Operations
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .route_layer(from_fn(middleware::track_metrics))
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response};
    use async_trait::async_trait;
    use caseforge_common::{
        db::{CaseStore, MemoryStore},
        AppError, CaseQuery, CaseRecord, Result,
    };
    use tower::ServiceExt;

    /// State over the three sample cases, without a metrics recorder
    pub fn state() -> AppState {
        state_with_store(Arc::new(MemoryStore::with_sample_cases()))
    }

    pub fn state_with_store(store: Arc<dyn CaseStore>) -> AppState {
        let config = AppConfig::in_memory();
        let repo = CaseRepository::from_config(store, &config);
        AppState {
            config: Arc::new(config),
            repo,
            metrics: None,
        }
    }

    /// Store whose every call fails as if the database were down
    pub struct FailingStore;

    #[async_trait]
    impl CaseStore for FailingStore {
        async fn fetch(&self, _query: &CaseQuery) -> Result<Vec<CaseRecord>> {
            Err(AppError::StorageUnavailable {
                message: "connection refused".to_string(),
            })
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::StorageUnavailable {
                message: "connection refused".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    pub async fn get(state: AppState, uri: &str) -> Response<Body> {
        create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    pub async fn body_text(response: Response<Body>) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }
}
