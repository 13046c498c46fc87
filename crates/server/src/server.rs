//! Server initialization, routing, and lifecycle.
//!
//! Startup order matters: the storage sink connects first (template install
//! is fatal), then the pipeline spins up its batcher and workers, and only
//! then does the listener start accepting reports. Shutdown runs the same
//! sequence backwards under a global deadline: stop accepting requests,
//! drain the pipeline, close the sink.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pipeline::BatchPipeline;
use storage::{ElasticsearchStorage, Storage};

use crate::config::ServiceConfig;
use crate::middleware::{log_requests, rate_limit, request_id};
use crate::routes::{health, report};
use crate::state::AppState;

/// Bound on the drain sequence after the listener closes.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the router. The rate limiter guards every endpoint, matching the
/// public fire-and-forget nature of CSP collection: there is no
/// authenticated tier to exempt.
pub fn build_router(state: Arc<AppState>) -> Router {
    let timeout = state.config.read_timeout();

    Router::new()
        .route("/csp-report", post(report::submit_report))
        .route("/csp", post(report::submit_report))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the ingest service and block until shutdown.
///
/// Returns an error (and a non-zero exit through `main`) when the sink is
/// unreachable, the index template cannot be installed, or the port cannot
/// be bound. After SIGINT/SIGTERM the listener closes gracefully, the
/// pipeline drains under [`SHUTDOWN_TIMEOUT`], and the sink is closed.
pub async fn start_server(service_config: ServiceConfig) -> anyhow::Result<()> {
    init_tracing(&service_config);

    let sink: Arc<dyn Storage> =
        Arc::new(ElasticsearchStorage::connect(service_config.elasticsearch()).await?);

    let pipeline_config = service_config.pipeline();
    pipeline_config.validate()?;
    let batch_pipeline = Arc::new(BatchPipeline::start(pipeline_config, Arc::clone(&sink)));

    let service_config = Arc::new(service_config);
    let state = Arc::new(AppState::new(
        Arc::clone(&service_config),
        Arc::clone(&batch_pipeline),
    ));
    let app = build_router(state);

    let addr = service_config.socket_addr()?;
    info!(
        port = service_config.server_port,
        rate_limit = service_config.rate_limit,
        rate_burst = service_config.rate_burst,
        "starting csp ingest server"
    );
    info!(
        read_timeout_secs = service_config.read_timeout().as_secs(),
        write_timeout_secs = service_config.write_timeout().as_secs(),
        idle_timeout_secs = service_config.idle_timeout().as_secs(),
        "http timeouts configured"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("draining batch pipeline");
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, batch_pipeline.shutdown())
        .await
        .is_err()
    {
        warn!("pipeline drain exceeded shutdown deadline");
    }
    if let Err(error) = sink.close().await {
        warn!(error = %error, "failed to close storage sink");
    }

    info!("server exited");
    Ok(())
}

fn init_tracing(service_config: &ServiceConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(service_config.log_filter()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if service_config.production {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c, shutting down"),
        _ = terminate => info!("received sigterm, shutting down"),
    }
}
