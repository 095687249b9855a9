use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tower_http::cors;

use splitpay::config::Config;
use splitpay::handlers;
use splitpay::record::PaymentLinkBase;
use splitpay::service::SplitService;
use splitpay::store::{
    MEMORY_PURGE_INTERVAL, MemoryStore, RedisStore, SplitRecordStore, StoreBackend,
};
use splitpay::util::{SigDown, Telemetry};

/// Initializes the split server.
///
/// - Loads `.env` variables.
/// - Initializes logging and, if configured, OpenTelemetry export.
/// - Connects to Redis, or falls back to the in-memory store.
/// - Starts an Axum HTTP server with the split handlers.
///
/// Binds to the address specified by the `HOST` and `PORT` env vars.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = Config::load()?;

    let sig_down = SigDown::try_new()?;
    let background = TaskTracker::new();

    let backend = match config.redis_url() {
        Some(url) => StoreBackend::Redis(RedisStore::connect(url, config.redis().into()).await?),
        None => {
            tracing::warn!("REDIS_URL is not set, split records are kept in memory");
            let memory = MemoryStore::new();
            memory.spawn_purge(
                MEMORY_PURGE_INTERVAL,
                &background,
                sig_down.cancellation_token(),
            );
            StoreBackend::Memory(memory)
        }
    };
    background.close();
    tracing::info!(backend = backend.name(), "Split store ready");

    let records = SplitRecordStore::new(backend).with_retention(config.retention());
    let service = SplitService::new(records, PaymentLinkBase::new(config.base_url().clone()))
        .with_currency(config.currency());
    let axum_state = Arc::new(service);

    let http_endpoints = Router::new()
        .merge(handlers::routes().with_state(axum_state))
        .layer(telemetry.http_tracing())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host(), config.port());
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| tracing::error!("Failed to bind to {}: {}", addr, e))?;

    let axum_cancellation_token = sig_down.cancellation_token();
    let axum_graceful_shutdown = async move { axum_cancellation_token.cancelled().await };
    let served = axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(axum_graceful_shutdown)
        .await;

    sig_down.cancel();
    sig_down.recv().await;
    background.wait().await;
    tracing::info!("Server stopped");
    served?;

    Ok(())
}
