//! Standalone illustration worker.
//!
//! Runs the illustration dispatcher without the HTTP server. With no
//! in-process queue to drain, the database sweep is the only source of
//! work, so `DISPATCH_POLL_SECS` must be greater than zero.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curico_pipeline::PipelineConfig;

/// Grace period for in-flight illustrations on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "curico_worker=debug,curico_pipeline=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = PipelineConfig::from_env();
    assert!(
        config.poll_interval().is_some(),
        "DISPATCH_POLL_SECS must be greater than 0 for the standalone worker"
    );

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = curico_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    curico_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // Page updates published here have no in-process subscribers; clients
    // pick them up from the status endpoint.
    let event_bus = Arc::new(curico_events::EventBus::default());
    let (pipeline, receiver) = config.build(pool, event_bus).await;
    // Sweep-only: nothing in this process feeds the queue.
    drop(receiver);

    let cancel = CancellationToken::new();
    let dispatcher = Arc::clone(&pipeline.dispatcher);
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        dispatcher.run(None, token).await;
    });

    shutdown_signal().await;
    cancel.cancel();
    let _ = handle.await;

    let drained = pipeline.dispatcher.wait_idle(SHUTDOWN_TIMEOUT).await;
    tracing::info!(
        drained,
        in_flight = pipeline.dispatcher.in_flight(),
        "Worker stopped",
    );
}

/// Wait for SIGINT or SIGTERM (Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
