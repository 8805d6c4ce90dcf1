use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use notification_cell::QueueProcessor;
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting appointment scheduler API server");

    // Load configuration
    let config = AppConfig::from_env();
    let services = router::AppServices::build(&config);
    services
        .notifications
        .validate_configuration()
        .context("invalid notification configuration")?;

    // Periodic delivery of due notifications
    let cancel = CancellationToken::new();
    let processor = QueueProcessor::new(
        Arc::clone(&services.notifications),
        Duration::from_secs(config.queue_interval_seconds.max(1)),
    )
    .spawn(cancel.clone());

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(&services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("server error")?;

    // The server may also stop on its own; make sure the worker follows.
    cancel.cancel();
    processor.await.context("queue processor task failed")?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}
