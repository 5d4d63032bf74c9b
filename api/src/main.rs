mod config;
mod display;
mod format;
mod handler;

use axum::{
    routing::{get, post},
    Router,
};
use config::AppConfig;
use connectors::frankfurter::FrankfurterConnector;
use display::DisplayBoard;
use handler::AppState;
use refresher::RateRefreshController;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting RateWatch");

    // Load configuration from environment
    let config = AppConfig::from_env()
        .map_err(|e| format!("Failed to load configuration: {}", e))?;

    // Create rate API connector
    let connector = FrankfurterConnector::with_base_url(
        config.rates.api_base_url.clone(),
        config.rates.request_timeout,
    )
    .map_err(|e| format!("Failed to create rate connector: {}", e))?;

    // Create display board and refresh controller
    let board = Arc::new(DisplayBoard::new());
    let controller = Arc::new(RateRefreshController::new(
        Arc::new(connector),
        board.clone(),
        config.rates.refresh_config(),
    ));
    info!(
        "Tracking {} pairs from {}",
        controller.pairs().len(),
        config.rates.api_base_url
    );

    let refresh = controller.start(config.rates.refresh_interval);
    let state = Arc::new(AppState { board, refresh });

    // Create CORS middleware
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Create Axum router with API routes
    let app = Router::new()
        .route("/api/v1/rates", get(handler::get_rates))
        .route("/api/v1/rates/refresh", post(handler::refresh_rates))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .map_err(|e| format!("Invalid listen address: {}", e))?;
    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.refresh.stop();
    info!("RateWatch stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
