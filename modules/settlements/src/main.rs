use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use settlements_rs::{
    config::Config,
    db,
    health::health,
    routes::orders::{delete_handler, transition_handler},
    routes::reconciliation::reconcile_handler,
    routes::settlements::{get_settlement, record_payment_handler},
    AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting settlements service...");

    // Load configuration from environment
    let config = Config::from_env()
        .expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, statement_timeout_ms={}",
        config.host,
        config.port,
        config.statement_timeout_ms
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let port = config.port;
    let state = Arc::new(AppState { pool, config });

    // Build the application router
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/settlements/reconcile", post(reconcile_handler))
        .route("/api/settlements/{settlement_id}", get(get_settlement))
        .route(
            "/api/settlements/{settlement_id}/payment",
            post(record_payment_handler),
        )
        .route("/api/orders/{order_id}/transition", post(transition_handler))
        .route("/api/orders/{order_id}", delete(delete_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    // Bind to the configured address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Settlements service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // Start the server
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
