// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use bac_grader::coefficients::CoefficientTable;
use bac_grader::config::Config;
use bac_grader::models::catalog::Catalog;
use bac_grader::routes;
use bac_grader::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Load and repair the exam catalog once; it is read-only from here on
    let catalog = Catalog::from_path(&config.catalog_path).expect("Failed to load exam catalog");

    let coefficients = match &config.coefficients_path {
        Some(path) => CoefficientTable::from_path(path).unwrap_or_else(|e| {
            tracing::error!("Failed to load coefficients from {}: {:?}", path, e);
            tracing::warn!("Falling back to built-in coefficients");
            CoefficientTable::default()
        }),
        None => CoefficientTable::default(),
    };
    tracing::info!("Coefficients cover tracks: {}", coefficients.tracks().join(", "));

    // Create AppState
    let state = AppState {
        catalog: Arc::new(catalog),
        coefficients: Arc::new(coefficients),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .expect("BIND_ADDR must be a socket address such as 0.0.0.0:3000");
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
