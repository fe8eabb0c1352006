use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ovpn_totp::config::Config;
use ovpn_totp::routes::{self, AppState};
use ovpn_totp::totp::{SqliteSecretStore, TotpEngine, TotpService};
use ovpn_totp::db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // One pool for the whole process, closed on shutdown
    let pool = db::connect(&config.database_url).await?;
    let service = TotpService::new(
        Arc::new(SqliteSecretStore::new(pool.clone())),
        TotpEngine::new(config.totp_config()),
    );
    let state = AppState::new(service, &config.jwt_secret);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state, config.totp_enabled).layer(cors);

    if !config.totp_enabled {
        tracing::info!("TOTP is disabled, no TOTP routes are served");
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("HTTP server running on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    pool.close().await;
    tracing::info!("HTTP server stopped");
    Ok(())
}
