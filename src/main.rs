use markup_collab::{config::{Config, ConfigError}, create_app, AppState};
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use std::panic;

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first so its log level can seed the tracing filter
    let loaded = Config::load();
    let fallback_filter = loaded
        .as_ref()
        .map(Config::log_filter)
        .unwrap_or_else(|_| Config::default().log_filter());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter.into()))
        .init();

    info!("Starting server...");

    let config = match loaded {
        Ok(config) => config,
        Err(e @ ConfigError::IdleTimeoutTooShort { .. }) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            warn!("Using default configuration");
            Config::default()
        }
    };
    info!("✅ Configuration loaded ({} environment)", config.environment);

    if config.cloud_auth_jwt_secret.is_none() {
        warn!("No JWT secret configured - every collaboration connection will be refused");
    }

    let address = config.server_address();
    let app = create_app(AppState::new(config));

    // Start the HTTP/WebSocket server
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
