mod models;
mod handlers;
mod routes;
mod docs;
mod config;
mod db;
mod services;
mod ws;

use config::Config;
use db::{dbsync::PgStore, memory::MemoryStore, DocumentStore};
use routes::create_app;
use services::auth_service::{IdentityVerifier, JwtVerifier};
use std::panic;
use std::sync::Arc;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ws::hub::SessionRegistry;
use ws::session::SessionOptions;

/// Process-wide state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
    pub client_mailbox_capacity: usize,
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Configuration is read first so its log level can seed the filter
    let loaded = Config::load();
    let fallback_filter = match &loaded {
        Ok(config) => config::log_filter(&config.log_level),
        Err(_) => config::log_filter(&Config::default().log_level),
    };

    // Initialize tracing, RUST_LOG takes precedence over the configured level
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter.into()))
        .init();

    info!("Starting server...");

    let config = loaded.unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Use the database when configured, otherwise keep documents in memory
    let store: Arc<dyn DocumentStore> = match &config.db_url {
        Some(db_url) => match connect_store(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory storage, documents will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        },
        None => {
            warn!("No database URL configured - documents will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier: Option<Arc<dyn IdentityVerifier>> = match &config.jwt_secret {
        Some(secret) => Some(Arc::new(JwtVerifier::new(secret))),
        None => {
            if config.is_production() {
                error!("No JWT secret configured in production - all connections are anonymous");
            } else {
                warn!("No JWT secret configured - all connections are anonymous");
            }
            None
        }
    };

    let options = SessionOptions {
        save_delay: config.save_debounce(),
        mailbox_capacity: config.session_mailbox_capacity,
    };
    let state = AppState {
        registry: Arc::new(SessionRegistry::new(store.clone(), options)),
        store,
        verifier,
        client_mailbox_capacity: config.client_mailbox_capacity,
    };

    let app = create_app(state, config.cors_origins.as_deref());

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

async fn connect_store(db_url: &str) -> Result<PgStore, sqlx::Error> {
    let store = PgStore::new(db_url).await?;
    store.ensure_schema().await?;
    Ok(store)
}
