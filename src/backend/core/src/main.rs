//! Palisade Server - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use palisade_core::{
    api::{self, AppState},
    audit::MemoryAuditLog,
    config::Config,
    middleware::HeaderIdentity,
    rbac::Role,
    services::{PostService, UserService},
    store::{InMemoryStore, UserRecord, UserStore},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    // Initialize logging and metrics
    telemetry::init_telemetry(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Palisade Server"
    );

    // Wire up storage, audit, and services
    let store = Arc::new(InMemoryStore::new());
    let audit_log = Arc::new(MemoryAuditLog::new(config.audit.retention));

    // Bootstrap account so the system is administrable from the start
    let admin = store
        .insert(UserRecord::new("admin", Role::Admin, None))
        .await?;
    tracing::info!(user_id = admin.id.as_str(), "bootstrap admin created");

    let app_state = AppState {
        users: UserService::new(store.clone(), audit_log.clone()),
        posts: PostService::new(store.clone(), store.clone(), audit_log.clone()),
        audit_log: audit_log.clone(),
    };

    // Build router
    let app = api::api_router(app_state, store, audit_log, Arc::new(HeaderIdentity));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
