use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clipr::config::Config;
use clipr::events::{EventKind, EventSink, ServiceEvent, TracingEventSink};
use clipr::registry::RegistryService;
use clipr::storage::open_storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage = open_storage(&config.database).await?;
    info!("Storage initialized successfully");

    let events = Arc::new(TracingEventSink::default());
    let registry = Arc::new(
        RegistryService::new(Arc::clone(&storage), config.registry.clone())
            .with_events(events.clone()),
    );

    if config.cors.allowed_origins.is_empty() {
        info!("CORS: allowing any origin");
    } else {
        info!("CORS: allowing origins {:?}", config.cors.allowed_origins);
    }

    let app = clipr::create_app(registry, config.client_ip.clone(), &config.cors)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    events.emit(ServiceEvent::info(
        EventKind::Server,
        format!("Server started on port {}", config.server.port),
    ));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped, closing storage...");
    storage.close().await;
    events.emit(ServiceEvent::info(EventKind::Server, "Server shut down"));

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
