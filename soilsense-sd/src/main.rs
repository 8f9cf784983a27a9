//! Session daemon (soilsense-sd) - Main entry point
//!
//! Wires the message bus, the session service, the classifier, and the
//! HTTP/SSE surface together, then serves until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soilsense_common::bus::MessageBus;
use soilsense_common::events::EventBus;
use soilsense_sd::api::{build_router, AppContext};
use soilsense_sd::classify::{ProfileModel, Recommender};
use soilsense_sd::config::{Args, Config, ConfigSource};
use soilsense_sd::service::SessionService;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration resolves first so the file can set the log level;
    // RUST_LOG still wins when present
    let args = Args::parse();
    let config = Config::resolve(&args).context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting SoilSense session daemon v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &config.source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found; using compiled defaults"),
    }

    // Classifier: explicit artifact or the built-in profile table
    let recommender: Arc<dyn Recommender> = match &config.model_path {
        Some(path) => {
            let model = ProfileModel::from_path(path).with_context(|| {
                format!("Failed to load classifier artifact {}", path.display())
            })?;
            info!(
                "Classifier ready: {} crop profiles from {}",
                model.profile_count(),
                path.display()
            );
            Arc::new(model)
        }
        None => {
            let model =
                ProfileModel::builtin().context("Failed to load built-in classifier")?;
            info!(
                "Classifier ready: {} built-in crop profiles",
                model.profile_count()
            );
            Arc::new(model)
        }
    };

    let bus = Arc::new(MessageBus::new(config.bus_capacity));
    let events = Arc::new(EventBus::new(config.bus_capacity));

    // The service subscribes before any HTTP publish can arrive
    let service = SessionService::new(
        Arc::clone(&bus),
        Arc::clone(&events),
        recommender,
        config.topics.clone(),
    );
    let status = service.status();
    service.start();

    let ctx = AppContext {
        bus,
        events,
        status,
    };
    let app = build_router(ctx);

    let addr = config.socket_addr();
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
