use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unistay::cli::{run_command, Cli};
use unistay::config::Config;
use unistay::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.command.is_some() {
        init_logging(cli.log_level.as_deref().unwrap_or("warn"));
        return run_command(&cli).await;
    }

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&log_level);

    tracing::info!("Starting Unistay v{}", env!("CARGO_PKG_VERSION"));
    if cli.config.exists() {
        tracing::info!("Loaded configuration from {}", cli.config.display());
    } else {
        tracing::info!("No config file at {}, using defaults", cli.config.display());
    }

    let store = unistay::db::init(&config.storage).await?;

    if cli.skip_checks {
        tracing::warn!("Startup checks skipped (--skip-checks)");
    } else {
        let report = unistay::startup::run_startup_checks(&config, store.as_ref()).await;
        if !report.all_critical_passed {
            anyhow::bail!("Critical startup checks failed: {}", report.summary);
        }
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store));
    let app = unistay::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

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
