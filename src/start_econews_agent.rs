//! Startup helpers for the econews agent server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::server::{self, AppState};

/// Install the global `tracing` subscriber (`RUST_LOG` overrides `info`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Run the server until Ctrl+C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting econews agent v{}", env!("CARGO_PKG_VERSION"));

    let (config, state) = match initialize() {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("Failed to start: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let served = rt.block_on(async {
        let listener = server::bind(config.port).await?;
        server::serve(listener, state, shutdown_signal()).await
    });
    if let Err(e) = served {
        tracing::error!(port = config.port, "Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Read the configuration and build application state without serving.
///
/// # Errors
/// Returns an error if the configuration is invalid or state creation fails.
pub fn initialize() -> Result<(AgentConfig, Arc<AppState>), Box<dyn std::error::Error + Send + Sync>> {
    let config = AgentConfig::from_env()?;
    tracing::info!(
        ollama = %config.ollama_url,
        model = %config.default_model,
        mode = ?config.execution_mode,
        timeout_secs = config.request_timeout.as_secs(),
        "Configuration loaded"
    );

    let state = AppState::new(&config)?;
    Ok((config, state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
