// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use token_sale_server::{
    api::router,
    blockchain::RpcLedgerClient,
    config::{AppConfig, LogFormat},
    confirmation::ConfirmationPoller,
    sale::{default_phases, PhaseRegistry, SaleError},
    state::AppState,
    storage::{SaleDatabase, SaleDbError, DATABASE_FILE},
};

#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to open sale database: {0}")]
    Storage(#[from] SaleDbError),

    #[error("failed to initialise sale state: {0}")]
    Sale(#[from] SaleError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    let db = Arc::new(SaleDatabase::open(&config.data_dir.join(DATABASE_FILE))?);

    let registry = match &config.sale.phases_path {
        Some(path) => PhaseRegistry::from_json_file(path)?,
        None => PhaseRegistry::new(default_phases())?,
    };

    let ledger = Arc::new(RpcLedgerClient::new(
        config.ledger.rpc_url.to_string(),
        config.ledger.rpc_timeout,
    ));
    info!(rpc_url = %ledger.url(), "Ledger client configured");

    let bind_addr = config.bind_addr;
    let poll_interval = config.confirmation.poll_interval;
    let retention = config.confirmation.retention;
    let state = AppState::build(config, db, registry, ledger)?;

    let shutdown = CancellationToken::new();
    let poller = ConfirmationPoller::new(state.tracker.clone(), poll_interval, retention);
    let poller_handle = tokio::spawn(poller.run(shutdown.clone()));

    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "Token sale server listening (docs at /docs)");

    tokio::spawn(watch_signals(shutdown.clone()));
    let server_shutdown = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await?;

    // The server can also stop on its own; make sure the poller follows.
    shutdown.cancel();
    if let Err(e) = poller_handle.await {
        error!(error = %e, "Confirmation poller task failed");
    }
    info!("Shutdown complete");
    Ok(())
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
    shutdown.cancel();
}
