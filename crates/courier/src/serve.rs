// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Wires the configured store, delivery provider, dispatcher loop, and
//! webhook server together, and handles graceful shutdown: Ctrl-C cancels
//! the shared token, the dispatcher finishes its in-flight cycle, the
//! webhook server drains, and the WAL is checkpointed on the way out.

use courier_config::model::CourierConfig;
use courier_core::CourierError;
use courier_delivery::Dispatcher;
use courier_provider::create_provider;
use courier_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.service.log_level);

    let db = Database::open(&config.storage.database_path).await?;
    let provider = create_provider(&config.provider)?;
    info!(
        provider = provider.name(),
        database = %config.storage.database_path,
        "courier starting"
    );

    let cancel = CancellationToken::new();

    let webhook_handle = if config.webhook.enabled {
        let server_config = courier_webhook::ServerConfig {
            host: config.webhook.host.clone(),
            port: config.webhook.port,
            token: config.webhook.token.clone(),
        };
        let db = db.clone();
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = courier_webhook::start_server(&server_config, db, cancel).await {
                error!(error = %e, "webhook server exited");
            }
        }))
    } else {
        info!("webhook server disabled by configuration");
        None
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                cancel.cancel();
            }
        });
    }

    let dispatcher = Dispatcher::new(db.clone(), provider, config.dispatcher.clone());
    dispatcher.run(cancel).await;

    if let Some(handle) = webhook_handle {
        let _ = handle.await;
    }
    db.close().await?;
    info!("courier stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let directives = [
        "courier",
        "courier_config",
        "courier_core",
        "courier_storage",
        "courier_provider",
        "courier_delivery",
        "courier_webhook",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .collect::<Vec<_>>()
    .join(",");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{directives},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
