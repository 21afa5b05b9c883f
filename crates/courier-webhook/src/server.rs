// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Routes:
//! - `GET /health` (unauthenticated, for probes)
//! - `POST /webhooks/delivery` (bearer-token authenticated)

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use courier_core::CourierError;
use courier_storage::Database;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for the ingestion handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub db: Database,
}

/// Webhook server configuration (mirrors `WebhookConfig` from
/// `courier-config` to avoid a dependency on the config crate).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Expected bearer token (`None` = fail closed).
    pub token: Option<String>,
}

/// Build the webhook router.
pub fn router(state: WebhookState, auth: AuthConfig) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::get_health));

    let ingest_routes = Router::new()
        .route("/webhooks/delivery", post(handlers::ingest))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(ingest_routes)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    db: Database,
    cancel: CancellationToken,
) -> Result<(), CourierError> {
    let app = router(
        WebhookState { db },
        AuthConfig {
            token: config.token.clone(),
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Server {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| CourierError::Server {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug_prints_bind_address() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8090,
            token: None,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(debug.contains("8090"));
    }
}
