// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier message queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delivery provider settings (HTTP API or SMTP relay).
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Dispatcher loop settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Webhook ingestion server settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "courier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "courier.db".to_string()
}

/// Delivery provider configuration.
///
/// `mode` selects the backend once at startup: `"api"` posts to the
/// provider's transactional HTTP API, `"smtp"` submits through a relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Backend selection: "api" or "smtp".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// API key for the HTTP backend. `None` fails sends permanently.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the transactional HTTP API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// When true, API sends carry the sandbox marker header and are
    /// dropped by the provider instead of delivered.
    #[serde(default)]
    pub sandbox: bool,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    /// Sender display name.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Sender address.
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// SMTP relay host (required in smtp mode).
    #[serde(default)]
    pub smtp_host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username; empty skips authentication.
    #[serde(default)]
    pub smtp_username: String,

    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,

    /// Use STARTTLS when the relay offers it.
    #[serde(default = "default_true")]
    pub smtp_use_tls: bool,

    /// Master switch: when false, every send short-circuits to success
    /// without touching the network (dry-run/maintenance).
    #[serde(default = "default_true")]
    pub enable_sending: bool,

    /// Deployment-wide context tags stamped on every enqueued message.
    #[serde(default)]
    pub context_tags: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            api_key: None,
            api_base_url: default_api_base_url(),
            sandbox: false,
            http_timeout_seconds: default_http_timeout_seconds(),
            sender_name: default_sender_name(),
            sender_email: default_sender_email(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_use_tls: true,
            enable_sending: true,
            context_tags: Vec::new(),
        }
    }
}

fn default_mode() -> String {
    "api".to_string()
}

fn default_api_base_url() -> String {
    "https://api.brevo.com".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_sender_name() -> String {
    "Courier".to_string()
}

fn default_sender_email() -> String {
    "no-reply@localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// Dispatcher loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Seconds between claim cycles.
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,

    /// Maximum messages claimed per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Lease duration in minutes. Must exceed worst-case provider latency
    /// with margin, or a second instance may reclaim and double-send.
    #[serde(default = "default_lock_minutes")]
    pub lock_minutes: i64,

    /// Send attempts before a retryable failure becomes permanent.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_seconds: default_poll_seconds(),
            batch_size: default_batch_size(),
            lock_minutes: default_lock_minutes(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_seconds() -> u64 {
    5
}

fn default_batch_size() -> u32 {
    10
}

fn default_lock_minutes() -> i64 {
    2
}

fn default_max_attempts() -> u32 {
    7
}

/// Webhook ingestion server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Enable the webhook server.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_webhook_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// Expected bearer token. `None` rejects every request (fail-closed).
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_webhook_host(),
            port: default_webhook_port(),
            token: None,
        }
    }
}

fn default_webhook_host() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_port() -> u16 {
    8090
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_dispatcher_contract() {
        let config = CourierConfig::default();
        assert_eq!(config.dispatcher.poll_seconds, 5);
        assert_eq!(config.dispatcher.batch_size, 10);
        assert_eq!(config.dispatcher.lock_minutes, 2);
        assert_eq!(config.dispatcher.max_attempts, 7);
        assert_eq!(config.provider.mode, "api");
        assert!(config.provider.enable_sending);
        assert!(config.webhook.token.is_none());
    }
}
