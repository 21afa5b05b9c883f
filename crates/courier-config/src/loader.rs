// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./courier.toml` > `~/.config/courier/courier.toml`
//! > `/etc/courier/courier.toml`, with environment variable overrides via the
//! `COURIER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CourierConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/courier/courier.toml` (system-wide)
/// 3. `~/.config/courier/courier.toml` (user XDG config)
/// 4. `./courier.toml` (local directory)
/// 5. `COURIER_*` environment variables
pub fn load_config() -> Result<CourierConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CourierConfig::default()))
        .merge(Toml::file("/etc/courier/courier.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("courier/courier.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("courier.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CourierConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CourierConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CourierConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CourierConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `COURIER_PROVIDER_API_KEY` must map to
/// `provider.api_key`, not `provider.api.key`.
fn env_provider() -> Env {
    Env::prefixed("COURIER_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("provider_", "provider.", 1)
            .replacen("dispatcher_", "dispatcher.", 1)
            .replacen("webhook_", "webhook.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "courier");
        assert_eq!(config.storage.database_path, "courier.db");
        assert_eq!(config.dispatcher.batch_size, 10);
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = load_config_from_str(
            r#"
            [provider]
            mode = "smtp"
            smtp_host = "smtp-relay.example.com"
            smtp_port = 2525
            context_tags = ["prod", "eu-west"]

            [dispatcher]
            batch_size = 25

            [webhook]
            token = "hook-secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.mode, "smtp");
        assert_eq!(config.provider.smtp_host, "smtp-relay.example.com");
        assert_eq!(config.provider.smtp_port, 2525);
        assert_eq!(config.provider.context_tags, vec!["prod", "eu-west"]);
        assert_eq!(config.dispatcher.batch_size, 25);
        assert_eq!(config.webhook.token.as_deref(), Some("hook-secret"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str("[dispatcher]\nbatchsize = 3\n");
        assert!(result.is_err(), "misspelled key must fail extraction");
    }

    #[test]
    fn env_vars_override_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("courier.toml", "[provider]\napi_key = \"from-file\"\n")?;
            jail.set_env("COURIER_PROVIDER_API_KEY", "from-env");
            let config = load_config().expect("config should load");
            assert_eq!(config.provider.api_key.as_deref(), Some("from-env"));
            Ok(())
        });
    }
}
