// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Figment guarantees shape and types; this pass checks cross-field rules
//! that serde cannot express. All violations are collected so an operator
//! fixes a config in one round trip.

use thiserror::Error;

use crate::model::CourierConfig;

/// A single configuration rule violation.
#[derive(Debug, Error)]
#[error("invalid config: {field}: {message}")]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a loaded configuration, collecting every violation.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match config.provider.mode.as_str() {
        "api" | "smtp" => {}
        other => errors.push(ConfigError::new(
            "provider.mode",
            format!("must be \"api\" or \"smtp\", got \"{other}\""),
        )),
    }

    if config.provider.sender_email.trim().is_empty() {
        errors.push(ConfigError::new("provider.sender_email", "must not be empty"));
    }

    if config.dispatcher.poll_seconds == 0 {
        errors.push(ConfigError::new("dispatcher.poll_seconds", "must be at least 1"));
    }
    if config.dispatcher.batch_size == 0 {
        errors.push(ConfigError::new("dispatcher.batch_size", "must be at least 1"));
    }
    if config.dispatcher.lock_minutes < 1 {
        errors.push(ConfigError::new("dispatcher.lock_minutes", "must be at least 1"));
    }
    if config.dispatcher.max_attempts == 0 {
        errors.push(ConfigError::new("dispatcher.max_attempts", "must be at least 1"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::new("storage.database_path", "must not be empty"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Print collected violations to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("courier: {error}");
    }
}
