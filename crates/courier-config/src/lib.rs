// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Courier message queue.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use courier_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("service: {}", config.service.name);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CourierConfig;
pub use validation::{render_errors, validate_config, ConfigError};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid [`CourierConfig`] or the list of violations.
pub fn load_and_validate() -> Result<CourierConfig, Vec<ConfigError>> {
    let config = loader::load_config().map_err(|err| {
        vec![ConfigError {
            field: "config".to_string(),
            message: err.to_string(),
        }]
    })?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<CourierConfig, Vec<ConfigError>> {
    let config = loader::load_config_from_str(toml_content).map_err(|err| {
        vec![ConfigError {
            field: "config".to_string(),
            message: err.to_string(),
        }]
    })?;
    validation::validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_validate_str_reports_figment_errors() {
        let errors = load_and_validate_str("provider = 3").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "config");
    }

    #[test]
    fn load_and_validate_str_accepts_minimal_config() {
        let config = load_and_validate_str("[provider]\nmode = \"smtp\"\n").unwrap();
        assert_eq!(config.provider.mode, "smtp");
    }
}
