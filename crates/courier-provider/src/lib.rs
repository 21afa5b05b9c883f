// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery provider backends for the Courier message queue.
//!
//! Two implementations of [`courier_core::DeliveryProvider`] share one
//! contract: [`api::HttpApiProvider`] posts to the provider's transactional
//! HTTP API, [`smtp::SmtpProvider`] submits through an SMTP relay. The
//! backend is selected exactly once at startup via [`create_provider`],
//! never per message.

pub mod api;
pub mod smtp;

use std::sync::Arc;

use courier_config::model::ProviderConfig;
use courier_core::{CourierError, DeliveryProvider};

pub use api::HttpApiProvider;
pub use smtp::SmtpProvider;

/// Build the configured delivery backend.
pub fn create_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn DeliveryProvider>, CourierError> {
    match config.mode.as_str() {
        "api" => Ok(Arc::new(HttpApiProvider::new(config.clone())?)),
        "smtp" => Ok(Arc::new(SmtpProvider::new(config.clone()))),
        other => Err(CourierError::Config(format!(
            "unknown provider mode \"{other}\" (expected \"api\" or \"smtp\")"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_selects_backend_from_mode() {
        let mut config = ProviderConfig::default();
        assert_eq!(create_provider(&config).unwrap().name(), "api");

        config.mode = "smtp".to_string();
        assert_eq!(create_provider(&config).unwrap().name(), "smtp");

        config.mode = "carrier-pigeon".to_string();
        assert!(create_provider(&config).is_err());
    }
}
