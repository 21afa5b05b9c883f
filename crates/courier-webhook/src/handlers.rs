// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for webhook ingestion.
//!
//! The provider posts either one JSON object or an array of them. Each
//! payload is handled independently: persisted as a [`DeliveryEvent`]
//! (duplicates silently discarded via the idempotency key), then reconciled
//! into the matching message if one exists.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use courier_core::transition;
use courier_core::types::DeliveryEvent;
use courier_core::CourierError;
use courier_storage::queries::{events, messages};
use courier_storage::Database;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::server::WebhookState;

/// One provider callback payload. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ts_event: Option<i64>,
    #[serde(default, rename = "message-id")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `GET /health` — unauthenticated liveness probe.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /webhooks/delivery` — ingest one payload or an array of payloads.
///
/// Always answers `200 "ok"` once processing finishes, even when payloads
/// were dropped, so the provider does not build a retry backlog.
pub async fn ingest(State(state): State<WebhookState>, body: String) -> impl IntoResponse {
    let parsed: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparseable webhook body");
            return (StatusCode::OK, "ok");
        }
    };

    let payloads = match parsed {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    for payload in &payloads {
        if let Err(e) = handle_one(&state.db, payload).await {
            error!(error = %e, "webhook event processing failed");
        }
    }

    (StatusCode::OK, "ok")
}

async fn handle_one(db: &Database, value: &serde_json::Value) -> Result<(), CourierError> {
    let payload: WebhookPayload = match serde_json::from_value(value.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "dropping malformed payload");
            return Ok(());
        }
    };

    // Without the full identity triple the event cannot be reconciled.
    let (Some(provider_message_id), Some(event), Some(ts_event)) =
        (payload.message_id, payload.event, payload.ts_event)
    else {
        debug!("dropping payload missing message-id, event, or ts_event");
        return Ok(());
    };

    let now = Utc::now();
    let record = DeliveryEvent {
        id: Uuid::new_v4().to_string(),
        provider_message_id: provider_message_id.clone(),
        event: event.clone(),
        ts_event,
        email: payload.email,
        reason: payload.reason,
        link: payload.link,
        raw_payload: value.to_string(),
        created_at: now,
    };

    if !events::insert_event(db, &record).await? {
        debug!(
            provider_message_id = %provider_message_id,
            event = %event,
            ts_event,
            "duplicate event discarded"
        );
        return Ok(());
    }

    // Event stays for audit even when no message matches (deleted message,
    // out-of-order arrival, or a send this store never tracked).
    let Some(mut msg) = messages::find_by_provider_message_id(db, &provider_message_id).await?
    else {
        debug!(provider_message_id = %provider_message_id, "no matching message for event");
        return Ok(());
    };

    transition::apply_event(&mut msg, &event, record.reason.as_deref(), now);
    messages::update_delivery_state(db, &msg).await?;
    debug!(message_id = %msg.id, event = %event, status = %msg.status, "event reconciled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_deserializes_provider_field_names() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "event": "delivered",
                "email": "tenant@example.com",
                "ts_event": 1700000000,
                "message-id": "abc123",
                "reason": null,
                "link": null,
                "tag": "ignored-extra-field"
            }"#,
        )
        .unwrap();
        assert_eq!(payload.event.as_deref(), Some("delivered"));
        assert_eq!(payload.message_id.as_deref(), Some("abc123"));
        assert_eq!(payload.ts_event, Some(1700000000));
    }

    #[test]
    fn payload_tolerates_missing_fields() {
        let payload: WebhookPayload = serde_json::from_str(r#"{"event": "delivered"}"#).unwrap();
        assert!(payload.message_id.is_none());
        assert!(payload.ts_event.is_none());
    }
}
