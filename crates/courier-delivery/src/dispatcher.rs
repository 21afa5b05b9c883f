// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background dispatcher loop.
//!
//! Each cycle claims a bounded batch of eligible messages under a lease,
//! sends them strictly sequentially through the delivery provider, and
//! applies outcomes via the transition engine. The lease is advisory mutual
//! exclusion across dispatcher instances sharing one store; it is not
//! renewed mid-send, so its duration must exceed worst-case provider
//! latency. Cancellation is observed between cycles — an in-flight cycle
//! always finishes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_config::model::DispatcherConfig;
use courier_core::tags::merge_tags;
use courier_core::transition;
use courier_core::types::{DeliveryStatus, Message, MessageContent, SendOutcome, SendRequest};
use courier_core::{CourierError, DeliveryProvider};
use courier_storage::queries::messages::{claim_batch, record_attempt, update_delivery_state};
use courier_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Retry delay for messages that fail outside the provider call
/// (e.g. malformed stored template parameters), instead of the
/// normal backoff schedule.
const LOCAL_FAILURE_RETRY_MINUTES: i64 = 5;

/// The dispatch-and-reconcile send loop.
pub struct Dispatcher {
    db: Database,
    provider: Arc<dyn DeliveryProvider>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(db: Database, provider: Arc<dyn DeliveryProvider>, config: DispatcherConfig) -> Self {
        Self {
            db,
            provider,
            config,
        }
    }

    /// Run until `cancel` fires. Cycle-level errors are logged and the loop
    /// continues at the next poll tick; nothing here terminates the process.
    pub async fn run(&self, cancel: CancellationToken) {
        let poll = Duration::from_secs(self.config.poll_seconds);
        info!(
            provider = self.provider.name(),
            poll_seconds = self.config.poll_seconds,
            batch_size = self.config.batch_size,
            "dispatcher started"
        );
        loop {
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "dispatch cycle failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("dispatcher stopped");
                    break;
                }
                _ = tokio::time::sleep(poll) => {}
            }
        }
    }

    /// One claim-and-send cycle.
    pub async fn run_cycle(&self) -> Result<(), CourierError> {
        let now = Utc::now();
        let lock_until = now + chrono::Duration::minutes(self.config.lock_minutes);
        let batch = claim_batch(&self.db, now, lock_until, self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(());
        }
        debug!(count = batch.len(), "claimed batch");

        for mut msg in batch {
            if let Err(e) = self.process_message(&mut msg).await {
                // Contain the failure to this message and keep the batch going.
                warn!(message_id = %msg.id, error = %e, "message dispatch failed");
                msg.status = DeliveryStatus::RetryPending;
                msg.locked_until = None;
                msg.last_error = Some(e.to_string());
                msg.next_attempt_at =
                    Some(Utc::now() + chrono::Duration::minutes(LOCAL_FAILURE_RETRY_MINUTES));
                if let Err(persist_err) = update_delivery_state(&self.db, &msg).await {
                    error!(message_id = %msg.id, error = %persist_err,
                        "failed to persist dispatch failure");
                }
            }
        }
        Ok(())
    }

    async fn process_message(&self, msg: &mut Message) -> Result<(), CourierError> {
        let request = build_send_request(msg)?;

        // Persist the increment before invoking the provider, so a crash
        // mid-send still counts as a consumed attempt.
        msg.attempt_count += 1;
        record_attempt(&self.db, &msg.id, msg.attempt_count).await?;

        let outcome = self.provider.send(&request).await;
        transition::apply_send_outcome(msg, &outcome, Utc::now(), self.config.max_attempts);
        update_delivery_state(&self.db, msg).await?;

        match &outcome {
            SendOutcome::Success {
                provider_message_id,
            } => {
                info!(
                    message_id = %msg.id,
                    provider_message_id = ?provider_message_id,
                    attempt = msg.attempt_count,
                    "message sent"
                );
            }
            SendOutcome::Failure { error, retryable } => {
                warn!(
                    message_id = %msg.id,
                    attempt = msg.attempt_count,
                    retryable,
                    status = %msg.status,
                    error = %error,
                    "send attempt failed"
                );
            }
        }
        Ok(())
    }
}

/// Resolve a claimed message into the request handed to the provider:
/// merged tag list, decoded template parameters.
fn build_send_request(msg: &Message) -> Result<SendRequest, CourierError> {
    let tags = merge_tags(&msg.context_tags, &msg.use_case_tags);
    let (html_body, text_body, template_id, template_params) = match &msg.content {
        MessageContent::Inline {
            html_body,
            text_body,
        } => (html_body.clone(), text_body.clone(), None, None),
        MessageContent::Template {
            template_id,
            params_json,
        } => {
            let params = params_json
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .map_err(|e| {
                    CourierError::Internal(format!("malformed stored template params: {e}"))
                })?;
            (None, None, Some(*template_id), params)
        }
    };
    Ok(SendRequest {
        to_email: msg.to_email.clone(),
        to_name: msg.to_name.clone(),
        subject: msg.subject.clone(),
        html_body,
        text_body,
        template_id,
        template_params,
        attachments: msg.attachments.clone(),
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_message(content: MessageContent) -> Message {
        Message {
            id: "m-1".into(),
            to_email: "tenant@example.com".into(),
            to_name: None,
            subject: "Subject".into(),
            content,
            attachments: vec![],
            context_tags: vec!["prod".to_string()],
            use_case_tags: vec!["PROD".to_string(), "billing-invoice-sent".to_string()],
            provider_message_id: None,
            status: DeliveryStatus::Sending,
            attempt_count: 0,
            next_attempt_at: None,
            locked_until: None,
            last_error: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap(),
            last_event_at: None,
        }
    }

    #[test]
    fn build_request_merges_tags_case_insensitively() {
        let msg = make_message(MessageContent::Inline {
            html_body: Some("<p>x</p>".into()),
            text_body: None,
        });
        let request = build_send_request(&msg).unwrap();
        assert_eq!(request.tags, vec!["prod", "billing-invoice-sent"]);
        assert_eq!(request.html_body.as_deref(), Some("<p>x</p>"));
        assert!(request.template_id.is_none());
    }

    #[test]
    fn build_request_decodes_template_params() {
        let msg = make_message(MessageContent::Template {
            template_id: 7,
            params_json: Some(r#"{"amount": 120}"#.into()),
        });
        let request = build_send_request(&msg).unwrap();
        assert_eq!(request.template_id, Some(7));
        assert_eq!(request.template_params.unwrap()["amount"], 120);
    }

    #[test]
    fn build_request_rejects_malformed_params() {
        let msg = make_message(MessageContent::Template {
            template_id: 7,
            params_json: Some("{not json".into()),
        });
        let err = build_send_request(&msg).unwrap_err();
        assert!(err.to_string().contains("malformed stored template params"));
    }
}
