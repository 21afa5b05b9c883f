// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status-transition engine.
//!
//! The single decision point for moving a message's status, used by the
//! dispatcher (send outcomes) and the webhook reconciler (delivery events).
//! Event rules are guarded by [`DeliveryStatus::rank`] so late or replayed
//! events cannot move a message backwards.

use chrono::{DateTime, Utc};

use crate::backoff::retry_delay;
use crate::types::{DeliveryStatus, Message, SendOutcome};

/// Apply the result of one provider send attempt.
///
/// `max_attempts` bounds retries: a retryable failure at or past the cap is
/// treated as permanent. The caller has already incremented
/// `msg.attempt_count` for this attempt.
pub fn apply_send_outcome(
    msg: &mut Message,
    outcome: &SendOutcome,
    now: DateTime<Utc>,
    max_attempts: u32,
) {
    match outcome {
        SendOutcome::Success {
            provider_message_id,
        } => {
            msg.status = DeliveryStatus::Sent;
            msg.provider_message_id = provider_message_id.clone();
            msg.locked_until = None;
            msg.next_attempt_at = None;
            msg.last_error = None;
            msg.last_event_at = Some(now);
        }
        SendOutcome::Failure { error, retryable } => {
            msg.last_error = Some(error.clone());
            msg.locked_until = None;
            if !retryable || msg.attempt_count >= max_attempts {
                msg.status = DeliveryStatus::Failed;
                msg.next_attempt_at = None;
            } else {
                msg.status = DeliveryStatus::RetryPending;
                msg.next_attempt_at = Some(now + retry_delay(msg.attempt_count));
            }
        }
    }
}

/// Normalize a provider event name into a transition key: lowercase with
/// every non-alphanumeric character stripped, so `"hard_bounce"`,
/// `"HardBounce"`, and `"HARDBOUNCE"` all collapse to `"hardbounce"`.
pub fn normalize_event_key(event: &str) -> String {
    event
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Apply one provider delivery event.
///
/// Unknown event keys and the open/click tracking events change nothing;
/// `last_event_at` is stamped regardless.
pub fn apply_event(msg: &mut Message, event: &str, reason: Option<&str>, now: DateTime<Utc>) {
    let key = normalize_event_key(event);
    match key.as_str() {
        "request" | "sent" => {
            if msg.status.rank() < DeliveryStatus::Sent.rank() {
                msg.status = DeliveryStatus::Sent;
            }
        }
        "delivered" => {
            if msg.status != DeliveryStatus::SpamComplaint {
                msg.status = DeliveryStatus::Delivered;
            }
        }
        "deferred" | "softbounce" => {
            if msg.status.rank() < DeliveryStatus::Delivered.rank() {
                msg.status = DeliveryStatus::Deferred;
            }
            msg.last_error = Some(reason.unwrap_or(event).to_string());
        }
        "hardbounce" | "blocked" | "invalidemail" | "invalid" | "error" => {
            msg.status = DeliveryStatus::Failed;
            msg.next_attempt_at = None;
            msg.last_error = Some(reason.unwrap_or(event).to_string());
        }
        "spam" => {
            msg.status = DeliveryStatus::SpamComplaint;
            msg.last_error = Some("spam".to_string());
        }
        // Tracking events: persisted upstream, no status effect.
        "opened" | "uniqueopened" | "click" => {}
        _ => {}
    }
    msg.last_event_at = Some(now);
}
