// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Courier workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Delivery status of a queued message.
///
/// Each status carries a rank used for "has progressed at least this far"
/// comparisons when reconciling provider events. `RetryPending` and `Failed`
/// share a rank: both are failure states, distinguished only by whether a
/// further attempt is scheduled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sending,
    Sent,
    Deferred,
    Delivered,
    /// A retryable failure with a scheduled next attempt.
    RetryPending,
    /// A permanent failure; the message will never be claimed again.
    Failed,
    SpamComplaint,
}

impl DeliveryStatus {
    /// Ordinal for progress comparisons between statuses.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Sending => 5,
            Self::Sent => 10,
            Self::Deferred => 20,
            Self::Delivered => 30,
            Self::RetryPending | Self::Failed => 90,
            Self::SpamComplaint => 100,
        }
    }

    /// Whether a message in this status is eligible for dispatcher claims
    /// (subject to its next-attempt and lease timestamps).
    pub const fn is_claimable(self) -> bool {
        matches!(self, Self::Queued | Self::RetryPending)
    }

    /// Whether this status ends the message lifecycle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::SpamComplaint)
    }
}

/// Message body: inline content or a provider-side template reference.
///
/// Exactly one mode is populated per message. Template parameters stay in
/// their serialized form until the dispatcher builds the send request, so a
/// malformed stored value surfaces during dispatch where it can be contained
/// per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageContent {
    Inline {
        html_body: Option<String>,
        text_body: Option<String>,
    },
    Template {
        template_id: i64,
        params_json: Option<String>,
    },
}

/// A file attached to a message. Owned by the message and deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A queued outbound message and its delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub content: MessageContent,
    pub attachments: Vec<Attachment>,
    /// Deployment-wide tags, snapshotted from configuration at enqueue time.
    pub context_tags: Vec<String>,
    /// Per-call tags resolved from the caller's flag set at enqueue time.
    pub use_case_tags: Vec<String>,
    /// Provider-assigned identifier, set only after a successful send.
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub attempt_count: u32,
    /// Null means eligible now.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Lease expiry; null means unclaimed.
    pub locked_until: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether the message satisfies the claimability invariant at `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.status.is_claimable()
            && self.next_attempt_at.is_none_or(|t| t <= now)
            && self.locked_until.is_none_or(|t| t < now)
    }
}

/// An immutable delivery fact reported by the provider about a sent message.
///
/// The triple `(provider_message_id, event, ts_event)` is the idempotency
/// key; a duplicate is discarded without applying its status effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: String,
    pub provider_message_id: String,
    /// Free-form provider event name; normalized only for transition lookup.
    pub event: String,
    /// Provider-supplied event timestamp (unix seconds), not wall-clock.
    pub ts_event: i64,
    pub email: Option<String>,
    pub reason: Option<String>,
    pub link: Option<String>,
    /// Verbatim payload, retained for audit.
    pub raw_payload: String,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

/// A fully-resolved request handed to a [`crate::DeliveryProvider`].
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub template_id: Option<i64>,
    pub template_params: Option<serde_json::Value>,
    pub attachments: Vec<Attachment>,
    /// Merged context + use-case tags, case-insensitively deduplicated.
    pub tags: Vec<String>,
}

/// Outcome of one provider send attempt.
///
/// Providers never return `Err`: every failure mode is folded into
/// `Failure` with a retryability classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success { provider_message_id: Option<String> },
    Failure { error: String, retryable: bool },
}

impl SendOutcome {
    pub fn ok(provider_message_id: impl Into<Option<String>>) -> Self {
        Self::Success {
            provider_message_id: provider_message_id.into(),
        }
    }

    pub fn fail(error: impl Into<String>, retryable: bool) -> Self {
        Self::Failure {
            error: error.into(),
            retryable,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
