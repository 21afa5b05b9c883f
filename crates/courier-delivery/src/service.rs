// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enqueue entry point for callers.
//!
//! Queuing never touches the network: the message is persisted as `queued`
//! with `next_attempt_at = now` and picked up by the dispatcher within one
//! poll interval. Context tags come from deployment configuration and are
//! snapshotted onto the row; use-case tags are resolved from the caller's
//! flag set.

use chrono::Utc;
use courier_core::tags::{normalize_tags, resolve_use_case_tags, UseCaseTag};
use courier_core::types::{Attachment, DeliveryStatus, Message, MessageContent};
use courier_core::CourierError;
use courier_storage::queries::messages;
use courier_storage::Database;
use tracing::info;
use uuid::Uuid;

/// Write-side API for queuing outbound messages.
#[derive(Clone)]
pub struct QueueService {
    db: Database,
    context_tags: Vec<String>,
}

impl QueueService {
    pub fn new(db: Database, context_tags: Vec<String>) -> Self {
        Self {
            db,
            context_tags: normalize_tags(context_tags),
        }
    }

    /// Queue a message with inline subject and body content.
    ///
    /// Returns the generated message id.
    #[allow(clippy::too_many_arguments)]
    pub async fn queue_inline(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        html_body: Option<&str>,
        text_body: Option<&str>,
        attachments: Vec<Attachment>,
        tags: &[UseCaseTag],
    ) -> Result<String, CourierError> {
        let content = MessageContent::Inline {
            html_body: html_body.map(str::to_string),
            text_body: text_body.map(str::to_string),
        };
        self.queue(to_email, to_name, subject.to_string(), content, attachments, tags)
            .await
    }

    /// Queue a message rendered provider-side from a template.
    ///
    /// The parameters are stored serialized and only decoded at dispatch
    /// time. Returns the generated message id.
    pub async fn queue_template(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        template_id: i64,
        params: &serde_json::Value,
        attachments: Vec<Attachment>,
        tags: &[UseCaseTag],
    ) -> Result<String, CourierError> {
        let content = MessageContent::Template {
            template_id,
            params_json: Some(params.to_string()),
        };
        self.queue(
            to_email,
            to_name,
            format!("Template:{template_id}"),
            content,
            attachments,
            tags,
        )
        .await
    }

    async fn queue(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: String,
        content: MessageContent,
        attachments: Vec<Attachment>,
        tags: &[UseCaseTag],
    ) -> Result<String, CourierError> {
        let now = Utc::now();
        let msg = Message {
            id: Uuid::new_v4().to_string(),
            to_email: to_email.to_string(),
            to_name: to_name.map(str::to_string),
            subject,
            content,
            attachments,
            context_tags: self.context_tags.clone(),
            use_case_tags: resolve_use_case_tags(tags),
            provider_message_id: None,
            status: DeliveryStatus::Queued,
            attempt_count: 0,
            next_attempt_at: Some(now),
            locked_until: None,
            last_error: None,
            created_at: now,
            last_event_at: None,
        };
        messages::insert_message(&self.db, &msg).await?;
        info!(message_id = %msg.id, to = %to_email, "message queued");
        Ok(msg.id)
    }
}
