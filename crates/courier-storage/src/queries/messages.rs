// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD and the dispatcher's lease-claim operation.

use chrono::{DateTime, Utc};
use courier_core::tags::{join_csv, parse_csv};
use courier_core::CourierError;
use rusqlite::params;
use std::str::FromStr;

use crate::database::{fmt_ts, parse_ts, Database};
use crate::models::{Attachment, DeliveryStatus, Message, MessageContent};

const MESSAGE_COLUMNS: &str = "id, to_email, to_name, subject, html_body, text_body, \
     template_id, template_params, context_tags, use_case_tags, provider_message_id, \
     status, attempt_count, next_attempt_at, locked_until, last_error, created_at, last_event_at";

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn opt_ts(idx: usize, text: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    text.map(|t| parse_ts(&t).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

/// Map one `MESSAGE_COLUMNS` row. Attachments are loaded separately.
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let template_id: Option<i64> = row.get(6)?;
    let content = match template_id {
        Some(template_id) => MessageContent::Template {
            template_id,
            params_json: row.get(7)?,
        },
        None => MessageContent::Inline {
            html_body: row.get(4)?,
            text_body: row.get(5)?,
        },
    };

    let status_text: String = row.get(11)?;
    let status = DeliveryStatus::from_str(&status_text).map_err(|e| conversion_err(11, e))?;

    let context_tags: String = row.get(8)?;
    let use_case_tags: String = row.get(9)?;
    let created_at: String = row.get(16)?;

    Ok(Message {
        id: row.get(0)?,
        to_email: row.get(1)?,
        to_name: row.get(2)?,
        subject: row.get(3)?,
        content,
        attachments: Vec::new(),
        context_tags: parse_csv(&context_tags),
        use_case_tags: parse_csv(&use_case_tags),
        provider_message_id: row.get(10)?,
        status,
        attempt_count: row.get(12)?,
        next_attempt_at: opt_ts(13, row.get(13)?)?,
        locked_until: opt_ts(14, row.get(14)?)?,
        last_error: row.get(15)?,
        created_at: parse_ts(&created_at).map_err(|e| conversion_err(16, e))?,
        last_event_at: opt_ts(17, row.get(17)?)?,
    })
}

fn load_attachments(
    conn: &rusqlite::Connection,
    message_id: &str,
) -> rusqlite::Result<Vec<Attachment>> {
    let mut stmt = conn.prepare(
        "SELECT file_name, content_type, content FROM attachments
         WHERE message_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![message_id], |row| {
        Ok(Attachment {
            file_name: row.get(0)?,
            content_type: row.get(1)?,
            content: row.get(2)?,
        })
    })?;
    let mut attachments = Vec::new();
    for row in rows {
        attachments.push(row?);
    }
    Ok(attachments)
}

/// Insert a new message together with its attachments, atomically.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), CourierError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let (html_body, text_body, template_id, template_params) = match &msg.content {
                MessageContent::Inline {
                    html_body,
                    text_body,
                } => (html_body.clone(), text_body.clone(), None, None),
                MessageContent::Template {
                    template_id,
                    params_json,
                } => (None, None, Some(*template_id), params_json.clone()),
            };

            tx.execute(
                "INSERT INTO messages (id, to_email, to_name, subject, html_body, text_body,
                     template_id, template_params, context_tags, use_case_tags,
                     provider_message_id, status, attempt_count, next_attempt_at,
                     locked_until, last_error, created_at, last_event_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    msg.id,
                    msg.to_email,
                    msg.to_name,
                    msg.subject,
                    html_body,
                    text_body,
                    template_id,
                    template_params,
                    join_csv(&msg.context_tags),
                    join_csv(&msg.use_case_tags),
                    msg.provider_message_id,
                    msg.status.to_string(),
                    msg.attempt_count,
                    msg.next_attempt_at.map(fmt_ts),
                    msg.locked_until.map(fmt_ts),
                    msg.last_error,
                    fmt_ts(msg.created_at),
                    msg.last_event_at.map(fmt_ts),
                ],
            )?;

            for attachment in &msg.attachments {
                tx.execute(
                    "INSERT INTO attachments (message_id, file_name, content_type, content)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        msg.id,
                        attachment.file_name,
                        attachment.content_type,
                        attachment.content,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim up to `limit` eligible messages for dispatch, oldest first.
///
/// Runs as one transaction on the single writer thread: selects messages
/// whose status is claimable and whose next-attempt and lease timestamps
/// permit a claim, then flips each to `sending` with a lease expiring at
/// `lock_until`. Two concurrent claims can therefore never overlap.
/// Returned messages carry their attachments and updated bookkeeping.
pub async fn claim_batch(
    db: &Database,
    now: DateTime<Utc>,
    lock_until: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Message>, CourierError> {
    let now_s = fmt_ts(now);
    let lock_s = fmt_ts(lock_until);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let mut claimed = Vec::new();
            {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE status IN ('queued', 'retry_pending')
                       AND (next_attempt_at IS NULL OR next_attempt_at <= ?1)
                       AND (locked_until IS NULL OR locked_until < ?1)
                     ORDER BY created_at ASC
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![now_s, limit], row_to_message)?;
                for row in rows {
                    claimed.push(row?);
                }
            }

            for msg in &mut claimed {
                tx.execute(
                    "UPDATE messages SET status = 'sending', locked_until = ?1 WHERE id = ?2",
                    params![lock_s, msg.id],
                )?;
                msg.status = DeliveryStatus::Sending;
                msg.locked_until = Some(lock_until);
                msg.attachments = load_attachments(&tx, &msg.id)?;
            }

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist an attempt-count increment before the provider call, so a crash
/// mid-send still counts as a consumed attempt.
pub async fn record_attempt(
    db: &Database,
    id: &str,
    attempt_count: u32,
) -> Result<(), CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET attempt_count = ?1 WHERE id = ?2",
                params![attempt_count, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the delivery bookkeeping fields after a transition.
pub async fn update_delivery_state(db: &Database, msg: &Message) -> Result<(), CourierError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = ?1, provider_message_id = ?2, attempt_count = ?3,
                     next_attempt_at = ?4, locked_until = ?5, last_error = ?6, last_event_at = ?7
                 WHERE id = ?8",
                params![
                    msg.status.to_string(),
                    msg.provider_message_id,
                    msg.attempt_count,
                    msg.next_attempt_at.map(fmt_ts),
                    msg.locked_until.map(fmt_ts),
                    msg.last_error,
                    msg.last_event_at.map(fmt_ts),
                    msg.id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one message with its attachments.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_message)?;
            match rows.next().transpose()? {
                Some(mut msg) => {
                    msg.attachments = load_attachments(conn, &msg.id)?;
                    Ok(Some(msg))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a message by its provider-assigned identifier.
///
/// Used by the webhook reconciler; a miss is normal (events may reference
/// messages this store never tracked).
pub async fn find_by_provider_message_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<Message>, CourierError> {
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE provider_message_id = ?1 LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![provider_message_id], row_to_message)?;
            match rows.next().transpose()? {
                Some(mut msg) => {
                    msg.attachments = load_attachments(conn, &msg.id)?;
                    Ok(Some(msg))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
