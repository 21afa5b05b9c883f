// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery event persistence.
//!
//! Events are insert-only. The `(provider_message_id, event, ts_event)`
//! uniqueness constraint is the idempotency key: replayed webhook payloads
//! land on `ON CONFLICT DO NOTHING` and report "not inserted" so the caller
//! skips the status transition.

use courier_core::CourierError;
use rusqlite::params;

use crate::database::{fmt_ts, parse_ts, Database};
use crate::models::DeliveryEvent;

/// Insert a delivery event. Returns `false` when the idempotency key
/// already exists (duplicate — discard, do not re-apply).
pub async fn insert_event(db: &Database, event: &DeliveryEvent) -> Result<bool, CourierError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO events (id, provider_message_id, event, ts_event, email,
                     reason, link, raw_payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (provider_message_id, event, ts_event) DO NOTHING",
                params![
                    event.id,
                    event.provider_message_id,
                    event.event,
                    event.ts_event,
                    event.email,
                    event.reason,
                    event.link,
                    event.raw_payload,
                    fmt_ts(event.created_at),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List stored events for one provider message id, oldest first.
pub async fn list_events(
    db: &Database,
    provider_message_id: &str,
) -> Result<Vec<DeliveryEvent>, CourierError> {
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, provider_message_id, event, ts_event, email, reason, link,
                        raw_payload, created_at
                 FROM events WHERE provider_message_id = ?1
                 ORDER BY ts_event ASC, created_at ASC",
            )?;
            let rows = stmt.query_map(params![provider_message_id], |row| {
                let created_at: String = row.get(8)?;
                Ok(DeliveryEvent {
                    id: row.get(0)?,
                    provider_message_id: row.get(1)?,
                    event: row.get(2)?,
                    ts_event: row.get(3)?,
                    email: row.get(4)?,
                    reason: row.get(5)?,
                    link: row.get(6)?,
                    raw_payload: row.get(7)?,
                    created_at: parse_ts(&created_at).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            8,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_event(id: &str, event: &str, ts_event: i64) -> DeliveryEvent {
        DeliveryEvent {
            id: id.to_string(),
            provider_message_id: "pm-1".to_string(),
            event: event.to_string(),
            ts_event,
            email: Some("tenant@example.com".to_string()),
            reason: None,
            link: None,
            raw_payload: format!(r#"{{"event":"{event}","ts_event":{ts_event}}}"#),
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_then_list() {
        let (db, _dir) = setup_db().await;

        assert!(insert_event(&db, &make_event("e-1", "sent", 1700000000)).await.unwrap());
        assert!(insert_event(&db, &make_event("e-2", "delivered", 1700000060)).await.unwrap());

        let events = list_events(&db, "pm-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "sent");
        assert_eq!(events[1].event, "delivered");
        assert!(list_events(&db, "pm-other").await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_triple_is_discarded() {
        let (db, _dir) = setup_db().await;

        assert!(insert_event(&db, &make_event("e-1", "delivered", 1700000000)).await.unwrap());
        // Same triple, different row id: must be reported as a duplicate.
        assert!(!insert_event(&db, &make_event("e-dup", "delivered", 1700000000)).await.unwrap());

        let events = list_events(&db, "pm-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e-1");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_event_with_different_timestamp_is_new() {
        let (db, _dir) = setup_db().await;

        assert!(insert_event(&db, &make_event("e-1", "deferred", 1700000000)).await.unwrap());
        assert!(insert_event(&db, &make_event("e-2", "deferred", 1700000300)).await.unwrap());

        assert_eq!(list_events(&db, "pm-1").await.unwrap().len(), 2);
        db.close().await.unwrap();
    }
}
