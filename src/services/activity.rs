//! Turns row changes into activity feed entries and keeps the shared feed
//! fed from realtime subscriptions.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::activity::{ActivityEvent, ActivityKind, ChangeEvent, ChangeOperation};
use crate::models::auth::Role;
use crate::models::task::parse_timestamp;
use crate::services::activity_feed::{
    employee_message, leave_message, task_message, SharedActivityFeed, FEED_CAPACITY,
};
use crate::services::data_source::HrDataSource;
use crate::services::realtime::{RealtimeHub, SubscriptionHandle};

pub const LEAVE_TABLE: &str = "leave_requests";
pub const TASK_TABLE: &str = "tasks";
pub const PROFILE_TABLE: &str = "profiles";

fn text<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Resolves a profile name, logging and swallowing lookup failures so the
/// message falls back to the default name.
async fn lookup_name<S: HrDataSource>(source: &S, user_field: Option<&str>) -> Option<String> {
    let user_id = match user_field.map(Uuid::parse_str) {
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            log::warn!("Activity record has malformed user id: {}", e);
            return None;
        }
        None => return None,
    };

    match source.profile_name(user_id).await {
        Ok(name) => name,
        Err(e) => {
            log::error!("Profile lookup for {} failed: {:#}", user_id, e);
            None
        }
    }
}

/// Builds the feed entry for a change, or `None` for changes the feed does
/// not show: deletes, profile updates, admin profiles, other tables and
/// records without an id.
///
/// `received_at` stands in for a missing or unreadable `created_at`.
pub async fn activity_from_change<S: HrDataSource>(
    source: &S,
    change: &ChangeEvent,
    received_at: DateTime<Utc>,
) -> Option<ActivityEvent> {
    if change.operation == ChangeOperation::Delete {
        return None;
    }

    let record = &change.record;
    let id = record_id(record)?;
    let created_at = text(record, "created_at")
        .and_then(parse_timestamp)
        .unwrap_or(received_at);
    let status = text(record, "status").unwrap_or_default();

    let (kind, message) = match change.table.as_str() {
        LEAVE_TABLE => {
            let name = lookup_name(source, text(record, "user_id")).await;
            (ActivityKind::Leave, leave_message(name.as_deref(), status))
        }
        TASK_TABLE => {
            let name = lookup_name(source, text(record, "assigned_to")).await;
            let title = text(record, "title").unwrap_or_default();
            (ActivityKind::Task, task_message(name.as_deref(), status, title))
        }
        PROFILE_TABLE
            if change.operation == ChangeOperation::Insert
                && text(record, "role") == Some(Role::Employee.as_str()) =>
        {
            (ActivityKind::Employee, employee_message(text(record, "full_name")))
        }
        _ => return None,
    };

    Some(ActivityEvent::new(kind, id, message, created_at))
}

/// Loads the latest rows into the feed before live changes start arriving.
pub async fn seed_feed<S: HrDataSource>(source: &S, feed: &SharedActivityFeed) {
    let changes = match source.recent_changes(FEED_CAPACITY as i64).await {
        Ok(changes) => changes,
        Err(e) => {
            log::error!("Failed to seed activity feed: {:#}", e);
            return;
        }
    };

    let now = Utc::now();
    for change in &changes {
        if let Some(event) = activity_from_change(source, change, now).await {
            feed.ingest(event);
        }
    }
    log::info!("📰 Activity feed seeded with {} entries", feed.snapshot().len());
}

/// Subscribes the feed to the leave, task and profile tables.
pub fn subscribe_feed<S: HrDataSource>(
    hub: &RealtimeHub,
    source: Arc<S>,
    feed: SharedActivityFeed,
) -> Vec<SubscriptionHandle> {
    [LEAVE_TABLE, TASK_TABLE, PROFILE_TABLE]
        .into_iter()
        .map(|table| {
            let source = source.clone();
            let feed = feed.clone();
            hub.subscribe(table, move |change| {
                let source = source.clone();
                let feed = feed.clone();
                async move {
                    if let Some(event) = activity_from_change(source.as_ref(), &change, Utc::now()).await {
                        log::debug!("Activity: {}", event.message);
                        feed.ingest(event);
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::data_source::memory::MemorySource;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;

    const ALICE: &str = "0b9d5a4e-6f0e-4a57-9a3b-3c2f1e0d9c81";

    fn source() -> MemorySource {
        let mut names = HashMap::new();
        names.insert(Uuid::parse_str(ALICE).unwrap(), Some("Alice".to_string()));
        MemorySource {
            names,
            ..MemorySource::default()
        }
    }

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
    }

    fn change(table: &str, operation: ChangeOperation, record: Value) -> ChangeEvent {
        ChangeEvent {
            table: table.to_string(),
            operation,
            record,
        }
    }

    fn leave(status: &str) -> ChangeEvent {
        change(
            LEAVE_TABLE,
            ChangeOperation::Update,
            json!({
                "id": "L1",
                "user_id": ALICE,
                "status": status,
                "created_at": "2024-06-10T08:00:00Z"
            }),
        )
    }

    #[tokio::test]
    async fn leave_events_resolve_the_requester() {
        let event = activity_from_change(&source(), &leave("pending"), received())
            .await
            .unwrap();

        assert_eq!(event.id, "leave-L1");
        assert_eq!(event.kind, ActivityKind::Leave);
        assert_eq!(event.message, "Alice requested leave");
        assert_eq!(event.created_at, Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn pending_then_approved_leaves_one_entry() {
        let source = source();
        let feed = SharedActivityFeed::new();
        for status in ["pending", "approved"] {
            let event = activity_from_change(&source, &leave(status), received()).await.unwrap();
            feed.ingest(event);
        }

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.events()[0].message, "Alice was approved for leave");
    }

    #[tokio::test]
    async fn failed_lookup_uses_default_name() {
        let source = MemorySource {
            fail_lookups: true,
            ..source()
        };
        let event = activity_from_change(&source, &leave("pending"), received()).await.unwrap();
        assert_eq!(event.message, "Employee requested leave");
    }

    #[tokio::test]
    async fn unknown_or_malformed_user_uses_default_name() {
        let record = json!({
            "id": "T9",
            "assigned_to": "not-a-uuid",
            "title": "Restock shelves",
            "status": "completed"
        });
        let event = activity_from_change(
            &source(),
            &change(TASK_TABLE, ChangeOperation::Update, record),
            received(),
        )
        .await
        .unwrap();

        assert_eq!(event.message, "Employee completed task: Restock shelves");
        assert_eq!(event.created_at, received());
    }

    #[tokio::test]
    async fn task_assignment_message() {
        let record = json!({
            "id": "T1",
            "assigned_to": ALICE,
            "title": "Quarterly report",
            "status": "pending",
            "created_at": "2024-06-11"
        });
        let event = activity_from_change(
            &source(),
            &change(TASK_TABLE, ChangeOperation::Insert, record),
            received(),
        )
        .await
        .unwrap();

        assert_eq!(event.id, "task-T1");
        assert_eq!(event.message, "Alice was assigned task: Quarterly report");
    }

    #[tokio::test]
    async fn employee_joins_only_on_insert() {
        let record = json!({
            "id": "E1",
            "full_name": "Dana",
            "role": "employee",
            "created_at": "2024-06-11T10:00:00Z"
        });

        let inserted = activity_from_change(
            &source(),
            &change(PROFILE_TABLE, ChangeOperation::Insert, record.clone()),
            received(),
        )
        .await;
        assert_eq!(inserted.unwrap().message, "New employee Dana joined the team");

        let updated = activity_from_change(
            &source(),
            &change(PROFILE_TABLE, ChangeOperation::Update, record),
            received(),
        )
        .await;
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn new_admins_are_not_announced() {
        let record = json!({
            "id": "A1",
            "full_name": "Root Admin",
            "role": "admin",
            "created_at": "2024-06-11T10:00:00Z"
        });
        let event = activity_from_change(
            &source(),
            &change(PROFILE_TABLE, ChangeOperation::Insert, record),
            received(),
        )
        .await;
        assert!(event.is_none());

        let no_role = json!({ "id": "E2", "full_name": "Sam" });
        let event = activity_from_change(
            &source(),
            &change(PROFILE_TABLE, ChangeOperation::Insert, no_role),
            received(),
        )
        .await;
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn deletes_and_other_tables_are_ignored() {
        let deleted = change(TASK_TABLE, ChangeOperation::Delete, json!({ "id": "T1" }));
        assert!(activity_from_change(&source(), &deleted, received()).await.is_none());

        let other = change("announcements", ChangeOperation::Insert, json!({ "id": "A1" }));
        assert!(activity_from_change(&source(), &other, received()).await.is_none());

        let no_id = change(TASK_TABLE, ChangeOperation::Insert, json!({ "title": "x" }));
        assert!(activity_from_change(&source(), &no_id, received()).await.is_none());
    }

    #[tokio::test]
    async fn live_subscriptions_feed_the_shared_feed() {
        let hub = RealtimeHub::new(32);
        let feed = SharedActivityFeed::new();
        let handles = subscribe_feed(&hub, Arc::new(source()), feed.clone());
        assert_eq!(handles.len(), 3);

        for n in 1..=6 {
            hub.publish(change(
                PROFILE_TABLE,
                ChangeOperation::Insert,
                json!({
                    "id": format!("E{}", n),
                    "full_name": format!("Person {}", n),
                    "role": "employee",
                    "created_at": format!("2024-06-0{}T09:00:00Z", n)
                }),
            ));
        }
        hub.publish(leave("pending"));

        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), FEED_CAPACITY);
        assert_eq!(snapshot.events()[0].id, "leave-L1");
        assert!(snapshot.events().iter().all(|e| e.id != "employee-E1"));

        for handle in handles {
            handle.unsubscribe().await;
        }
    }

    #[tokio::test]
    async fn seeding_replays_recent_rows() {
        let source = MemorySource {
            changes: vec![
                leave("pending"),
                change(
                    PROFILE_TABLE,
                    ChangeOperation::Insert,
                    json!({
                        "id": "E1",
                        "full_name": null,
                        "role": "employee",
                        "created_at": "2024-06-01T09:00:00Z"
                    }),
                ),
            ],
            ..source()
        };
        let feed = SharedActivityFeed::new();
        seed_feed(&source, &feed).await;

        let messages: Vec<_> = feed
            .snapshot()
            .events()
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(messages, ["Alice requested leave", "New employee Employee joined the team"]);
    }

    #[tokio::test]
    async fn live_changes_during_seeding_are_kept() {
        let hub = RealtimeHub::new(8);
        let source = Arc::new(MemorySource {
            changes: vec![leave("pending")],
            ..source()
        });
        let feed = SharedActivityFeed::new();
        let handles = subscribe_feed(&hub, source.clone(), feed.clone());

        let live = json!({
            "id": "T1",
            "assigned_to": ALICE,
            "title": "Close till",
            "status": "completed",
            "created_at": "2024-06-11T17:00:00Z"
        });
        assert_eq!(hub.publish(change(TASK_TABLE, ChangeOperation::Update, live)), 3);
        seed_feed(source.as_ref(), &feed).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let ids: Vec<_> = feed.snapshot().events().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, ["task-T1", "leave-L1"]);

        for handle in handles {
            handle.unsubscribe().await;
        }
    }
}
