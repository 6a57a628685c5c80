//! Row change notifications.
//!
//! Database triggers send `pg_notify('hr_changes', payload)` with a JSON
//! [`ChangeEvent`]. One listener task forwards them into a broadcast
//! channel; subscribers filter by table.

use anyhow::{Context, Result};
use sqlx::postgres::PgListener;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::database::Database;
use crate::models::activity::ChangeEvent;

pub const CHANGES_CHANNEL: &str = "hr_changes";

/// Postgres rejects NOTIFY payloads of this many bytes or more.
pub const NOTIFY_PAYLOAD_LIMIT: usize = 8000;

/// Row columns the trigger copies into [`ChangeEvent::record`].
pub const NOTIFIED_COLUMNS: [&str; 8] = [
    "id",
    "status",
    "title",
    "user_id",
    "assigned_to",
    "full_name",
    "role",
    "created_at",
];

#[derive(Debug, Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl RealtimeHub {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        RealtimeHub { sender }
    }

    /// Returns how many subscriptions received the change.
    pub fn publish(&self, change: ChangeEvent) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    /// Runs `on_change` for every change to `table`, one at a time and in
    /// delivery order, until the returned handle is unsubscribed or dropped.
    pub fn subscribe<F, Fut>(&self, table: &str, mut on_change: F) -> SubscriptionHandle
    where
        F: FnMut(ChangeEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut receiver = self.sender.subscribe();
        let table = table.to_string();
        let task_table = table.clone();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) if change.table == task_table => on_change(change).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Subscription on {} skipped {} changes", task_table, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            log::debug!("Subscription on {} finished", task_table);
        });

        log::info!("📡 Subscribed to {} changes", table);
        SubscriptionHandle {
            table,
            task: Some(task),
        }
    }
}

#[derive(Debug)]
pub struct SubscriptionHandle {
    table: String,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Stops the subscription. Once this returns the callback will not run
    /// again.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            log::info!("Unsubscribed from {} changes", self.table);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Forwards Postgres notifications on [`CHANGES_CHANNEL`] into `hub`.
pub async fn listen(db: &Database, hub: RealtimeHub) -> Result<JoinHandle<()>> {
    let mut listener = PgListener::connect_with(&db.pool)
        .await
        .context("Failed to open notification listener")?;
    listener
        .listen(CHANGES_CHANNEL)
        .await
        .with_context(|| format!("Failed to LISTEN on {}", CHANGES_CHANNEL))?;

    log::info!("🔔 Listening for changes on channel {}", CHANGES_CHANNEL);

    Ok(tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => {
                    match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                        Ok(change) => {
                            log::debug!("Change on {}: {:?}", change.table, change.operation);
                            hub.publish(change);
                        }
                        Err(e) => log::warn!("Ignoring malformed change payload: {}", e),
                    }
                }
                Err(e) => {
                    // The listener reconnects on the next recv.
                    log::error!("Notification listener error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ChangeOperation;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn change(table: &str, id: u32) -> ChangeEvent {
        ChangeEvent {
            table: table.to_string(),
            operation: ChangeOperation::Insert,
            record: json!({ "id": id }),
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn delivers_only_matching_table() {
        let hub = RealtimeHub::new(16);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let handle = hub.subscribe("tasks", move |change| {
            let sink = sink.clone();
            async move { sink.lock().unwrap().push(change.record["id"].clone()) }
        });
        assert_eq!(handle.table(), "tasks");

        hub.publish(change("tasks", 1));
        hub.publish(change("profiles", 2));
        hub.publish(change("tasks", 3));
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!(3)]);
        handle.unsubscribe().await;
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let hub = RealtimeHub::new(16);
        let count = Arc::new(Mutex::new(0));

        let counter = count.clone();
        let handle = hub.subscribe("tasks", move |_| {
            let counter = counter.clone();
            async move { *counter.lock().unwrap() += 1 }
        });

        hub.publish(change("tasks", 1));
        settle().await;
        handle.unsubscribe().await;

        assert_eq!(hub.publish(change("tasks", 2)), 0);
        settle().await;
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn dropping_the_handle_unsubscribes() {
        let hub = RealtimeHub::new(4);
        let handle = hub.subscribe("leave_requests", |_| async {});
        drop(handle);
        settle().await;
        assert_eq!(hub.publish(change("leave_requests", 1)), 0);
    }

    #[test]
    fn trigger_copies_exactly_the_notified_columns() {
        let schema = include_str!("../../schema.sql");
        let columns = NOTIFIED_COLUMNS
            .iter()
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        assert!(schema.contains(&format!("WHERE key IN ({})", columns)));
        assert!(!schema.contains("to_jsonb(NEW) - 'password_hash'"));
    }

    #[test]
    fn largest_notification_fits_payload_limit() {
        // Longest values the request validators accept, in 4-byte characters.
        let title: String = std::iter::repeat('𝄞').take(200).collect();
        let full_name: String = std::iter::repeat('𝄞').take(120).collect();
        let id = "0b9d5a4e-6f0e-4a57-9a3b-3c2f1e0d9c81";
        let change = ChangeEvent {
            table: "leave_requests".to_string(),
            operation: ChangeOperation::Update,
            record: json!({
                "id": id,
                "status": "in_progress",
                "title": title,
                "user_id": id,
                "assigned_to": id,
                "full_name": full_name,
                "role": "employee",
                "created_at": "2024-06-12T09:00:00.123456+00:00"
            }),
        };
        let payload = serde_json::to_string(&change).unwrap();
        assert!(payload.len() < NOTIFY_PAYLOAD_LIMIT, "{} bytes", payload.len());
    }

    #[test]
    fn payload_format_matches_trigger_output() {
        let payload = r#"{"table":"leave_requests","operation":"UPDATE","record":{"id":"L1","status":"approved"}}"#;
        let parsed: ChangeEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.operation, ChangeOperation::Update);
        assert_eq!(parsed.record["status"], "approved");
    }
}
