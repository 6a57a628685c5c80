//! Read/write contract the task and activity logic depends on, and its
//! Postgres implementation.

use anyhow::{Context, Result};
use sqlx::Row;
use std::future::Future;
use uuid::Uuid;

use crate::database::Database;
use crate::models::activity::{ChangeEvent, ChangeOperation};
use crate::models::announcement::Announcement;
use crate::models::task::{Task, TaskStatus};

const TASK_COLUMNS: &str =
    "id, title, description, assigned_to, status, due_date, created_at, updated_at";

/// Outcome of a status change limited to the task's assignee.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Updated(Task),
    NotAssignee,
    NotFound,
}

pub trait HrDataSource: Send + Sync + 'static {
    /// Tasks assigned to `user_id`, earliest due date first, undated last.
    fn fetch_tasks(&self, user_id: Uuid) -> impl Future<Output = Result<Vec<Task>>> + Send;

    /// Returns `None` when no task has `task_id`.
    fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
    ) -> impl Future<Output = Result<Option<Task>>> + Send;

    /// Changes the status only if the task is assigned to `assignee`. The
    /// ownership check and the write are one statement.
    fn update_own_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        assignee: Uuid,
    ) -> impl Future<Output = Result<StatusUpdate>> + Send;

    /// Newest first.
    fn fetch_announcements(&self) -> impl Future<Output = Result<Vec<Announcement>>> + Send;

    fn profile_name(&self, user_id: Uuid) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Latest rows of the feed source tables, replayed as change events.
    fn recent_changes(&self, per_table: i64) -> impl Future<Output = Result<Vec<ChangeEvent>>> + Send;
}

impl HrDataSource for Database {
    async fn fetch_tasks(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let query = format!(
            "SELECT {} FROM tasks WHERE assigned_to = $1 ORDER BY due_date ASC NULLS LAST, created_at ASC",
            TASK_COLUMNS
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch tasks for {}", user_id))
    }

    async fn update_task_status(&self, task_id: Uuid, status: TaskStatus) -> Result<Option<Task>> {
        let query = format!(
            "UPDATE tasks SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            TASK_COLUMNS
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(status.as_str())
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to update status of task {}", task_id))
    }

    async fn update_own_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        assignee: Uuid,
    ) -> Result<StatusUpdate> {
        let query = format!(
            "UPDATE tasks SET status = $1, updated_at = NOW() WHERE id = $2 AND assigned_to = $3 RETURNING {}",
            TASK_COLUMNS
        );
        let updated = sqlx::query_as::<_, Task>(&query)
            .bind(status.as_str())
            .bind(task_id)
            .bind(assignee)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to update status of task {}", task_id))?;
        if let Some(task) = updated {
            return Ok(StatusUpdate::Updated(task));
        }

        // Nothing written; only the error to report depends on this read.
        let exists = sqlx::query("SELECT 1 FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up task {}", task_id))?
            .is_some();
        Ok(if exists {
            StatusUpdate::NotAssignee
        } else {
            StatusUpdate::NotFound
        })
    }

    async fn fetch_announcements(&self) -> Result<Vec<Announcement>> {
        sqlx::query_as::<_, Announcement>(
            "SELECT id, title, content, created_by, created_at FROM announcements ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch announcements")
    }

    async fn profile_name(&self, user_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT full_name FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up profile {}", user_id))?;

        Ok(row.and_then(|row| row.get::<Option<String>, _>("full_name")))
    }

    async fn recent_changes(&self, per_table: i64) -> Result<Vec<ChangeEvent>> {
        let sources = [
            ("leave_requests", ChangeOperation::Update, "TRUE"),
            ("tasks", ChangeOperation::Update, "TRUE"),
            ("profiles", ChangeOperation::Insert, "role = 'employee'"),
        ];

        let mut changes = Vec::new();
        for (table, operation, condition) in sources {
            // Table names and conditions come from the fixed list above.
            let query = format!(
                "SELECT to_jsonb(t) - 'password_hash' AS record FROM (SELECT * FROM {} WHERE {} ORDER BY created_at DESC LIMIT $1) t",
                table, condition
            );
            let rows = sqlx::query(&query)
                .bind(per_table)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to load recent rows from {}", table))?;

            changes.extend(rows.into_iter().map(|row| ChangeEvent {
                table: table.to_string(),
                operation,
                record: row.get::<serde_json::Value, _>("record"),
            }));
        }

        Ok(changes)
    }
}
