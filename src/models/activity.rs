use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use utoipa::ToSchema;

use crate::models::task::TaskStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Leave,
    Task,
    Employee,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Leave => "leave",
            ActivityKind::Task => "task",
            ActivityKind::Employee => "employee",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the admin activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivityEvent {
    /// `{kind}-{source record id}`; two events with the same id describe the
    /// same record.
    pub id: String,
    pub kind: ActivityKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(
        kind: ActivityKind,
        source_id: impl fmt::Display,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        ActivityEvent {
            id: format!("{}-{}", kind, source_id),
            kind,
            message,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

/// Row change notification delivered by the realtime hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChangeEvent {
    pub table: String,
    pub operation: ChangeOperation,
    #[schema(value_type = Object)]
    pub record: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DashboardCounts {
    pub employees: i64,
    pub pending_leave: i64,
    pub announcements: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub task_stats: TaskStats,
    pub recent_activity: Vec<ActivityEvent>,
}
