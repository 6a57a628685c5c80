use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Pending and in-progress tasks are the only ones that can run late.
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// A task row as stored by the backend.
///
/// `status` stays a plain string so that rows with a missing or unknown
/// status still load; [`Task::status`] gives the parsed value.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub assigned_to: Uuid,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn status(&self) -> Option<TaskStatus> {
        self.status.parse().ok()
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and bare calendar
/// dates (midnight UTC). Anything else becomes `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

/// Selection criterion for the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl TaskFilter {
    /// Selecting the active criterion a second time clears it.
    pub fn toggle(self, requested: TaskFilter) -> TaskFilter {
        if self == requested {
            TaskFilter::All
        } else {
            requested
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Success,
    Info,
    Warning,
    Danger,
    Neutral,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub is_overdue: bool,
    pub display_color: StatusColor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct GroupedTasks {
    pub pending: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    pub filter: TaskFilter,
    pub tasks: Vec<TaskView>,
    pub grouped: GroupedTasks,
    pub stats: TaskStats,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Criterion the user just selected.
    pub filter: Option<TaskFilter>,
    /// Criterion that was active before the selection.
    pub active: Option<TaskFilter>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Task title is required"))]
    pub title: String,
    #[validate(length(max = 5000, message = "Description is limited to 5000 characters"))]
    pub description: Option<String>,
    pub assigned_to: Uuid,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_known_statuses_only() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert!("done".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn due_date_accepts_calendar_dates_and_timestamps() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn malformed_row_deserializes_with_safe_defaults() {
        let raw = serde_json::json!({
            "id": "4c5b1c3e-2f7a-4d7e-9a51-0b8f6a3c2d10",
            "title": "Stock count",
            "assigned_to": "a9e7c9d2-1b1f-4a86-8c1e-2d5d2b1c0e11",
            "due_date": "sometime soon",
            "created_at": "2024-03-01T08:00:00Z",
            "updated_at": "2024-03-01T08:00:00Z"
        });

        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.status(), None);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn toggling_the_active_filter_resets_to_all() {
        assert_eq!(TaskFilter::Pending.toggle(TaskFilter::Pending), TaskFilter::All);
        assert_eq!(TaskFilter::Pending.toggle(TaskFilter::Overdue), TaskFilter::Overdue);
        assert_eq!(TaskFilter::All.toggle(TaskFilter::All), TaskFilter::All);
    }

    #[test]
    fn task_description_length_is_bounded() {
        let request = |description: Option<String>| CreateTaskRequest {
            title: "Stock count".to_string(),
            description,
            assigned_to: Uuid::nil(),
            due_date: None,
        };
        assert!(request(None).validate().is_ok());
        assert!(request(Some("d".repeat(5000))).validate().is_ok());
        assert!(request(Some("d".repeat(9000))).validate().is_err());
    }
}
