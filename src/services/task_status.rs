//! Derived task state: overdue detection, display colors, filtering,
//! grouping and counts.
//!
//! Everything here is a pure function of the task list and an explicit
//! `now`. Nothing is cached, since a task becomes overdue without any row
//! changing.

use chrono::{DateTime, Utc};

use crate::models::task::{
    GroupedTasks, StatusColor, Task, TaskFilter, TaskStats, TaskStatus, TaskView,
};

pub fn classify_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    let open = task.status().is_some_and(|status| status.is_open());
    match task.due_date {
        Some(due) => open && due < now,
        None => false,
    }
}

pub fn status_color(task: &Task, now: DateTime<Utc>) -> StatusColor {
    match task.status() {
        Some(TaskStatus::Completed) => StatusColor::Success,
        Some(TaskStatus::InProgress) => StatusColor::Info,
        Some(TaskStatus::Pending) if classify_overdue(task, now) => StatusColor::Danger,
        Some(TaskStatus::Pending) => StatusColor::Warning,
        None => StatusColor::Neutral,
    }
}

pub fn derive_view(task: &Task, now: DateTime<Utc>) -> TaskView {
    TaskView {
        is_overdue: classify_overdue(task, now),
        display_color: status_color(task, now),
        task: task.clone(),
    }
}

/// Tasks matching `criterion`, in input order.
pub fn filter_by_criterion(tasks: &[Task], criterion: TaskFilter, now: DateTime<Utc>) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| matches_criterion(task, criterion, now))
        .cloned()
        .collect()
}

fn matches_criterion(task: &Task, criterion: TaskFilter, now: DateTime<Utc>) -> bool {
    match criterion {
        TaskFilter::All => true,
        TaskFilter::Pending => task.status() == Some(TaskStatus::Pending),
        TaskFilter::InProgress => task.status() == Some(TaskStatus::InProgress),
        TaskFilter::Completed => task.status() == Some(TaskStatus::Completed),
        TaskFilter::Overdue => classify_overdue(task, now),
    }
}

/// Applies a user selection on top of the currently active criterion.
/// Returns the criterion now in effect together with the matching tasks.
pub fn select(
    tasks: &[Task],
    active: TaskFilter,
    requested: TaskFilter,
    now: DateTime<Utc>,
) -> (TaskFilter, Vec<Task>) {
    let effective = active.toggle(requested);
    (effective, filter_by_criterion(tasks, effective, now))
}

/// Stable partition by status. Rows without a recognised status are left out.
pub fn group_by_status(tasks: &[Task]) -> GroupedTasks {
    let mut grouped = GroupedTasks::default();
    for task in tasks {
        match task.status() {
            Some(TaskStatus::Pending) => grouped.pending.push(task.clone()),
            Some(TaskStatus::InProgress) => grouped.in_progress.push(task.clone()),
            Some(TaskStatus::Completed) => grouped.completed.push(task.clone()),
            None => log::debug!("Task {} has unrecognised status '{}'", task.id, task.status),
        }
    }
    grouped
}

pub fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    tasks.iter().fold(
        TaskStats {
            total: tasks.len(),
            ..TaskStats::default()
        },
        |mut stats, task| {
            match task.status() {
                Some(TaskStatus::Pending) => stats.pending += 1,
                Some(TaskStatus::InProgress) => stats.in_progress += 1,
                Some(TaskStatus::Completed) => stats.completed += 1,
                None => {}
            }
            if classify_overdue(task, now) {
                stats.overdue += 1;
            }
            stats
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap()
    }

    fn task(title: &str, status: &str, due_in_days: Option<i64>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            assigned_to: Uuid::nil(),
            status: status.to_string(),
            due_date: due_in_days.map(|days| now() + Duration::days(days)),
            created_at: now() - Duration::days(10),
            updated_at: now() - Duration::days(10),
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("late pending", "pending", Some(-2)),
            task("late in progress", "in_progress", Some(-1)),
            task("late completed", "completed", Some(-3)),
            task("future pending", "pending", Some(4)),
            task("no due date", "in_progress", None),
            task("broken", "archived", Some(-5)),
        ]
    }

    #[test]
    fn open_tasks_past_due_are_overdue() {
        assert!(classify_overdue(&task("a", "pending", Some(-1)), now()));
        assert!(classify_overdue(&task("b", "in_progress", Some(-1)), now()));
    }

    #[test]
    fn completed_tasks_are_never_overdue() {
        for days in [-30, -1, 0, 1] {
            assert!(!classify_overdue(&task("done", "completed", Some(days)), now()));
        }
    }

    #[test]
    fn tasks_without_due_date_are_never_overdue() {
        assert!(!classify_overdue(&task("a", "pending", None), now()));
        assert!(!classify_overdue(&task("b", "in_progress", None), now()));
    }

    #[test]
    fn due_exactly_now_is_not_overdue() {
        let mut t = task("edge", "pending", None);
        t.due_date = Some(now());
        assert!(!classify_overdue(&t, now()));
    }

    #[test]
    fn unknown_status_is_not_overdue_and_renders_neutral() {
        let t = task("broken", "archived", Some(-5));
        assert!(!classify_overdue(&t, now()));
        assert_eq!(status_color(&t, now()), StatusColor::Neutral);
    }

    #[test]
    fn overdue_pending_task_scenario() {
        let tasks = vec![task("report", "pending", Some(-1))];

        assert!(classify_overdue(&tasks[0], now()));
        assert_eq!(status_color(&tasks[0], now()), StatusColor::Danger);
        assert_eq!(filter_by_criterion(&tasks, TaskFilter::Overdue, now()).len(), 1);

        let stats = compute_stats(&tasks, now());
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn completed_task_past_due_scenario() {
        let t = task("report", "completed", Some(-1));
        assert!(!classify_overdue(&t, now()));
        assert_eq!(status_color(&t, now()), StatusColor::Success);
    }

    #[test]
    fn colors_by_status() {
        assert_eq!(status_color(&task("a", "in_progress", Some(-1)), now()), StatusColor::Info);
        assert_eq!(status_color(&task("b", "pending", Some(1)), now()), StatusColor::Warning);
        assert_eq!(status_color(&task("c", "pending", None), now()), StatusColor::Warning);
    }

    #[test]
    fn color_follows_the_clock() {
        let t = task("a", "pending", Some(1));
        assert_eq!(status_color(&t, now()), StatusColor::Warning);
        assert_eq!(status_color(&t, now() + Duration::days(2)), StatusColor::Danger);
    }

    #[test]
    fn all_filter_is_identity() {
        let tasks = sample();
        assert_eq!(filter_by_criterion(&tasks, TaskFilter::All, now()), tasks);
        assert!(filter_by_criterion(&[], TaskFilter::All, now()).is_empty());
    }

    #[test]
    fn status_filters_keep_input_order() {
        let tasks = sample();
        let titles = |filter| {
            filter_by_criterion(&tasks, filter, now())
                .into_iter()
                .map(|t| t.title)
                .collect::<Vec<_>>()
        };

        assert_eq!(titles(TaskFilter::Pending), ["late pending", "future pending"]);
        assert_eq!(titles(TaskFilter::InProgress), ["late in progress", "no due date"]);
        assert_eq!(titles(TaskFilter::Completed), ["late completed"]);
        assert_eq!(titles(TaskFilter::Overdue), ["late pending", "late in progress"]);
    }

    #[test]
    fn reselecting_active_filter_returns_everything() {
        let tasks = sample();

        let (first, pending) = select(&tasks, TaskFilter::All, TaskFilter::Pending, now());
        assert_eq!(first, TaskFilter::Pending);
        assert_eq!(pending.len(), 2);

        let (second, everything) = select(&tasks, first, TaskFilter::Pending, now());
        assert_eq!(second, TaskFilter::All);
        assert_eq!(everything, filter_by_criterion(&tasks, TaskFilter::All, now()));
    }

    #[test]
    fn grouping_is_a_stable_partition() {
        let tasks = sample();
        let grouped = group_by_status(&tasks);

        assert_eq!(grouped.pending, vec![tasks[0].clone(), tasks[3].clone()]);
        assert_eq!(grouped.in_progress, vec![tasks[1].clone(), tasks[4].clone()]);
        assert_eq!(grouped.completed, vec![tasks[2].clone()]);
    }

    #[test]
    fn stats_count_overdue_independently() {
        let tasks = sample();
        let stats = compute_stats(&tasks, now());

        assert_eq!(
            stats,
            TaskStats {
                total: 6,
                pending: 2,
                in_progress: 2,
                completed: 1,
                overdue: 2,
            }
        );
    }

    #[test]
    fn stats_total_matches_input_length() {
        for n in 0..5 {
            let tasks = sample().into_iter().take(n).collect::<Vec<_>>();
            assert_eq!(compute_stats(&tasks, now()).total, n);
        }
    }

    #[test]
    fn view_carries_derived_fields() {
        let view = derive_view(&task("late", "pending", Some(-1)), now());
        assert!(view.is_overdue);
        assert_eq!(view.display_color, StatusColor::Danger);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "late");
        assert_eq!(json["display_color"], "danger");
    }
}
