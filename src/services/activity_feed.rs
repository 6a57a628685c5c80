//! Admin activity feed: a short, newest-first list merged from leave,
//! task and employee changes.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::activity::ActivityEvent;

pub const FEED_CAPACITY: usize = 5;
pub const DEFAULT_NAME: &str = "Employee";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActivityFeed {
    events: Vec<ActivityEvent>,
}

impl ActivityFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the feed with `event` merged in.
    ///
    /// An entry with the same id is replaced, the list is re-sorted newest
    /// first by `created_at` (ties keep the incoming event in front) and cut
    /// to [`FEED_CAPACITY`]. Arrival order plays no part in the result.
    pub fn ingest(&self, event: ActivityEvent) -> ActivityFeed {
        let mut events = Vec::with_capacity(self.events.len() + 1);
        events.extend(
            self.events
                .iter()
                .filter(|existing| existing.id != event.id)
                .cloned(),
        );
        events.insert(0, event);
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(FEED_CAPACITY);
        ActivityFeed { events }
    }

    pub fn ingest_all<I>(&self, events: I) -> ActivityFeed
    where
        I: IntoIterator<Item = ActivityEvent>,
    {
        events
            .into_iter()
            .fold(self.clone(), |feed, event| feed.ingest(event))
    }
}

/// Mutable home for the feed shared between the realtime listener and
/// request handlers. Each ingest is one read-modify-write under the lock.
#[derive(Debug, Clone, Default)]
pub struct SharedActivityFeed {
    inner: Arc<Mutex<ActivityFeed>>,
}

impl SharedActivityFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&self, event: ActivityEvent) -> ActivityFeed {
        let mut feed = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *feed = feed.ingest(event);
        feed.clone()
    }

    pub fn snapshot(&self) -> ActivityFeed {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn display_name(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_NAME,
    }
}

pub fn leave_message(name: Option<&str>, status: &str) -> String {
    let name = display_name(name);
    if status == "pending" {
        format!("{} requested leave", name)
    } else {
        format!("{} was approved for leave", name)
    }
}

pub fn task_message(name: Option<&str>, status: &str, title: &str) -> String {
    let name = display_name(name);
    if status == "pending" {
        format!("{} was assigned task: {}", name, title)
    } else {
        format!("{} completed task: {}", name, title)
    }
}

pub fn employee_message(name: Option<&str>) -> String {
    format!("New employee {} joined the team", display_name(name))
}
