//! Cached announcement list, reloaded in bulk whenever the announcements
//! table reports a change.

use std::sync::{Arc, PoisonError, RwLock};

use crate::models::announcement::Announcement;
use crate::services::data_source::HrDataSource;
use crate::services::realtime::{RealtimeHub, SubscriptionHandle};

pub const ANNOUNCEMENT_TABLE: &str = "announcements";

#[derive(Debug, Default)]
struct BoardState {
    announcements: Vec<Announcement>,
    /// Set by a successful load, cleared by a failed one.
    current: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnnouncementBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl AnnouncementBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first. Empty until the first successful load.
    pub fn snapshot(&self) -> Vec<Announcement> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .announcements
            .clone()
    }

    pub fn is_current(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).current
    }

    /// Replaces the cached list. On failure the previous list is kept but
    /// the board stops counting as current.
    pub async fn refresh<S: HrDataSource>(&self, source: &S) -> anyhow::Result<usize> {
        match source.fetch_announcements().await {
            Ok(mut announcements) => {
                announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let count = announcements.len();
                let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
                state.announcements = announcements;
                state.current = true;
                Ok(count)
            }
            Err(e) => {
                self.inner.write().unwrap_or_else(PoisonError::into_inner).current = false;
                Err(e)
            }
        }
    }

    /// Serves the cache while it is current; otherwise reloads from `source`
    /// and returns the fetch error to the caller.
    pub async fn announcements<S: HrDataSource>(&self, source: &S) -> anyhow::Result<Vec<Announcement>> {
        if !self.is_current() {
            self.refresh(source).await?;
        }
        Ok(self.snapshot())
    }

    pub fn subscribe<S: HrDataSource>(&self, hub: &RealtimeHub, source: Arc<S>) -> SubscriptionHandle {
        let board = self.clone();
        hub.subscribe(ANNOUNCEMENT_TABLE, move |_change| {
            let board = board.clone();
            let source = source.clone();
            async move {
                match board.refresh(source.as_ref()).await {
                    Ok(count) => log::info!("📢 Announcements reloaded ({})", count),
                    Err(e) => log::error!("Failed to reload announcements: {:#}", e),
                }
            }
        })
    }
}
