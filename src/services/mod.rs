pub mod activity;
pub mod activity_feed;
pub mod announcements;
pub mod data_source;
pub mod realtime;
pub mod task_status;
