pub mod activity;
pub mod announcement;
pub mod auth;
pub mod leave;
pub mod shift;
pub mod task;
