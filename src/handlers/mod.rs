pub mod announcement;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod leave;
pub mod shift;
pub mod task;

pub use announcement::announcement_config;
pub use auth::auth_config;
pub use dashboard::dashboard_config;
pub use health::health_config;
pub use leave::leave_config;
pub use shift::shift_config;
pub use task::task_config;

use actix_web::web;

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health_config)
        .configure(auth_config)
        .configure(task_config)
        .configure(leave_config)
        .configure(shift_config)
        .configure(announcement_config)
        .configure(dashboard_config);
}
