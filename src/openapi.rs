use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::models::activity::{ActivityEvent, ActivityKind, DashboardCounts, DashboardResponse};
use crate::models::announcement::{Announcement, CreateAnnouncementRequest};
use crate::models::auth::{
    ErrorResponse, LoginRequest, LoginResponseData, ProfileResponse, Role, UpdateProfileRequest,
};
use crate::models::leave::{CreateLeaveRequest, LeaveRequest, LeaveStatus, LeaveType, ReviewLeaveRequest};
use crate::models::shift::{CreateShiftRequest, Shift};
use crate::models::task::{
    CreateTaskRequest, GroupedTasks, StatusColor, Task, TaskFilter, TaskListResponse, TaskStats,
    TaskStatus, TaskView, UpdateTaskStatusRequest,
};
use crate::utils::errors::ServiceError;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Portal Backend API",
        version = "0.1.0",
        description = "REST API for the employee and admin HR portal"
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::auth::update_profile,
        handlers::task::get_my_tasks,
        handlers::task::update_task_status,
        handlers::task::create_task,
        handlers::task::get_all_tasks,
        handlers::leave::get_my_leave,
        handlers::leave::create_leave,
        handlers::leave::get_all_leave,
        handlers::leave::review_leave,
        handlers::shift::get_my_shifts,
        handlers::shift::create_shift,
        handlers::announcement::get_announcements,
        handlers::announcement::create_announcement,
        handlers::dashboard::get_dashboard,
        handlers::dashboard::get_activity,
        handlers::dashboard::get_employees,
    ),
    components(schemas(
        ServiceError, ErrorResponse,
        Role, ProfileResponse, LoginRequest, LoginResponseData, UpdateProfileRequest,
        Task, TaskStatus, TaskFilter, StatusColor, TaskView, GroupedTasks, TaskStats,
        TaskListResponse, CreateTaskRequest, UpdateTaskStatusRequest,
        LeaveRequest, LeaveStatus, LeaveType, CreateLeaveRequest, ReviewLeaveRequest,
        Shift, CreateShiftRequest,
        Announcement, CreateAnnouncementRequest,
        ActivityEvent, ActivityKind, DashboardCounts, DashboardResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Authentication and own profile"),
        (name = "tasks", description = "Employee task list"),
        (name = "leave", description = "Employee leave requests"),
        (name = "shifts", description = "Employee shifts"),
        (name = "announcements", description = "Company announcements"),
        (name = "admin", description = "Admin portal")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
