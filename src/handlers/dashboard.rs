use actix_web::{web, HttpResponse, Result};
use chrono::Utc;

use crate::database::Database;
use crate::handlers::task::fetch_all_tasks;
use crate::models::activity::{ActivityEvent, DashboardCounts, DashboardResponse};
use crate::models::auth::{ApiResponse, Profile, ProfileResponse};
use crate::services::activity_feed::SharedActivityFeed;
use crate::services::task_status;
use crate::utils::auth::AdminUser;
use crate::utils::errors::ServiceError;

/// Admin dashboard: headline counts and recent activity
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Dashboard data", body = ApiResponse<DashboardResponse>),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_dashboard(
    _admin: AdminUser,
    db: web::Data<Database>,
    feed: web::Data<SharedActivityFeed>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/admin/dashboard");

    let stats = db.get_stats().await?;
    let tasks = fetch_all_tasks(&db).await?;

    let response = DashboardResponse {
        counts: DashboardCounts {
            employees: stats.profiles,
            pending_leave: stats.pending_leave_requests,
            announcements: stats.announcements,
        },
        task_stats: task_status::compute_stats(&tasks, Utc::now()),
        recent_activity: feed.snapshot().events().to_vec(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success("Dashboard retrieved successfully", response)))
}

/// Recent activity only
#[utoipa::path(
    get,
    path = "/api/admin/activity",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Recent activity, newest first", body = ApiResponse<Vec<ActivityEvent>>),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_activity(
    _admin: AdminUser,
    feed: web::Data<SharedActivityFeed>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/admin/activity");
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Activity retrieved successfully",
        feed.snapshot().events().to_vec(),
    )))
}

/// Employee directory
#[utoipa::path(
    get,
    path = "/api/admin/employees",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Employees retrieved", body = ApiResponse<Vec<ProfileResponse>>),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_employees(
    _admin: AdminUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/admin/employees");

    let profiles = sqlx::query_as::<_, Profile>(
        "SELECT id, email, password_hash, full_name, role, department, position, phone, created_at, updated_at
         FROM profiles WHERE role = 'employee' ORDER BY full_name ASC NULLS LAST",
    )
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching employees: {}", e);
        ServiceError::DatabaseError("Failed to fetch employees".to_string())
    })?;

    let employees: Vec<ProfileResponse> = profiles.into_iter().map(ProfileResponse::from).collect();
    log::info!("Retrieved {} employees", employees.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Employees retrieved successfully", employees)))
}

pub fn dashboard_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/admin/dashboard", web::get().to(get_dashboard))
        .route("/api/admin/activity", web::get().to(get_activity))
        .route("/api/admin/employees", web::get().to(get_employees));
}
