use actix_web::{web, HttpResponse, Result};
use uuid::Uuid;
use validator::Validate;

use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::models::leave::{CreateLeaveRequest, LeaveRequest, LeaveStatus, ReviewLeaveRequest};
use crate::utils::auth::{AdminUser, AuthUser};
use crate::utils::errors::ServiceError;

const LEAVE_COLUMNS: &str =
    "id, user_id, leave_type, start_date, end_date, reason, status, created_at, updated_at";

/// Get the caller's leave requests
#[utoipa::path(
    get,
    path = "/api/leave",
    tag = "leave",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Leave requests retrieved", body = ApiResponse<Vec<LeaveRequest>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_my_leave(
    user: AuthUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/leave - {}", user.id);

    let query = format!(
        "SELECT {} FROM leave_requests WHERE user_id = $1 ORDER BY created_at DESC",
        LEAVE_COLUMNS
    );
    let requests = sqlx::query_as::<_, LeaveRequest>(&query)
        .bind(user.id)
        .fetch_all(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error fetching leave requests: {}", e);
            ServiceError::DatabaseError("Failed to fetch leave requests".to_string())
        })?;

    log::info!("Retrieved {} leave requests", requests.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Leave requests retrieved successfully", requests)))
}

/// Submit a leave request
#[utoipa::path(
    post,
    path = "/api/leave",
    tag = "leave",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreateLeaveRequest,
    responses(
        (status = 201, description = "Leave request submitted", body = ApiResponse<LeaveRequest>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_leave(
    user: AuthUser,
    db: web::Data<Database>,
    leave_req: web::Json<CreateLeaveRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/leave - {} from {} to {}", user.id, leave_req.start_date, leave_req.end_date);

    leave_req.validate()?;

    let query = format!(
        "INSERT INTO leave_requests (user_id, leave_type, start_date, end_date, reason, status)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {}",
        LEAVE_COLUMNS
    );
    let request = sqlx::query_as::<_, LeaveRequest>(&query)
        .bind(user.id)
        .bind(leave_req.leave_type)
        .bind(leave_req.start_date)
        .bind(leave_req.end_date)
        .bind(&leave_req.reason)
        .bind(LeaveStatus::Pending)
        .fetch_one(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error creating leave request: {}", e);
            ServiceError::DatabaseError("Failed to submit leave request".to_string())
        })?;

    log::info!("Leave request {} submitted ({} days)", request.id, request.days());
    Ok(HttpResponse::Created().json(ApiResponse::success("Leave request submitted successfully", request)))
}

/// Get every leave request
#[utoipa::path(
    get,
    path = "/api/admin/leave",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Leave requests retrieved", body = ApiResponse<Vec<LeaveRequest>>),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_all_leave(
    _admin: AdminUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/admin/leave");

    // Pending first so the review queue leads.
    let query = format!(
        "SELECT {} FROM leave_requests ORDER BY (status = 'pending') DESC, created_at DESC",
        LEAVE_COLUMNS
    );
    let requests = sqlx::query_as::<_, LeaveRequest>(&query)
        .fetch_all(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error fetching leave requests: {}", e);
            ServiceError::DatabaseError("Failed to fetch leave requests".to_string())
        })?;

    log::info!("Retrieved {} leave requests", requests.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Leave requests retrieved successfully", requests)))
}

/// Approve or reject a leave request
#[utoipa::path(
    put,
    path = "/api/admin/leave/{id}",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = Uuid, Path, description = "Leave request ID")
    ),
    request_body = ReviewLeaveRequest,
    responses(
        (status = 200, description = "Leave request reviewed", body = ApiResponse<LeaveRequest>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Leave request not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn review_leave(
    AdminUser(admin): AdminUser,
    db: web::Data<Database>,
    path: web::Path<Uuid>,
    review_req: web::Json<ReviewLeaveRequest>,
) -> Result<HttpResponse, ServiceError> {
    let leave_id = path.into_inner();
    log::info!("PUT /api/admin/leave/{} - {:?}", leave_id, review_req.status);

    if review_req.status == LeaveStatus::Pending {
        return Err(ServiceError::ValidationError(
            "A review must approve or reject the request".to_string(),
        ));
    }

    let query = format!(
        "UPDATE leave_requests SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
        LEAVE_COLUMNS
    );
    let request = sqlx::query_as::<_, LeaveRequest>(&query)
        .bind(review_req.status)
        .bind(leave_id)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error reviewing leave request: {}", e);
            ServiceError::DatabaseError("Failed to review leave request".to_string())
        })?
        .ok_or_else(|| ServiceError::NotFound("Leave request not found".to_string()))?;

    log::info!("Leave request {} set to {:?} by {}", leave_id, request.status, admin.email);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Leave request reviewed successfully", request)))
}

pub fn leave_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/leave")
            .route(web::get().to(get_my_leave))
            .route(web::post().to(create_leave))
    )
    .route("/api/admin/leave", web::get().to(get_all_leave))
    .route("/api/admin/leave/{id}", web::put().to(review_leave));
}
