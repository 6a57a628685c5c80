use actix_web::{web, HttpResponse, Result};
use validator::Validate;

use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::models::shift::{CreateShiftRequest, Shift};
use crate::utils::auth::{AdminUser, AuthUser};
use crate::utils::errors::ServiceError;

/// Get the caller's current and upcoming shifts
#[utoipa::path(
    get,
    path = "/api/shifts",
    tag = "shifts",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shifts retrieved", body = ApiResponse<Vec<Shift>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_my_shifts(
    user: AuthUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/shifts - {}", user.id);

    let shifts = sqlx::query_as::<_, Shift>(
        "SELECT id, user_id, start_time, end_time, location, created_at
         FROM shifts WHERE user_id = $1 AND end_time >= NOW()
         ORDER BY start_time ASC",
    )
    .bind(user.id)
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching shifts: {}", e);
        ServiceError::DatabaseError("Failed to fetch shifts".to_string())
    })?;

    log::info!("Retrieved {} shifts", shifts.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Shifts retrieved successfully", shifts)))
}

/// Schedule a shift
#[utoipa::path(
    post,
    path = "/api/admin/shifts",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreateShiftRequest,
    responses(
        (status = 201, description = "Shift created", body = ApiResponse<Shift>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_shift(
    _admin: AdminUser,
    db: web::Data<Database>,
    shift_req: web::Json<CreateShiftRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/admin/shifts - {} at {}", shift_req.user_id, shift_req.start_time);

    shift_req.validate()?;

    let shift = sqlx::query_as::<_, Shift>(
        "INSERT INTO shifts (user_id, start_time, end_time, location)
         VALUES ($1, $2, $3, $4)
         RETURNING id, user_id, start_time, end_time, location, created_at",
    )
    .bind(shift_req.user_id)
    .bind(shift_req.start_time)
    .bind(shift_req.end_time)
    .bind(&shift_req.location)
    .fetch_one(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error creating shift: {}", e);
        ServiceError::DatabaseError("Failed to create shift".to_string())
    })?;

    log::info!("Shift {} created", shift.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Shift created successfully", shift)))
}

pub fn shift_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/shifts", web::get().to(get_my_shifts))
        .route("/api/admin/shifts", web::post().to(create_shift));
}
