use actix_web::{web, HttpResponse, Result};
use validator::Validate;

use crate::database::Database;
use crate::models::announcement::{Announcement, CreateAnnouncementRequest};
use crate::models::auth::ApiResponse;
use crate::services::announcements::AnnouncementBoard;
use crate::utils::auth::{AdminUser, AuthUser};
use crate::utils::errors::ServiceError;

/// Get announcements, newest first
#[utoipa::path(
    get,
    path = "/api/announcements",
    tag = "announcements",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Announcements retrieved", body = ApiResponse<Vec<Announcement>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError),
        (status = 500, description = "Announcements could not be loaded", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_announcements(
    _user: AuthUser,
    db: web::Data<Database>,
    board: web::Data<AnnouncementBoard>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/announcements");

    let announcements = board.announcements(db.get_ref()).await.map_err(|e| {
        log::error!("Failed to load announcements: {:#}", e);
        ServiceError::DatabaseError("Failed to fetch announcements".to_string())
    })?;

    log::info!("Retrieved {} announcements", announcements.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success("Announcements retrieved successfully", announcements)))
}

/// Publish an announcement
#[utoipa::path(
    post,
    path = "/api/admin/announcements",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Announcement published", body = ApiResponse<Announcement>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 403, description = "Admin access required", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_announcement(
    AdminUser(admin): AdminUser,
    db: web::Data<Database>,
    board: web::Data<AnnouncementBoard>,
    announcement_req: web::Json<CreateAnnouncementRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/admin/announcements - {}", announcement_req.title);

    announcement_req.validate()?;

    let announcement = sqlx::query_as::<_, Announcement>(
        "INSERT INTO announcements (title, content, created_by)
         VALUES ($1, $2, $3)
         RETURNING id, title, content, created_by, created_at",
    )
    .bind(announcement_req.title.trim())
    .bind(&announcement_req.content)
    .bind(admin.id)
    .fetch_one(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error creating announcement: {}", e);
        ServiceError::DatabaseError("Failed to publish announcement".to_string())
    })?;

    // The change notification reloads the board too; this covers the
    // author's next read.
    if let Err(e) = board.refresh(db.get_ref()).await {
        log::warn!("Announcement board refresh failed: {:#}", e);
    }

    log::info!("Announcement {} published by {}", announcement.id, admin.email);
    Ok(HttpResponse::Created().json(ApiResponse::success("Announcement published successfully", announcement)))
}

pub fn announcement_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/announcements", web::get().to(get_announcements))
        .route("/api/admin/announcements", web::post().to(create_announcement));
}
