use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::models::auth::ApiResponse;
use crate::database::Database;

/// Service and database health
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unavailable")
    )
)]
pub async fn health_check(db: web::Data<Database>) -> Result<HttpResponse> {
    match db.health_check().await {
        Ok(_) => {
            let stats = db.get_stats().await.unwrap_or_else(|e| {
                log::warn!("Could not collect database stats: {:#}", e);
                Default::default()
            });

            Ok(HttpResponse::Ok().json(ApiResponse::success(
                "HR Portal Backend API is running",
                json!({
                    "status": "ok",
                    "database": "connected",
                    "stats": {
                        "profiles": stats.profiles,
                        "tasks": stats.tasks,
                        "leave_requests": stats.leave_requests,
                        "announcements": stats.announcements
                    }
                })
            )))
        }
        Err(e) => {
            log::error!("Database health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Database connection failed",
                "error": e.to_string()
            })))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
