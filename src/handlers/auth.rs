use actix_web::{web, HttpResponse, Result};
use bcrypt::verify;
use validator::Validate;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::{
    ApiResponse, LoginRequest, LoginResponseData, Profile, ProfileResponse, UpdateProfileRequest,
};
use crate::utils::auth::{issue_token, AuthUser};
use crate::utils::errors::ServiceError;

const PROFILE_COLUMNS: &str =
    "id, email, password_hash, full_name, role, department, position, phone, created_at, updated_at";

pub(crate) async fn find_profile(db: &Database, id: uuid::Uuid) -> Result<Option<Profile>, ServiceError> {
    let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
    sqlx::query_as::<_, Profile>(&query)
        .bind(id)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error fetching profile: {}", e);
            ServiceError::DatabaseError("Failed to query profile".to_string())
        })
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponseData>),
        (status = 401, description = "Invalid credentials", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    login_req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/login - Login attempt for: {}", login_req.email);

    login_req.validate()?;

    let query = format!("SELECT {} FROM profiles WHERE lower(email) = lower($1)", PROFILE_COLUMNS);
    let profile = sqlx::query_as::<_, Profile>(&query)
        .bind(login_req.email.trim())
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error during login: {}", e);
            ServiceError::DatabaseError("Failed to query user".to_string())
        })?;

    let profile = match profile {
        Some(profile) => profile,
        None => {
            log::warn!("Login failed: User not found - {}", login_req.email);
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let password_valid = verify(&login_req.password, &profile.password_hash).map_err(|e| {
        log::error!("Password verification error: {}", e);
        ServiceError::AuthenticationError("Password verification failed".to_string())
    })?;

    if !password_valid {
        log::warn!("Login failed: Invalid password for user - {}", login_req.email);
        return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = issue_token(&config, profile.id, &profile.email, profile.role)?;

    log::info!("Login successful for user: {}", profile.email);
    let response_data = LoginResponseData {
        token,
        user: ProfileResponse::from(profile),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", response_data)))
}

/// User logout endpoint
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Logout successful", body = ApiResponse<bool>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn logout(user: AuthUser) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/logout");

    // Tokens are stateless; the client discards its copy.
    log::info!("User logout successful: {}", user.email);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully logout from the system", true)))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User information retrieved", body = ApiResponse<ProfileResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_me(
    user: AuthUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/auth/me");

    let profile = find_profile(&db, user.id).await?.ok_or_else(|| {
        log::warn!("User not found for ID: {}", user.id);
        ServiceError::Unauthorized("User not found".to_string())
    })?;

    log::info!("User information retrieved for: {}", profile.email);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Successfully retrieved user data",
        ProfileResponse::from(profile),
    )))
}

/// Update the caller's own profile
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileResponse>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_profile(
    user: AuthUser,
    db: web::Data<Database>,
    update_req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("PUT /api/profile - {}", user.id);

    update_req.validate()?;

    let mut query_builder = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE profiles SET updated_at = NOW()");
    if let Some(ref full_name) = update_req.full_name {
        query_builder.push(", full_name = ").push_bind(full_name.trim());
    }
    if let Some(ref department) = update_req.department {
        query_builder.push(", department = ").push_bind(department);
    }
    if let Some(ref position) = update_req.position {
        query_builder.push(", position = ").push_bind(position);
    }
    if let Some(ref phone) = update_req.phone {
        query_builder.push(", phone = ").push_bind(phone);
    }
    query_builder.push(" WHERE id = ").push_bind(user.id);
    query_builder.push(" RETURNING ").push(PROFILE_COLUMNS);

    let profile = query_builder
        .build_query_as::<Profile>()
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error updating profile: {}", e);
            ServiceError::DatabaseError("Failed to update profile".to_string())
        })?
        .ok_or_else(|| ServiceError::NotFound("Profile not found".to_string()))?;

    log::info!("Profile updated: {}", user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Profile updated successfully",
        ProfileResponse::from(profile),
    )))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(get_me))
    )
    .route("/api/profile", web::put().to(update_profile));
}
