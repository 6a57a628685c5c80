use actix_web::dev::Payload;
use actix_web::http::header::Header;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::auth::Role;
use crate::utils::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // Subject (profile id)
    pub email: String,
    pub role: Role,
    pub exp: usize, // Expiration time (Unix timestamp)
    pub iat: usize, // Issued at (Unix timestamp)
}

pub fn issue_token(config: &AppConfig, id: Uuid, email: &str, role: Role) -> Result<String, ServiceError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::hours(config.jwt_expiry_hours))
        .ok_or_else(|| ServiceError::InternalError("Token expiry out of range".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: id,
        email: email.to_string(),
        role,
        exp,
        iat: now.timestamp() as usize,
    };

    encode(
        &JwtHeader::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("JWT encoding error: {}", e);
        ServiceError::AuthenticationError("Failed to generate token".to_string())
    })
}

pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::warn!("JWT validation error: {}", e);
        ServiceError::Unauthorized("Invalid token".to_string())
    })
}

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ServiceError> {
    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(|| ServiceError::InternalError("AppConfig is not registered".to_string()))?;

    let auth = Authorization::<Bearer>::parse(req)
        .map_err(|_| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let claims = verify_token(config, auth.as_ref().token())?;

    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser(user))
            } else {
                log::warn!("Admin route refused for {}", user.email);
                Err(ServiceError::Forbidden("Admin access required".to_string()))
            }
        }))
    }
}
