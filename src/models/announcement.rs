use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Content must be 1 to 5000 characters"))]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: String) -> CreateAnnouncementRequest {
        CreateAnnouncementRequest {
            title: "Office closed".to_string(),
            content,
        }
    }

    #[test]
    fn content_length_is_bounded() {
        assert!(request("Closed on Friday".to_string()).validate().is_ok());
        assert!(request("x".repeat(5000)).validate().is_ok());
        assert!(request("x".repeat(9000)).validate().is_err());
        assert!(request(String::new()).validate().is_err());
    }
}
