use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_shift_window"))]
pub struct CreateShiftRequest {
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
}

fn validate_shift_window(req: &CreateShiftRequest) -> Result<(), ValidationError> {
    if req.end_time <= req.start_time {
        let mut err = ValidationError::new("shift_window");
        err.message = Some("Shift must end after it starts".into());
        return Err(err);
    }
    Ok(())
}
