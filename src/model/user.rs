use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "name": "Jane Doe",
        "email": "jane.doe@company.com",
        "role_id": 3,
        "check_in_time": "21:00",
        "check_out_time": "05:00",
        "timezone": "Asia/Karachi",
        "is_active": true,
        "created_at": "2025-01-01T00:00:00Z"
    })
)]
pub struct User {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "jane.doe@company.com")]
    pub email: String,

    #[schema(example = 3)]
    pub role_id: u8,

    /// Custom shift check-in time (HH:mm); system default when null.
    #[schema(example = "21:00", nullable = true)]
    pub check_in_time: Option<String>,

    /// Custom shift check-out time (HH:mm); system default when null.
    #[schema(example = "05:00", nullable = true)]
    pub check_out_time: Option<String>,

    /// IANA zone id for the schedule; system default when null.
    #[schema(example = "Asia/Karachi", nullable = true)]
    pub timezone: Option<String>,

    #[schema(example = true)]
    pub is_active: bool,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The schedule columns alone, for handlers that only need to resolve a
/// shift.
#[derive(Debug, sqlx::FromRow)]
pub struct UserScheduleRow {
    pub check_in_time: Option<String>,
    pub check_out_time: Option<String>,
    pub timezone: Option<String>,
}
