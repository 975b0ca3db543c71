use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LateRequest {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    /// Shift occurrence the request applies to.
    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub shift_date: NaiveDate,

    /// Requested replacement check-in time (HH:mm).
    #[schema(example = "23:00")]
    pub requested_time: String,

    #[schema(example = "Doctor appointment")]
    pub reason: String,

    #[schema(example = "PENDING", nullable = true)]
    pub status: Option<String>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
