use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One employee-shift attendance row. At most one exists per
/// (user_id, shift_date); the unique key lives in the database.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    /// Calendar date the shift started on, in the employee's timezone.
    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub shift_date: NaiveDate,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_in_at: Option<DateTime<Utc>>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out_at: Option<DateTime<Utc>>,

    #[schema(example = 24.8607, nullable = true)]
    pub check_in_latitude: Option<f64>,

    #[schema(example = 67.0011, nullable = true)]
    pub check_in_longitude: Option<f64>,

    #[schema(nullable = true)]
    pub check_out_latitude: Option<f64>,

    #[schema(nullable = true)]
    pub check_out_longitude: Option<f64>,

    #[schema(example = "ON_TIME")]
    pub status: String,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
