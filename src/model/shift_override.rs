use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A one-shot replacement of the scheduled check-in time for a single
/// (user, shift date). Upserted on approval; a later approval for the
/// same key simply replaces the earlier one.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftOverride {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub shift_date: NaiveDate,

    /// Replacement check-in time (HH:mm) for that one shift.
    #[schema(example = "23:00")]
    pub new_check_in_time: String,

    #[schema(example = "Late request approved: traffic", nullable = true)]
    pub reason: Option<String>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
