use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Task {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    /// Shift date the task is assigned for.
    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "Prepare the daily report")]
    pub title: String,

    #[schema(example = false)]
    pub completed: bool,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
