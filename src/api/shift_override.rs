use crate::auth::auth::AuthUser;
use crate::model::shift_override::ShiftOverride;
use crate::shift::TimeOfDay;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateOverride {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "2025-12-12", format = "date", value_type = String)]
    pub shift_date: NaiveDate,
    /// Replacement check-in time (HH:mm) for that one shift
    #[schema(example = "23:00")]
    pub new_check_in_time: String,
    #[schema(example = "Approved by operations", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct OverrideFilter {
    #[schema(example = 7)]
    /// Filter by employee ID
    pub user_id: Option<u64>,
}

/// Create or replace a shift override directly (Admin)
#[utoipa::path(
    post,
    path = "/api/v1/overrides",
    request_body = CreateOverride,
    responses(
        (status = 200, description = "Override stored", body = Object, example = json!({
            "message": "Override stored"
        })),
        (status = 400, description = "Invalid time of day"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Override"
)]
pub async fn create_override(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOverride>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if let Err(e) = TimeOfDay::parse(&payload.new_check_in_time) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": e.to_string()
        })));
    }

    // Last write wins for a given (user, shift date); overrides never
    // stack.
    sqlx::query(
        r#"
        INSERT INTO shift_overrides (user_id, shift_date, new_check_in_time, reason)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            new_check_in_time = VALUES(new_check_in_time),
            reason = VALUES(reason)
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.shift_date)
    .bind(&payload.new_check_in_time)
    .bind(&payload.reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = payload.user_id, "Failed to store override");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Override stored"
    })))
}

/// List shift overrides (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/overrides",
    params(OverrideFilter),
    responses(
        (status = 200, description = "Overrides, newest shift first", body = [ShiftOverride]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Override"
)]
pub async fn list_overrides(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<OverrideFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let overrides = match query.user_id {
        Some(user_id) => {
            sqlx::query_as::<_, ShiftOverride>(
                "SELECT * FROM shift_overrides WHERE user_id = ? ORDER BY shift_date DESC",
            )
            .bind(user_id)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, ShiftOverride>(
                "SELECT * FROM shift_overrides ORDER BY shift_date DESC LIMIT 200",
            )
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to list overrides");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(overrides))
}
