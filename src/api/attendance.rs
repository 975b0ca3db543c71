use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::AttendanceRecord;
use crate::model::user::UserScheduleRow;
use crate::shift::{Schedule, TimeOfDay, classify, resolve_shift, scheduled_start};
use crate::utils::email::{Mailer, spawn_notification};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct LocationPayload {
    #[schema(example = 24.8607, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 67.0011, nullable = true)]
    pub longitude: Option<f64>,
}

/// Loads the employee's schedule, falling back to the system default for
/// any column left unset. Stored values are validated on write, so a
/// parse failure here means a corrupt row and surfaces as a 500.
pub(crate) async fn load_schedule(
    pool: &MySqlPool,
    user_id: u64,
    config: &Config,
) -> actix_web::Result<Schedule> {
    let row = sqlx::query_as::<_, UserScheduleRow>(
        "SELECT check_in_time, check_out_time, timezone FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to fetch schedule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .ok_or_else(|| actix_web::error::ErrorForbidden("No such user"))?;

    let check_in = row
        .check_in_time
        .as_deref()
        .unwrap_or(&config.default_check_in_time);
    let check_out = row
        .check_out_time
        .as_deref()
        .unwrap_or(&config.default_check_out_time);
    let tz = row.timezone.as_deref().unwrap_or(&config.default_timezone);

    Schedule::parse(check_in, check_out, tz).map_err(|e| {
        tracing::error!(error = %e, user_id, "Stored schedule is invalid");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })
}

/// One-shot check-in replacement for this exact shift occurrence, if an
/// approved override exists. A later approval for the same key has
/// already replaced any earlier one at write time.
pub(crate) async fn override_time(
    pool: &MySqlPool,
    user_id: u64,
    shift_date: NaiveDate,
) -> actix_web::Result<Option<TimeOfDay>> {
    let stored = sqlx::query_scalar::<_, String>(
        "SELECT new_check_in_time FROM shift_overrides WHERE user_id = ? AND shift_date = ?",
    )
    .bind(user_id)
    .bind(shift_date)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, %shift_date, "Failed to fetch override");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(stored.and_then(|s| match TimeOfDay::parse(&s) {
        Ok(t) => Some(t),
        Err(e) => {
            // Validated on write; a bad value here is operator-corrupted
            // data and should not block the check-in.
            tracing::error!(error = %e, user_id, %shift_date, "Ignoring corrupt override");
            None
        }
    }))
}

async fn fetch_record(
    pool: &MySqlPool,
    user_id: u64,
    shift_date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE user_id = ? AND shift_date = ?",
    )
    .bind(user_id)
    .bind(shift_date)
    .fetch_optional(pool)
    .await
}

fn format_local_time(instant: DateTime<Utc>, schedule: &Schedule) -> String {
    instant
        .with_timezone(&schedule.tz)
        .format("%I:%M %p")
        .to_string()
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = LocationPayload,
    responses(
        (status = 200, description = "Checked in", body = AttendanceRecord),
        (status = 400, description = "Already checked in for this shift", body = Object, example = json!({
            "message": "Already checked in for this shift"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    mailer: web::Data<Option<Mailer>>,
    payload: web::Json<LocationPayload>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.user_id;
    let schedule = load_schedule(pool.get_ref(), user_id, &config).await?;

    let now = Utc::now();
    let resolution = resolve_shift(now, &schedule);

    let existing = fetch_record(pool.get_ref(), user_id, resolution.shift_date)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to fetch attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if existing.as_ref().is_some_and(|r| r.check_in_at.is_some()) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Already checked in for this shift"
        })));
    }

    // The grace period and the early window both measure against the
    // override-adjusted start.
    let start = match override_time(pool.get_ref(), user_id, resolution.shift_date).await? {
        Some(t) => scheduled_start(resolution.shift_date, t, schedule.tz),
        None => resolution.scheduled_start,
    };
    let status = classify(now, start, config.late_threshold_minutes);

    // An ABSENT placeholder row may already exist for the shift; the
    // unique (user_id, shift_date) key turns the insert into an update.
    sqlx::query(
        r#"
        INSERT INTO attendance
            (user_id, shift_date, check_in_at, check_in_latitude, check_in_longitude, status)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            check_in_at = VALUES(check_in_at),
            check_in_latitude = VALUES(check_in_latitude),
            check_in_longitude = VALUES(check_in_longitude),
            status = VALUES(status)
        "#,
    )
    .bind(user_id)
    .bind(resolution.shift_date)
    .bind(now)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(status.as_str())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Check-in failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let record = fetch_record(pool.get_ref(), user_id, resolution.shift_date)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to reload attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if let Some(m) = mailer.get_ref().clone() {
        let to = auth.email.clone();
        let name = auth.name.clone();
        let time = format_local_time(now, &schedule);
        let status_label = status.as_str();
        spawn_notification("check_in", async move {
            m.send_check_in(&to, &name, &time, status_label).await
        });
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendance": record })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = LocationPayload,
    responses(
        (status = 200, description = "Checked out", body = AttendanceRecord),
        (status = 400, description = "No active shift, or incomplete tasks remain", body = Object, example = json!({
            "message": "No active shift found to check out from"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    mailer: web::Data<Option<Mailer>>,
    payload: web::Json<LocationPayload>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.user_id;

    // Location is mandatory on the way out.
    let (Some(latitude), Some(longitude)) = (payload.latitude, payload.longitude) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Location access is required to check out. Please enable location services."
        })));
    };

    let open = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance
        WHERE user_id = ? AND check_in_at IS NOT NULL AND check_out_at IS NULL
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to fetch open shift");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(open) = open else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No active shift found to check out from"
        })));
    };

    let incomplete: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE user_id = ? AND date = ? AND completed = FALSE",
    )
    .bind(user_id)
    .bind(open.shift_date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to count tasks");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if incomplete > 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!(
                "You have {incomplete} incomplete task(s). Please complete them before checking out."
            )
        })));
    }

    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE attendance
        SET check_out_at = ?, check_out_latitude = ?, check_out_longitude = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(latitude)
    .bind(longitude)
    .bind(open.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let record = fetch_record(pool.get_ref(), user_id, open.shift_date)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to reload attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if let Some(m) = mailer.get_ref().clone() {
        let schedule = load_schedule(pool.get_ref(), user_id, &config).await?;
        let worked = now - open.check_in_at.unwrap_or(now);
        let duration = format!(
            "{}h {}m",
            worked.num_hours(),
            worked.num_minutes() % 60
        );
        let to = auth.email.clone();
        let name = auth.name.clone();
        let time = format_local_time(now, &schedule);
        spawn_notification("check_out", async move {
            m.send_check_out(&to, &name, &time, &duration).await
        });
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendance": record })))
}

/// Current-shift status
#[utoipa::path(
    get,
    path = "/api/v1/attendance/status",
    responses(
        (status = 200, description = "The current shift's record, or null", body = Object, example = json!({
            "attendance": null
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn current_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let schedule = load_schedule(pool.get_ref(), auth.user_id, &config).await?;
    let resolution = resolve_shift(Utc::now(), &schedule);

    let record = fetch_record(pool.get_ref(), auth.user_id, resolution.shift_date)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = auth.user_id, "Failed to fetch status");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendance": record })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Number of recent shifts to return (default 14, max 90)
    #[schema(example = 14)]
    pub limit: Option<u32>,
    /// Another employee's records; admins and managers only
    #[schema(example = 7)]
    pub user_id: Option<u64>,
}

/// Recent attendance history, newest shift first
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recent records", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let target = match query.user_id {
        Some(other) if other != auth.user_id => {
            if !auth.can_view_others() {
                return Err(actix_web::error::ErrorForbidden("Admin/Manager only"));
            }
            other
        }
        _ => auth.user_id,
    };

    let limit = query.limit.unwrap_or(14).clamp(1, 90);

    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance
        WHERE user_id = ?
        ORDER BY shift_date DESC
        LIMIT ?
        "#,
    )
    .bind(target)
    .bind(limit)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, target, "Failed to fetch history");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendances": records })))
}

/// Effective shift times for the current occurrence, override included
#[utoipa::path(
    get,
    path = "/api/v1/attendance/times",
    responses(
        (status = 200, description = "Effective check-in/check-out times", body = Object, example = json!({
            "check_in_time": "23:00",
            "check_out_time": "05:00",
            "shift_date": "2025-12-12"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn effective_times(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let schedule = load_schedule(pool.get_ref(), auth.user_id, &config).await?;
    let resolution = resolve_shift(Utc::now(), &schedule);

    let check_in = override_time(pool.get_ref(), auth.user_id, resolution.shift_date)
        .await?
        .unwrap_or(schedule.check_in);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "check_in_time": check_in.to_string(),
        "check_out_time": schedule.check_out.to_string(),
        "shift_date": resolution.shift_date,
    })))
}
