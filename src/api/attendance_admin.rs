use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::shift::AttendanceStatus;
use crate::utils::geocode;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, prelude::FromRow};
use std::collections::BTreeMap;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

// Columns an admin may fix up on a record after the fact.
const UPDATABLE: &[&str] = &["shift_date", "check_in_at", "check_out_at", "status"];

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RecordFilter {
    #[schema(example = 7)]
    /// Filter by employee ID
    pub user_id: Option<u64>,
    #[schema(example = "LATE")]
    /// Filter by attendance status
    pub status: Option<String>,
    #[schema(example = "2025-12-01", value_type = String, format = "date")]
    /// Earliest shift date (inclusive)
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-12-31", value_type = String, format = "date")]
    /// Latest shift date (inclusive)
    pub end_date: Option<NaiveDate>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub per_page: Option<u64>,
}

enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

fn build_filters(query: &RecordFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND a.user_id = ?");
        args.push(FilterValue::U64(user_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND a.status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }
    if let Some(start) = query.start_date {
        where_sql.push_str(" AND a.shift_date >= ?");
        args.push(FilterValue::Date(start));
    }
    if let Some(end) = query.end_date {
        where_sql.push_str(" AND a.shift_date <= ?");
        args.push(FilterValue::Date(end));
    }

    (where_sql, args)
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct RecordRow {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub shift_date: NaiveDate,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_in_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub check_in_latitude: Option<f64>,
    #[schema(nullable = true)]
    pub check_in_longitude: Option<f64>,
    #[schema(nullable = true)]
    pub check_out_latitude: Option<f64>,
    #[schema(nullable = true)]
    pub check_out_longitude: Option<f64>,
    #[schema(example = "ON_TIME")]
    pub status: String,
    #[schema(example = "Jane Doe")]
    pub user_name: String,
    #[schema(example = "jane.doe@company.com")]
    pub user_email: String,
}

#[derive(Serialize, ToSchema)]
pub struct RecordListResponse {
    pub data: Vec<RecordRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 120)]
    pub total: i64,
}

const RECORD_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.shift_date, a.check_in_at, a.check_out_at,
           a.check_in_latitude, a.check_in_longitude,
           a.check_out_latitude, a.check_out_longitude,
           a.status,
           u.name AS user_name, u.email AS user_email
    FROM attendance a
    JOIN users u ON u.id = a.user_id
"#;

/// Paginated attendance records (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/attendance/records",
    params(RecordFilter),
    responses(
        (status = 200, description = "Paginated records", body = RecordListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn list_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecordFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let per_page = query.per_page.unwrap_or(20).min(200);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let (where_sql, args) = build_filters(&query);

    let count_sql = format!("SELECT COUNT(*) FROM attendance a{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        "{RECORD_SELECT}{where_sql} ORDER BY a.shift_date DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, RecordRow>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(s.as_str()),
            FilterValue::Date(d) => data_q.bind(*d),
        };
    }
    let records = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch records");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(RecordListResponse {
        data: records,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Fix up an attendance record (Admin)
#[utoipa::path(
    put,
    path = "/api/v1/attendance/records/{record_id}",
    params(
        ("record_id" = u64, Path, description = "Record ID")
    ),
    request_body(content = Object, description = "Subset of record fields", example = json!({
        "check_out_at": "2025-12-13T01:00:00",
        "status": "NO_CHECKOUT"
    })),
    responses(
        (status = 200, description = "Record updated"),
        (status = 400, description = "Invalid field or status"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn update_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<serde_json::Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let record_id = path.into_inner();

    // ABSENT and NO_CHECKOUT enter the system here, by an admin closing
    // out a shift, not from the classifier.
    if let Some(status) = body.get("status").and_then(serde_json::Value::as_str) {
        if AttendanceStatus::from_str(status).is_err() {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": format!("Unknown status `{status}`")
            })));
        }
    }

    let update =
        crate::utils::db_utils::build_update_sql("attendance", &body, UPDATABLE, "id", record_id)?;

    let affected = crate::utils::db_utils::execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, record_id, "Failed to update record");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Record not found"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Record updated successfully"
    })))
}

/// Delete an attendance record (Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/records/{record_id}",
    params(
        ("record_id" = u64, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn delete_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let record_id = path.into_inner();

    let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, record_id, "Failed to delete record");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Record not found"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Record deleted"
    })))
}

#[derive(sqlx::FromRow)]
struct StatusCount {
    status: String,
    cnt: i64,
}

/// Aggregate status counts over a filter window (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    params(RecordFilter),
    responses(
        (status = 200, description = "Status counts", body = Object, example = json!({
            "total": 120, "present": 100, "late": 12, "absent": 5, "no_checkout": 3
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecordFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (where_sql, args) = build_filters(&query);
    let sql = format!(
        "SELECT a.status, COUNT(*) AS cnt FROM attendance a{} GROUP BY a.status",
        where_sql
    );

    let mut rows_q = sqlx::query_as::<_, StatusCount>(&sql);
    for arg in &args {
        rows_q = match arg {
            FilterValue::U64(v) => rows_q.bind(*v),
            FilterValue::Str(s) => rows_q.bind(s.as_str()),
            FilterValue::Date(d) => rows_q.bind(*d),
        };
    }
    let rows = rows_q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to aggregate stats");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let count = |status: &str| {
        rows.iter()
            .find(|r| r.status == status)
            .map(|r| r.cnt)
            .unwrap_or(0)
    };

    let total: i64 = rows.iter().map(|r| r.cnt).sum();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": total,
        "present": count("ON_TIME") + count("LATE"),
        "late": count("LATE"),
        "absent": count("ABSENT"),
        "no_checkout": count("NO_CHECKOUT"),
    })))
}

#[derive(Serialize, Default, Clone, Copy, ToSchema)]
pub struct DayBreakdown {
    #[schema(example = 12)]
    pub on_time: i64,
    #[schema(example = 2)]
    pub late: i64,
    #[schema(example = 1)]
    pub absent: i64,
    #[schema(example = 0)]
    pub no_checkout: i64,
}

#[derive(sqlx::FromRow)]
struct DayStatusCount {
    shift_date: NaiveDate,
    status: String,
    cnt: i64,
}

/// Last-7-days attendance trend (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/analytics/weekly",
    responses(
        (status = 200, description = "Per-day status breakdown, oldest day first", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn weekly_trends(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    // "Today" in the company's default zone, so the week window does not
    // drift around midnight UTC.
    let tz: Tz = config.default_timezone.parse().unwrap_or(chrono_tz::UTC);
    let today = Utc::now().with_timezone(&tz).date_naive();
    let week_ago = today - Duration::days(6);

    let rows = sqlx::query_as::<_, DayStatusCount>(
        r#"
        SELECT shift_date, status, COUNT(*) AS cnt
        FROM attendance
        WHERE shift_date BETWEEN ? AND ?
        GROUP BY shift_date, status
        "#,
    )
    .bind(week_ago)
    .bind(today)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch weekly trends");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut days: BTreeMap<NaiveDate, DayBreakdown> = (0..7)
        .map(|i| (week_ago + Duration::days(i), DayBreakdown::default()))
        .collect();

    for row in rows {
        if let Some(day) = days.get_mut(&row.shift_date) {
            match row.status.as_str() {
                // Early arrivals chart with the on-time bar.
                "ON_TIME" | "EARLY" => day.on_time += row.cnt,
                "LATE" => day.late += row.cnt,
                "ABSENT" => day.absent += row.cnt,
                "NO_CHECKOUT" => day.no_checkout += row.cnt,
                _ => {}
            }
        }
    }

    let trends: Vec<_> = days
        .into_iter()
        .map(|(date, counts)| {
            serde_json::json!({
                "date": date.format("%a").to_string(),
                "full_date": date,
                "on_time": counts.on_time,
                "late": counts.late,
                "absent": counts.absent,
                "no_checkout": counts.no_checkout,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "weekly_trends": trends })))
}

fn csv_escape(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// CSV export of attendance records (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/export",
    params(RecordFilter),
    responses(
        (status = 200, description = "CSV download", body = String, content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn export_csv(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecordFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (where_sql, args) = build_filters(&query);
    let sql = format!("{RECORD_SELECT}{where_sql} ORDER BY a.shift_date DESC");

    let mut export_q = sqlx::query_as::<_, RecordRow>(&sql);
    for arg in &args {
        export_q = match arg {
            FilterValue::U64(v) => export_q.bind(*v),
            FilterValue::Str(s) => export_q.bind(s.as_str()),
            FilterValue::Date(d) => export_q.bind(*d),
        };
    }
    let records = export_q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch export rows");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut lines = vec![
        "Employee Name,Email,Date,Check In,Check Out,Status,Check In Location,Check Out Location"
            .to_string(),
    ];

    for r in &records {
        let check_in_location =
            geocode::location_name(r.check_in_latitude, r.check_in_longitude).await;
        let check_out_location =
            geocode::location_name(r.check_out_latitude, r.check_out_longitude).await;

        let cells = [
            r.user_name.clone(),
            r.user_email.clone(),
            r.shift_date.to_string(),
            r.check_in_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string()),
            r.check_out_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string()),
            r.status.clone(),
            check_in_location,
            check_out_location,
        ];
        lines.push(
            cells
                .iter()
                .map(|c| csv_escape(c))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    let filename = format!("attendance-{}.csv", Utc::now().date_naive());

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(lines.join("\n")))
}
