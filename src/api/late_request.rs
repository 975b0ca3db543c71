use crate::auth::auth::AuthUser;
use crate::model::late_request::LateRequest;
use crate::shift::TimeOfDay;
use crate::utils::email::{Mailer, spawn_notification};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, prelude::FromRow};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLateRequest {
    #[schema(example = "2025-12-12", format = "date", value_type = String)]
    pub shift_date: NaiveDate,
    /// Requested replacement check-in time (HH:mm)
    #[schema(example = "23:00")]
    pub requested_time: String,
    #[schema(example = "Doctor appointment")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LateRequestFilter {
    #[schema(example = 7)]
    /// Filter by employee ID
    pub user_id: Option<u64>,
    #[schema(example = "PENDING")]
    /// Filter by request status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct LateRequestRow {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub shift_date: NaiveDate,
    #[schema(example = "23:00")]
    pub requested_time: String,
    #[schema(example = "Doctor appointment")]
    pub reason: String,
    #[schema(example = "PENDING", nullable = true)]
    pub status: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[schema(example = "Jane Doe")]
    pub user_name: String,
    #[schema(example = "jane.doe@company.com")]
    pub user_email: String,
}

#[derive(Serialize, ToSchema)]
pub struct LateRequestListResponse {
    pub data: Vec<LateRequestRow>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

fn base_url(req: &HttpRequest) -> String {
    let proto = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    let host = req
        .headers()
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}

/* =========================
Create late-arrival request
========================= */
/// Submit a late-arrival request for one shift
#[utoipa::path(
    post,
    path = "/api/v1/late-requests",
    request_body(
        content = CreateLateRequest,
        description = "Late-arrival request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Request submitted", body = Object, example = json!({
            "message": "Late request submitted",
            "status": "PENDING"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "LateRequest"
)]
pub async fn create_late_request(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Option<Mailer>>,
    payload: web::Json<CreateLateRequest>,
) -> actix_web::Result<impl Responder> {
    if payload.reason.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "A reason is required"
        })));
    }

    // The requested time becomes an override verbatim on approval, so it
    // is validated here, at the submission boundary.
    if let Err(e) = TimeOfDay::parse(&payload.requested_time) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": e.to_string()
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO late_requests (user_id, shift_date, requested_time, reason)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.shift_date)
    .bind(&payload.requested_time)
    .bind(payload.reason.trim())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create late request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let request_id = result.last_insert_id();

    if let Some(m) = mailer.get_ref().clone() {
        let admins = sqlx::query_as::<_, (String,)>("SELECT email FROM users WHERE role_id = 1")
            .fetch_all(pool.get_ref())
            .await
            .unwrap_or_default();

        let base = base_url(&req);
        let employee = auth.name.clone();
        let shift_date = payload.shift_date.to_string();
        let requested_time = payload.requested_time.clone();
        let reason = payload.reason.trim().to_string();

        spawn_notification("late_request", async move {
            for (admin_email,) in admins {
                m.send_late_request(
                    &admin_email,
                    &employee,
                    &shift_date,
                    &requested_time,
                    &reason,
                    &format!("{base}/admin/requests/{request_id}/approve"),
                    &format!("{base}/admin/requests/{request_id}/reject"),
                )
                .await?;
            }
            Ok(())
        });
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Late request submitted",
        "status": "PENDING"
    })))
}

#[derive(FromRow)]
struct RequestWithUser {
    user_id: u64,
    shift_date: NaiveDate,
    requested_time: String,
    reason: String,
    status: String,
    email: String,
    name: String,
}

async fn fetch_request(
    pool: &MySqlPool,
    request_id: u64,
) -> actix_web::Result<Option<RequestWithUser>> {
    sqlx::query_as::<_, RequestWithUser>(
        r#"
        SELECT lr.user_id, lr.shift_date, lr.requested_time, lr.reason, lr.status,
               u.email, u.name
        FROM late_requests lr
        JOIN users u ON u.id = lr.user_id
        WHERE lr.id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Failed to fetch late request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })
}

/* =========================
Approve late request (Admin)
========================= */
/// Approve a late-arrival request and create the shift override
#[utoipa::path(
    put,
    path = "/api/v1/late-requests/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the request to approve")
    ),
    responses(
        (status = 200, description = "Request approved", body = Object, example = json!({
            "message": "Late request approved"
        })),
        (status = 400, description = "Request not found or already processed", body = Object, example = json!({
            "message": "Late request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "LateRequest"
)]
pub async fn approve_late_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Option<Mailer>>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let request_id = path.into_inner();

    let Some(request) = fetch_request(pool.get_ref(), request_id).await? else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Late request not found or already processed"
        })));
    };

    if request.status != "PENDING" {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("Late request already {}", request.status)
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE late_requests
        SET status = 'APPROVED'
        WHERE id = ?
        AND status = 'PENDING'
        "#,
    )
    .bind(request_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Approve late request failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Late request not found or already processed"
        })));
    }

    // Upsert: a second approval for the same (user, shift) replaces the
    // earlier override, it never stacks.
    sqlx::query(
        r#"
        INSERT INTO shift_overrides (user_id, shift_date, new_check_in_time, reason)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            new_check_in_time = VALUES(new_check_in_time),
            reason = VALUES(reason)
        "#,
    )
    .bind(request.user_id)
    .bind(request.shift_date)
    .bind(&request.requested_time)
    .bind(format!("Late request approved: {}", request.reason))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Failed to create shift override");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if let Some(m) = mailer.get_ref().clone() {
        let shift_date = request.shift_date.to_string();
        spawn_notification("late_decision", async move {
            m.send_late_decision(&request.email, &request.name, &shift_date, "APPROVED")
                .await
        });
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Late request approved"
    })))
}

/* =========================
Reject late request (Admin)
========================= */
/// Reject a late-arrival request
#[utoipa::path(
    put,
    path = "/api/v1/late-requests/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the request to reject")
    ),
    responses(
        (status = 200, description = "Request rejected", body = Object, example = json!({
            "message": "Late request rejected"
        })),
        (status = 400, description = "Request not found or already processed", body = Object, example = json!({
            "message": "Late request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "LateRequest"
)]
pub async fn reject_late_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Option<Mailer>>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let request_id = path.into_inner();

    let Some(request) = fetch_request(pool.get_ref(), request_id).await? else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Late request not found or already processed"
        })));
    };

    if request.status != "PENDING" {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("Late request already {}", request.status)
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE late_requests
        SET status = 'REJECTED'
        WHERE id = ?
        AND status = 'PENDING'
        "#,
    )
    .bind(request_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Reject late request failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Late request not found or already processed"
        })));
    }

    if let Some(m) = mailer.get_ref().clone() {
        let shift_date = request.shift_date.to_string();
        spawn_notification("late_decision", async move {
            m.send_late_decision(&request.email, &request.name, &shift_date, "REJECTED")
                .await
        });
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Late request rejected"
    })))
}

/// Fetch one late-arrival request
#[utoipa::path(
    get,
    path = "/api/v1/late-requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the request to fetch")
    ),
    responses(
        (status = 200, description = "Late request found", body = LateRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Late request not found", body = Object, example = json!({
            "message": "Late request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "LateRequest"
)]
pub async fn get_late_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();

    let request = sqlx::query_as::<_, LateRequest>(
        r#"
        SELECT id, user_id, shift_date, requested_time, reason, status, created_at
        FROM late_requests
        WHERE id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, request_id, "Failed to fetch late request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match request {
        // Employees may only read their own requests.
        Some(data) if data.user_id == auth.user_id || auth.is_admin() => {
            Ok(HttpResponse::Ok().json(data))
        }
        Some(_) => Err(actix_web::error::ErrorForbidden("Not your request")),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Late request not found"
        }))),
    }
}

/// Paginated late-request list (Admin)
#[utoipa::path(
    get,
    path = "/api/v1/late-requests",
    params(LateRequestFilter),
    responses(
        (status = 200, description = "Paginated late-request list", body = LateRequestListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "LateRequest"
)]
pub async fn late_request_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LateRequestFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND lr.user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND lr.status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM late_requests lr{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count late requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT lr.id, lr.user_id, lr.shift_date, lr.requested_time, lr.reason,
               lr.status, lr.created_at,
               u.name AS user_name, u.email AS user_email
        FROM late_requests lr
        JOIN users u ON u.id = lr.user_id
        {}
        ORDER BY lr.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LateRequestRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let requests = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch late requests");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let response = LateRequestListResponse {
        data: requests,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}
