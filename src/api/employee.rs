use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::user::User;
use crate::shift::Schedule;
use crate::utils::email::{Mailer, spawn_notification};
use crate::utils::{email_cache, email_filter};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

const USER_COLUMNS: &str =
    "id, name, email, role_id, check_in_time, check_out_time, timezone, is_active, created_at";

// Columns an admin may touch through the update endpoint.
const UPDATABLE: &[&str] = &[
    "name",
    "email",
    "role_id",
    "check_in_time",
    "check_out_time",
    "timezone",
    "is_active",
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// 1 = admin, 2 = manager, 3 = employee (default)
    #[schema(example = 3)]
    pub role_id: Option<u8>,
    #[schema(example = "21:00", nullable = true)]
    pub check_in_time: Option<String>,
    #[schema(example = "05:00", nullable = true)]
    pub check_out_time: Option<String>,
    #[schema(example = "Asia/Karachi", nullable = true)]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by role id
    pub role_id: Option<u8>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, Default, Clone, Copy, ToSchema)]
pub struct EmployeeStats {
    #[schema(example = 20)]
    pub total: i64,
    #[schema(example = 15)]
    pub on_time: i64,
    #[schema(example = 3)]
    pub late: i64,
    #[schema(example = 1)]
    pub absent: i64,
    #[schema(example = 1)]
    pub no_checkout: i64,
    #[schema(example = 75)]
    pub on_time_rate: i64,
    #[schema(example = 15)]
    pub late_rate: i64,
    #[schema(example = 5)]
    pub absent_rate: i64,
    /// Set when at least 5 records exist and late + absent exceed 30%
    #[schema(example = false)]
    pub is_red_flag: bool,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeWithStats {
    pub user: User,
    pub stats: EmployeeStats,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<EmployeeWithStats>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

enum FilterValue {
    U64(u64),
    Str(String),
}

/// Validates the *effective* schedule an employee would end up with:
/// custom columns where given, system defaults elsewhere. Catches bad
/// HH:mm strings, unknown zones and the equal-times configuration error
/// in one place.
fn validate_schedule_fields(
    check_in: Option<&str>,
    check_out: Option<&str>,
    timezone: Option<&str>,
    config: &Config,
) -> Result<(), String> {
    let check_in = check_in.unwrap_or(&config.default_check_in_time);
    let check_out = check_out.unwrap_or(&config.default_check_out_time);
    let tz = timezone.unwrap_or(&config.default_timezone);

    Schedule::parse(check_in, check_out, tz)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// true  => email AVAILABLE
/// false => email TAKEN
async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.trim().to_lowercase();

    // 1. Cuckoo filter — fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2. Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3. Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

/// Create Employee (Admin)
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created successfully"
        })),
        (status = 400, description = "Invalid schedule or payload"),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "message": "Email already registered"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    mailer: web::Data<Option<Mailer>>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and password must not be empty"
        })));
    }
    if !email.contains('@') {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid email address"
        })));
    }

    let role_id = payload.role_id.unwrap_or(3);
    if crate::model::role::Role::from_id(role_id).is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid role id"
        })));
    }

    if let Err(e) = validate_schedule_fields(
        payload.check_in_time.as_deref(),
        payload.check_out_time.as_deref(),
        payload.timezone.as_deref(),
        &config,
    ) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e })));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Email already registered"
        })));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (name, email, password, role_id, check_in_time, check_out_time, timezone)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(&hashed)
    .bind(role_id)
    .bind(&payload.check_in_time)
    .bind(&payload.check_out_time)
    .bind(&payload.timezone)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            // Keep the fast availability path in sync with the insert.
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;

            if let Some(m) = mailer.get_ref().clone() {
                let to = email.clone();
                let employee = name.to_string();
                spawn_notification("welcome", async move {
                    m.send_welcome(&to, &employee).await
                });
            }

            Ok(HttpResponse::Created().json(json!({
                "message": "Employee created successfully"
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Email already registered"
                    })));
                }
            }

            error!(error = %e, "Failed to create employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, contact the system admin"
            })))
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatusCount {
    user_id: u64,
    status: String,
    cnt: i64,
}

async fn stats_for(
    pool: &MySqlPool,
    user_ids: &[u64],
) -> Result<HashMap<u64, EmployeeStats>, sqlx::Error> {
    let mut stats: HashMap<u64, EmployeeStats> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(stats);
    }

    let placeholders = vec!["?"; user_ids.len()].join(", ");
    let sql = format!(
        "SELECT user_id, status, COUNT(*) AS cnt FROM attendance \
         WHERE user_id IN ({placeholders}) GROUP BY user_id, status"
    );

    let mut q = sqlx::query_as::<_, StatusCount>(&sql);
    for id in user_ids {
        q = q.bind(id);
    }

    for row in q.fetch_all(pool).await? {
        let entry = stats.entry(row.user_id).or_default();
        entry.total += row.cnt;
        match row.status.as_str() {
            // Early counts toward on-time in the summary, same as the
            // trend charts.
            "ON_TIME" | "EARLY" => entry.on_time += row.cnt,
            "LATE" => entry.late += row.cnt,
            "ABSENT" => entry.absent += row.cnt,
            "NO_CHECKOUT" => entry.no_checkout += row.cnt,
            _ => {}
        }
    }

    for entry in stats.values_mut() {
        if entry.total > 0 {
            entry.on_time_rate = (entry.on_time * 100 + entry.total / 2) / entry.total;
            entry.late_rate = (entry.late * 100 + entry.total / 2) / entry.total;
            entry.absent_rate = (entry.absent * 100 + entry.total / 2) / entry.total;
        }
        entry.is_red_flag = entry.total >= 5 && entry.late_rate + entry.absent_rate > 30;
    }

    Ok(stats)
}

/// List employees with attendance stats (Admin/Manager)
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_manager()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    // Admin accounts stay out of the employee roster.
    let mut conditions = vec!["role_id <> 1".to_string()];
    let mut bindings: Vec<FilterValue> = Vec::new();

    if let Some(role_id) = query.role_id {
        conditions.push("role_id = ?".to_string());
        bindings.push(FilterValue::U64(role_id as u64));
    }

    if let Some(search) = &query.search {
        conditions.push("(name LIKE ? OR email LIKE ?)".to_string());
        let like = format!("%{}%", search);
        bindings.push(FilterValue::Str(like.clone()));
        bindings.push(FilterValue::Str(like));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            FilterValue::U64(v) => count_query.bind(*v),
            FilterValue::Str(s) => count_query.bind(s.clone()),
        };
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {USER_COLUMNS} FROM users {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, User>(&data_sql);
    for b in bindings {
        data_query = match b {
            FilterValue::U64(v) => data_query.bind(v),
            FilterValue::Str(s) => data_query.bind(s),
        };
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch employees");
        ErrorInternalServerError("Database error")
    })?;

    let ids: Vec<u64> = employees.iter().map(|u| u.id).collect();
    let mut stats = stats_for(pool.get_ref(), &ids).await.map_err(|e| {
        error!(error = %e, "Failed to aggregate attendance stats");
        ErrorInternalServerError("Database error")
    })?;

    let data = employees
        .into_iter()
        .map(|user| {
            let s = stats.remove(&user.id).unwrap_or_default();
            EmployeeWithStats { user, stats: s }
        })
        .collect();

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID (Admin/Manager)
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = User),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_manager()?;

    let employee_id = path.into_inner();

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match user {
        Some(u) => Ok(HttpResponse::Ok().json(u)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Update Employee (Admin)
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(content = Object, description = "Subset of employee fields", example = json!({
        "check_in_time": "22:00",
        "check_out_time": "06:00"
    })),
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Invalid field or schedule value"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    // Schedule fields are validated as the *resulting* pair: what is in
    // the payload, else what the row already holds, else the default.
    let current = sqlx::query_as::<_, crate::model::user::UserScheduleRow>(
        "SELECT check_in_time, check_out_time, timezone FROM users WHERE id = ?",
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(current) = current else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    let field = |key: &str| body.get(key).and_then(Value::as_str);
    if let Err(e) = validate_schedule_fields(
        field("check_in_time").or(current.check_in_time.as_deref()),
        field("check_out_time").or(current.check_out_time.as_deref()),
        field("timezone").or(current.timezone.as_deref()),
        &config,
    ) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e })));
    }

    let update = crate::utils::db_utils::build_update_sql(
        "users",
        &body,
        UPDATABLE,
        "id",
        employee_id,
    )?;

    crate::utils::db_utils::execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to update employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if let Some(new_email) = field("email") {
        email_filter::insert(new_email);
        email_cache::mark_taken(new_email).await;
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee (Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error", body = Object)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(email) = email else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    // Attendance, tasks, requests and overrides cascade in the schema.
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to delete employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    email_filter::remove(&email);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
