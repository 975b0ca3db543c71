use crate::auth::auth::AuthUser;
use crate::model::task::Task;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TaskQuery {
    /// Shift date the tasks are assigned for
    #[schema(example = "2025-12-12", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Another employee's tasks; admins and managers only
    #[schema(example = 7)]
    pub user_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTask {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "2025-12-12", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Prepare the daily report")]
    pub title: String,
}

/// Tasks for one shift date
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Tasks, oldest first", body = [Task]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn list_tasks(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TaskQuery>,
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

    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE user_id = ? AND date = ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(target)
    .bind(query.date)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, target, "Failed to fetch tasks");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "tasks": tasks })))
}

/// Assign a task to an employee for one shift date (Admin/Manager)
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTask>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_manager()?;

    if payload.title.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Title must not be empty"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO tasks (user_id, date, title)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.date)
    .bind(payload.title.trim())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = payload.user_id, "Failed to create task");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(result.last_insert_id())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to reload task");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "task": task })))
}

/// Toggle a task's completion flag
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{task_id}/toggle",
    params(
        ("task_id" = u64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task toggled", body = Task),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Task not found", body = Object, example = json!({
            "message": "Task not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn toggle_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, task_id, "Failed to fetch task");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(task) = task else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Task not found"
        })));
    };

    // The assignee flips their own tasks; admins and managers may flip
    // anyone's.
    if task.user_id != auth.user_id && !auth.can_view_others() {
        return Err(actix_web::error::ErrorForbidden("Not your task"));
    }

    sqlx::query("UPDATE tasks SET completed = NOT completed WHERE id = ?")
        .bind(task_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, task_id, "Failed to toggle task");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, task_id, "Failed to reload task");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "task": task })))
}
