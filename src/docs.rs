use crate::api::attendance::{HistoryQuery, LocationPayload};
use crate::api::attendance_admin::{DayBreakdown, RecordFilter, RecordListResponse, RecordRow};
use crate::api::employee::{
    CreateEmployee, EmployeeListResponse, EmployeeQuery, EmployeeStats, EmployeeWithStats,
};
use crate::api::late_request::{
    CreateLateRequest, LateRequestFilter, LateRequestListResponse, LateRequestRow,
};
use crate::api::shift_override::{CreateOverride, OverrideFilter};
use crate::api::task::{CreateTask, TaskQuery};
use crate::model::attendance::AttendanceRecord;
use crate::model::late_request::LateRequest;
use crate::model::shift_override::ShiftOverride;
use crate::model::task::Task;
use crate::model::user::User;
use crate::shift::AttendanceStatus;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Shiftwatch Attendance API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Backend for shift-based attendance: check-in/check-out with geolocation,
shift-status classification, and the admin surfaces around them.

### 🔹 Key Features
- **Attendance**
  - Check-in / check-out mapped to the correct shift date, overnight shifts included
  - EARLY / ON_TIME / LATE classification with a configurable grace period
- **Late-Arrival Requests**
  - Employee requests, admin approval, one-shot schedule overrides
- **Employee Management**
  - Create, update, list, and delete employees with per-employee schedules
- **Reporting**
  - Status stats, weekly trends, CSV export with reverse-geocoded locations
- **Daily Tasks**
  - Per-shift task assignment with a completion guard on check-out

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Admin and Manager roles gate the sensitive operations.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::current_status,
        crate::api::attendance::history,
        crate::api::attendance::effective_times,

        crate::api::late_request::create_late_request,
        crate::api::late_request::get_late_request,
        crate::api::late_request::late_request_list,
        crate::api::late_request::approve_late_request,
        crate::api::late_request::reject_late_request,

        crate::api::shift_override::create_override,
        crate::api::shift_override::list_overrides,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance_admin::list_records,
        crate::api::attendance_admin::update_record,
        crate::api::attendance_admin::delete_record,
        crate::api::attendance_admin::stats,
        crate::api::attendance_admin::weekly_trends,
        crate::api::attendance_admin::export_csv,

        crate::api::task::list_tasks,
        crate::api::task::create_task,
        crate::api::task::toggle_task
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            LocationPayload,
            HistoryQuery,
            LateRequest,
            LateRequestRow,
            LateRequestFilter,
            LateRequestListResponse,
            CreateLateRequest,
            ShiftOverride,
            CreateOverride,
            OverrideFilter,
            User,
            CreateEmployee,
            EmployeeQuery,
            EmployeeStats,
            EmployeeWithStats,
            EmployeeListResponse,
            RecordRow,
            RecordFilter,
            RecordListResponse,
            DayBreakdown,
            Task,
            CreateTask,
            TaskQuery
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in/check-out and shift status APIs"),
        (name = "LateRequest", description = "Late-arrival request workflow APIs"),
        (name = "Override", description = "One-shot schedule override APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Admin", description = "Record administration and reporting APIs"),
        (name = "Task", description = "Daily task APIs"),
    )
)]
pub struct ApiDoc;
