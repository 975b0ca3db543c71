use crate::{
    api::{attendance, attendance_admin, employee, late_request, shift_override, task},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(build_limiter(config.rate_refresh_per_min))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(handlers::protected)
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/status").route(web::get().to(attendance::current_status)),
                    )
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/times").route(web::get().to(attendance::effective_times)),
                    )
                    // admin record surface
                    .service(
                        web::resource("/records")
                            .route(web::get().to(attendance_admin::list_records)),
                    )
                    .service(
                        web::resource("/records/{id}")
                            .route(web::put().to(attendance_admin::update_record))
                            .route(web::delete().to(attendance_admin::delete_record)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/late-requests")
                    .service(
                        web::resource("")
                            .route(web::get().to(late_request::late_request_list))
                            .route(web::post().to(late_request::create_late_request)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(late_request::get_late_request)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(late_request::approve_late_request)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(late_request::reject_late_request)),
                    ),
            )
            .service(
                web::scope("/overrides").service(
                    web::resource("")
                        .route(web::post().to(shift_override::create_override))
                        .route(web::get().to(shift_override::list_overrides)),
                ),
            )
            .service(
                web::scope("/tasks")
                    .service(
                        web::resource("")
                            .route(web::get().to(task::list_tasks))
                            .route(web::post().to(task::create_task)),
                    )
                    .service(
                        web::resource("/{id}/toggle").route(web::put().to(task::toggle_task)),
                    ),
            )
            .service(web::resource("/stats").route(web::get().to(attendance_admin::stats)))
            .service(
                web::resource("/analytics/weekly")
                    .route(web::get().to(attendance_admin::weekly_trends)),
            )
            .service(web::resource("/export").route(web::get().to(attendance_admin::export_csv))),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
