use crate::{
    api::{admin, holidays, leave_request},
    auth::{
        handlers,
        middleware::{admin_gate, auth_middleware, optional_auth_middleware},
    },
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // only fails for a zero period or burst, both clamped above
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Optional auth: anonymous callers get the global view
    cfg.service(
        web::scope("/holidays")
            .wrap(from_fn(optional_auth_middleware))
            .wrap(protected_limiter.clone())
            .service(web::resource("").route(web::get().to(holidays::list_holidays))),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // fixed segments before /{id}
                    .service(
                        web::resource("/pending").route(web::get().to(leave_request::pending_list)),
                    )
                    .service(web::resource("/all").route(web::get().to(leave_request::all_list)))
                    .service(
                        web::resource("/balances").route(web::get().to(leave_request::my_balances)),
                    )
                    .service(
                        web::resource("/balances/{leave_type}")
                            .route(web::get().to(leave_request::my_balance)),
                    )
                    .service(
                        web::resource("/lop").route(web::get().to(leave_request::my_lop_records)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .wrap(from_fn(admin_gate))
                    .service(web::resource("/users").route(web::get().to(admin::list_users)))
                    .service(
                        web::resource("/users/{id}/role").route(web::put().to(admin::update_role)),
                    )
                    .service(
                        web::resource("/users/{id}/active").route(web::put().to(admin::set_active)),
                    )
                    .service(
                        web::resource("/users/{id}/balances")
                            .route(web::get().to(admin::user_balances)),
                    )
                    .service(
                        web::resource("/users/{id}/balances/adjust")
                            .route(web::post().to(admin::adjust_balance)),
                    )
                    .service(
                        web::resource("/users/{id}/lop")
                            .route(web::get().to(admin::user_lop_records)),
                    )
                    .service(
                        web::resource("/users/{id}/lop/convert")
                            .route(web::post().to(admin::convert_user_lop)),
                    )
                    .service(
                        web::resource("/quotas")
                            .route(web::get().to(admin::list_quotas))
                            .route(web::put().to(admin::put_quota)),
                    )
                    .service(
                        web::resource("/accrual-rates")
                            .route(web::get().to(admin::list_accrual_rates))
                            .route(web::put().to(admin::put_accrual_rate)),
                    )
                    .service(
                        web::resource("/lop-settings")
                            .route(web::get().to(admin::get_lop_settings))
                            .route(web::put().to(admin::put_lop_settings)),
                    )
                    .service(
                        web::resource("/accrual/run").route(web::post().to(admin::run_accrual)),
                    )
                    .service(
                        web::resource("/lop/convert").route(web::post().to(admin::convert_all_lop)),
                    )
                    .service(
                        web::resource("/holidays")
                            .route(web::get().to(admin::list_holidays))
                            .route(web::post().to(admin::add_holiday)),
                    )
                    .service(
                        web::resource("/holidays/{id}")
                            .route(web::delete().to(admin::delete_holiday)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refresh_token
//       └─ returns a new pair, old refresh token revoked
