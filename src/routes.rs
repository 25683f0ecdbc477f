use crate::{
    api::{
        admin, approval, email, email_template, employee, invoice, leave_request, license, misc,
        onboarding, project, sync, timesheet,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{Scope, middleware::from_fn, web};
use std::sync::Arc;
use tracing::warn;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish();

    let cfg = cfg.unwrap_or_else(|| {
        warn!(requests_per_min, "Invalid rate limit, using governor defaults");
        GovernorConfig::default()
    });
    Governor::new(&cfg)
}

/// Malformed bodies, queries and paths answer with the `{error}` envelope.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(20 * 1024 * 1024) // base64 attachments
            .error_handler(|err, _| ApiError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| ApiError::bad_request(err.to_string()).into()),
    );
}

/// Leave routes are served under both `/leave` and `/leave-requests`.
fn leave_scope(path: &str) -> Scope {
    web::scope(path)
        .service(
            web::resource("")
                .route(web::get().to(leave_request::leave_list))
                .route(web::post().to(leave_request::create_leave)),
        )
        .service(
            web::resource("/balance/{user_id}").route(web::get().to(leave_request::leave_balance)),
        )
        .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
        .service(
            web::resource("/{id}/status").route(web::put().to(leave_request::update_leave_status)),
        )
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));
    let prefix = config.api_prefix.trim_end_matches('/').to_string();

    extractor_configs(cfg);

    cfg.service(web::resource("/").route(web::get().to(misc::index)));

    // Public routes
    cfg.service(
        web::scope(&format!("{prefix}/auth"))
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );
    cfg.service(web::resource(format!("{prefix}/test")).route(web::get().to(misc::api_test)));

    // Protected routes
    cfg.service(
        web::scope(&prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/timesheets")
                    .service(
                        web::resource("")
                            .route(web::get().to(timesheet::list_timesheets))
                            .route(web::post().to(timesheet::create_timesheet)),
                    )
                    .service(web::resource("/weekly").route(web::get().to(timesheet::weekly_rows)))
                    .service(
                        web::resource("/bulk-submit").route(web::post().to(timesheet::bulk_submit)),
                    )
                    .service(
                        web::resource("/bulk-approve")
                            .route(web::post().to(timesheet::bulk_approve)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(timesheet::update_timesheet))
                            .route(web::delete().to(timesheet::delete_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::post().to(timesheet::submit_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(timesheet::approve_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::post().to(timesheet::reject_timesheet)),
                    ),
            )
            .service(leave_scope("/leave"))
            .service(leave_scope("/leave-requests"))
            .service(
                web::scope("/invoices")
                    .service(
                        web::resource("")
                            .route(web::get().to(invoice::list_invoices))
                            .route(web::post().to(invoice::create_invoice)),
                    )
                    .service(
                        web::resource("/generate").route(web::post().to(invoice::generate_invoice)),
                    )
                    .service(web::resource("/send").route(web::post().to(invoice::send_invoice))),
            )
            .service(
                web::scope("/onboarding")
                    .service(web::resource("").route(web::get().to(onboarding::list_onboarding)))
                    .service(web::resource("/invite").route(web::post().to(onboarding::invite)))
                    .service(
                        web::resource("/token/{token}").route(web::get().to(onboarding::by_token)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(onboarding::get_onboarding)))
                    .service(
                        web::resource("/{id}/documents")
                            .route(web::post().to(onboarding::add_document)),
                    )
                    .service(
                        web::resource("/{id}/complete").route(web::post().to(onboarding::complete)),
                    ),
            )
            .service(
                web::scope("/approvals")
                    .service(
                        web::resource("")
                            .route(web::get().to(approval::list_approvals))
                            .route(web::post().to(approval::create_approval)),
                    )
                    .service(web::resource("/stats").route(web::get().to(approval::approval_stats)))
                    .service(web::resource("/{id}/decide").route(web::post().to(approval::decide))),
            )
            .service(
                web::scope("/email-templates")
                    .service(
                        web::resource("")
                            .route(web::get().to(email_template::list_templates))
                            .route(web::post().to(email_template::create_template)),
                    )
                    .service(
                        web::resource("/meta/categories")
                            .route(web::get().to(email_template::categories)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(email_template::get_template))
                            .route(web::put().to(email_template::update_template))
                            .route(web::delete().to(email_template::delete_template)),
                    )
                    .service(
                        web::resource("/{id}/duplicate")
                            .route(web::post().to(email_template::duplicate_template)),
                    )
                    .service(
                        web::resource("/{id}/preview")
                            .route(web::post().to(email_template::preview_template)),
                    ),
            )
            .service(
                web::scope("/email")
                    .service(
                        web::resource("/smtp-accounts").route(web::get().to(email::list_accounts)),
                    )
                    .service(
                        web::resource("/smtp-accounts/{id}")
                            .route(web::put().to(email::update_account)),
                    )
                    .service(
                        web::resource("/test-connection")
                            .route(web::post().to(email::test_connection)),
                    )
                    .service(web::resource("/send").route(web::post().to(email::send_email)))
                    .service(web::resource("/sent").route(web::get().to(email::sent_emails))),
            )
            .service(
                web::scope("/smtp-config")
                    .service(web::resource("").route(web::get().to(email::list_accounts)))
                    .service(web::resource("/test").route(web::post().to(email::test_connection)))
                    .service(web::resource("/{id}").route(web::put().to(email::update_account))),
            )
            .service(
                web::scope("/license")
                    .service(web::resource("").route(web::get().to(license::get_license)))
                    .service(web::resource("/usage").route(web::get().to(license::usage)))
                    .service(
                        web::resource("/purchase-seats")
                            .route(web::post().to(license::purchase_seats)),
                    ),
            )
            .service(web::resource("/license-plans").route(web::get().to(license::plans)))
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/roles")
                            .route(web::get().to(admin::list_roles))
                            .route(web::post().to(admin::create_role)),
                    )
                    .service(
                        web::resource("/roles/{id}")
                            .route(web::put().to(admin::update_role))
                            .route(web::delete().to(admin::delete_role)),
                    )
                    .service(web::resource("/permissions").route(web::get().to(admin::permissions)))
                    .service(web::resource("/users").route(web::get().to(admin::list_users)))
                    .service(
                        web::resource("/users/{id}/role").route(web::put().to(admin::assign_role)),
                    )
                    .service(web::resource("/audit-logs").route(web::get().to(admin::audit_logs)))
                    .service(web::resource("/audit-stats").route(web::get().to(admin::audit_stats)))
                    .service(
                        web::resource("/settings")
                            .route(web::get().to(admin::get_settings))
                            .route(web::put().to(admin::update_settings)),
                    ),
            )
            .service(
                web::resource("/projects")
                    .route(web::get().to(project::list_projects))
                    .route(web::post().to(project::create_project)),
            )
            .service(
                web::resource("/tasks")
                    .route(web::get().to(project::list_tasks))
                    .route(web::post().to(project::create_task)),
            )
            .service(
                web::scope("/sharepoint")
                    .service(web::resource("/status").route(web::get().to(sync::status)))
                    .service(web::resource("/config").route(web::put().to(sync::update_config)))
                    .service(
                        web::resource("/test-connection").route(web::post().to(sync::test_connection)),
                    )
                    .service(
                        web::resource("/create-lists").route(web::post().to(sync::create_lists)),
                    )
                    .service(
                        web::resource("/restore-config")
                            .route(web::post().to(sync::restore_config)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ token (access, 15 min)
//  └─ refreshToken (7 days)

// API REQUEST
//  └─ Authorization: Bearer token

// ACCESS EXPIRED
//  └─ POST /api/auth/refresh with refreshToken
//       └─ returns a new pair, the old refresh token is revoked

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::store::AppStore;
    use crate::test_support::{peer, quiet_runner, test_state};
    use actix_web::{App, http::StatusCode, test, web};

    #[actix_web::test]
    async fn refresh_and_logout_share_one_quota() {
        let state = test_state(web::Data::new(AppStore::new()), quiet_runner());
        let config = Config {
            rate_refresh_per_min: 1,
            ..state.config.get_ref().clone()
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .app_data(state.store.clone())
                .app_data(state.sessions.clone())
                .app_data(state.sync.clone())
                .configure(|cfg| super::configure(cfg, config)),
        )
        .await;

        let logout = || test::TestRequest::post().uri("/api/auth/logout").peer_addr(peer());

        let resp = test::call_service(&app, logout().to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = test::call_service(&app, logout().to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
