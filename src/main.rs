use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};

mod api;
mod auth;
mod config;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod services;
mod store;
mod sync;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;

use crate::auth::sessions::SessionStore;
use crate::docs::ApiDoc;
use crate::store::AppStore;
use crate::sync::{SyncService, runner::ShellRunner};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let store = Data::new(if config.seed_demo_data {
        AppStore::with_demo_data()
    } else {
        AppStore::new()
    });
    let sessions = Data::new(SessionStore::new(config.refresh_token_ttl));
    let sync = Data::new(SyncService::new(
        config.sync_config_path.clone(),
        Arc::new(ShellRunner::new(config.sync_shell.clone())),
        Duration::from_secs(config.sync_timeout_secs),
    ));

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the UI's JS/CSS files
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config_data.clone())
            .app_data(store.clone())
            .app_data(sessions.clone())
            .app_data(sync.clone())
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
