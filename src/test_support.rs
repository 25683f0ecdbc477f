//! Shared helpers for HTTP-level tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{test::TestRequest, web::Data};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{jwt::generate_access_token, sessions::SessionStore};
use crate::config::Config;
use crate::model::role::Role;
use crate::store::AppStore;
use crate::sync::{SyncService, runner::ScriptRunner, tests::CannedRunner};

/// The rate limiter keys on the peer address, which test requests lack by default.
pub const PEER: &str = "127.0.0.1:40000";

pub struct TestState {
    pub config: Data<Config>,
    pub store: Data<AppStore>,
    pub sessions: Data<SessionStore>,
    pub sync: Data<SyncService>,
}

pub fn test_state(store: Data<AppStore>, runner: Arc<dyn ScriptRunner>) -> TestState {
    let config = Config {
        sync_config_path: std::env::temp_dir().join(format!("centrapro-sync-{}.json", Uuid::new_v4())),
        ..Config::default()
    };
    let sync = SyncService::new(
        config.sync_config_path.clone(),
        runner,
        Duration::from_secs(1),
    );
    TestState {
        sessions: Data::new(SessionStore::new(config.refresh_token_ttl)),
        config: Data::new(config),
        store,
        sync: Data::new(sync),
    }
}

pub fn quiet_runner() -> Arc<dyn ScriptRunner> {
    CannedRunner::replying("")
}

/// Builds the full app around a fresh store, or the given `Data<AppStore>`.
macro_rules! init_app {
    () => {
        $crate::test_support::init_app!(actix_web::web::Data::new($crate::store::AppStore::new()))
    };
    ($store:expr) => {
        $crate::test_support::init_app!($store, $crate::test_support::quiet_runner())
    };
    ($store:expr, $runner:expr) => {{
        let state = $crate::test_support::test_state($store, $runner);
        let config = state.config.get_ref().clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(state.config.clone())
                .app_data(state.store.clone())
                .app_data(state.sessions.clone())
                .app_data(state.sync.clone())
                .configure(|cfg| $crate::routes::configure(cfg, config)),
        )
        .await
    }};
}
pub(crate) use init_app;

pub fn token_for(role: Role) -> String {
    let (id, email) = match role {
        Role::Admin => (1, "admin@example.com"),
        Role::Manager => (2, "manager@example.com"),
        Role::Employee => (3, "user@example.com"),
    };
    generate_access_token(id, email.to_string(), role.id(), &Config::default().jwt_secret, 900)
        .expect("test token signs")
}

pub fn json_request(req: TestRequest, body: Value) -> TestRequest {
    req.peer_addr(peer()).set_json(body)
}

/// Adds a peer address and a bearer token for `role`.
pub fn authed(req: TestRequest, role: Role) -> TestRequest {
    req.peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", token_for(role))))
}

pub fn peer() -> SocketAddr {
    PEER.parse().expect("valid socket address")
}
