use crate::{
    auth::auth::AuthUser,
    sync::{
        SyncConfigRestore, SyncConfigUpdate, SyncCredentials, SyncError, SyncService,
        config::MaskedSyncConfig,
    },
    store::AppStore,
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SyncStatusResponse {
    pub success: bool,
    pub config: MaskedSyncConfig,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub success: bool,
    pub message: String,
    pub site_id: String,
    pub site_name: String,
    pub lists_count: u32,
    pub lists_found: usize,
    pub all_lists_created: bool,
    pub lists: Vec<String>,
}

/// Missing input and ordering mistakes are the caller's fault; everything else is ours.
fn failure(message: &str, err: &SyncError) -> HttpResponse {
    match err {
        SyncError::MissingCredentials | SyncError::NotConnected => {
            HttpResponse::BadRequest().json(json!({
                "success": false,
                "message": err.to_string()
            }))
        }
        _ => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "message": message,
            "error": err.to_string()
        })),
    }
}

/// Sync status
///
/// Identifiers are masked to their last four characters.
#[utoipa::path(
    get,
    path = "/api/sharepoint/status",
    responses((status = 200, description = "Masked configuration", body = SyncStatusResponse)),
    tag = "Sync",
    security(("bearer_auth" = []))
)]
pub async fn status(sync: web::Data<SyncService>) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(SyncStatusResponse {
        success: true,
        config: sync.status(),
    }))
}

/// Update sync settings
///
/// Only non-empty fields overwrite the current values.
#[utoipa::path(
    put,
    path = "/api/sharepoint/config",
    request_body = SyncConfigUpdate,
    responses((status = 200, description = "Updated", body = SyncStatusResponse)),
    tag = "Sync",
    security(("bearer_auth" = []))
)]
pub async fn update_config(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<SyncConfigUpdate>,
) -> actix_web::Result<impl Responder> {
    let config = sync.update(payload.into_inner());
    audit::record(&store, &auth, "update", "sync_config", None, "Updated sync settings");

    Ok(HttpResponse::Ok().json(SyncStatusResponse {
        success: true,
        config: config.masked(),
    }))
}

/// Test the remote connection
#[utoipa::path(
    post,
    path = "/api/sharepoint/test-connection",
    request_body = SyncCredentials,
    responses(
        (status = 200, description = "Connected", body = ConnectionResponse),
        (status = 400, description = "Missing required credentials"),
        (status = 500, description = "Connection failed", body = Object, example = json!({
            "success": false,
            "message": "Connection test failed",
            "error": "Script timed out after 60 seconds"
        }))
    ),
    tag = "Sync",
    security(("bearer_auth" = []))
)]
pub async fn test_connection(
    sync: web::Data<SyncService>,
    payload: web::Json<SyncCredentials>,
) -> actix_web::Result<impl Responder> {
    match sync.test_connection(payload.into_inner()).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ConnectionResponse {
            success: true,
            message: format!("Connected to {}", report.site_name),
            lists_found: report.lists.len(),
            site_id: report.site_id,
            site_name: report.site_name,
            lists_count: report.lists_count,
            all_lists_created: report.all_lists_created,
            lists: report.lists,
        })),
        Err(e) => {
            error!(error = %e, "Sync connection test failed");
            Ok(failure("Connection test failed", &e))
        }
    }
}

/// Create the remote lists
#[utoipa::path(
    post,
    path = "/api/sharepoint/create-lists",
    responses(
        (status = 200, description = "Lists created", body = Object, example = json!({
            "success": true,
            "message": "Lists created successfully",
            "created": ["CentraPro_Timesheets"]
        })),
        (status = 400, description = "Please test connection first"),
        (status = 500, description = "Script failed")
    ),
    tag = "Sync",
    security(("bearer_auth" = []))
)]
pub async fn create_lists(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
) -> actix_web::Result<impl Responder> {
    match sync.create_lists().await {
        Ok(created) => {
            audit::record(
                &store,
                &auth,
                "create_lists",
                "sync_config",
                None,
                format!("{} list(s) created", created.len()),
            );
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Lists created successfully",
                "created": created
            })))
        }
        Err(e) => {
            error!(error = %e, "Creating sync lists failed");
            Ok(failure("Failed to create lists", &e))
        }
    }
}

/// Restore a saved configuration
#[utoipa::path(
    post,
    path = "/api/sharepoint/restore-config",
    request_body = SyncConfigRestore,
    responses((status = 200, description = "Restored", body = SyncStatusResponse)),
    tag = "Sync",
    security(("bearer_auth" = []))
)]
pub async fn restore_config(
    sync: web::Data<SyncService>,
    payload: web::Json<SyncConfigRestore>,
) -> actix_web::Result<impl Responder> {
    let config = sync.restore(payload.into_inner()).await;
    Ok(HttpResponse::Ok().json(SyncStatusResponse {
        success: true,
        config: config.masked(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::store::AppStore;
    use crate::sync::tests::CannedRunner;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test, web};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn lists_require_a_tested_connection() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/sharepoint/create-lists"), Role::Admin)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Please test connection first");

        let req = authed(test::TestRequest::post().uri("/api/sharepoint/test-connection"), Role::Admin)
            .set_json(json!({ "tenantId": "t" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Missing required credentials");
    }

    #[actix_web::test]
    async fn timed_out_test_is_a_server_error() {
        let app = init_app!(web::Data::new(AppStore::new()), CannedRunner::timing_out());

        let req = authed(test::TestRequest::post().uri("/api/sharepoint/test-connection"), Role::Admin)
            .set_json(json!({
                "tenantId": "tenant-0001",
                "clientId": "client-0002",
                "clientSecret": "s",
                "siteUrl": "https://contoso.sharepoint.com"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("timed out"));

        let req = authed(test::TestRequest::get().uri("/api/sharepoint/status"), Role::Admin)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["config"]["connectionStatus"], "failed");
    }

    #[actix_web::test]
    async fn connected_service_creates_lists() {
        let runner = CannedRunner::replying(
            r#"{"success":true,"siteId":"site-1","siteName":"Contoso","centraProListsCount":2,"lists":["CentraPro_Timesheets","CentraPro_Employees"],"created":"CentraPro_Tasks"}"#,
        );
        let app = init_app!(web::Data::new(AppStore::new()), runner.clone());

        let req = authed(test::TestRequest::post().uri("/api/sharepoint/test-connection"), Role::Admin)
            .set_json(json!({
                "tenantId": "tenant-0001",
                "clientId": "client-0002",
                "clientSecret": "s",
                "siteUrl": "https://contoso.sharepoint.com"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["siteId"], "site-1");
        assert_eq!(body["listsFound"], 2);
        assert_eq!(body["allListsCreated"], false);

        let req = authed(test::TestRequest::post().uri("/api/sharepoint/create-lists"), Role::Admin)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["created"], json!(["CentraPro_Tasks"]));

        let req = authed(test::TestRequest::get().uri("/api/sharepoint/status"), Role::Admin)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["config"]["tenantId"], "***0001");
        assert_eq!(body["config"]["connectionStatus"], "connected");
        assert_eq!(runner.scripts.lock().len(), 2);
    }
}
