use std::collections::BTreeMap;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::admin::{AdminRole, PERMISSIONS, SystemSettings},
    store::AppStore,
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_AUDIT_LIMIT: usize = 100;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleReq {
    #[schema(example = "auditor")]
    pub name: String,
    #[schema(example = "Auditor")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignRoleReq {
    #[schema(example = "manager")]
    pub role: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    /// Exact action match, e.g. `create`
    pub action: Option<String>,
    /// Exact resource match, e.g. `employee`
    pub resource: Option<String>,
    /// Most recent entries to return (default 100)
    pub limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub role_info: Option<AdminRole>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total: usize,
    pub last24h: usize,
    pub last7d: usize,
    pub by_action: BTreeMap<String, usize>,
    pub by_resource: BTreeMap<String, usize>,
    pub by_user: BTreeMap<String, usize>,
}

fn name_taken(store: &AppStore, name: &str, except: Option<u64>) -> bool {
    store
        .admin_roles
        .find_by(|r| r.name.eq_ignore_ascii_case(name) && Some(r.id) != except)
        .is_some()
}

/// List roles
#[utoipa::path(
    get,
    path = "/api/admin/roles",
    responses(
        (status = 200, description = "Roles", body = [AdminRole]),
        (status = 403, description = "Admin only")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_roles(
    auth: AuthUser,
    store: web::Data<AppStore>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(store.admin_roles.all()))
}

/// Create role
#[utoipa::path(
    post,
    path = "/api/admin/roles",
    request_body = RoleReq,
    responses(
        (status = 200, description = "Created role", body = AdminRole),
        (status = 400, description = "Missing name"),
        (status = 409, description = "Role name already exists")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<RoleReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let req = payload.into_inner();
    let name = req.name.trim().to_lowercase();

    if name.is_empty() {
        return Err(ApiError::bad_request("Role name is required").into());
    }
    if name_taken(&store, &name, None) {
        return Err(ApiError::Conflict("Role name already exists".into()).into());
    }

    let now = Utc::now();
    let role = store.admin_roles.insert_with(|id| AdminRole {
        id,
        display_name: req.display_name.unwrap_or_else(|| req.name.trim().to_string()),
        name,
        description: req.description,
        permissions: req.permissions,
        is_system: false,
        created_at: now,
        updated_at: now,
    });

    info!(role = %role.name, "Role created");
    audit::record(
        &store,
        &auth,
        "create",
        "role",
        Some(role.id),
        format!("Created role {}", role.name),
    );
    Ok(HttpResponse::Ok().json(role))
}

/// Update role
#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}",
    params(("id" = u64, Path, description = "Role id")),
    request_body = RoleReq,
    responses(
        (status = 200, description = "Updated role", body = AdminRole),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role name already exists")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<RoleReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = id.into_inner();
    let req = payload.into_inner();
    let name = req.name.trim().to_lowercase();

    if name_taken(&store, &name, Some(id)) {
        return Err(ApiError::Conflict("Role name already exists".into()).into());
    }

    let role = store
        .admin_roles
        .update(id, |role| {
            // built-in roles keep their name, login maps onto it
            if !role.is_system && !name.is_empty() {
                role.name = name;
            }
            if let Some(display_name) = req.display_name {
                role.display_name = display_name;
            }
            role.description = req.description;
            role.permissions = req.permissions;
            role.updated_at = Utc::now();
        })
        .ok_or_else(|| ApiError::not_found("Role not found"))?;

    audit::record(&store, &auth, "update", "role", Some(id), format!("Updated role {}", role.name));
    Ok(HttpResponse::Ok().json(role))
}

/// Delete role
#[utoipa::path(
    delete,
    path = "/api/admin/roles/{id}",
    params(("id" = u64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({ "success": true })),
        (status = 400, description = "Cannot delete system role"),
        (status = 404, description = "Role not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = id.into_inner();

    let role = store
        .admin_roles
        .find(id)
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    if role.is_system {
        return Err(ApiError::bad_request("Cannot delete system role").into());
    }
    store.admin_roles.remove(id);

    audit::record(&store, &auth, "delete", "role", Some(id), format!("Deleted role {}", role.name));
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Permission catalogue
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    responses((status = 200, description = "All permissions", body = Object, example = json!([
        { "id": "employees.read", "name": "View employees", "category": "Employees" }
    ]))),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn permissions(auth: AuthUser) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(PERMISSIONS))
}

/// Directory users with their roles
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "Users", body = [AdminUser])),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    store: web::Data<AppStore>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let roles = store.admin_roles.all();

    let users: Vec<AdminUser> = store
        .users
        .all()
        .into_iter()
        .map(|u| AdminUser {
            role_info: roles.iter().find(|r| r.name.eq_ignore_ascii_case(&u.role)).cloned(),
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
        })
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// Assign a role to a user
///
/// Takes effect at the user's next login.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = u64, Path, description = "User id")),
    request_body = AssignRoleReq,
    responses(
        (status = 200, description = "Role assigned", body = Object, example = json!({
            "success": true,
            "message": "Role updated"
        })),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn assign_role(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<AssignRoleReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = id.into_inner();

    let role = store
        .admin_roles
        .find_by(|r| r.name.eq_ignore_ascii_case(payload.role.trim()))
        .ok_or_else(|| ApiError::bad_request("Invalid role"))?;

    let user = store
        .users
        .update(id, |u| u.role = role.name.clone())
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = id, role = %role.name, "Role assigned");
    audit::record(
        &store,
        &auth,
        "assign_role",
        "user",
        Some(id),
        format!("{} is now {}", user.email, role.name),
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Role updated"
    })))
}

/// Audit log
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditQuery),
    responses((status = 200, description = "Newest first", body = [crate::model::admin::AuditLog])),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn audit_logs(
    auth: AuthUser,
    store: web::Data<AppStore>,
    query: web::Query<AuditQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let mut logs = store.audit_logs.filter(|l| {
        query.action.as_deref().is_none_or(|a| l.action == a)
            && query.resource.as_deref().is_none_or(|r| l.resource == r)
    });
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    logs.truncate(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT));

    Ok(HttpResponse::Ok().json(logs))
}

/// Audit log counters
#[utoipa::path(
    get,
    path = "/api/admin/audit-stats",
    responses((status = 200, description = "Counters", body = AuditStats)),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn audit_stats(
    auth: AuthUser,
    store: web::Data<AppStore>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let logs = store.audit_logs.all();
    let now = Utc::now();
    let since = |d: Duration| logs.iter().filter(|l| l.timestamp >= now - d).count();

    let mut stats = AuditStats {
        total: logs.len(),
        last24h: since(Duration::hours(24)),
        last7d: since(Duration::days(7)),
        by_action: BTreeMap::new(),
        by_resource: BTreeMap::new(),
        by_user: BTreeMap::new(),
    };
    for log in &logs {
        *stats.by_action.entry(log.action.clone()).or_default() += 1;
        *stats.by_resource.entry(log.resource.clone()).or_default() += 1;
        *stats.by_user.entry(log.user_name.clone()).or_default() += 1;
    }

    Ok(HttpResponse::Ok().json(stats))
}

/// System settings
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, description = "Settings", body = SystemSettings)),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn get_settings(
    auth: AuthUser,
    store: web::Data<AppStore>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(store.settings.read().clone()))
}

/// Replace system settings
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = SystemSettings,
    responses((status = 200, description = "Stored settings", body = SystemSettings)),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<SystemSettings>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let settings = payload.into_inner();
    *store.settings.write() = settings.clone();

    audit::record(&store, &auth, "update", "settings", None, "Updated system settings");
    Ok(HttpResponse::Ok().json(settings))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::store::AppStore;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test, web};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn admin_routes_reject_other_roles() {
        let app = init_app!();
        for uri in ["/api/admin/roles", "/api/admin/audit-logs", "/api/admin/settings"] {
            let req = authed(test::TestRequest::get().uri(uri), Role::Manager).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[actix_web::test]
    async fn role_lifecycle_guards() {
        let store = web::Data::new(AppStore::new());
        let app = init_app!(store.clone());

        let req = authed(test::TestRequest::post().uri("/api/admin/roles"), Role::Admin)
            .set_json(json!({ "name": "Manager" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = authed(test::TestRequest::post().uri("/api/admin/roles"), Role::Admin)
            .set_json(json!({ "name": "auditor", "permissions": ["admin.audit"] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["isSystem"], false);
        let id = body["id"].as_u64().unwrap();

        let system_id = store.admin_roles.find_by(|r| r.is_system).unwrap().id;
        let req = authed(
            test::TestRequest::delete().uri(&format!("/api/admin/roles/{system_id}")),
            Role::Admin,
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = authed(test::TestRequest::put().uri("/api/admin/users/2/role"), Role::Admin)
            .set_json(json!({ "role": "nobody" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = authed(test::TestRequest::put().uri("/api/admin/users/2/role"), Role::Admin)
            .set_json(json!({ "role": "auditor" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(store.users.find(2).unwrap().role, "auditor");

        let req = authed(
            test::TestRequest::delete().uri(&format!("/api/admin/roles/{id}")),
            Role::Admin,
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = authed(test::TestRequest::get().uri("/api/admin/audit-logs?limit=2"), Role::Admin)
            .to_request();
        let logs: Value = test::call_and_read_body_json(&app, req).await;
        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["action"], "delete");
        assert_eq!(logs[0]["userName"], "admin");

        let req = authed(test::TestRequest::get().uri("/api/admin/audit-stats"), Role::Admin)
            .to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total"], 3);
        assert_eq!(stats["last24h"], 3);
        assert_eq!(stats["byResource"]["role"], 2);
    }

    #[actix_web::test]
    async fn settings_are_replaced_wholesale() {
        let app = init_app!();

        let req = authed(test::TestRequest::get().uri("/api/admin/settings"), Role::Admin)
            .to_request();
        let mut settings: Value = test::call_and_read_body_json(&app, req).await;
        settings["security"]["passwordMinLength"] = json!(12);

        let req = authed(test::TestRequest::put().uri("/api/admin/settings"), Role::Admin)
            .set_json(&settings)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["security"]["passwordMinLength"], 12);
        assert_eq!(body["modules"]["leave"]["maxDaysPerRequest"], 30);
    }
}
