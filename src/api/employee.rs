use std::collections::BTreeMap;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::employee::Employee,
    store::AppStore,
    sync::{SyncList, SyncService},
    utils::{audit, merge::merge_patch},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john@email.com", format = "email")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "Developer")]
    pub position: String,
    #[serde(default)]
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "Active")]
    pub status: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
    #[schema(example = 65.0)]
    pub hourly_rate: Option<f64>,
    pub manager: Option<String>,
    /// Any other profile fields (address, dateOfBirth, employeeId, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Exact department match
    pub department: Option<String>,
    /// Exact status match
    pub status: Option<String>,
    /// Case-insensitive match on name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeResponse {
    #[schema(example = true)]
    pub success: bool,
    pub employee: Employee,
}

fn matches(employee: &Employee, query: &EmployeeQuery) -> bool {
    if let Some(department) = &query.department {
        if !employee.department.eq_ignore_ascii_case(department) {
            return false;
        }
    }
    if let Some(status) = &query.status {
        if !employee.status.eq_ignore_ascii_case(status) {
            return false;
        }
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        return employee.name.to_lowercase().contains(&needle)
            || employee.email.to_lowercase().contains(&needle);
    }
    true
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "All matching employees", body = [Employee])
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    store: web::Data<AppStore>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let employees = store.employees.filter(|e| matches(e, &query));
    debug!(count = employees.len(), "Listing employees");
    Ok(HttpResponse::Ok().json(employees))
}

/// Get employee by id
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "error": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = store
        .employees
        .find(id.into_inner())
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Create employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 200, description = "Employee created", body = EmployeeResponse),
        (status = 400, description = "Malformed body")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let employee = store.employees.insert_with(|id| Employee {
        id,
        name: payload.name,
        email: payload.email,
        position: payload.position,
        department: payload.department,
        status: payload.status.unwrap_or_else(|| "Active".to_string()),
        phone: payload.phone,
        hire_date: payload.hire_date,
        hourly_rate: payload.hourly_rate,
        manager: payload.manager,
        created_at: Utc::now(),
        updated_at: None,
        extra: payload.extra,
    });

    info!(employee_id = employee.id, "Employee created");
    audit::record(
        &store,
        &auth,
        "create",
        "employee",
        Some(employee.id),
        format!("Created employee {}", employee.name),
    );
    sync.push(SyncList::Employees, &employee);

    Ok(HttpResponse::Ok().json(EmployeeResponse {
        success: true,
        employee,
    }))
}

/// Update employee
///
/// Any subset of employee fields; `id` and `createdAt` are ignored.
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    request_body(content = Object, example = json!({ "position": "Lead Developer" })),
    responses(
        (status = 200, description = "Employee updated", body = EmployeeResponse),
        (status = 400, description = "Empty body or wrong field types"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();

    let employee = store
        .employees
        .try_update(id, |current| {
            let mut merged: Employee = merge_patch(current, &payload)?;
            merged.updated_at = Some(Utc::now());
            *current = merged;
            Ok::<_, ApiError>(())
        })?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    audit::record(&store, &auth, "update", "employee", Some(id), "Updated employee");

    Ok(HttpResponse::Ok().json(EmployeeResponse {
        success: true,
        employee,
    }))
}

/// Delete employee
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee deleted", body = Object, example = json!({
            "success": true,
            "message": "Employee deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    let removed = store
        .employees
        .remove(id)
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    audit::record(
        &store,
        &auth,
        "delete",
        "employee",
        Some(id),
        format!("Deleted employee {}", removed.name),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee deleted"
    })))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::store::AppStore;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test, web};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn created_employee_shows_up_in_list() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/employees"), Role::Admin)
            .set_json(json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "position": "Engineer",
                "department": "R&D",
                "hireDate": "2026-01-05"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["employee"]["status"], "Active");
        let id = body["employee"]["id"].as_u64().unwrap();

        let req = authed(test::TestRequest::get().uri("/api/employees"), Role::Employee)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        let created = list
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"].as_u64() == Some(id))
            .unwrap();
        assert_eq!(created["name"], "Ada Lovelace");
        assert_eq!(created["email"], "ada@example.com");
        assert_eq!(created["department"], "R&D");
        assert_eq!(created["hireDate"], "2026-01-05");
    }

    #[actix_web::test]
    async fn profile_form_fields_survive_create_and_update() {
        let app = init_app!();
        let form = json!({
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "position": "Director",
            "department": "Engineering",
            "phone": "",
            "dateOfBirth": "1906-12-09",
            "joinDate": "2026-02-01",
            "address": "1 Navy Way",
            "city": "Arlington",
            "state": "VA",
            "zipCode": "22202",
            "employeeId": "EMP-042",
            "managerId": null,
            "role": "user",
            "status": "active"
        });

        let req = authed(test::TestRequest::post().uri("/api/employees"), Role::Admin)
            .set_json(form.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["employee"]["id"].as_u64().unwrap();

        let req = authed(test::TestRequest::get().uri("/api/employees"), Role::Admin)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        let listed = list
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"].as_u64() == Some(id))
            .unwrap();
        for (key, value) in form.as_object().unwrap() {
            assert_eq!(&listed[key], value, "field {key}");
        }

        let req = authed(
            test::TestRequest::put().uri(&format!("/api/employees/{id}")),
            Role::Admin,
        )
        .set_json(json!({ "city": "Washington", "emergencyContact": "Navy" }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["employee"]["city"], "Washington");
        assert_eq!(body["employee"]["emergencyContact"], "Navy");
        assert_eq!(body["employee"]["zipCode"], "22202");
    }

    #[actix_web::test]
    async fn duplicate_emails_are_accepted_and_search_filters() {
        let app = init_app!();
        for name in ["Ann", "Bob"] {
            let req = authed(test::TestRequest::post().uri("/api/employees"), Role::Admin)
                .set_json(json!({ "name": name, "email": "same@example.com" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = authed(test::TestRequest::get().uri("/api/employees?search=bo"), Role::Admin)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["name"], "Bob");
    }

    #[actix_web::test]
    async fn update_merges_and_delete_reports_missing() {
        let store = web::Data::new(AppStore::new());
        let app = init_app!(store.clone());

        let req = authed(test::TestRequest::post().uri("/api/employees"), Role::Admin)
            .set_json(json!({ "name": "Cy", "email": "cy@example.com" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["employee"]["id"].as_u64().unwrap();

        let req = authed(
            test::TestRequest::put().uri(&format!("/api/employees/{id}")),
            Role::Admin,
        )
        .set_json(json!({ "position": "Lead", "id": 999 }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["employee"]["position"], "Lead");
        assert_eq!(body["employee"]["name"], "Cy");
        assert_eq!(body["employee"]["id"], id);
        assert!(body["employee"]["updatedAt"].is_string());

        let req = authed(
            test::TestRequest::delete().uri(&format!("/api/employees/{id}")),
            Role::Admin,
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = authed(
            test::TestRequest::get().uri(&format!("/api/employees/{id}")),
            Role::Admin,
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Employee not found");

        // create, update and delete were audited
        assert_eq!(store.audit_logs.len(), 3);
    }
}
