use std::collections::HashMap;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::email_template::{EmailTemplate, TEMPLATE_CATEGORIES},
    store::AppStore,
    utils::{
        audit,
        template::{extract_variables, render},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TemplateQuery {
    /// Exact category match
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateReq {
    #[schema(example = "Welcome Email")]
    pub name: String,
    #[schema(example = "Welcome, {{firstName}}!")]
    pub subject: String,
    pub body: String,
    #[schema(example = "Onboarding")]
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct PreviewReq {
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Serialize, ToSchema)]
pub struct TemplateRef {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub subject: String,
    pub body: String,
    pub original_template: TemplateRef,
}

fn variables_of(subject: &str, body: &str) -> Vec<String> {
    extract_variables([subject, body])
}

/// List templates
#[utoipa::path(
    get,
    path = "/api/email-templates",
    params(TemplateQuery),
    responses((status = 200, description = "Templates", body = [EmailTemplate])),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn list_templates(
    store: web::Data<AppStore>,
    query: web::Query<TemplateQuery>,
) -> actix_web::Result<impl Responder> {
    let templates = store
        .email_templates
        .filter(|t| query.category.as_deref().is_none_or(|c| t.category == c));
    Ok(HttpResponse::Ok().json(templates))
}

/// Get template
#[utoipa::path(
    get,
    path = "/api/email-templates/{id}",
    params(("id" = u64, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template", body = EmailTemplate),
        (status = 404, description = "Template not found")
    ),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn get_template(
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let template = store
        .email_templates
        .find(id.into_inner())
        .ok_or_else(|| ApiError::not_found("Template not found"))?;
    Ok(HttpResponse::Ok().json(template))
}

/// Create template
#[utoipa::path(
    post,
    path = "/api/email-templates",
    request_body = TemplateReq,
    responses((status = 200, description = "Created template", body = EmailTemplate)),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn create_template(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<TemplateReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    let now = Utc::now();

    let template = store.email_templates.insert_with(|id| EmailTemplate {
        id,
        variables: variables_of(&req.subject, &req.body),
        name: req.name,
        subject: req.subject,
        body: req.body,
        category: req.category.unwrap_or_else(|| "General".to_string()),
        is_active: req.is_active.unwrap_or(true),
        created_by: auth.display_name(),
        created_at: now,
        last_modified: now,
    });

    audit::record(
        &store,
        &auth,
        "create",
        "email_template",
        Some(template.id),
        format!("Created template {}", template.name),
    );
    Ok(HttpResponse::Ok().json(template))
}

/// Replace template content
#[utoipa::path(
    put,
    path = "/api/email-templates/{id}",
    params(("id" = u64, Path, description = "Template id")),
    request_body = TemplateReq,
    responses(
        (status = 200, description = "Updated template", body = EmailTemplate),
        (status = 404, description = "Template not found")
    ),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn update_template(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<TemplateReq>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    let req = payload.into_inner();

    let template = store
        .email_templates
        .update(id, |t| {
            t.variables = variables_of(&req.subject, &req.body);
            t.name = req.name;
            t.subject = req.subject;
            t.body = req.body;
            if let Some(category) = req.category {
                t.category = category;
            }
            if let Some(active) = req.is_active {
                t.is_active = active;
            }
            t.last_modified = Utc::now();
        })
        .ok_or_else(|| ApiError::not_found("Template not found"))?;

    audit::record(&store, &auth, "update", "email_template", Some(id), "Updated template");
    Ok(HttpResponse::Ok().json(template))
}

/// Delete template
#[utoipa::path(
    delete,
    path = "/api/email-templates/{id}",
    params(("id" = u64, Path, description = "Template id")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "success": true,
            "message": "Template deleted"
        })),
        (status = 404, description = "Template not found")
    ),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn delete_template(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    let removed = store
        .email_templates
        .remove(id)
        .ok_or_else(|| ApiError::not_found("Template not found"))?;

    audit::record(
        &store,
        &auth,
        "delete",
        "email_template",
        Some(id),
        format!("Deleted template {}", removed.name),
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Template deleted"
    })))
}

/// Duplicate template
#[utoipa::path(
    post,
    path = "/api/email-templates/{id}/duplicate",
    params(("id" = u64, Path, description = "Template id")),
    responses(
        (status = 200, description = "The copy", body = EmailTemplate),
        (status = 404, description = "Template not found")
    ),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn duplicate_template(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let source = store
        .email_templates
        .find(id.into_inner())
        .ok_or_else(|| ApiError::not_found("Template not found"))?;
    let now = Utc::now();

    let copy = store.email_templates.insert_with(|id| EmailTemplate {
        id,
        name: format!("{} (Copy)", source.name),
        variables: variables_of(&source.subject, &source.body),
        created_by: auth.display_name(),
        created_at: now,
        last_modified: now,
        ..source.clone()
    });

    audit::record(
        &store,
        &auth,
        "duplicate",
        "email_template",
        Some(copy.id),
        format!("Copied template {}", source.id),
    );
    Ok(HttpResponse::Ok().json(copy))
}

/// Preview template
///
/// Substitutes the given variables; placeholders without a value stay as written.
#[utoipa::path(
    post,
    path = "/api/email-templates/{id}/preview",
    params(("id" = u64, Path, description = "Template id")),
    request_body = PreviewReq,
    responses(
        (status = 200, description = "Rendered subject and body", body = PreviewResponse),
        (status = 404, description = "Template not found")
    ),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn preview_template(
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: Option<web::Json<PreviewReq>>,
) -> actix_web::Result<impl Responder> {
    let template = store
        .email_templates
        .find(id.into_inner())
        .ok_or_else(|| ApiError::not_found("Template not found"))?;
    let values = payload.map(|p| p.into_inner().variables).unwrap_or_default();

    Ok(HttpResponse::Ok().json(PreviewResponse {
        subject: render(&template.subject, &values),
        body: render(&template.body, &values),
        original_template: TemplateRef {
            id: template.id,
            name: template.name,
        },
    }))
}

/// Template categories
#[utoipa::path(
    get,
    path = "/api/email-templates/meta/categories",
    responses((status = 200, description = "Category names", body = [String])),
    tag = "Email Template",
    security(("bearer_auth" = []))
)]
pub async fn categories() -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(TEMPLATE_CATEGORIES))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn variables_follow_content_and_copies() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/email-templates"), Role::Admin)
            .set_json(json!({
                "name": "Reminder",
                "subject": "Hi {{name}}",
                "body": "Due {{date}} for {{name}}",
                "category": "Timesheets"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["variables"], json!(["name", "date"]));
        let id = body["id"].as_u64().unwrap();

        let req = authed(
            test::TestRequest::put().uri(&format!("/api/email-templates/{id}")),
            Role::Admin,
        )
        .set_json(json!({ "name": "Reminder", "subject": "{{week}}", "body": "plain" }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["variables"], json!(["week"]));
        assert_eq!(body["category"], "Timesheets");

        let req = authed(
            test::TestRequest::post().uri(&format!("/api/email-templates/{id}/duplicate")),
            Role::Admin,
        )
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Reminder (Copy)");
        assert_ne!(body["id"], id);
        assert_eq!(body["variables"], json!(["week"]));
    }

    #[actix_web::test]
    async fn preview_leaves_unknown_placeholders() {
        let app = init_app!();

        let req = authed(test::TestRequest::get().uri("/api/email-templates?category=Onboarding"), Role::Admin)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        let welcome = &list[0];
        assert_eq!(welcome["name"], "Welcome Email");
        let id = welcome["id"].as_u64().unwrap();

        let req = authed(
            test::TestRequest::post().uri(&format!("/api/email-templates/{id}/preview")),
            Role::Admin,
        )
        .set_json(json!({ "variables": { "firstName": "Ada" } }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["subject"].as_str().unwrap().contains("Ada"));
        assert!(body["body"].as_str().unwrap().contains("{{"));
        assert_eq!(body["originalTemplate"]["id"], id);

        let req = authed(test::TestRequest::get().uri("/api/email-templates/meta/categories"), Role::Admin)
            .to_request();
        let cats: Value = test::call_and_read_body_json(&app, req).await;
        assert!(cats.as_array().unwrap().contains(&json!("Invoicing")));

        let req = authed(test::TestRequest::delete().uri("/api/email-templates/999"), Role::Admin)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
