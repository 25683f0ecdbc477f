use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::onboarding::{OnboardingDocument, OnboardingRecord, OnboardingStatus},
    store::AppStore,
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteReq {
    #[serde(default)]
    #[schema(example = "new.hire@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "Jane")]
    pub first_name: String,
    #[serde(default)]
    #[schema(example = "Doe")]
    pub last_name: String,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub manager_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct DocumentReq {
    #[schema(example = "passport.pdf")]
    pub name: String,
    #[serde(rename = "type", default)]
    #[schema(example = "identity")]
    pub doc_type: String,
    pub path: Option<String>,
    /// Base64 payload
    pub data: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompleteReq {
    #[schema(value_type = Option<Object>)]
    pub profile_data: Option<Value>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub success: bool,
    pub onboarding: OnboardingRecord,
    #[schema(example = "/onboarding/3f1c...")]
    pub invite_link: String,
}

/// List onboarding records
#[utoipa::path(
    get,
    path = "/api/onboarding",
    responses((status = 200, description = "All invitations", body = [OnboardingRecord])),
    tag = "Onboarding",
    security(("bearer_auth" = []))
)]
pub async fn list_onboarding(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(store.onboarding.all()))
}

/// Get onboarding record
#[utoipa::path(
    get,
    path = "/api/onboarding/{id}",
    params(("id" = u64, Path, description = "Onboarding id")),
    responses(
        (status = 200, description = "Record", body = OnboardingRecord),
        (status = 404, description = "Onboarding record not found")
    ),
    tag = "Onboarding",
    security(("bearer_auth" = []))
)]
pub async fn get_onboarding(
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record = store
        .onboarding
        .find(id.into_inner())
        .ok_or_else(|| ApiError::not_found("Onboarding record not found"))?;
    Ok(HttpResponse::Ok().json(record))
}

/// Look up an invitation by token
///
/// Tokens do not expire.
#[utoipa::path(
    get,
    path = "/api/onboarding/token/{token}",
    params(("token" = String, Path, description = "Invite token")),
    responses(
        (status = 200, description = "Record", body = OnboardingRecord),
        (status = 404, description = "Invalid invite token")
    ),
    tag = "Onboarding",
    security(("bearer_auth" = []))
)]
pub async fn by_token(
    store: web::Data<AppStore>,
    token: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let token = token.into_inner();
    let record = store
        .onboarding
        .find_by(|r| r.invite_token == token)
        .ok_or_else(|| ApiError::not_found("Invalid invite token"))?;
    Ok(HttpResponse::Ok().json(record))
}

/// Invite a new hire
#[utoipa::path(
    post,
    path = "/api/onboarding/invite",
    request_body = InviteReq,
    responses(
        (status = 200, description = "Invitation created", body = InviteResponse),
        (status = 400, description = "Missing fields", body = Object, example = json!({
            "error": "Email, first name and last name are required"
        }))
    ),
    tag = "Onboarding",
    security(("bearer_auth" = []))
)]
pub async fn invite(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<InviteReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    if [&req.email, &req.first_name, &req.last_name]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::bad_request("Email, first name and last name are required").into());
    }

    let record = store.onboarding.insert_with(|id| OnboardingRecord {
        id,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        designation: req.designation,
        department: req.department,
        manager_id: req.manager_id,
        invite_token: Uuid::new_v4().to_string(),
        status: OnboardingStatus::Invited,
        invited_at: Utc::now(),
        completed_at: None,
        documents: Vec::new(),
        profile_data: None,
    });

    info!(onboarding_id = record.id, "Onboarding invitation created");
    audit::record(
        &store,
        &auth,
        "invite",
        "onboarding",
        Some(record.id),
        format!("Invited {}", record.email),
    );

    Ok(HttpResponse::Ok().json(InviteResponse {
        success: true,
        invite_link: format!("/onboarding/{}", record.invite_token),
        onboarding: record,
    }))
}

/// Upload an onboarding document
///
/// The first document moves an invitation to `in-progress`.
#[utoipa::path(
    post,
    path = "/api/onboarding/{id}/documents",
    params(("id" = u64, Path, description = "Onboarding id")),
    request_body = DocumentReq,
    responses(
        (status = 200, description = "Updated record", body = OnboardingRecord),
        (status = 404, description = "Onboarding record not found")
    ),
    tag = "Onboarding",
    security(("bearer_auth" = []))
)]
pub async fn add_document(
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<DocumentReq>,
) -> actix_web::Result<impl Responder> {
    let doc = payload.into_inner();

    let record = store
        .onboarding
        .update(id.into_inner(), |record| {
            let doc_id = record.documents.iter().map(|d| d.id).max().unwrap_or(0) + 1;
            record.documents.push(OnboardingDocument {
                id: doc_id,
                name: doc.name,
                doc_type: doc.doc_type,
                path: doc.path,
                data: doc.data,
                uploaded_at: Utc::now(),
            });
            if record.status == OnboardingStatus::Invited {
                record.status = OnboardingStatus::InProgress;
            }
        })
        .ok_or_else(|| ApiError::not_found("Onboarding record not found"))?;

    Ok(HttpResponse::Ok().json(record))
}

/// Complete onboarding
#[utoipa::path(
    post,
    path = "/api/onboarding/{id}/complete",
    params(("id" = u64, Path, description = "Onboarding id")),
    request_body = CompleteReq,
    responses(
        (status = 200, description = "Completed record", body = OnboardingRecord),
        (status = 404, description = "Onboarding record not found")
    ),
    tag = "Onboarding",
    security(("bearer_auth" = []))
)]
pub async fn complete(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: Option<web::Json<CompleteReq>>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    let profile_data = payload.and_then(|p| p.into_inner().profile_data);

    let record = store
        .onboarding
        .update(id, |record| {
            record.status = OnboardingStatus::Completed;
            record.completed_at = Some(Utc::now());
            if profile_data.is_some() {
                record.profile_data = profile_data;
            }
        })
        .ok_or_else(|| ApiError::not_found("Onboarding record not found"))?;

    audit::record(&store, &auth, "complete", "onboarding", Some(id), "Onboarding completed");
    Ok(HttpResponse::Ok().json(record))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn invite_requires_names() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/onboarding/invite"), Role::Manager)
            .set_json(json!({ "email": "x@example.com", "firstName": "X" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn invitation_moves_through_its_states() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/onboarding/invite"), Role::Manager)
            .set_json(json!({
                "email": "jane@example.com",
                "firstName": "Jane",
                "lastName": "Doe",
                "department": "Finance"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let record = &body["onboarding"];
        assert_eq!(record["status"], "invited");
        let id = record["id"].as_u64().unwrap();
        let token = record["inviteToken"].as_str().unwrap().to_string();
        assert_eq!(token.len(), 36);

        let req = authed(
            test::TestRequest::get().uri(&format!("/api/onboarding/token/{token}")),
            Role::Employee,
        )
        .to_request();
        let found: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(found["id"], id);

        let req = authed(
            test::TestRequest::post().uri(&format!("/api/onboarding/{id}/documents")),
            Role::Employee,
        )
        .set_json(json!({ "name": "passport.pdf", "type": "identity", "data": "AAAA" }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "in-progress");
        assert_eq!(body["documents"][0]["type"], "identity");

        let req = authed(
            test::TestRequest::post().uri(&format!("/api/onboarding/{id}/complete")),
            Role::Employee,
        )
        .set_json(json!({ "profileData": { "phone": "555-0100" } }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["profileData"]["phone"], "555-0100");
        assert!(body["completedAt"].is_string());

        let req = authed(test::TestRequest::get().uri("/api/onboarding/token/nope"), Role::Employee)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
