use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::approval::{Approval, ApprovalComment, ApprovalStatus},
    store::AppStore,
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApprovalQuery {
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<ApprovalStatus>,
    /// Approval type, e.g. `timesheet`
    #[serde(rename = "type")]
    pub approval_type: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApproval {
    #[serde(rename = "type")]
    #[schema(example = "timesheet")]
    pub approval_type: String,
    #[schema(example = 1)]
    pub reference_id: u64,
    pub title: Option<String>,
    pub requested_by: Option<String>,
    #[serde(default)]
    pub approvers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn status(self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct DecideReq {
    pub decision: Decision,
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStats {
    pub pending: usize,
    pub approved_today: usize,
    /// Mean hours from creation to decision over all decided approvals.
    pub avg_decision_hours: f64,
}

/// List approvals
#[utoipa::path(
    get,
    path = "/api/approvals",
    params(ApprovalQuery),
    responses((status = 200, description = "Matching approvals", body = [Approval])),
    tag = "Approval",
    security(("bearer_auth" = []))
)]
pub async fn list_approvals(
    store: web::Data<AppStore>,
    query: web::Query<ApprovalQuery>,
) -> actix_web::Result<impl Responder> {
    let approvals = store.approvals.filter(|a| {
        query.status.is_none_or(|s| a.status == s)
            && query
                .approval_type
                .as_deref()
                .is_none_or(|t| a.approval_type.eq_ignore_ascii_case(t))
    });
    Ok(HttpResponse::Ok().json(approvals))
}

/// Open an approval
#[utoipa::path(
    post,
    path = "/api/approvals",
    request_body = CreateApproval,
    responses((status = 200, description = "Pending approval", body = Approval)),
    tag = "Approval",
    security(("bearer_auth" = []))
)]
pub async fn create_approval(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<CreateApproval>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();

    let approval = store.approvals.insert_with(|id| Approval {
        id,
        approval_type: req.approval_type,
        reference_id: req.reference_id,
        title: req.title,
        requested_by: req.requested_by.or_else(|| Some(auth.display_name())),
        status: ApprovalStatus::Pending,
        approvers: req.approvers,
        comments: Vec::new(),
        created_at: Utc::now(),
        decided_by: None,
        decided_at: None,
    });

    audit::record(
        &store,
        &auth,
        "create",
        "approval",
        Some(approval.id),
        format!("{} #{}", approval.approval_type, approval.reference_id),
    );
    Ok(HttpResponse::Ok().json(approval))
}

/// Approve or reject
///
/// Managers and admins only. A decided approval can be decided again.
#[utoipa::path(
    post,
    path = "/api/approvals/{id}/decide",
    params(("id" = u64, Path, description = "Approval id")),
    request_body = DecideReq,
    responses(
        (status = 200, description = "Decided approval", body = Approval),
        (status = 403, description = "Manager/Admin only"),
        (status = 404, description = "Approval not found")
    ),
    tag = "Approval",
    security(("bearer_auth" = []))
)]
pub async fn decide(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<DecideReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let id = id.into_inner();
    let DecideReq { decision, comment } = payload.into_inner();
    let now = Utc::now();

    let approval = store
        .approvals
        .update(id, |approval| {
            approval.status = decision.status();
            approval.decided_by = Some(auth.user_id);
            approval.decided_at = Some(now);
            if let Some(comment) = comment.filter(|c| !c.trim().is_empty()) {
                approval.comments.push(ApprovalComment {
                    user_id: auth.user_id,
                    user_name: auth.display_name(),
                    comment,
                    created_at: now,
                });
            }
        })
        .ok_or_else(|| ApiError::not_found("Approval not found"))?;

    info!(approval_id = id, %decision, "Approval decided");
    audit::record(
        &store,
        &auth,
        &decision.to_string(),
        "approval",
        Some(id),
        format!("{} #{}", approval.approval_type, approval.reference_id),
    );
    Ok(HttpResponse::Ok().json(approval))
}

/// Approval statistics
#[utoipa::path(
    get,
    path = "/api/approvals/stats",
    responses((status = 200, description = "Counters", body = ApprovalStats)),
    tag = "Approval",
    security(("bearer_auth" = []))
)]
pub async fn approval_stats(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    let approvals = store.approvals.all();
    let today = Utc::now().date_naive();

    let pending = approvals
        .iter()
        .filter(|a| a.status == ApprovalStatus::Pending)
        .count();
    let approved_today = approvals
        .iter()
        .filter(|a| a.status == ApprovalStatus::Approved)
        .filter(|a| a.decided_at.is_some_and(|d| d.date_naive() == today))
        .count();

    let waits: Vec<Duration> = approvals
        .iter()
        .filter_map(|a| a.decided_at.map(|d| d - a.created_at))
        .collect();
    let avg_decision_hours = if waits.is_empty() {
        0.0
    } else {
        let total_secs: i64 = waits.iter().map(Duration::num_seconds).sum();
        let hours = total_secs as f64 / waits.len() as f64 / 3600.0;
        (hours * 10.0).round() / 10.0
    };

    Ok(HttpResponse::Ok().json(ApprovalStats {
        pending,
        approved_today,
        avg_decision_hours,
    }))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn only_managers_decide_and_comments_accumulate() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/approvals"), Role::Employee)
            .set_json(json!({ "type": "leave", "referenceId": 4, "title": "Vacation" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "pending");
        let id = body["id"].as_u64().unwrap();
        let decide_uri = format!("/api/approvals/{id}/decide");

        let req = authed(test::TestRequest::post().uri(&decide_uri), Role::Employee)
            .set_json(json!({ "decision": "approve" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = authed(test::TestRequest::post().uri(&decide_uri), Role::Manager)
            .set_json(json!({ "decision": "reject", "comment": "Overlaps release" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["comments"][0]["userName"], "manager");

        // re-deciding is allowed
        let req = authed(test::TestRequest::post().uri(&decide_uri), Role::Admin)
            .set_json(json!({ "decision": "approve", "comment": "  " }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "approved");
        assert_eq!(body["decidedBy"], 1);
        assert_eq!(body["comments"].as_array().unwrap().len(), 1);

        let req = authed(test::TestRequest::get().uri("/api/approvals/stats"), Role::Admin)
            .to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["pending"], 0);
        assert_eq!(stats["approvedToday"], 1);

        let req = authed(test::TestRequest::get().uri("/api/approvals?type=leave&status=approved"), Role::Admin)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }
}
