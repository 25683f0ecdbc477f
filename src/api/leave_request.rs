use std::collections::BTreeMap;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::leave_request::{LeaveRequest, LeaveStatus, inclusive_days},
    store::AppStore,
    sync::{SyncList, SyncService},
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Yearly allowance used by the balance endpoint.
const LEAVE_ALLOWANCE: i64 = 10;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeave {
    pub user_id: Option<u64>,
    pub user_name: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Vacation")]
    pub leave_type: String,
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    /// Filter by requesting user
    pub user_id: Option<u64>,
    /// Filter by leave status
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<LeaveStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveStatusReq {
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveResponse {
    pub success: bool,
    pub leave: LeaveRequest,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub user_id: u64,
    #[schema(example = 10)]
    pub total: i64,
    pub used: i64,
    pub balance: i64,
}

/// Submit a leave request
///
/// Dates are stored as given; `days` counts both ends.
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted", body = LeaveResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let leave = store.leave_requests.insert_with(|id| LeaveRequest {
        id,
        user_id: payload.user_id.or(Some(auth.user_id)),
        user_name: payload.user_name.or_else(|| Some(auth.display_name())),
        days: inclusive_days(payload.start_date, payload.end_date),
        start_date: payload.start_date,
        end_date: payload.end_date,
        leave_type: payload.leave_type,
        reason: payload.reason,
        status: LeaveStatus::Pending,
        comment: None,
        approved_by: None,
        approved_at: None,
        created_at: Utc::now(),
        extra: payload.extra,
    });

    info!(leave_id = leave.id, days = leave.days, "Leave request submitted");
    audit::record(
        &store,
        &auth,
        "create",
        "leave",
        Some(leave.id),
        format!("{} day(s) of {}", leave.days, leave.leave_type),
    );
    sync.push(SyncList::LeaveRequests, &leave);

    Ok(HttpResponse::Ok().json(LeaveResponse {
        success: true,
        leave,
    }))
}

/// Set the status of a leave request
///
/// Any status may be written over any other.
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/status",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    request_body = LeaveStatusReq,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn update_leave_status(
    auth: AuthUser,
    store: web::Data<AppStore>,
    path: web::Path<u64>,
    payload: web::Json<LeaveStatusReq>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();
    let LeaveStatusReq { status, comment } = payload.into_inner();

    let leave = store
        .leave_requests
        .update(leave_id, |leave| {
            leave.status = status;
            if comment.is_some() {
                leave.comment = comment;
            }
            if status != LeaveStatus::Pending {
                leave.approved_by = Some(auth.user_id);
                leave.approved_at = Some(Utc::now());
            }
        })
        .ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    info!(leave_id, %status, "Leave status changed");
    audit::record(
        &store,
        &auth,
        &status.to_string(),
        "leave",
        Some(leave_id),
        format!("Leave set to {status}"),
    );

    Ok(HttpResponse::Ok().json(leave))
}

/// Get a leave request
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    store: web::Data<AppStore>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = store
        .leave_requests
        .find(path.into_inner())
        .ok_or_else(|| ApiError::not_found("Leave request not found"))?;
    Ok(HttpResponse::Ok().json(leave))
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Matching leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    store: web::Data<AppStore>,
    filter: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let leaves = store.leave_requests.filter(|l| {
        filter.user_id.is_none_or(|u| l.user_id == Some(u))
            && filter.status.is_none_or(|s| l.status == s)
    });
    Ok(HttpResponse::Ok().json(leaves))
}

/// Leave balance for a user
///
/// Each approved request counts once against the allowance, whatever its length.
#[utoipa::path(
    get,
    path = "/api/leave/balance/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Balance", body = LeaveBalance)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_balance(
    store: web::Data<AppStore>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let used = store
        .leave_requests
        .filter(|l| l.user_id == Some(user_id) && l.status == LeaveStatus::Approved)
        .len() as i64;

    Ok(HttpResponse::Ok().json(LeaveBalance {
        user_id,
        total: LEAVE_ALLOWANCE,
        used,
        balance: LEAVE_ALLOWANCE - used,
    }))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn reversed_dates_are_accepted_and_counted() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/leave"), Role::Employee)
            .set_json(json!({
                "startDate": "2026-01-03",
                "endDate": "2026-01-01",
                "leaveType": "Vacation",
                "halfDay": false,
                "contactNumber": "555-0100"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["leave"]["days"], 3);
        assert_eq!(body["leave"]["status"], "pending");
        assert_eq!(body["leave"]["userId"], 3);
        assert_eq!(body["leave"]["halfDay"], false);
        assert_eq!(body["leave"]["contactNumber"], "555-0100");
    }

    #[actix_web::test]
    async fn approval_moves_balance_through_either_alias() {
        let app = init_app!();

        let req = authed(test::TestRequest::post().uri("/api/leave-requests"), Role::Employee)
            .set_json(json!({
                "userId": 7,
                "startDate": "2026-02-02",
                "endDate": "2026-02-06",
                "leaveType": "Sick"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["leave"]["id"].as_u64().unwrap();

        let req = authed(
            test::TestRequest::put().uri(&format!("/api/leave/{id}/status")),
            Role::Manager,
        )
        .set_json(json!({ "status": "approved", "comment": "Get well" }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "approved");
        assert_eq!(body["approvedBy"], 2);
        assert_eq!(body["comment"], "Get well");

        let req = authed(test::TestRequest::get().uri("/api/leave/balance/7"), Role::Employee)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "userId": 7, "total": 10, "used": 1, "balance": 9 }));

        let req = authed(test::TestRequest::get().uri("/api/leave?status=approved"), Role::Admin)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let req = authed(test::TestRequest::get().uri("/api/leave/42"), Role::Admin).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
