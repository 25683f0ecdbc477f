use std::collections::BTreeMap;

use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::timesheet::{Attachment, Timesheet, TimesheetStatus},
    store::AppStore,
    sync::{SyncList, SyncService},
    utils::{
        audit,
        merge::merge_patch,
        weeks::group_weekly,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimesheet {
    pub user_id: Option<u64>,
    #[schema(example = "2025-12-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 8.0)]
    pub hours: f64,
    #[schema(example = "Spruce")]
    pub project: String,
    #[schema(example = "Development")]
    pub task: String,
    #[schema(example = 65.0)]
    pub hourly_rate: Option<f64>,
    pub status: Option<TimesheetStatus>,
    #[schema(example = "Dec 01, 2025")]
    pub week_start: Option<String>,
    #[schema(example = 1)]
    pub week_number: Option<i64>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Other entry fields such as `notes` and `billable`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TimesheetQuery {
    pub user_id: Option<u64>,
    #[param(value_type = Option<String>, example = "Approved")]
    pub status: Option<TimesheetStatus>,
    pub week_number: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkWeekReq {
    /// Matched as sent; an absent number selects records without one.
    #[schema(example = 1)]
    pub week_number: Option<i64>,
    /// When present, exactly these records are updated instead.
    #[schema(example = json!([1, 2, 3]))]
    pub timesheet_ids: Option<Vec<u64>>,
}

impl BulkWeekReq {
    fn selects(&self, ts: &Timesheet) -> bool {
        match &self.timesheet_ids {
            Some(ids) => ids.contains(&ts.id),
            None => ts.week_number == self.week_number,
        }
    }

    fn describe(&self) -> String {
        match (&self.timesheet_ids, self.week_number) {
            (Some(ids), _) => format!("{} selected record(s)", ids.len()),
            (None, Some(week)) => format!("Week {week}"),
            (None, None) => "Records without a week number".to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
pub struct RejectReq {
    #[schema(example = "Hours exceed the project budget")]
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TimesheetResponse {
    pub success: bool,
    pub timesheet: Timesheet,
}

#[derive(Serialize, ToSchema)]
pub struct BulkResponse {
    pub success: bool,
    pub updated: Vec<Timesheet>,
    #[schema(example = "4 timesheet(s) approved")]
    pub message: String,
}

fn matches(ts: &Timesheet, query: &TimesheetQuery) -> bool {
    query.user_id.is_none_or(|u| ts.user_id == Some(u))
        && query.status.is_none_or(|s| ts.status == s)
        && query.week_number.is_none_or(|w| ts.week_number == Some(w))
}

/// List daily timesheet records
#[utoipa::path(
    get,
    path = "/api/timesheets",
    params(TimesheetQuery),
    responses((status = 200, description = "Matching records", body = [Timesheet])),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn list_timesheets(
    store: web::Data<AppStore>,
    query: web::Query<TimesheetQuery>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(store.timesheets.filter(|t| matches(t, &query))))
}

/// Weekly timesheet rows
///
/// Daily records grouped by project, task and week (Monday start), newest week first.
#[utoipa::path(
    get,
    path = "/api/timesheets/weekly",
    params(TimesheetQuery),
    responses((status = 200, description = "Weekly rows", body = [crate::utils::weeks::WeeklyRow])),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn weekly_rows(
    store: web::Data<AppStore>,
    query: web::Query<TimesheetQuery>,
) -> actix_web::Result<impl Responder> {
    let daily = store.timesheets.filter(|t| matches(t, &query));
    Ok(HttpResponse::Ok().json(group_weekly(&daily)))
}

/// Create a daily record
#[utoipa::path(
    post,
    path = "/api/timesheets",
    request_body = CreateTimesheet,
    responses((status = 200, description = "Record created", body = TimesheetResponse)),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn create_timesheet(
    auth: AuthUser,
    store: web::Data<AppStore>,
    sync: web::Data<SyncService>,
    payload: web::Json<CreateTimesheet>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let timesheet = store.timesheets.insert_with(|id| Timesheet {
        id,
        user_id: payload.user_id.or(Some(auth.user_id)),
        date: payload.date,
        hours: payload.hours,
        project: payload.project,
        task: payload.task,
        hourly_rate: payload.hourly_rate,
        status: payload.status.unwrap_or_default(),
        week_start: payload.week_start,
        week_number: payload.week_number,
        attachments: payload.attachments,
        rejection_reason: None,
        submitted_at: None,
        approved_at: None,
        created_at: Utc::now(),
        extra: payload.extra,
    });

    info!(timesheet_id = timesheet.id, hours = timesheet.hours, "Timesheet created");
    audit::record(
        &store,
        &auth,
        "create",
        "timesheet",
        Some(timesheet.id),
        format!("{}h on {} / {}", timesheet.hours, timesheet.project, timesheet.task),
    );
    sync.push(SyncList::Timesheets, &timesheet);

    Ok(HttpResponse::Ok().json(TimesheetResponse {
        success: true,
        timesheet,
    }))
}

/// Update a daily record
#[utoipa::path(
    put,
    path = "/api/timesheets/{id}",
    params(("id" = u64, Path, description = "Timesheet id")),
    request_body(content = Object, example = json!({ "hours": 6.5 })),
    responses(
        (status = 200, description = "Updated record", body = Timesheet),
        (status = 404, description = "Timesheet not found")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn update_timesheet(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    let timesheet = store
        .timesheets
        .try_update(id, |current| {
            *current = merge_patch(current, &payload)?;
            Ok::<_, ApiError>(())
        })?
        .ok_or_else(|| ApiError::not_found("Timesheet not found"))?;

    audit::record(&store, &auth, "update", "timesheet", Some(id), "Updated timesheet");
    Ok(HttpResponse::Ok().json(timesheet))
}

/// Delete a daily record
///
/// Succeeds whether or not the id exists.
#[utoipa::path(
    delete,
    path = "/api/timesheets/{id}",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses((status = 200, description = "Done", body = Object, example = json!({ "success": true }))),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn delete_timesheet(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    if store.timesheets.remove(id).is_some() {
        audit::record(&store, &auth, "delete", "timesheet", Some(id), "Deleted timesheet");
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

fn set_status(
    store: &AppStore,
    auth: &AuthUser,
    id: u64,
    status: TimesheetStatus,
    reason: Option<String>,
) -> Result<Timesheet, ApiError> {
    let timesheet = store
        .timesheets
        .update(id, |ts| {
            ts.set_status(status);
            if status == TimesheetStatus::Rejected {
                ts.rejection_reason = Some(reason.unwrap_or_default());
            }
        })
        .ok_or_else(|| ApiError::not_found("Timesheet not found"))?;

    info!(timesheet_id = id, %status, "Timesheet status changed");
    audit::record(
        store,
        auth,
        &status.to_string().to_lowercase(),
        "timesheet",
        Some(id),
        format!("Status set to {status}"),
    );
    Ok(timesheet)
}

/// Submit a record
#[utoipa::path(
    post,
    path = "/api/timesheets/{id}/submit",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Record with status Submitted", body = Timesheet),
        (status = 404, description = "Timesheet not found")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn submit_timesheet(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let ts = set_status(&store, &auth, id.into_inner(), TimesheetStatus::Submitted, None)?;
    Ok(HttpResponse::Ok().json(ts))
}

/// Approve a record
#[utoipa::path(
    post,
    path = "/api/timesheets/{id}/approve",
    params(("id" = u64, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Record with status Approved", body = Timesheet),
        (status = 404, description = "Timesheet not found")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn approve_timesheet(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let ts = set_status(&store, &auth, id.into_inner(), TimesheetStatus::Approved, None)?;
    Ok(HttpResponse::Ok().json(ts))
}

/// Reject a record
#[utoipa::path(
    post,
    path = "/api/timesheets/{id}/reject",
    params(("id" = u64, Path, description = "Timesheet id")),
    request_body = RejectReq,
    responses(
        (status = 200, description = "Record with status Rejected", body = Timesheet),
        (status = 404, description = "Timesheet not found")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn reject_timesheet(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: Option<web::Json<RejectReq>>,
) -> actix_web::Result<impl Responder> {
    let reason = payload.and_then(|p| p.into_inner().reason);
    let ts = set_status(&store, &auth, id.into_inner(), TimesheetStatus::Rejected, reason)?;
    Ok(HttpResponse::Ok().json(ts))
}

/// Overwrites the status of every selected record. Last write wins.
fn bulk_set(
    store: &AppStore,
    auth: &AuthUser,
    req: &BulkWeekReq,
    status: TimesheetStatus,
    verb: &str,
) -> BulkResponse {
    let updated = store
        .timesheets
        .update_where(|t| req.selects(t), |t| t.set_status(status));

    info!(week_number = ?req.week_number, count = updated.len(), %status, "Bulk timesheet update");
    audit::record(
        store,
        auth,
        &format!("bulk_{verb}"),
        "timesheet",
        None,
        format!("{}: {} record(s)", req.describe(), updated.len()),
    );

    BulkResponse {
        success: true,
        message: format!("{} timesheet(s) {verb}", updated.len()),
        updated,
    }
}

/// Submit every record in a week
#[utoipa::path(
    post,
    path = "/api/timesheets/bulk-submit",
    request_body = BulkWeekReq,
    responses((status = 200, description = "Updated records", body = BulkResponse)),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn bulk_submit(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<BulkWeekReq>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(bulk_set(
        &store,
        &auth,
        &payload,
        TimesheetStatus::Submitted,
        "submitted",
    )))
}

/// Approve every record in a week
#[utoipa::path(
    post,
    path = "/api/timesheets/bulk-approve",
    request_body = BulkWeekReq,
    responses((status = 200, description = "Updated records", body = BulkResponse)),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn bulk_approve(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<BulkWeekReq>,
) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(bulk_set(
        &store,
        &auth,
        &payload,
        TimesheetStatus::Approved,
        "approved",
    )))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::store::AppStore;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test, web};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn bulk_approve_overwrites_every_status_in_the_week() {
        let store = web::Data::new(AppStore::new());
        let app = init_app!(store.clone());

        for (date, status) in [
            ("2025-12-01", "Pending"),
            ("2025-12-02", "Rejected"),
            ("2025-12-03", "Approved"),
        ] {
            let req = authed(test::TestRequest::post().uri("/api/timesheets"), Role::Employee)
                .set_json(json!({
                    "date": date, "hours": 8, "project": "Spruce", "task": "Development",
                    "status": status, "weekNumber": 7
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let req = authed(test::TestRequest::post().uri("/api/timesheets"), Role::Employee)
            .set_json(json!({
                "date": "2025-12-10", "hours": 8, "project": "Pine", "task": "Testing",
                "weekNumber": 8
            }))
            .to_request();
        test::call_service(&app, req).await;

        let req = authed(test::TestRequest::post().uri("/api/timesheets/bulk-approve"), Role::Manager)
            .set_json(json!({ "weekNumber": 7 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "3 timesheet(s) approved");

        let week7 = store.timesheets.filter(|t| t.week_number == Some(7));
        assert_eq!(week7.len(), 3);
        assert!(week7.iter().all(|t| t.status.to_string() == "Approved"));
        let week8 = store.timesheets.filter(|t| t.week_number == Some(8));
        assert_eq!(week8[0].status.to_string(), "Pending");
    }

    #[actix_web::test]
    async fn grid_entries_keep_extra_fields_and_bulk_submit_by_ids() {
        let store = web::Data::new(AppStore::new());
        let app = init_app!(store.clone());

        let entry = json!({
            "userId": 3,
            "date": "2026-03-02",
            "hours": 7.5,
            "notes": "",
            "project": "Spruce",
            "task": "Development",
            "billable": true,
            "hourlyRate": 62.5,
            "attachments": [],
            "weekStart": "2026-03-02"
        });
        for _ in 0..2 {
            let req = authed(test::TestRequest::post().uri("/api/timesheets"), Role::Employee)
                .set_json(entry.clone())
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["timesheet"]["billable"], true);
            assert_eq!(body["timesheet"]["notes"], "");
        }

        let req = authed(test::TestRequest::post().uri("/api/timesheets/bulk-submit"), Role::Employee)
            .set_json(json!({ "timesheetIds": [1] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "1 timesheet(s) submitted");
        assert_eq!(store.timesheets.find(1).unwrap().status.to_string(), "Submitted");
        assert_eq!(store.timesheets.find(2).unwrap().status.to_string(), "Pending");

        // no ids and no week number: every record without a week number
        let req = authed(test::TestRequest::post().uri("/api/timesheets/bulk-submit"), Role::Employee)
            .set_json(json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "2 timesheet(s) submitted");
        assert!(store.timesheets.all().iter().all(|t| t.status.to_string() == "Submitted"));

        let req = authed(test::TestRequest::get().uri("/api/timesheets"), Role::Employee)
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        for (key, value) in entry.as_object().unwrap() {
            assert_eq!(&list[0][key], value, "field {key}");
        }
    }

    #[actix_web::test]
    async fn reject_records_reason_and_missing_ids_404() {
        let app = init_app!(web::Data::new(AppStore::with_demo_data()));

        let req = authed(test::TestRequest::post().uri("/api/timesheets/1/reject"), Role::Manager)
            .set_json(json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "Rejected");
        assert_eq!(body["rejectionReason"], "");

        let req = authed(test::TestRequest::post().uri("/api/timesheets/99/submit"), Role::Manager)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = authed(test::TestRequest::delete().uri("/api/timesheets/99"), Role::Manager)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
    }

    #[actix_web::test]
    async fn weekly_view_groups_demo_rows() {
        let app = init_app!(web::Data::new(AppStore::with_demo_data()));

        let req = authed(test::TestRequest::get().uri("/api/timesheets/weekly"), Role::Employee)
            .to_request();
        let rows: Value = test::call_and_read_body_json(&app, req).await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["weekStart"], "2025-12-22");
        assert_eq!(rows[3]["status"], "Pending");
        assert_eq!(rows[3]["totalAmount"], 2600.0);
        assert_eq!(rows[3]["attachments"].as_array().unwrap().len(), 2);
    }
}
