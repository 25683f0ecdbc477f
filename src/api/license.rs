use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::license::{BillingEntry, License, plan_catalogue},
    store::AppStore,
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSeatsReq {
    #[schema(example = 5)]
    pub additional_seats: i64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub success: bool,
    pub purchase_amount: f64,
    pub license: License,
}

#[derive(Serialize, ToSchema)]
pub struct UsageMetric {
    pub used: f64,
    pub limit: f64,
    /// Whole percent of the limit in use.
    pub percentage: u32,
}

impl UsageMetric {
    fn new(used: f64, limit: f64) -> Self {
        let percentage = if limit > 0.0 {
            (used / limit * 100.0).round() as u32
        } else {
            0
        };
        Self {
            used,
            limit,
            percentage,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub employees: UsageMetric,
    pub storage: UsageMetric,
    pub api_calls: UsageMetric,
    pub seats: UsageMetric,
}

/// The license with seat counts taken from the current employee list.
fn current_license(store: &AppStore) -> License {
    let used = store.employees.len() as u64;
    let mut license = store.license.write();
    license.refresh_seats(used);
    license.clone()
}

/// Tenant license
#[utoipa::path(
    get,
    path = "/api/license",
    responses((status = 200, description = "Current license", body = License)),
    tag = "License",
    security(("bearer_auth" = []))
)]
pub async fn get_license(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(current_license(&store)))
}

/// License usage against limits
#[utoipa::path(
    get,
    path = "/api/license/usage",
    responses((status = 200, description = "Usage per metric", body = UsageReport)),
    tag = "License",
    security(("bearer_auth" = []))
)]
pub async fn usage(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    let license = current_license(&store);

    Ok(HttpResponse::Ok().json(UsageReport {
        employees: UsageMetric::new(
            license.usage.employees as f64,
            license.limits.max_employees as f64,
        ),
        storage: UsageMetric::new(license.usage.storage_gb, license.limits.max_storage_gb),
        api_calls: UsageMetric::new(
            license.usage.api_calls_today as f64,
            license.limits.max_api_calls_per_day as f64,
        ),
        seats: UsageMetric::new(license.used_seats as f64, license.total_seats as f64),
    }))
}

/// Available plans
#[utoipa::path(
    get,
    path = "/api/license-plans",
    responses((status = 200, description = "Plan catalogue", body = [crate::model::license::LicensePlan])),
    tag = "License",
    security(("bearer_auth" = []))
)]
pub async fn plans() -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(plan_catalogue()))
}

/// Buy more seats
///
/// No payment is taken; the purchase is appended to the billing history.
#[utoipa::path(
    post,
    path = "/api/license/purchase-seats",
    request_body = PurchaseSeatsReq,
    responses(
        (status = 200, description = "Seats added", body = PurchaseResponse),
        (status = 400, description = "Seat count must be positive")
    ),
    tag = "License",
    security(("bearer_auth" = []))
)]
pub async fn purchase_seats(
    auth: AuthUser,
    store: web::Data<AppStore>,
    payload: web::Json<PurchaseSeatsReq>,
) -> actix_web::Result<impl Responder> {
    let seats = u64::try_from(payload.additional_seats)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| ApiError::bad_request("Invalid number of seats"))?;

    let used = store.employees.len() as u64;
    let (purchase_amount, license) = {
        let mut license = store.license.write();
        let amount = seats as f64 * license.price_per_seat;
        license.total_seats += seats;
        license.refresh_seats(used);

        let entry_id = license.billing_history.len() as u64 + 1;
        let today = Utc::now().date_naive();
        license.billing_history.push(BillingEntry {
            id: entry_id,
            date: today,
            amount,
            status: "paid".to_string(),
            invoice_number: format!("LIC-{}-{entry_id:03}", today.format("%Y%m%d")),
        });
        (amount, license.clone())
    };

    info!(seats, total_seats = license.total_seats, "License seats purchased");
    audit::record(
        &store,
        &auth,
        "purchase",
        "license",
        Some(license.id),
        format!("Added {seats} seat(s)"),
    );

    Ok(HttpResponse::Ok().json(PurchaseResponse {
        success: true,
        purchase_amount,
        license,
    }))
}

#[cfg(test)]
mod tests {
    use crate::model::role::Role;
    use crate::test_support::{authed, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn seats_follow_employees_and_purchases() {
        let app = init_app!();

        for name in ["A", "B"] {
            let req = authed(test::TestRequest::post().uri("/api/employees"), Role::Admin)
                .set_json(json!({ "name": name, "email": "x@example.com" }))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = authed(test::TestRequest::get().uri("/api/license"), Role::Admin).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["usedSeats"], 2);
        assert_eq!(body["availableSeats"], 48);

        let req = authed(test::TestRequest::post().uri("/api/license/purchase-seats"), Role::Admin)
            .set_json(json!({ "additionalSeats": 5 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["purchaseAmount"], 60.0);
        assert_eq!(body["license"]["totalSeats"], 55);
        assert_eq!(body["license"]["billingHistory"].as_array().unwrap().len(), 2);

        let req = authed(test::TestRequest::post().uri("/api/license/purchase-seats"), Role::Admin)
            .set_json(json!({ "additionalSeats": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = authed(test::TestRequest::get().uri("/api/license/usage"), Role::Admin)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["seats"]["used"], 2.0);
        assert_eq!(body["seats"]["percentage"], 4);
        assert_eq!(body["employees"]["percentage"], 2);

        let req = authed(test::TestRequest::get().uri("/api/license-plans"), Role::Employee)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }
}
