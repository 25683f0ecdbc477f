use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub async fn index() -> impl Responder {
    "CentraPro HR API"
}

/// Health check
#[utoipa::path(
    get,
    path = "/api/test",
    responses(
        (status = 200, description = "Server is up", body = Object, example = json!({
            "message": "Backend is working!"
        }))
    ),
    tag = "Misc"
)]
pub async fn api_test() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Backend is working!" }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{init_app, peer};
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn health_endpoints_are_public() {
        let app = init_app!();

        let req = test::TestRequest::get().uri("/").peer_addr(peer()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/test").peer_addr(peer()).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Backend is working!");

        let req = test::TestRequest::get().uri("/api/employees").peer_addr(peer()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
