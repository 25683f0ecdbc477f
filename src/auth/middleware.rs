use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v,
            Err(_) => {
                return Ok(reject(req, "Invalid Authorization header encoding"));
            }
        },
        None => return Ok(reject(req, "Missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Ok(reject(req, "Authorization header must start with Bearer")),
    };

    let auth_user = match AuthUser::from_token(token, &config.jwt_secret) {
        Ok(user) => user,
        Err(e) => {
            debug!(error = %e, path = req.path(), "Rejected bearer token");
            let message = e.to_string();
            return Ok(reject(req, &message));
        }
    };

    let ip = req.connection_info().realip_remote_addr().map(str::to_string);
    req.extensions_mut().insert(auth_user.with_ip(ip.as_deref()));

    next.call(req).await
}

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({ "error": message }));
    req.into_response(resp.map_into_boxed_body())
}
