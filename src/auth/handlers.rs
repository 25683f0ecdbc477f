use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
        sessions::SessionStore,
    },
    config::Config,
    error::ApiError,
    model::role::Role,
    models::{Claims, LoginReqDto, TokenType},
    store::AppStore,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginUser {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "admin@example.com")]
    pub email: String,
    #[schema(example = "admin")]
    pub name: String,
    #[schema(example = "admin")]
    pub role: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: LoginUser,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReqDto {
    pub refresh_token: Option<String>,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Refresh token from the JSON body, falling back to the Authorization header.
fn refresh_token_from(req: &HttpRequest, body: Option<web::Json<RefreshReqDto>>) -> Option<String> {
    body.and_then(|b| b.into_inner().refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer(req).map(str::to_string))
}

async fn issue_tokens(
    user_id: u64,
    email: &str,
    role: Role,
    config: &Config,
    sessions: &SessionStore,
) -> Result<(String, String), ApiError> {
    let access_token = generate_access_token(
        user_id,
        email.to_string(),
        role.id(),
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        ApiError::internal("Failed to issue token")
    })?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        email.to_string(),
        role.id(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign refresh token");
        ApiError::internal("Failed to issue token")
    })?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh session");
    sessions.open(&refresh_claims.jti, user_id).await;

    Ok((access_token, refresh_token))
}

/// Login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "error": "Invalid credentials"
        }))
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, sessions, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<AppStore>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::bad_request("Email and password are required").into());
    }

    let email = user.email.trim().to_lowercase();
    let Some(account) = store.users.find_by(|u| u.email == email) else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthorized("Invalid credentials".into()).into());
    };

    if let Err(e) = verify_password(&user.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()).into());
    }

    let role = Role::from_name(&account.role);
    let (token, refresh_token) =
        issue_tokens(account.id, &account.email, role, &config, &sessions).await?;

    info!(user_id = account.id, role = role.as_str(), "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        refresh_token,
        user: LoginUser {
            id: account.id,
            email: account.email,
            name: account.name,
            role: account.role,
        },
    }))
}

/// Rotate refresh token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshReqDto,
    responses(
        (status = 200, description = "New token pair", body = RefreshResponse),
        (status = 401, description = "Unknown, revoked or expired refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    body: Option<web::Json<RefreshReqDto>>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> actix_web::Result<impl Responder> {
    let token = refresh_token_from(&req, body)
        .ok_or_else(|| ApiError::Unauthorized("No token".into()))?;

    let claims: Claims = verify_token(&token, &config.jwt_secret)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {e}")))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Refresh token required".into()).into());
    }

    let session = sessions
        .active(&claims.jti)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Session expired or revoked".into()))?;

    sessions.revoke(&claims.jti).await;

    let role = Role::from_id(claims.role).unwrap_or(Role::Employee);
    let (token, refresh_token) =
        issue_tokens(session.user_id, &claims.sub, role, &config, &sessions).await?;

    debug!(user_id = session.user_id, "Refresh token rotated");

    Ok(HttpResponse::Ok().json(RefreshResponse {
        token,
        refresh_token,
    }))
}

/// Logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = RefreshReqDto,
    responses(
        (status = 204, description = "Session revoked (also returned for unknown tokens)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<RefreshReqDto>>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> impl Responder {
    let Some(token) = refresh_token_from(&req, body) else {
        return HttpResponse::NoContent().finish();
    };

    // Only refresh tokens carry a session; anything else is a no-op.
    if let Ok(claims) = verify_token(&token, &config.jwt_secret) {
        if claims.token_type == TokenType::Refresh {
            sessions.revoke(&claims.jti).await;
            debug!(user_id = claims.user_id, "Refresh session revoked");
        }
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use crate::test_support::{init_app, json_request};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn login_refresh_and_logout() {
        let app = init_app!();

        let req = json_request(
            test::TestRequest::post().uri("/api/auth/login"),
            json!({ "email": "manager@example.com", "password": "manager123" }),
        );
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["role"], "manager");
        assert_eq!(body["user"]["name"], "manager");
        let refresh = body["refreshToken"].as_str().unwrap().to_string();

        let req = json_request(
            test::TestRequest::post().uri("/api/auth/refresh"),
            json!({ "refreshToken": refresh }),
        );
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let rotated: Value = test::read_body_json(resp).await;
        let next = rotated["refreshToken"].as_str().unwrap().to_string();

        // The old refresh token was revoked by the rotation.
        let req = json_request(
            test::TestRequest::post().uri("/api/auth/refresh"),
            json!({ "refreshToken": refresh }),
        );
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = json_request(
            test::TestRequest::post().uri("/api/auth/logout"),
            json!({ "refreshToken": next }),
        );
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let app = init_app!();

        let req = json_request(
            test::TestRequest::post().uri("/api/auth/login"),
            json!({ "email": "admin@example.com", "password": "nope" }),
        );
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid credentials");
    }
}
