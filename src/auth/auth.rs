use crate::config::Config;
use crate::{auth::jwt::verify_token, error::ApiError, model::role::Role, models::TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: u64,
    /// Login email.
    pub username: String,
    pub role: Role,
    pub ip_address: String,
}

impl AuthUser {
    /// Decodes a bearer access token.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, ApiError> {
        let claims = verify_token(token, secret)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid or expired token: {e}")))?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized("Access token required".into()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            ip_address: String::new(),
        })
    }

    pub fn with_ip(mut self, ip: Option<&str>) -> Self {
        self.ip_address = ip.unwrap_or("unknown").to_string();
        self
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ApiError::Unauthorized("Missing token".into()).into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ApiError::internal("Config missing").into())),
        };

        let ip = req.connection_info().realip_remote_addr().map(str::to_string);
        ready(
            AuthUser::from_token(token, &config.jwt_secret)
                .map(|user| user.with_ip(ip.as_deref()))
                .map_err(Into::into),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_manager_or_admin(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::Manager) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Manager/Admin only".into()))
        }
    }

    /// Display name used in audit entries and comments.
    pub fn display_name(&self) -> String {
        self.username
            .split('@')
            .next()
            .unwrap_or(&self.username)
            .to_string()
    }
}
