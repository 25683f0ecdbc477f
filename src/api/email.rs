use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::smtp_account::{PASSWORD_MASK, SentEmail, SmtpAccount, SmtpAuth},
    services::mailer::{self, OutgoingAttachment, OutgoingMail, SmtpSettings},
    store::AppStore,
    utils::audit,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{info, warn};
use utoipa::ToSchema;

const DEFAULT_ACCOUNT_TYPE: &str = "notification";

/// How an outgoing mail left the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryMode {
    Delivered,
    Demo,
}

/// Sends through the account of the given type when it has credentials.
///
/// Without credentials, or when the server refuses the mail, the message is
/// only logged. Either way it lands in the sent log.
pub(crate) async fn deliver(
    store: &AppStore,
    config: &Config,
    account_type: &str,
    to: String,
    subject: String,
    html: String,
    attachments: Vec<OutgoingAttachment>,
) -> DeliveryMode {
    let account = store
        .smtp_accounts
        .find_by(|a| a.account_type == account_type);

    let from = account
        .as_ref()
        .map(|a| a.auth.user.clone())
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| config.mail_from.clone());

    let mail = OutgoingMail {
        from,
        to,
        subject,
        html,
        attachments,
    };

    let mode = match account.filter(|a| a.auth.is_configured()) {
        Some(account) => match mailer::send(&SmtpSettings::from(&account), &mail).await {
            Ok(()) => DeliveryMode::Delivered,
            Err(e) => {
                warn!(error = %e, to = %mail.to, account_type, "SMTP delivery failed, using demo mode");
                DeliveryMode::Demo
            }
        },
        None => DeliveryMode::Demo,
    };

    if mode == DeliveryMode::Demo {
        info!(
            to = %mail.to,
            attachments = mail.attachments.len(),
            "[DEMO] Would send email"
        );
    }

    store.sent_emails.insert_with(|id| SentEmail {
        id,
        from: mail.from.clone(),
        to: mail.to.clone(),
        subject: mail.subject.clone(),
        attachment_count: mail.attachments.len(),
        mode: mode.to_string(),
        sent_at: Utc::now(),
    });

    mode
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAccountReq {
    #[schema(example = "smtp.office365.com")]
    pub host: String,
    #[schema(example = 587)]
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub auth: SmtpAuth,
}

#[derive(Deserialize, ToSchema)]
pub struct TestConnectionReq {
    /// Account to mark with the result.
    pub id: Option<u64>,
    #[schema(example = "smtp.office365.com")]
    pub host: String,
    #[schema(example = 587)]
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailReq {
    #[schema(example = "someone@example.com")]
    pub to: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
    #[schema(example = "notification")]
    pub account_type: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// List SMTP accounts
///
/// Passwords are masked.
#[utoipa::path(
    get,
    path = "/api/email/smtp-accounts",
    responses((status = 200, description = "Configured accounts", body = [SmtpAccount])),
    tag = "Email",
    security(("bearer_auth" = []))
)]
pub async fn list_accounts(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    let accounts: Vec<SmtpAccount> = store.smtp_accounts.all().iter().map(SmtpAccount::masked).collect();
    Ok(HttpResponse::Ok().json(accounts))
}

/// Update SMTP account
///
/// A masked password sent back unchanged keeps the stored one.
#[utoipa::path(
    put,
    path = "/api/email/smtp-accounts/{id}",
    params(("id" = u64, Path, description = "Account id")),
    request_body = UpdateAccountReq,
    responses(
        (status = 200, description = "Account updated", body = MessageResponse),
        (status = 404, description = "Account not found")
    ),
    tag = "Email",
    security(("bearer_auth" = []))
)]
pub async fn update_account(
    auth: AuthUser,
    store: web::Data<AppStore>,
    id: web::Path<u64>,
    payload: web::Json<UpdateAccountReq>,
) -> actix_web::Result<impl Responder> {
    let id = id.into_inner();
    let UpdateAccountReq {
        host,
        port,
        secure,
        auth: credentials,
    } = payload.into_inner();

    store
        .smtp_accounts
        .update(id, |account| {
            account.host = host;
            account.port = port;
            account.secure = secure;
            account.auth.user = credentials.user;
            if credentials.pass != PASSWORD_MASK {
                account.auth.pass = credentials.pass;
            }
        })
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    audit::record(&store, &auth, "update", "smtp_account", Some(id), "Updated SMTP account");

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: "Account updated successfully".to_string(),
    }))
}

/// Test an SMTP connection
#[utoipa::path(
    post,
    path = "/api/email/test-connection",
    request_body = TestConnectionReq,
    responses(
        (status = 200, description = "Connected", body = MessageResponse),
        (status = 400, description = "Connection failed", body = MessageResponse)
    ),
    tag = "Email",
    security(("bearer_auth" = []))
)]
pub async fn test_connection(
    store: web::Data<AppStore>,
    payload: web::Json<TestConnectionReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    let settings = SmtpSettings {
        host: req.host.clone(),
        port: req.port,
        secure: req.secure,
        user: req.user.clone(),
        pass: req.pass,
    };

    let result = mailer::test_connection(&settings).await;
    let status = if result.is_ok() { "success" } else { "failed" };
    if let Some(id) = req.id {
        store.smtp_accounts.update(id, |a| a.test_status = status.to_string());
    }

    match result {
        Ok(()) => Ok(HttpResponse::Ok().json(MessageResponse {
            success: true,
            message: format!("Successfully connected to {}:{} as {}", req.host, req.port, req.user),
        })),
        Err(e) => {
            warn!(host = %req.host, port = req.port, error = %e, "SMTP connection test failed");
            Ok(HttpResponse::BadRequest().json(MessageResponse {
                success: false,
                message: e.to_string(),
            }))
        }
    }
}

/// Send an e-mail
#[utoipa::path(
    post,
    path = "/api/email/send",
    request_body = SendEmailReq,
    responses((status = 200, description = "Sent or logged", body = MessageResponse)),
    tag = "Email",
    security(("bearer_auth" = []))
)]
pub async fn send_email(
    auth: AuthUser,
    config: web::Data<Config>,
    store: web::Data<AppStore>,
    payload: web::Json<SendEmailReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    if req.to.trim().is_empty() {
        return Err(ApiError::bad_request("Recipient email required").into());
    }
    let account_type = req.account_type.as_deref().unwrap_or(DEFAULT_ACCOUNT_TYPE);

    let mode = deliver(
        &store,
        &config,
        account_type,
        req.to.clone(),
        req.subject,
        req.body,
        Vec::new(),
    )
    .await;

    audit::record(&store, &auth, "send", "email", None, format!("To {}", req.to));

    let message = match mode {
        DeliveryMode::Delivered => "Email sent successfully",
        DeliveryMode::Demo => "Email sent (demo mode)",
    };
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: message.to_string(),
    }))
}

/// Sent e-mail log
#[utoipa::path(
    get,
    path = "/api/email/sent",
    responses((status = 200, description = "Everything sent since start-up", body = [SentEmail])),
    tag = "Email",
    security(("bearer_auth" = []))
)]
pub async fn sent_emails(store: web::Data<AppStore>) -> actix_web::Result<impl Responder> {
    let mut sent = store.sent_emails.all();
    sent.reverse();
    Ok(HttpResponse::Ok().json(sent))
}
