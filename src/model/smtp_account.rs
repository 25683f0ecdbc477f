use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::Record;

pub const PASSWORD_MASK: &str = "••••••••";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SmtpAuth {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

impl SmtpAuth {
    pub fn is_configured(&self) -> bool {
        !self.user.is_empty() && !self.pass.is_empty()
    }
}

/// Outbound mail account. Credentials are held in plain text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmtpAccount {
    pub id: u64,
    #[schema(example = "Invoice SMTP")]
    pub name: String,
    #[schema(example = "smtp.office365.com")]
    pub host: String,
    #[schema(example = 587)]
    pub port: u16,
    /// Implicit TLS when true, STARTTLS otherwise.
    pub secure: bool,
    pub auth: SmtpAuth,
    pub purpose: String,
    #[schema(example = "not_tested")]
    pub test_status: String,
    #[serde(rename = "type")]
    #[schema(example = "invoice")]
    pub account_type: String,
}

impl Record for SmtpAccount {
    fn id(&self) -> u64 {
        self.id
    }
}

impl SmtpAccount {
    pub fn masked(&self) -> Self {
        let mut account = self.clone();
        if !account.auth.pass.is_empty() {
            account.auth.pass = PASSWORD_MASK.to_string();
        }
        account
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SentEmail {
    pub id: u64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub attachment_count: usize,
    /// `delivered` or `demo`.
    pub mode: String,
    #[schema(value_type = String, format = "date-time")]
    pub sent_at: DateTime<Utc>,
}

impl Record for SentEmail {
    fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(pass: &str) -> SmtpAccount {
        SmtpAccount {
            id: 1,
            name: "Invoice SMTP".into(),
            host: "smtp.office365.com".into(),
            port: 587,
            secure: false,
            auth: SmtpAuth {
                user: "billing@example.com".into(),
                pass: pass.into(),
            },
            purpose: "Billing & Invoicing".into(),
            test_status: "not_tested".into(),
            account_type: "invoice".into(),
        }
    }

    #[test]
    fn masks_only_when_password_set() {
        assert_eq!(account("secret").masked().auth.pass, PASSWORD_MASK);
        assert_eq!(account("").masked().auth.pass, "");
        assert!(account("secret").auth.is_configured());
        assert!(!account("").auth.is_configured());
    }
}
