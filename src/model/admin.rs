use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::Record;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRole {
    pub id: u64,
    #[schema(example = "manager")]
    pub name: String,
    #[schema(example = "Manager")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Built-in roles cannot be deleted.
    pub is_system: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Record for AdminRole {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Permission {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

pub const PERMISSIONS: &[Permission] = &[
    Permission { id: "employees.read", name: "View employees", category: "Employees" },
    Permission { id: "employees.write", name: "Manage employees", category: "Employees" },
    Permission { id: "timesheets.read", name: "View timesheets", category: "Timesheets" },
    Permission { id: "timesheets.write", name: "Edit timesheets", category: "Timesheets" },
    Permission { id: "timesheets.approve", name: "Approve timesheets", category: "Timesheets" },
    Permission { id: "leave.read", name: "View leave requests", category: "Leave" },
    Permission { id: "leave.approve", name: "Approve leave", category: "Leave" },
    Permission { id: "invoices.read", name: "View invoices", category: "Invoicing" },
    Permission { id: "invoices.send", name: "Generate and send invoices", category: "Invoicing" },
    Permission { id: "approvals.decide", name: "Decide approvals", category: "Approvals" },
    Permission { id: "email.manage", name: "Manage templates and SMTP", category: "Email" },
    Permission { id: "admin.roles", name: "Manage roles", category: "Administration" },
    Permission { id: "admin.settings", name: "Manage system settings", category: "Administration" },
    Permission { id: "admin.audit", name: "View audit logs", category: "Administration" },
];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: u64,
    pub user_id: u64,
    pub user_name: String,
    #[schema(example = "create")]
    pub action: String,
    #[schema(example = "employee")]
    pub resource: String,
    pub resource_id: Option<u64>,
    pub details: String,
    pub ip_address: String,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
}

impl Record for AuditLog {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleToggle {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_days_per_request: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModuleSettings {
    pub onboarding: ModuleToggle,
    pub timesheets: ModuleToggle,
    pub leave: ModuleToggle,
    pub invoicing: ModuleToggle,
    pub reporting: ModuleToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    pub password_min_length: u32,
    pub password_require_special_char: bool,
    pub session_timeout: u32,
    pub max_login_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_enabled: bool,
    pub smtp_configured: bool,
}

/// Admin-editable switches. Stored and returned; the server does not act on them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemSettings {
    pub modules: ModuleSettings,
    pub security: SecuritySettings,
    pub notifications: NotificationSettings,
}

impl Default for SystemSettings {
    fn default() -> Self {
        let on = |require_approval| ModuleToggle {
            enabled: true,
            require_approval,
            max_days_per_request: None,
        };
        Self {
            modules: ModuleSettings {
                onboarding: on(Some(true)),
                timesheets: on(Some(true)),
                leave: ModuleToggle {
                    enabled: true,
                    require_approval: None,
                    max_days_per_request: Some(30),
                },
                invoicing: on(None),
                reporting: on(None),
            },
            security: SecuritySettings {
                password_min_length: 8,
                password_require_special_char: false,
                session_timeout: 30,
                max_login_attempts: 5,
            },
            notifications: NotificationSettings {
                email_enabled: true,
                smtp_configured: false,
            },
        }
    }
}
