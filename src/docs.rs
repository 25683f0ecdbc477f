use crate::api::admin::{AdminUser, AssignRoleReq, AuditStats, RoleReq};
use crate::api::approval::{ApprovalStats, CreateApproval, DecideReq, Decision};
use crate::api::email::{MessageResponse, SendEmailReq, TestConnectionReq, UpdateAccountReq};
use crate::api::email_template::{PreviewReq, PreviewResponse, TemplateRef, TemplateReq};
use crate::api::employee::{CreateEmployee, EmployeeResponse};
use crate::api::invoice::{
    CreateInvoice, GenerateInvoiceReq, InvoiceResponse, SendInvoiceMeta, SendInvoiceReq,
    SendInvoiceResponse,
};
use crate::api::leave_request::{CreateLeave, LeaveBalance, LeaveResponse, LeaveStatusReq};
use crate::api::license::{PurchaseResponse, PurchaseSeatsReq, UsageMetric, UsageReport};
use crate::api::onboarding::{CompleteReq, DocumentReq, InviteReq, InviteResponse};
use crate::api::project::{CreateProject, CreateTask};
use crate::api::sync::{ConnectionResponse, SyncStatusResponse};
use crate::api::timesheet::{
    BulkResponse, BulkWeekReq, CreateTimesheet, RejectReq, TimesheetResponse,
};
use crate::auth::handlers::{LoginResponse, LoginUser, RefreshReqDto, RefreshResponse};
use crate::model::admin::{
    AdminRole, AuditLog, ModuleSettings, ModuleToggle, NotificationSettings, SecuritySettings,
    SystemSettings,
};
use crate::model::approval::{Approval, ApprovalComment, ApprovalStatus};
use crate::model::email_template::EmailTemplate;
use crate::model::employee::Employee;
use crate::model::invoice::{Invoice, InvoiceWeek};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::license::{
    BillingEntry, License, LicenseLimits, LicensePlan, LicenseUsage, PaymentMethod,
};
use crate::model::onboarding::{OnboardingDocument, OnboardingRecord, OnboardingStatus};
use crate::model::project::{Project, Task};
use crate::model::smtp_account::{SentEmail, SmtpAccount, SmtpAuth};
use crate::model::timesheet::{Attachment, Timesheet, TimesheetStatus};
use crate::models::LoginReqDto;
use crate::sync::config::{ConnectionStatus, MaskedSyncConfig};
use crate::sync::{SyncConfigRestore, SyncConfigUpdate, SyncCredentials};
use crate::utils::weeks::WeeklyRow;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CentraPro HR API",
        version = "1.0.0",
        description = r#"
## CentraPro HR Operations

Back end for the CentraPro HR portal: timesheets, leave, invoicing,
onboarding, approvals, email and tenant administration.

### Key Features
- **Timesheets**: daily entries, weekly roll-ups, submit/approve/reject and bulk actions
- **Invoicing**: monthly generation from approved weeks, HTML/PDF invoices sent by email
- **Leave**: requests, approval and balances
- **Onboarding**: invite links, document collection and completion
- **Approvals**: generic approval queue with comments and statistics
- **Email**: SMTP accounts per purpose, templates with `{{variable}}` placeholders
- **Administration**: roles, users, audit trail, system settings and license seats
- **Document-list sync**: optional mirroring of new records into an external site

### Security
Everything under `/api` except `/api/auth/*` and `/api/test` requires a
**JWT Bearer** access token. Administrative endpoints additionally require
the admin role.

### Errors
Failures answer with `{"error": "<message>"}` and a matching status code.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::misc::api_test,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::timesheet::list_timesheets,
        crate::api::timesheet::weekly_rows,
        crate::api::timesheet::create_timesheet,
        crate::api::timesheet::update_timesheet,
        crate::api::timesheet::delete_timesheet,
        crate::api::timesheet::submit_timesheet,
        crate::api::timesheet::approve_timesheet,
        crate::api::timesheet::reject_timesheet,
        crate::api::timesheet::bulk_submit,
        crate::api::timesheet::bulk_approve,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave_status,
        crate::api::leave_request::leave_balance,

        crate::api::invoice::list_invoices,
        crate::api::invoice::create_invoice,
        crate::api::invoice::generate_invoice,
        crate::api::invoice::send_invoice,

        crate::api::onboarding::list_onboarding,
        crate::api::onboarding::get_onboarding,
        crate::api::onboarding::by_token,
        crate::api::onboarding::invite,
        crate::api::onboarding::add_document,
        crate::api::onboarding::complete,

        crate::api::approval::list_approvals,
        crate::api::approval::create_approval,
        crate::api::approval::decide,
        crate::api::approval::approval_stats,

        crate::api::email::list_accounts,
        crate::api::email::update_account,
        crate::api::email::test_connection,
        crate::api::email::send_email,
        crate::api::email::sent_emails,

        crate::api::email_template::list_templates,
        crate::api::email_template::get_template,
        crate::api::email_template::create_template,
        crate::api::email_template::update_template,
        crate::api::email_template::delete_template,
        crate::api::email_template::duplicate_template,
        crate::api::email_template::preview_template,
        crate::api::email_template::categories,

        crate::api::license::get_license,
        crate::api::license::usage,
        crate::api::license::plans,
        crate::api::license::purchase_seats,

        crate::api::admin::list_roles,
        crate::api::admin::create_role,
        crate::api::admin::update_role,
        crate::api::admin::delete_role,
        crate::api::admin::permissions,
        crate::api::admin::list_users,
        crate::api::admin::assign_role,
        crate::api::admin::audit_logs,
        crate::api::admin::audit_stats,
        crate::api::admin::get_settings,
        crate::api::admin::update_settings,

        crate::api::project::list_projects,
        crate::api::project::create_project,
        crate::api::project::list_tasks,
        crate::api::project::create_task,

        crate::api::sync::status,
        crate::api::sync::update_config,
        crate::api::sync::test_connection,
        crate::api::sync::create_lists,
        crate::api::sync::restore_config
    ),
    components(
        schemas(
            LoginReqDto,
            LoginUser,
            LoginResponse,
            RefreshReqDto,
            RefreshResponse,
            CreateEmployee,
            EmployeeResponse,
            Employee,
            Timesheet,
            TimesheetStatus,
            Attachment,
            CreateTimesheet,
            BulkWeekReq,
            RejectReq,
            TimesheetResponse,
            BulkResponse,
            WeeklyRow,
            LeaveRequest,
            LeaveStatus,
            CreateLeave,
            LeaveStatusReq,
            LeaveResponse,
            LeaveBalance,
            Invoice,
            InvoiceWeek,
            CreateInvoice,
            GenerateInvoiceReq,
            SendInvoiceMeta,
            SendInvoiceReq,
            InvoiceResponse,
            SendInvoiceResponse,
            OnboardingRecord,
            OnboardingDocument,
            OnboardingStatus,
            InviteReq,
            DocumentReq,
            CompleteReq,
            InviteResponse,
            Approval,
            ApprovalComment,
            ApprovalStatus,
            CreateApproval,
            DecideReq,
            Decision,
            ApprovalStats,
            SmtpAccount,
            SmtpAuth,
            SentEmail,
            UpdateAccountReq,
            TestConnectionReq,
            SendEmailReq,
            MessageResponse,
            EmailTemplate,
            TemplateReq,
            PreviewReq,
            PreviewResponse,
            TemplateRef,
            License,
            LicenseLimits,
            LicenseUsage,
            PaymentMethod,
            BillingEntry,
            LicensePlan,
            PurchaseSeatsReq,
            PurchaseResponse,
            UsageMetric,
            UsageReport,
            AdminRole,
            AuditLog,
            SystemSettings,
            ModuleSettings,
            ModuleToggle,
            SecuritySettings,
            NotificationSettings,
            RoleReq,
            AssignRoleReq,
            AdminUser,
            AuditStats,
            Project,
            Task,
            CreateProject,
            CreateTask,
            SyncCredentials,
            SyncConfigUpdate,
            SyncConfigRestore,
            MaskedSyncConfig,
            ConnectionStatus,
            SyncStatusResponse,
            ConnectionResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Misc", description = "Health check"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Timesheet", description = "Timesheet entry and approval APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Invoice", description = "Invoice generation and delivery APIs"),
        (name = "Onboarding", description = "New-hire onboarding APIs"),
        (name = "Approval", description = "Approval queue APIs"),
        (name = "Email", description = "SMTP accounts and outgoing mail"),
        (name = "Email Template", description = "Email template APIs"),
        (name = "License", description = "License and seat APIs"),
        (name = "Admin", description = "Roles, users, audit trail and settings"),
        (name = "Catalog", description = "Projects and tasks"),
        (name = "Sync", description = "External document-list sync"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn document_lists_protected_routes_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/timesheets/bulk-approve"));
        assert!(doc.paths.paths.contains_key("/api/invoices/send"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
