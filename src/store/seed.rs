use chrono::{NaiveDate, Utc};

use crate::auth::directory::directory_users;
use crate::model::{
    admin::AdminRole,
    email_template::EmailTemplate,
    project::{Project, Task},
    smtp_account::{SmtpAccount, SmtpAuth},
    timesheet::{Attachment, Timesheet, TimesheetStatus},
};
use crate::store::AppStore;
use crate::utils::template::extract_variables;

// Tiny placeholder documents for the demo attachments.
const DEMO_PDF_BASE64: &str = "JVBERi0xLjQKJeLjz9MNCjEgMCBvYmo8PC9UeXBlL0NhdGFsb2cvUGFnZXMgMiAwIFI+PmVuZG9iagoyIDAgb2JqPDwvVHlwZS9QYWdlcy9LaWRzIFszIDAgUl0vQ291bnQgMT4+ZW5kb2JqCjMgMCBvYmo8PC9UeXBlL1BhZ2UvUGFyZW50IDIgMCBSL01lZGlhQm94IFswIDAgNjEyIDc5Ml0+PmVuZG9iagp0cmFpbGVyPDwvUm9vdCAxIDAgUj4+CiUlRU9G";
const DEMO_XLSX_BASE64: &str = "UEsDBBQABgAIAAAAIQA4K7+VrQAAANIAAAALAAAAX3JlbHMvLnJlbHOiBAIooAAC";
const DEMO_DOCX_BASE64: &str = "UEsDBBQABgAIAAAAIQAc/91pzQAAABcBAAA4AAAAY3VzdG9tWG1sL2l0ZW1Qcm9wczEueG1s";

const PDF: &str = "application/pdf";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn load_reference_data(store: &AppStore) {
    for user in directory_users() {
        store.users.insert_with(|id| {
            let mut user = user.clone();
            user.id = id;
            user
        });
    }

    let now = Utc::now();

    for name in ["Spruce", "Pine", "Oak"] {
        store.projects.insert_with(|id| Project {
            id,
            name: name.to_string(),
            active: true,
            description: None,
            status: Some("Active".to_string()),
            start_date: None,
            end_date: None,
            created_at: now,
            extra: Default::default(),
        });
    }

    for name in ["Development", "Testing", "Design", "Documentation"] {
        store.tasks.insert_with(|id| Task {
            id,
            name: name.to_string(),
            description: None,
            assigned_to: None,
            status: None,
            priority: None,
            due_date: None,
            created_at: now,
            extra: Default::default(),
        });
    }

    let accounts = [
        ("Invoice SMTP", "Billing & Invoicing", "invoice"),
        ("Notification SMTP", "System Alerts & Notifications", "notification"),
        ("HR SMTP", "Human Resources Communications", "hr"),
        ("Support SMTP", "Customer Support & Inquiries", "support"),
        ("Marketing SMTP", "Marketing Campaigns & Newsletters", "marketing"),
    ];
    for (name, purpose, account_type) in accounts {
        store.smtp_accounts.insert_with(|id| SmtpAccount {
            id,
            name: name.to_string(),
            host: "smtp.office365.com".to_string(),
            port: 587,
            secure: false,
            auth: SmtpAuth::default(),
            purpose: purpose.to_string(),
            test_status: "not_tested".to_string(),
            account_type: account_type.to_string(),
        });
    }

    let roles = [
        ("admin", "Administrator", "Full access to every module", vec!["*"]),
        (
            "manager",
            "Manager",
            "Approves timesheets, leave and invoices",
            vec![
                "employees.read",
                "timesheets.read",
                "timesheets.approve",
                "leave.read",
                "leave.approve",
                "invoices.read",
                "invoices.send",
                "approvals.decide",
            ],
        ),
        (
            "employee",
            "Employee",
            "Self-service timesheets and leave",
            vec!["timesheets.read", "timesheets.write", "leave.read"],
        ),
    ];
    for (name, display_name, description, permissions) in roles {
        store.admin_roles.insert_with(|id| AdminRole {
            id,
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            is_system: true,
            created_at: now,
            updated_at: now,
        });
    }

    let templates = [
        (
            "Welcome Email",
            "Onboarding",
            "Welcome to {{companyName}}, {{firstName}}!",
            "<p>Hi {{firstName}},</p><p>Please complete your onboarding here: {{onboardingLink}}</p>",
        ),
        (
            "Leave Approved",
            "Leave",
            "Your leave from {{startDate}} to {{endDate}} was approved",
            "<p>Hi {{employeeName}},</p><p>Your {{leaveType}} leave has been approved.</p>",
        ),
        (
            "Timesheet Reminder",
            "Timesheets",
            "Timesheet for week {{weekStart}} is due",
            "<p>Hi {{employeeName}},</p><p>Please submit your timesheet for {{weekStart}}.</p>",
        ),
        (
            "Invoice Cover Letter",
            "Invoicing",
            "Invoice {{invoiceNumber}} from {{companyName}}",
            "<p>Please find attached invoice {{invoiceNumber}} for {{totalAmount}}.</p>",
        ),
    ];
    for (name, category, subject, body) in templates {
        store.email_templates.insert_with(|id| EmailTemplate {
            id,
            name: name.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            variables: extract_variables([subject, body]),
            category: category.to_string(),
            is_active: true,
            created_by: "system".to_string(),
            created_at: now,
            last_modified: now,
        });
    }
}

/// Four Spruce/Development weeks in December 2025, the first still pending.
pub fn load_demo_timesheets(store: &AppStore) {
    let attachment = |name: &str, data: &str, content_type: &str, uploaded: &str| Attachment {
        name: name.to_string(),
        data: data.to_string(),
        content_type: Some(content_type.to_string()),
        uploaded_at: Some(uploaded.to_string()),
    };

    let weeks = [
        (
            1,
            1,
            "Dec 01, 2025",
            TimesheetStatus::Pending,
            vec![
                attachment("Spruce-Timesheet-Week1-1.pdf", DEMO_PDF_BASE64, PDF, "2025-12-01"),
                attachment("Project-Details-Week1.xlsx", DEMO_XLSX_BASE64, XLSX, "2025-12-01"),
            ],
        ),
        (
            8,
            2,
            "Dec 08, 2025",
            TimesheetStatus::Approved,
            vec![attachment(
                "Development-Report-Week2.pdf",
                DEMO_PDF_BASE64,
                PDF,
                "2025-12-08",
            )],
        ),
        (
            15,
            3,
            "Dec 15, 2025",
            TimesheetStatus::Approved,
            vec![
                attachment("Code-Review-Week3.pdf", DEMO_PDF_BASE64, PDF, "2025-12-15"),
                attachment("Testing-Results-Week3.docx", DEMO_DOCX_BASE64, DOCX, "2025-12-15"),
            ],
        ),
        (22, 4, "Dec 22, 2025", TimesheetStatus::Approved, Vec::new()),
    ];

    let now = Utc::now();
    for (day, week_number, label, status, attachments) in weeks {
        store.timesheets.insert_with(|id| Timesheet {
            id,
            user_id: Some(1),
            date: NaiveDate::from_ymd_opt(2025, 12, day).unwrap_or_default(),
            hours: 40.0,
            project: "Spruce".to_string(),
            task: "Development".to_string(),
            hourly_rate: Some(65.0),
            status,
            week_start: Some(label.to_string()),
            week_number: Some(week_number),
            attachments,
            rejection_reason: None,
            submitted_at: None,
            approved_at: None,
            created_at: now,
            extra: Default::default(),
        });
    }
}
