pub mod admin;
pub mod approval;
pub mod email_template;
pub mod employee;
pub mod invoice;
pub mod leave_request;
pub mod license;
pub mod onboarding;
pub mod project;
pub mod role;
pub mod smtp_account;
pub mod timesheet;
pub mod user;
