pub mod admin;
pub mod approval;
pub mod email;
pub mod email_template;
pub mod employee;
pub mod invoice;
pub mod leave_request;
pub mod license;
pub mod misc;
pub mod onboarding;
pub mod project;
pub mod sync;
pub mod timesheet;
