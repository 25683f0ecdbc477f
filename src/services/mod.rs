pub mod invoice;
pub mod mailer;
pub mod pdf;
