use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::Record;

pub const TEMPLATE_CATEGORIES: &[&str] = &[
    "Onboarding",
    "Leave",
    "Timesheets",
    "Invoicing",
    "Notifications",
    "General",
];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: u64,
    #[schema(example = "Welcome Email")]
    pub name: String,
    #[schema(example = "Welcome to {{companyName}}, {{firstName}}!")]
    pub subject: String,
    pub body: String,
    /// Placeholders found in subject and body, in first-seen order.
    pub variables: Vec<String>,
    #[schema(example = "Onboarding")]
    pub category: String,
    pub is_active: bool,
    pub created_by: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub last_modified: DateTime<Utc>,
}

impl Record for EmailTemplate {
    fn id(&self) -> u64 {
        self.id
    }
}
