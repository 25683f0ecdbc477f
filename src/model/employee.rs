use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::store::Record;

fn default_status() -> String {
    "Active".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "email": "john.doe@company.com",
        "position": "Developer",
        "department": "Engineering",
        "status": "Active",
        "phone": "+8801712345678",
        "hireDate": "2024-01-01",
        "hourlyRate": 65.0,
        "createdAt": "2026-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[serde(default)]
    #[schema(example = "Developer")]
    pub position: String,

    #[serde(default)]
    #[schema(example = "Engineering")]
    pub department: String,

    #[serde(default = "default_status")]
    #[schema(example = "Active")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Client fields without a dedicated column, kept as sent.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for Employee {
    fn id(&self) -> u64 {
        self.id
    }
}
