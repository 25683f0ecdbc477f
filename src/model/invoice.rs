use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::model::timesheet::Attachment;
use crate::store::Record;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "INV-0001")]
    pub invoice_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "December")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 2025)]
    pub year: Option<i32>,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub total_amount: f64,
    #[schema(example = "Generated")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weeks: Vec<InvoiceWeek>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub sent_at: Option<DateTime<Utc>>,

    /// Client fields without a dedicated column, kept as sent.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for Invoice {
    fn id(&self) -> u64 {
        self.id
    }
}

/// One billed line on an invoice: a weekly timesheet row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceWeek {
    #[schema(example = "Dec 01, 2025")]
    pub week_start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_number: Option<i64>,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default, skip_serializing)]
    pub attachments: Vec<Attachment>,
}

impl InvoiceWeek {
    pub fn amount(&self) -> f64 {
        self.hours * self.hourly_rate
    }
}

pub fn invoice_number(id: u64) -> String {
    format!("INV-{id:04}")
}
