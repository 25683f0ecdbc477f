use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::store::Record;

/// `Pending -> Submitted -> Approved | Rejected`, written without guards.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
pub enum TimesheetStatus {
    #[default]
    Pending,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[schema(example = "Spruce-Timesheet-Week1.pdf")]
    pub name: String,
    /// Base64 encoded file content.
    pub data: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    #[schema(example = "application/pdf")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[schema(example = "2025-12-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 8.0)]
    pub hours: f64,
    #[schema(example = "Spruce")]
    pub project: String,
    #[schema(example = "Development")]
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 65.0)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub status: TimesheetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Dec 01, 2025")]
    pub week_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub week_number: Option<i64>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    /// Client fields without a dedicated column, kept as sent.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for Timesheet {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Timesheet {
    /// Overwrites the status and stamps the matching timestamp.
    pub fn set_status(&mut self, status: TimesheetStatus) {
        self.status = status;
        match status {
            TimesheetStatus::Submitted => self.submitted_at = Some(Utc::now()),
            TimesheetStatus::Approved => self.approved_at = Some(Utc::now()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_as_plain_words() {
        assert_eq!(
            serde_json::to_string(&TimesheetStatus::Submitted).unwrap(),
            "\"Submitted\""
        );
        assert_eq!(
            TimesheetStatus::from_str("Rejected").unwrap(),
            TimesheetStatus::Rejected
        );
        assert_eq!(TimesheetStatus::Approved.to_string(), "Approved");
    }

    #[test]
    fn attachment_uses_type_key() {
        let att: Attachment = serde_json::from_value(serde_json::json!({
            "name": "a.pdf",
            "data": "AAAA",
            "type": "application/pdf"
        }))
        .unwrap();
        assert_eq!(att.content_type.as_deref(), Some("application/pdf"));
    }
}
