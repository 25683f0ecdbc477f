use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::store::Record;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = "Vacation")]
    pub leave_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Inclusive day count, whatever order the dates come in.
    pub days: i64,
    pub status: LeaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    /// Client fields without a dedicated column, kept as sent.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record for LeaveRequest {
    fn id(&self) -> u64 {
        self.id
    }
}

pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_days_inclusively_in_either_order() {
        let a = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        assert_eq!(inclusive_days(a, b), 3);
        assert_eq!(inclusive_days(b, a), 3);
        assert_eq!(inclusive_days(a, a), 1);
    }
}
