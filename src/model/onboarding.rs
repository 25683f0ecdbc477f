use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStatus {
    Invited,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDocument {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Base64 payload, kept as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub uploaded_at: DateTime<Utc>,
}

/// An invitation and its progress. Tokens never expire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub manager_id: Option<u64>,
    pub invite_token: String,
    pub status: OnboardingStatus,
    #[schema(value_type = String, format = "date-time")]
    pub invited_at: DateTime<Utc>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub documents: Vec<OnboardingDocument>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub profile_data: Option<Value>,
}

impl Record for OnboardingRecord {
    fn id(&self) -> u64 {
        self.id
    }
}
