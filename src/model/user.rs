use serde::{Deserialize, Serialize};

use crate::store::Record;

/// A login account from the hard-coded directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    /// Admin-console role name.
    pub role: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl Record for DirectoryUser {
    fn id(&self) -> u64 {
        self.id
    }
}
