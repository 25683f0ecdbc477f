use chrono::Utc;

use crate::auth::auth::AuthUser;
use crate::model::admin::AuditLog;
use crate::store::AppStore;

/// Appends an audit entry. Entries are informational only and can be lost
/// with the rest of the store.
pub fn record(
    store: &AppStore,
    actor: &AuthUser,
    action: &str,
    resource: &str,
    resource_id: Option<u64>,
    details: impl Into<String>,
) {
    let details = details.into();
    store.audit_logs.insert_with(|id| AuditLog {
        id,
        user_id: actor.user_id,
        user_name: actor.display_name(),
        action: action.to_string(),
        resource: resource.to_string(),
        resource_id,
        details,
        ip_address: actor.ip_address.clone(),
        timestamp: Utc::now(),
    });
}
