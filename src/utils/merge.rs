use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::ApiError;

/// Keys a client may never overwrite through a partial update.
const PROTECTED_KEYS: &[&str] = &["id", "createdAt"];

/// Spread-merges a JSON body over an existing record.
///
/// The record is serialized, every top-level key of `payload` replaces the
/// stored value, and the result is deserialized back into `T`.
pub fn merge_patch<T>(current: &T, payload: &Value) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
{
    let patch = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut merged = serde_json::to_value(current)
        .map_err(|e| ApiError::internal(format!("Failed to serialize record: {e}")))?;

    let target = merged
        .as_object_mut()
        .ok_or_else(|| ApiError::internal("Record is not a JSON object"))?;

    for (key, value) in patch {
        if PROTECTED_KEYS.contains(&key.as_str()) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }

    serde_json::from_value(merged)
        .map_err(|e| ApiError::bad_request(format!("Invalid field value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Item {
        id: u64,
        name: String,
        hours: f64,
        created_at: String,
    }

    fn item() -> Item {
        Item {
            id: 1,
            name: "a".into(),
            hours: 8.0,
            created_at: "2026-01-01".into(),
        }
    }

    #[test]
    fn overlays_fields_but_keeps_identity() {
        let merged = merge_patch(
            &item(),
            &json!({ "name": "b", "id": 99, "createdAt": "never" }),
        )
        .unwrap();
        assert_eq!(merged.id, 1);
        assert_eq!(merged.name, "b");
        assert_eq!(merged.hours, 8.0);
        assert_eq!(merged.created_at, "2026-01-01");
    }

    #[test]
    fn rejects_non_objects_and_bad_types() {
        assert!(matches!(
            merge_patch(&item(), &json!([1, 2])),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            merge_patch(&item(), &json!({})),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            merge_patch(&item(), &json!({ "hours": "lots" })),
            Err(ApiError::BadRequest(_))
        ));
    }
}
