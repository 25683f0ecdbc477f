use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    NotTested,
    Testing,
    Connected,
    Failed,
}

/// Credentials and state for the external document-list service.
///
/// This is the only state that outlives the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub site_url: String,
    pub site_name: String,
    pub connection_status: ConnectionStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_tested: Option<DateTime<Utc>>,
    pub lists_created: bool,
    pub lists_count: u32,
}

impl SyncConfig {
    pub fn is_live(&self) -> bool {
        self.enabled && self.connection_status == ConnectionStatus::Connected
    }

    /// Host name used in site lookups; derived from the URL when not set.
    pub fn site_host(&self) -> String {
        if !self.site_name.trim().is_empty() {
            return self.site_name.trim().to_string();
        }
        self.site_url
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    }

    pub fn masked(&self) -> MaskedSyncConfig {
        MaskedSyncConfig {
            enabled: self.enabled,
            tenant_id: mask(&self.tenant_id),
            client_id: mask(&self.client_id),
            site_url: self.site_url.clone(),
            site_name: self.site_name.clone(),
            connection_status: self.connection_status,
            last_tested: self.last_tested,
            lists_created: self.lists_created,
            lists_count: self.lists_count,
        }
    }
}

/// Status view: identifiers reduced to their last four characters.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaskedSyncConfig {
    pub enabled: bool,
    #[schema(example = "***3a7e")]
    pub tenant_id: String,
    pub client_id: String,
    pub site_url: String,
    pub site_name: String,
    pub connection_status: ConnectionStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_tested: Option<DateTime<Utc>>,
    pub lists_created: bool,
    pub lists_count: u32,
}

pub fn mask(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{tail}")
}

/// Reads the saved configuration over the defaults. Any failure is logged and
/// the defaults are used.
pub fn load(path: &Path) -> SyncConfig {
    if !path.exists() {
        return SyncConfig::default();
    }

    match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<SyncConfig>(&raw).map_err(|e| e.to_string()))
    {
        Ok(config) => {
            info!(
                enabled = config.enabled,
                status = %config.connection_status,
                lists = config.lists_count,
                "Loaded sync config"
            );
            config
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "Failed to load sync config, using defaults");
            SyncConfig::default()
        }
    }
}

/// Failures are logged only.
pub async fn save(path: &Path, config: &SyncConfig) {
    let result = match serde_json::to_string_pretty(config) {
        Ok(json) => tokio::fs::write(path, json).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(()) => info!(path = %path.display(), "Sync config saved"),
        Err(e) => error!(error = %e, path = %path.display(), "Failed to save sync config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four() {
        assert_eq!(mask("da28b76b-d863"), "***d863");
        assert_eq!(mask("abc"), "***abc");
        assert_eq!(mask(""), "");
    }

    #[actix_web::test]
    async fn save_then_load_and_tolerate_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync-config.json");
        assert_eq!(load(&path), SyncConfig::default());

        let config = SyncConfig {
            enabled: true,
            tenant_id: "tenant".into(),
            connection_status: ConnectionStatus::Connected,
            lists_count: 8,
            ..SyncConfig::default()
        };
        save(&path, &config).await;
        assert_eq!(load(&path), config);

        fs::write(&path, "{not json").unwrap();
        assert_eq!(load(&path), SyncConfig::default());

        // Unwritable target: logged, nothing created.
        let missing = dir.path().join("no-such-dir").join("sync.json");
        save(&missing, &config).await;
        assert!(!missing.exists());
    }

    #[test]
    fn site_host_falls_back_to_url() {
        let config = SyncConfig {
            site_url: "https://contoso.sharepoint.com/".into(),
            ..SyncConfig::default()
        };
        assert_eq!(config.site_host(), "contoso.sharepoint.com");
    }
}
