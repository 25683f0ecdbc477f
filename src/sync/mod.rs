//! Best-effort mirroring of records into an external document-list service.
//!
//! Every remote call is a shelled-out script. Pushes never block or fail the
//! request that triggered them.

pub mod config;
pub mod runner;
pub mod scripts;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use derive_more::Display;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display as StrumDisplay;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use self::config::{ConnectionStatus, MaskedSyncConfig, SyncConfig};
use self::runner::ScriptRunner;
use self::scripts::{LIST_NAMES, full_list_name};

/// Pushes are killed after this long.
const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Display)]
pub enum SyncError {
    #[display(fmt = "Missing required credentials")]
    MissingCredentials,
    #[display(fmt = "Please test connection first")]
    NotConnected,
    #[display(fmt = "Failed to run script: {}", _0)]
    Spawn(String),
    #[display(fmt = "Script timed out after {} seconds", _0)]
    Timeout(u64),
    #[display(fmt = "Unexpected script output: {}", _0)]
    BadOutput(String),
    #[display(fmt = "{}", _0)]
    Remote(String),
}

/// Lists that receive a new item when a record is created.
#[derive(Debug, Clone, Copy, StrumDisplay)]
pub enum SyncList {
    Timesheets,
    Employees,
    Projects,
    Tasks,
    Invoices,
    LeaveRequests,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub site_url: String,
    pub site_name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfigUpdate {
    pub enabled: Option<bool>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
}

/// Client-held copy of the configuration, replayed after a server restart.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfigRestore {
    pub enabled: Option<bool>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub connection_status: Option<ConnectionStatus>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_tested: Option<chrono::DateTime<Utc>>,
    pub lists_created: Option<bool>,
    pub lists_count: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub site_id: String,
    pub site_name: String,
    pub lists_count: u32,
    pub all_lists_created: bool,
    pub lists: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptResult {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    site_id: Option<String>,
    #[serde(default)]
    site_name: Option<String>,
    #[serde(default)]
    centra_pro_lists_count: Option<u32>,
    #[serde(default)]
    lists: Option<Value>,
    #[serde(default)]
    created: Option<Value>,
}

/// PowerShell collapses one-element arrays into a scalar.
fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => Vec::new(),
    }
}

fn set_if_present(target: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = value;
    }
}

pub struct SyncService {
    config: RwLock<SyncConfig>,
    path: PathBuf,
    runner: Arc<dyn ScriptRunner>,
    timeout: Duration,
}

impl SyncService {
    pub fn new(path: PathBuf, runner: Arc<dyn ScriptRunner>, timeout: Duration) -> Self {
        let config = config::load(&path);
        Self {
            config: RwLock::new(config),
            path,
            runner,
            timeout,
        }
    }

    pub fn snapshot(&self) -> SyncConfig {
        self.config.read().clone()
    }

    pub fn status(&self) -> MaskedSyncConfig {
        self.config.read().masked()
    }

    async fn save(&self) {
        let snapshot = self.snapshot();
        config::save(&self.path, &snapshot).await;
    }

    /// Overwrites the supplied non-empty fields. Not persisted.
    pub fn update(&self, update: SyncConfigUpdate) -> SyncConfig {
        let mut config = self.config.write();
        if let Some(enabled) = update.enabled {
            config.enabled = enabled;
        }
        set_if_present(&mut config.tenant_id, update.tenant_id);
        set_if_present(&mut config.client_id, update.client_id);
        set_if_present(&mut config.client_secret, update.client_secret);
        set_if_present(&mut config.site_url, update.site_url);
        set_if_present(&mut config.site_name, update.site_name);
        config.clone()
    }

    pub async fn restore(&self, restore: SyncConfigRestore) -> SyncConfig {
        {
            let mut config = self.config.write();
            if let Some(enabled) = restore.enabled {
                config.enabled = enabled;
            }
            set_if_present(&mut config.tenant_id, restore.tenant_id);
            set_if_present(&mut config.client_id, restore.client_id);
            set_if_present(&mut config.client_secret, restore.client_secret);
            set_if_present(&mut config.site_url, restore.site_url);
            set_if_present(&mut config.site_name, restore.site_name);
            if let Some(status) = restore.connection_status {
                config.connection_status = status;
            }
            if restore.last_tested.is_some() {
                config.last_tested = restore.last_tested;
            }
            if let Some(created) = restore.lists_created {
                config.lists_created = created;
            }
            if let Some(count) = restore.lists_count {
                config.lists_count = count;
            }
            info!(
                enabled = config.enabled,
                status = %config.connection_status,
                lists = config.lists_count,
                "Sync config restored"
            );
        }
        self.save().await;
        self.snapshot()
    }

    async fn run_script(&self, script: &str) -> Result<ScriptResult, SyncError> {
        let output = self.runner.run(script, self.timeout).await?;
        let line = output
            .last_line()
            .ok_or_else(|| SyncError::BadOutput("no output".into()))?;
        serde_json::from_str(line).map_err(|e| SyncError::BadOutput(format!("{e}: {line}")))
    }

    fn mark_failed(&self) {
        let mut config = self.config.write();
        config.connection_status = ConnectionStatus::Failed;
        config.last_tested = Some(Utc::now());
    }

    pub async fn test_connection(
        &self,
        credentials: SyncCredentials,
    ) -> Result<ConnectionReport, SyncError> {
        if [
            &credentials.tenant_id,
            &credentials.client_id,
            &credentials.client_secret,
            &credentials.site_url,
        ]
        .iter()
        .any(|v| v.trim().is_empty())
        {
            return Err(SyncError::MissingCredentials);
        }

        let snapshot = {
            let mut config = self.config.write();
            config.tenant_id = credentials.tenant_id;
            config.client_id = credentials.client_id;
            config.client_secret = credentials.client_secret;
            config.site_url = credentials.site_url;
            set_if_present(&mut config.site_name, Some(credentials.site_name));
            config.connection_status = ConnectionStatus::Testing;
            config.clone()
        };

        info!(tenant = %config::mask(&snapshot.tenant_id), site = %snapshot.site_host(), "Testing sync connection");

        let result = match self.run_script(&scripts::connection_test(&snapshot)).await {
            Ok(result) if result.success => result,
            Ok(result) => {
                let message = result.error.unwrap_or_else(|| "unknown error".into());
                error!(error = %message, "Sync connection failed");
                self.mark_failed();
                return Err(SyncError::Remote(message));
            }
            Err(e) => {
                error!(error = %e, "Sync connection test error");
                self.mark_failed();
                return Err(e);
            }
        };

        let lists_count = result.centra_pro_lists_count.unwrap_or(0);
        let all_lists_created = lists_count as usize == LIST_NAMES.len();
        {
            let mut config = self.config.write();
            config.enabled = true;
            config.connection_status = ConnectionStatus::Connected;
            config.last_tested = Some(Utc::now());
            config.lists_count = lists_count;
            config.lists_created = all_lists_created;
        }
        self.save().await;

        info!(lists_count, "Sync connection established");

        Ok(ConnectionReport {
            site_id: result.site_id.unwrap_or_default(),
            site_name: result.site_name.unwrap_or_default(),
            lists_count,
            all_lists_created,
            lists: string_list(result.lists),
        })
    }

    /// Creates the missing lists and returns the ones it created.
    pub async fn create_lists(&self) -> Result<Vec<String>, SyncError> {
        let snapshot = self.snapshot();
        if snapshot.connection_status != ConnectionStatus::Connected {
            return Err(SyncError::NotConnected);
        }

        let result = self.run_script(&scripts::create_lists(&snapshot)).await?;
        if !result.success {
            return Err(SyncError::Remote(
                result.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        {
            let mut config = self.config.write();
            config.lists_created = true;
            config.lists_count = LIST_NAMES.len() as u32;
        }
        self.save().await;

        Ok(string_list(result.created))
    }

    /// Fire-and-forget: mirrors `record` into `list` when sync is live.
    pub fn push<T: Serialize>(&self, list: SyncList, record: &T) {
        let config = self.snapshot();
        let list_name = full_list_name(&list.to_string());

        if !config.is_live() {
            debug!(list = %list_name, "Sync skipped");
            return;
        }

        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, list = %list_name, "Failed to serialize record for sync");
                return;
            }
        };

        let script = scripts::create_item(&config, &list_name, &scripts::item_fields(&value));
        let runner = self.runner.clone();

        actix_web::rt::spawn(async move {
            match runner.run(&script, PUSH_TIMEOUT).await {
                Ok(output) => {
                    info!(list = %list_name, output = %output.stdout.trim(), "Sync push finished")
                }
                Err(e) => warn!(list = %list_name, error = %e, "Sync push failed"),
            }
        });
    }
}
