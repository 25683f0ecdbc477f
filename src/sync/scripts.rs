//! PowerShell scripts sent to the external document-list service.
//!
//! Every interpolated value goes through [`quote`], so a single quote in a
//! field or secret cannot end the string literal.

use serde_json::Value;

use crate::sync::config::SyncConfig;

pub const LIST_PREFIX: &str = "CentraPro_";

pub const LIST_NAMES: [&str; 8] = [
    "Timesheets",
    "Employees",
    "Projects",
    "Tasks",
    "Invoices",
    "LeaveRequests",
    "Users",
    "AuditLogs",
];

/// Wraps `value` in single quotes, doubling embedded ones.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn full_list_name(name: &str) -> String {
    format!("{LIST_PREFIX}{name}")
}

/// Acquires a client-credentials token and resolves the site id into `$siteId`.
fn preamble(config: &SyncConfig) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$tokenBody = @{{
  grant_type = 'client_credentials'
  client_id = {client_id}
  client_secret = {client_secret}
  scope = 'https://graph.microsoft.com/.default'
}}
$tokenUri = 'https://login.microsoftonline.com/' + {tenant_id} + '/oauth2/v2.0/token'
$tokenResponse = Invoke-RestMethod -Uri $tokenUri -Method POST -Body $tokenBody -ContentType 'application/x-www-form-urlencoded' -TimeoutSec 30
$headers = @{{ Authorization = 'Bearer ' + $tokenResponse.access_token }}
$site = Invoke-RestMethod -Uri ('https://graph.microsoft.com/v1.0/sites/' + {site}) -Headers $headers -TimeoutSec 30
$siteId = $site.id
$lists = (Invoke-RestMethod -Uri "https://graph.microsoft.com/v1.0/sites/$siteId/lists" -Headers $headers -TimeoutSec 30).value
"#,
        client_id = quote(&config.client_id),
        client_secret = quote(&config.client_secret),
        tenant_id = quote(&config.tenant_id),
        site = quote(&config.site_host()),
    )
}

/// Prints one JSON line: `{success, siteId, siteName, totalLists, centraProListsCount, lists}`
/// or `{success: false, error}`.
pub fn connection_test(config: &SyncConfig) -> String {
    format!(
        r#"try {{
{preamble}
$ours = @($lists | Where-Object {{ $_.displayName -like {prefix} }})
$result = @{{
  success = $true
  siteId = $siteId
  siteName = $site.displayName
  totalLists = @($lists).Count
  centraProListsCount = $ours.Count
  lists = @($lists | ForEach-Object {{ $_.displayName }})
}}
Write-Output ($result | ConvertTo-Json -Compress)
}} catch {{
Write-Output (@{{ success = $false; error = $_.Exception.Message }} | ConvertTo-Json -Compress)
}}
"#,
        preamble = preamble(config),
        prefix = quote(&format!("{LIST_PREFIX}*")),
    )
}

/// Creates each missing list and prints `{success, created}` or `{success: false, error}`.
pub fn create_lists(config: &SyncConfig) -> String {
    let names = LIST_NAMES
        .iter()
        .map(|n| quote(&full_list_name(n)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"try {{
{preamble}
$created = @()
foreach ($name in @({names})) {{
  if (-not ($lists | Where-Object {{ $_.displayName -eq $name }})) {{
    $body = @{{ displayName = $name; list = @{{ template = 'genericList' }} }} | ConvertTo-Json -Depth 5
    Invoke-RestMethod -Uri "https://graph.microsoft.com/v1.0/sites/$siteId/lists" -Method POST -Headers $headers -ContentType 'application/json' -Body $body -TimeoutSec 30 | Out-Null
    $created += $name
  }}
}}
Write-Output (@{{ success = $true; created = $created }} | ConvertTo-Json -Compress)
}} catch {{
Write-Output (@{{ success = $false; error = $_.Exception.Message }} | ConvertTo-Json -Compress)
}}
"#,
        preamble = preamble(config),
    )
}

/// Scalar top-level fields of a record as text. Nested values are skipped.
pub fn item_fields(record: &Value) -> Vec<(String, String)> {
    let Some(object) = record.as_object() else {
        return Vec::new();
    };
    let mut fields: Vec<(String, String)> = object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key.clone(), text))
        })
        .collect();
    fields.sort();
    fields
}

/// Adds one item to `list`.
pub fn create_item(config: &SyncConfig, list: &str, fields: &[(String, String)]) -> String {
    let assignments = fields
        .iter()
        .map(|(key, value)| format!("$fields[{}] = {}", quote(key), quote(value)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"try {{
{preamble}
$target = $lists | Where-Object {{ $_.displayName -eq {list} }}
if ($target) {{
$fields = @{{}}
{assignments}
$item = @{{ fields = $fields }} | ConvertTo-Json -Depth 10
Invoke-RestMethod -Uri "https://graph.microsoft.com/v1.0/sites/$siteId/lists/$($target.id)/items" -Method POST -Headers $headers -ContentType 'application/json' -Body $item -TimeoutSec 30 | Out-Null
Write-Output ('SUCCESS: created in ' + {list})
}} else {{
Write-Output ('ERROR: list not found ' + {list})
}}
}} catch {{
Write-Output ('ERROR: ' + $_.Exception.Message)
}}
"#,
        preamble = preamble(config),
        list = quote(list),
    )
}
