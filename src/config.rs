use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
    pub seed_demo_data: bool,

    // Invoicing
    pub invoice_hourly_rate: f64,
    pub invoice_min_weeks: usize,
    /// Command that reads invoice HTML on stdin and writes a PDF to stdout.
    pub invoice_pdf_command: Option<String>,
    pub mail_from: String,

    // External document-list sync
    pub sync_config_path: PathBuf,
    pub sync_shell: String,
    pub sync_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:4000".to_string(),
            jwt_secret: "dev_secret_please_change".to_string(),
            access_token_ttl: 900,     // 15 min
            refresh_token_ttl: 604800, // 7 days
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            seed_demo_data: true,
            invoice_hourly_rate: 50.0,
            invoice_min_weeks: 4,
            invoice_pdf_command: None,
            mail_from: "noreply@centrapro.com".to_string(),
            sync_config_path: PathBuf::from("sync-config.json"),
            sync_shell: "pwsh".to_string(),
            sync_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            access_token_ttl: parse_var("ACCESS_TOKEN_TTL", defaults.access_token_ttl)?,
            refresh_token_ttl: parse_var("REFRESH_TOKEN_TTL", defaults.refresh_token_ttl)?,

            rate_login_per_min: parse_var("RATE_LOGIN_PER_MIN", defaults.rate_login_per_min)?,
            rate_refresh_per_min: parse_var("RATE_REFRESH_PER_MIN", defaults.rate_refresh_per_min)?,
            rate_protected_per_min: parse_var(
                "RATE_PROTECTED_PER_MIN",
                defaults.rate_protected_per_min,
            )?,

            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            log_dir: env::var("LOG_DIR").unwrap_or(defaults.log_dir),
            seed_demo_data: parse_var("SEED_DEMO_DATA", defaults.seed_demo_data)?,

            invoice_hourly_rate: parse_var("INVOICE_HOURLY_RATE", defaults.invoice_hourly_rate)?,
            invoice_min_weeks: parse_var("INVOICE_MIN_WEEKS", defaults.invoice_min_weeks)?,
            invoice_pdf_command: env::var("INVOICE_PDF_COMMAND")
                .ok()
                .filter(|c| !c.trim().is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or(defaults.mail_from),

            sync_config_path: env::var("SYNC_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sync_config_path),
            sync_shell: env::var("SYNC_SHELL").unwrap_or(defaults.sync_shell),
            sync_timeout_secs: parse_var("SYNC_TIMEOUT_SECS", defaults.sync_timeout_secs)?,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_dev_setup() {
        let config = Config::default();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.invoice_min_weeks, 4);
        assert_eq!(config.invoice_hourly_rate, 50.0);
        assert!(config.invoice_pdf_command.is_none());
    }

    #[test]
    fn parse_var_falls_back_when_unset() {
        let value: u32 = parse_var("CENTRAPRO_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
