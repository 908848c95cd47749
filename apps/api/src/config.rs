use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};

use crate::invoices::quota::DEFAULT_FREE_INVOICE_LIMIT;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Sent invoices allowed on the free plan.
    pub free_invoice_limit: i32,
    pub session_ttl_hours: i64,
    /// Offset used to decide what "today" is for due-date math. Defaults to WIB (UTC+7).
    pub utc_offset_hours: i32,
    /// Registering with this email grants the admin flag.
    pub admin_email: Option<String>,
    pub upgrade_price: i64,
    pub upgrade_bank_account: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            free_invoice_limit: parse_env("FREE_INVOICE_LIMIT", DEFAULT_FREE_INVOICE_LIMIT)?,
            session_ttl_hours: parse_env("SESSION_TTL_HOURS", 720)?,
            utc_offset_hours: parse_env("APP_UTC_OFFSET_HOURS", 7)?,
            admin_email: optional_env("ADMIN_EMAIL").map(|e| e.to_lowercase()),
            upgrade_price: parse_env("UPGRADE_PRICE", 29_000)?,
            upgrade_bank_account: optional_env("UPGRADE_BANK_ACCOUNT"),
        })
    }

    /// The current calendar date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        let offset = FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or(Utc.fix());
        Utc::now().with_timezone(&offset).date_naive()
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/invokit_test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            free_invoice_limit: DEFAULT_FREE_INVOICE_LIMIT,
            session_ttl_hours: 1,
            utc_offset_hours: 7,
            admin_email: Some("admin@invokit.test".to_string()),
            upgrade_price: 29_000,
            upgrade_bank_account: Some("BCA 1234567890 a.n. InvoKit".to_string()),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
