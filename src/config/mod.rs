//! Configuration module for the SEO publisher.
//!
//! Configuration is loaded from environment variables (optionally via `.env`).
//! Credentials and staging-store coordinates have no defaults: startup fails
//! when they are missing or still hold a `YOUR_...` placeholder.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default chat-completion endpoint.
pub const DEFAULT_API_URL: &str = "https://api.x.ai/v1/chat/completions";

/// Default year the generation prompts are anchored to.
pub const DEFAULT_TRENDS_YEAR: i32 = 2025;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the language-model API
    pub api_key: String,
    /// Chat-completion endpoint URL
    pub api_url: String,
    /// Pre-shared key for operator API authentication (optional in development)
    pub api_psk: Option<String>,
    /// Path to the primary SQLite database file
    pub primary_db_path: PathBuf,
    /// Connection URL of the staging store
    pub staging_db_url: String,
    /// Table prefix of the staging store
    pub staging_table_prefix: String,
    /// Public URL of the staging site, used for post guids
    pub staging_site_url: String,
    /// Author id that owns drafts in the staging store
    pub staging_author_id: i64,
    /// Year referenced by the SEO prompts
    pub trends_year: i32,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Startup configuration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset, empty or a placeholder.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "required configuration {} is not set", key),
            ConfigError::Invalid { key, reason } => write!(f, "invalid {}: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !is_placeholder(v));
        let required = |key: &'static str| value(key).ok_or(ConfigError::Missing(key));

        let api_key = required("SEO_XAI_API_KEY")?;
        let api_url = value("SEO_XAI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_psk = value("SEO_API_PSK");

        let primary_db_path = value("SEO_PRIMARY_DB_PATH")
            .unwrap_or_else(|| "./data/primary.sqlite".to_string())
            .into();

        let staging_db_url = required("SEO_STAGING_DATABASE_URL")?;

        let staging_table_prefix = required("SEO_STAGING_TABLE_PREFIX")?;
        if !staging_table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid {
                key: "SEO_STAGING_TABLE_PREFIX",
                reason: "only letters, digits and underscores are allowed".to_string(),
            });
        }

        let staging_site_url = required("SEO_STAGING_SITE_URL")?
            .trim_end_matches('/')
            .to_string();

        let staging_author_id = parse_or("SEO_STAGING_AUTHOR_ID", value("SEO_STAGING_AUTHOR_ID"), 1)?;
        let trends_year = parse_or("SEO_TRENDS_YEAR", value("SEO_TRENDS_YEAR"), DEFAULT_TRENDS_YEAR)?;
        let bind_addr = parse_or(
            "SEO_BIND_ADDR",
            value("SEO_BIND_ADDR"),
            SocketAddr::from(([127, 0, 0, 1], 8080)),
        )?;

        let log_level = value("SEO_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            api_key,
            api_url,
            api_psk,
            primary_db_path,
            staging_db_url,
            staging_table_prefix,
            staging_site_url,
            staging_author_id,
            trends_year,
            bind_addr,
            log_level,
        })
    }
}

fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.starts_with("YOUR_")
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
