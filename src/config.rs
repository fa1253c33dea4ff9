use std::collections::HashSet;
use std::env;

use uuid::Uuid;

/// Which refresh-token design this deployment runs. Chosen once at startup;
/// requests never branch between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenMode {
    Stateless,
    Stateful,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Absent ⇒ the in-process store. Fine for a single instance; a shared
    /// Redis is required as soon as more than one process serves traffic, or
    /// revocations stop being visible across instances.
    pub redis_url: Option<String>,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub reset_link_ttl_seconds: i64,
    pub refresh_token_mode: RefreshTokenMode,
    /// The read-only demo identity. Absent ⇒ the observer guard is inert.
    pub observer_account_id: Option<Uuid>,
    /// Curated example assets the observer account may browse but never touch.
    pub protected_asset_ids: HashSet<Uuid>,
    pub frontend_url: String,
    pub host: String,
    pub port: u16,
    // SMTP (optional)
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,
            access_token_ttl_seconds: env::var("ACCESS_TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| "25".into())
                .parse()?,
            refresh_token_ttl_seconds: env::var("REFRESH_TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| "2592000".into())
                .parse()?,
            reset_link_ttl_seconds: env::var("RESET_LINK_TTL_SECONDS")
                .unwrap_or_else(|_| "300".into())
                .parse()?,
            refresh_token_mode: match env::var("REFRESH_TOKEN_MODE").as_deref() {
                Ok("stateless") => RefreshTokenMode::Stateless,
                Ok("stateful") | Err(_) => RefreshTokenMode::Stateful,
                Ok(other) => anyhow::bail!("Unknown REFRESH_TOKEN_MODE: {other}"),
            },
            observer_account_id: env::var("OBSERVER_ACCOUNT_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.parse())
                .transpose()?,
            protected_asset_ids: env::var("PROTECTED_ASSET_IDS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT").unwrap_or_else(|_| "8080".into()).parse()?,
            smtp_host: env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            smtp_port: env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()),
            smtp_username: env::var("SMTP_USERNAME").ok().filter(|s| !s.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            smtp_from: env::var("SMTP_FROM").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
