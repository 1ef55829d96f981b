use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; a `.env` file is honoured when present.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared cache backend. In-memory cache when unset.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// Template used when a request does not name one.
    pub default_template: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: optional_env("REDIS_URL"),
            cache_ttl_secs: parse_env("CACHE_TTL_SECS", 3600)?,
            cache_capacity: parse_env("CACHE_CAPACITY", 512)?,
            default_template: optional_env("DEFAULT_TEMPLATE")
                .unwrap_or_else(|| "classic".to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_url: None,
            cache_ttl_secs: 3600,
            cache_capacity: 512,
            default_template: "classic".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
