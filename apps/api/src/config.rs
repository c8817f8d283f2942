use anyhow::{Context, Result};

/// Default number of utterances kept in the rolling conversation context.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Single allowed CORS origin; permissive when unset.
    pub cors_origin: Option<String>,
    pub history_window: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            cors_origin: optional_env("CORS_ORIGIN"),
            history_window: match optional_env("HISTORY_WINDOW") {
                Some(v) => parse_history_window(&v)?,
                None => DEFAULT_HISTORY_WINDOW,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_history_window(value: &str) -> Result<usize> {
    let window = value
        .trim()
        .parse::<usize>()
        .context("HISTORY_WINDOW must be a positive integer")?;
    anyhow::ensure!(window >= 2, "HISTORY_WINDOW must be at least 2");
    Ok(window)
}
