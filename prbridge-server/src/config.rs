use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Secret for deriving CSRF tokens from session tokens.
    pub session_secret: String,
    /// Session lifetime in minutes before a refresh is required.
    pub session_ttl_minutes: i64,
    /// Stripe API secret key. If not set, payment endpoints return 503.
    pub stripe_secret_key: Option<String>,
    /// If set, counterparty notifications are POSTed to this URL;
    /// otherwise they are logged.
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let session_secret = env::var("SESSION_SECRET")
            .context("SESSION_SECRET environment variable is required")?;

        let session_ttl_minutes = env::var("SESSION_TTL_MINUTES")
            .unwrap_or_else(|_| "720".to_string())
            .parse::<i64>()
            .context("SESSION_TTL_MINUTES must be a valid number")?;

        let stripe_secret_key = parse_optional(env::var("STRIPE_SECRET_KEY").ok());
        let notify_webhook_url = parse_optional(env::var("NOTIFY_WEBHOOK_URL").ok());

        Ok(Config {
            port,
            state_dir,
            session_secret,
            session_ttl_minutes,
            stripe_secret_key,
            notify_webhook_url,
        })
    }
}

/// Parse an optional env value, treating empty/whitespace-only as unset.
///
/// This prevents an empty `STRIPE_SECRET_KEY=` from enabling payment
/// endpoints with an unusable key.
pub fn parse_optional(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
