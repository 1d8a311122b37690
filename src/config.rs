use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;
use crate::feed::letterboxd_platform::DEFAULT_BASE_URL;

#[derive(Clone, Debug)]
pub struct Config {
    pub poll_interval: Duration,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    pub discord_token: String,
    pub discord_api_url: String,
    pub feed_base_url: String,
    /// Maximum number of entries rendered into one digest.
    pub entry_limit: usize,
    pub fetch_timeout: Duration,
    pub delivery_timeout: Duration,
    /// How many subscribers are fetched at the same time within a cycle.
    pub fetch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30 * 60),
            db_url: "sqlite://data/fizzboxd.db".to_string(),
            db_path: "data/fizzboxd.db".to_string(),
            logs_path: PathBuf::from("logs"),
            discord_token: String::new(),
            discord_api_url: "https://discord.com/api/v10".to_string(),
            feed_base_url: DEFAULT_BASE_URL.to_string(),
            entry_limit: 4,
            fetch_timeout: Duration::from_secs(30),
            delivery_timeout: Duration::from_secs(30),
            fetch_concurrency: 4,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides defaults with values from the environment.
    ///
    /// Unparsable numbers keep their default.
    pub fn load(&mut self) -> Result<(), AppError> {
        let defaults = Self::default();

        self.poll_interval = env_secs("POLL_INTERVAL").unwrap_or(defaults.poll_interval);
        self.db_url = std::env::var("DB_URL").unwrap_or(defaults.db_url);
        self.db_path = std::env::var("DB_PATH").unwrap_or(defaults.db_path);
        self.logs_path = std::env::var("LOGS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.logs_path);
        self.discord_token = std::env::var("DISCORD_TOKEN").unwrap_or_default();
        self.discord_api_url = std::env::var("DISCORD_API_URL").unwrap_or(defaults.discord_api_url);
        self.feed_base_url = std::env::var("FEED_BASE_URL").unwrap_or(defaults.feed_base_url);
        self.entry_limit = env_parse("ENTRY_LIMIT")
            .filter(|v| *v > 0)
            .unwrap_or(defaults.entry_limit);
        self.fetch_timeout = env_secs("FETCH_TIMEOUT")
            .filter(|d| !d.is_zero())
            .unwrap_or(defaults.fetch_timeout);
        self.delivery_timeout = env_secs("DELIVERY_TIMEOUT")
            .filter(|d| !d.is_zero())
            .unwrap_or(defaults.delivery_timeout);
        self.fetch_concurrency = env_parse("FETCH_CONCURRENCY")
            .filter(|v| *v > 0)
            .unwrap_or(defaults.fetch_concurrency);

        if self.poll_interval.is_zero() {
            return Err(AppError::ConfigurationError {
                msg: "POLL_INTERVAL must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Fails unless a Discord bot token is configured.
    pub fn require_discord_token(&self) -> Result<&str, AppError> {
        if self.discord_token.trim().is_empty() {
            return Err(AppError::MissingConfig {
                key: "DISCORD_TOKEN".to_string(),
            });
        }
        Ok(&self.discord_token)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}
