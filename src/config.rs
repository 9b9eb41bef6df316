//! Runtime configuration.
//!
//! Values come from explicit overrides, then `WORDBANK_*` environment
//! variables, then built-in defaults. The binary loads a `.env` file first,
//! so anything set there behaves like a real environment variable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::{DEFAULT_BUSY_TIMEOUT, DEFAULT_STATEMENT_TIMEOUT};
use crate::fetcher::{
    DEFAULT_LOCALE, DEFAULT_URL_TEMPLATE, FetchError, HttpPageSource, HttpPageSourceBuilder,
    RetryPolicy,
};

pub const ENV_DB_PATH: &str = "WORDBANK_DB_PATH";
pub const ENV_SOURCE_URL: &str = "WORDBANK_SOURCE_URL";
pub const ENV_LOCALE: &str = "WORDBANK_LOCALE";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "WORDBANK_FETCH_TIMEOUT_SECS";
pub const ENV_FETCH_ATTEMPTS: &str = "WORDBANK_FETCH_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "WORDBANK_RETRY_DELAY_MS";
pub const ENV_DB_TIMEOUT_MS: &str = "WORDBANK_DB_TIMEOUT_MS";
pub const ENV_STATEMENT_TIMEOUT_MS: &str = "WORDBANK_STATEMENT_TIMEOUT_MS";
pub const ENV_BATCH_SIZE: &str = "WORDBANK_BATCH_SIZE";

/// Default number of words per migration batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to determine default database path: {0}")]
    NoDataDir(String),
}

/// Resolved configuration for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` means the platform default from [`crate::utils::get_database_path`].
    pub db_path: Option<PathBuf>,
    pub source_url: String,
    pub locale: String,
    pub fetch_timeout: Duration,
    pub fetch_attempts: u32,
    pub retry_delay: Duration,
    pub db_timeout: Duration,
    pub statement_timeout: Duration,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            source_url: DEFAULT_URL_TEMPLATE.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            fetch_timeout: Duration::from_secs(10),
            fetch_attempts: 3,
            retry_delay: Duration::from_secs(1),
            db_timeout: DEFAULT_BUSY_TIMEOUT,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Reads every `WORDBANK_*` variable on top of the defaults.
    ///
    /// Unset or empty variables keep their default. A variable that is set
    /// but does not parse is an error rather than a silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = env_string(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(url) = env_string(ENV_SOURCE_URL) {
            config.source_url = url;
        }
        if let Some(locale) = env_string(ENV_LOCALE) {
            config.locale = locale;
        }
        if let Some(secs) = env_parse::<u64>(ENV_FETCH_TIMEOUT_SECS, "number of seconds")? {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<u32>(ENV_FETCH_ATTEMPTS, "attempt count")? {
            config.fetch_attempts = attempts.max(1);
        }
        if let Some(ms) = env_parse::<u64>(ENV_RETRY_DELAY_MS, "number of milliseconds")? {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>(ENV_DB_TIMEOUT_MS, "number of milliseconds")? {
            config.db_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>(ENV_STATEMENT_TIMEOUT_MS, "number of milliseconds")? {
            config.statement_timeout = Duration::from_millis(ms);
        }
        if let Some(size) = env_parse::<usize>(ENV_BATCH_SIZE, "batch size")? {
            config.batch_size = size.max(1);
        }

        Ok(config)
    }

    /// The database path, falling back to the platform data directory.
    pub fn resolved_db_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => crate::utils::get_database_path()
                .map_err(|e| ConfigError::NoDataDir(e.to_string())),
        }
    }

    /// Retry policy for upstream fetches.
    pub fn fetch_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch_attempts, self.retry_delay)
    }

    /// Builds the HTTP page source from this configuration.
    pub fn page_source(&self) -> Result<HttpPageSource, FetchError> {
        HttpPageSourceBuilder::new()
            .url_template(self.source_url.clone())
            .locale(self.locale.clone())
            .timeout(self.fetch_timeout)
            .build()
    }
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match env_string(var) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var,
                value,
                expected,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 9] = [
        ENV_DB_PATH,
        ENV_SOURCE_URL,
        ENV_LOCALE,
        ENV_FETCH_TIMEOUT_SECS,
        ENV_FETCH_ATTEMPTS,
        ENV_RETRY_DELAY_MS,
        ENV_DB_TIMEOUT_MS,
        ENV_STATEMENT_TIMEOUT_MS,
        ENV_BATCH_SIZE,
    ];

    fn clear_env() {
        for var in ALL_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_when_env_not_set() {
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.fetch_policy(), RetryPolicy::default());
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_DB_PATH, "/tmp/wordbank-test.db");
            std::env::set_var(ENV_LOCALE, "en-us");
            std::env::set_var(ENV_FETCH_ATTEMPTS, "5");
            std::env::set_var(ENV_RETRY_DELAY_MS, "250");
            std::env::set_var(ENV_BATCH_SIZE, "10");
            std::env::set_var(ENV_STATEMENT_TIMEOUT_MS, "2000");
        }

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/wordbank-test.db")));
        assert_eq!(config.locale, "en-us");
        assert_eq!(config.fetch_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.statement_timeout, Duration::from_secs(2));
        assert_eq!(config.db_timeout, DEFAULT_BUSY_TIMEOUT);
        assert_eq!(config.source_url, DEFAULT_URL_TEMPLATE);
    }

    #[test]
    #[serial]
    fn unparseable_value_is_an_error() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_BATCH_SIZE, "lots");
        }

        let result = Config::from_env();
        clear_env();

        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                var: ENV_BATCH_SIZE,
                value: "lots".to_string(),
                expected: "batch size",
            })
        );
    }

    #[test]
    #[serial]
    fn zero_batch_size_is_raised_to_one() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_BATCH_SIZE, "0");
            std::env::set_var(ENV_FETCH_ATTEMPTS, "0");
        }

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.batch_size, 1);
        assert_eq!(config.fetch_attempts, 1);
    }

    #[test]
    fn explicit_db_path_is_used_verbatim() {
        let config = Config {
            db_path: Some(PathBuf::from("words.db")),
            ..Config::default()
        };
        assert_eq!(config.resolved_db_path().unwrap(), PathBuf::from("words.db"));
    }

    #[test]
    fn page_source_uses_configured_template() {
        let config = Config {
            source_url: "https://dict.test/?q={word}&l={locale}".to_string(),
            locale: "zh-tw".to_string(),
            ..Config::default()
        };

        let source = config.page_source().unwrap();

        assert_eq!(source.url_for("quick"), "https://dict.test/?q=quick&l=zh-tw");
    }
}
