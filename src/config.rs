//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! tuning constants for the Telegram and search layers.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub telegram_token: String,
    /// Legacy name of the token, used only when `telegram_token` is unset
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    /// Comma-separated list of allowed user IDs. Empty means everybody.
    #[serde(rename = "allowed_users")]
    pub allowed_users_str: Option<String>,

    /// Base URL of the LeakOsint search API
    #[serde(default = "default_api_url")]
    pub leakosint_api_url: String,
    /// LeakOsint API credential
    #[serde(default)]
    pub leakosint_api_token: String,
    /// Timeout of a single search call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub leakosint_timeout_secs: u64,

    /// Language code sent with every search
    #[serde(default = "default_search_lang")]
    pub search_lang: String,
    /// Maximum number of results requested per search
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Maximum rendered length of one report page
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Send pages with HTML markup (falls back to plain text when rejected)
    #[serde(default = "default_rich_text")]
    pub rich_text: bool,

    /// How long a report stays navigable, in seconds
    #[serde(default = "default_report_cache_ttl")]
    pub report_cache_ttl_secs: u64,
    /// Maximum number of reports kept in memory
    #[serde(default = "default_report_cache_max_size")]
    pub report_cache_max_size: u64,

    /// Delay before reconnecting after the polling loop failed, in seconds
    #[serde(default = "default_restart_delay")]
    pub polling_restart_delay_secs: u64,
}

/// Default LeakOsint endpoint.
pub const DEFAULT_API_URL: &str = "https://leakosintapi.com/";
/// Default search language.
pub const DEFAULT_SEARCH_LANG: &str = "en";
/// Default number of results requested per search.
pub const DEFAULT_SEARCH_LIMIT: u32 = 300;
/// Telegram's hard limit for a single message.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4096;
/// Default search timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Reports expire after one day by default.
pub const REPORT_CACHE_TTL_SECS: u64 = 86_400;
/// Maximum number of cached reports.
pub const REPORT_CACHE_MAX_SIZE: u64 = 10_000;
/// Delay between polling restarts.
pub const POLLING_RESTART_DELAY_SECS: u64 = 5;

// Telegram API retry configuration
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum attempts for a Telegram API operation
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_search_lang() -> String {
    DEFAULT_SEARCH_LANG.to_string()
}

const fn default_search_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

const fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

const fn default_rich_text() -> bool {
    true
}

const fn default_report_cache_ttl() -> u64 {
    REPORT_CACHE_TTL_SECS
}

const fn default_report_cache_max_size() -> u64 {
    REPORT_CACHE_MAX_SIZE
}

const fn default_restart_delay() -> u64 {
    POLLING_RESTART_DELAY_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            telegram_bot_token: None,
            allowed_users_str: None,
            leakosint_api_url: default_api_url(),
            leakosint_api_token: String::new(),
            leakosint_timeout_secs: DEFAULT_TIMEOUT_SECS,
            search_lang: default_search_lang(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            rich_text: true,
            report_cache_ttl_secs: REPORT_CACHE_TTL_SECS,
            report_cache_max_size: REPORT_CACHE_MAX_SIZE,
            polling_restart_delay_secs: POLLING_RESTART_DELAY_SECS,
        }
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use osint_lookup_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Prefixed overrides, e.g. `APP__SEARCH_LIMIT`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain variables; empty ones count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.resolve_legacy_token();
        settings.validate()?;
        Ok(settings)
    }

    /// Falls back to `TELEGRAM_BOT_TOKEN` when `TELEGRAM_TOKEN` is unset.
    fn resolve_legacy_token(&mut self) {
        if self.telegram_token.trim().is_empty() {
            if let Some(legacy) = self.telegram_bot_token.take() {
                self.telegram_token = legacy;
            }
        }
    }

    /// Checks values that have no sensible default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN (or TELEGRAM_BOT_TOKEN) must be set".to_string(),
            ));
        }
        if self.max_message_length <= 150 {
            return Err(ConfigError::Message(format!(
                "MAX_MESSAGE_LENGTH must be greater than 150, got {}",
                self.max_message_length
            )));
        }
        Ok(())
    }

    /// Returns a set of Telegram IDs that are allowed to use the bot.
    ///
    /// An empty set means the allow-list is not configured.
    #[must_use]
    pub fn allowed_users(&self) -> HashSet<i64> {
        self.allowed_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Timeout applied to every search call
    #[must_use]
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.leakosint_timeout_secs)
    }

    /// Delay between polling restarts
    #[must_use]
    pub const fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.polling_restart_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Single test so environment mutations never race each other
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        // 1. Defaults with only the token present
        env::set_var("TELEGRAM_TOKEN", "dummy_token");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.leakosint_api_url, DEFAULT_API_URL);
        assert_eq!(settings.search_limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(settings.max_message_length, DEFAULT_MAX_MESSAGE_LENGTH);
        assert!(settings.rich_text);

        env::remove_var("TELEGRAM_TOKEN");

        // 2. Legacy variable name and numeric overrides
        env::set_var("TELEGRAM_BOT_TOKEN", "legacy_token");
        env::set_var("SEARCH_LIMIT", "50");
        env::set_var("SEARCH_LANG", "ru");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "legacy_token");
        assert_eq!(settings.search_limit, 50);
        assert_eq!(settings.search_lang, "ru");

        env::remove_var("SEARCH_LIMIT");
        env::remove_var("SEARCH_LANG");

        // 3. Both names set: the current one wins
        env::set_var("TELEGRAM_TOKEN", "current_token");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "current_token");

        env::remove_var("TELEGRAM_TOKEN");
        env::remove_var("TELEGRAM_BOT_TOKEN");

        // 4. Empty token is rejected
        env::set_var("TELEGRAM_TOKEN", "");
        assert!(Settings::new().is_err());
        env::remove_var("TELEGRAM_TOKEN");
        Ok(())
    }

    #[test]
    fn test_list_parsing() {
        let mut settings = Settings::default();
        assert!(settings.allowed_users().is_empty());

        // Test comma
        settings.allowed_users_str = Some("123,456".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&123));
        assert!(allowed.contains(&456));
        assert_eq!(allowed.len(), 2);

        // Test semicolon and mixed
        settings.allowed_users_str = Some("333; 444, 555".to_string());
        let allowed = settings.allowed_users();
        assert_eq!(allowed.len(), 3);

        // Test empty/bad parsing
        settings.allowed_users_str = Some("abc, 777".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&777));
        assert_eq!(allowed.len(), 1);
    }

    #[test]
    fn test_legacy_token_only_fills_missing_token() {
        let mut settings = Settings {
            telegram_token: "current".to_string(),
            telegram_bot_token: Some("legacy".to_string()),
            ..Settings::default()
        };
        settings.resolve_legacy_token();
        assert_eq!(settings.telegram_token, "current");

        let mut settings = Settings {
            telegram_bot_token: Some("legacy".to_string()),
            ..Settings::default()
        };
        settings.resolve_legacy_token();
        assert_eq!(settings.telegram_token, "legacy");
    }

    #[test]
    fn test_validate_rejects_tiny_page_length() {
        let settings = Settings {
            telegram_token: "token".to_string(),
            max_message_length: 100,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
