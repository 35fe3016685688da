use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    activity::{DEFAULT_CAPACITY, DEFAULT_LISTENER_BUFFER},
    logging::LoggingConfig,
    registry::{DEFAULT_ACCOUNT_ID, DEFAULT_REGION},
};

pub const ENV_PREFIX: &str = "SNSIM";
pub const DEFAULT_QUEUE_ENDPOINT: &str = "http://localhost:9320";
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 262_144;

/// Account and region used to derive identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub account_id: String,
    pub region: String,
}

/// HTTP delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub enabled: bool,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub timeout_seconds: u64,
}

/// Queue-service delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub enabled: bool,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySettings {
    pub capacity: usize,
    pub listener_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    pub max_size: usize,
}

/// Developer conveniences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeveloperSettings {
    /// New subscriptions skip the pending state.
    pub auto_confirm_subscriptions: bool,
}

/// Full runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub account: AccountSettings,
    pub http: HttpSettings,
    pub queue: QueueSettings,
    pub activity: ActivitySettings,
    pub messages: MessageSettings,
    pub developer: DeveloperSettings,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Defaults overlaid with `SNSIM__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Defaults, then the optional file (format picked by extension), then
    /// the environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("account.account_id", DEFAULT_ACCOUNT_ID)?
            .set_default("account.region", DEFAULT_REGION)?
            .set_default("http.enabled", true)?
            .set_default("http.max_retries", 3_i64)?
            .set_default("http.retry_backoff_ms", 100_i64)?
            .set_default("http.timeout_seconds", 5_i64)?
            .set_default("queue.enabled", true)?
            .set_default("queue.endpoint", DEFAULT_QUEUE_ENDPOINT)?
            .set_default("activity.capacity", DEFAULT_CAPACITY as i64)?
            .set_default("activity.listener_buffer", DEFAULT_LISTENER_BUFFER as i64)?
            .set_default("messages.max_size", DEFAULT_MAX_MESSAGE_SIZE as i64)?
            .set_default("developer.auto_confirm_subscriptions", true)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Defaults
////////////////////////////////////////////////////////////////////////////////

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            retry_backoff_ms: 100,
            timeout_seconds: 5,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_QUEUE_ENDPOINT.to_string(),
        }
    }
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            listener_buffer: DEFAULT_LISTENER_BUFFER,
        }
    }
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Default for DeveloperSettings {
    fn default() -> Self {
        Self {
            auto_confirm_subscriptions: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_match_loaded() {
        let loaded = Settings::load_from(None).unwrap();
        let defaults = Settings::default();
        assert_eq!(loaded.account, defaults.account);
        assert_eq!(loaded.http, defaults.http);
        assert_eq!(loaded.queue, defaults.queue);
        assert_eq!(loaded.activity, defaults.activity);
        assert_eq!(loaded.messages.max_size, 262_144);
        assert!(loaded.developer.auto_confirm_subscriptions);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[http]\nmax_retries = 1\nretry_backoff_ms = 5").unwrap();
        writeln!(file, "[developer]\nauto_confirm_subscriptions = false").unwrap();

        let settings = Settings::load_from(Some(file.path())).unwrap();

        assert_eq!(settings.http.max_retries, 1);
        assert_eq!(settings.http.retry_backoff_ms, 5);
        assert!(settings.http.enabled);
        assert!(!settings.developer.auto_confirm_subscriptions);
        assert_eq!(settings.account.region, DEFAULT_REGION);
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/definitely/not/here/snsim.toml");
        assert!(Settings::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_timeout() {
        assert_eq!(HttpSettings::default().timeout(), Duration::from_secs(5));
    }
}
