//! Runtime configuration read from `WMS_*` environment variables.

use thiserror::Error;
use utils::document_number::{PrefixError, PrefixTable};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://wms.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_INSERT_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Prefix(#[from] PrefixError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Total create attempts when the submitted number is already taken; 1 disables retry
    pub insert_attempts: u32,
    pub prefixes: PrefixTable,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            insert_attempts: DEFAULT_INSERT_ATTEMPTS,
            prefixes: PrefixTable::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let prefixes = PrefixTable::from_lookup(&get)?;

        Ok(Self {
            host: get("WMS_HOST").unwrap_or(defaults.host),
            port: match get("WMS_PORT") {
                Some(value) => parse_value("WMS_PORT", &value, "a TCP port")?,
                None => defaults.port,
            },
            database_url: get("WMS_DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: match get("WMS_MAX_CONNECTIONS") {
                Some(value) => parse_positive("WMS_MAX_CONNECTIONS", &value)?,
                None => defaults.max_connections,
            },
            insert_attempts: match get("WMS_INSERT_ATTEMPTS") {
                Some(value) => parse_positive("WMS_INSERT_ATTEMPTS", &value)?,
                None => defaults.insert_attempts,
            },
            prefixes,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(
    key: &str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, expected))
}

fn parse_positive(key: &str, value: &str) -> Result<u32, ConfigError> {
    match parse_value::<u32>(key, value, "a positive integer")? {
        0 => Err(invalid(key, value, "a positive integer")),
        parsed => Ok(parsed),
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use utils::document_number::DocumentKind;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.insert_attempts, DEFAULT_INSERT_ATTEMPTS);
        assert_eq!(config.prefixes, PrefixTable::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("WMS_HOST", "0.0.0.0"),
            ("WMS_PORT", "8080"),
            ("WMS_INSERT_ATTEMPTS", "1"),
            ("WMS_PREFIX_RECEIPT", "GRN"),
            ("WMS_MAX_CONNECTIONS", " "),
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.insert_attempts, 1);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.prefixes.prefix(DocumentKind::Receipt), "GRN");
        assert_eq!(config.prefixes.prefix(DocumentKind::Delivery), "DEL");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            config_from(&[("WMS_PORT", "eighty")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("WMS_INSERT_ATTEMPTS", "0")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config_from(&[("WMS_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "WMS_MAX_CONNECTIONS"
        ));
        assert!(matches!(
            config_from(&[("WMS_PREFIX_TRANSFER", "ADJ")]),
            Err(ConfigError::Prefix(PrefixError::Duplicate(_)))
        ));
    }
}
