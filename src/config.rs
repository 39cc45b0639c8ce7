use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error};

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings read once at startup and handed to the notifier.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub provider_url: String,
    pub provider_auth_key: String,
    pub sender_id: String,
    pub provider_timeout: Duration,
    pub max_db_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => {
                debug!("Successfully loaded {}", name);
                Ok(value)
            }
            _ => {
                error!("Failed to load {}", name);
                Err(ConfigError::Missing(name))
            }
        };

        let database_url = required("DATABASE_URL")?;
        let provider_url = required("MSGCLUB_URL")?;
        let provider_auth_key = required("MSGCLUB_AUTH_KEY")?;
        let sender_id = required("SENDER_ID")?;

        let timeout_secs = parse_optional(
            &lookup,
            "MSGCLUB_TIMEOUT_SECS",
            DEFAULT_PROVIDER_TIMEOUT_SECS,
        )?;
        let max_db_connections = parse_optional(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_MAX_DB_CONNECTIONS,
        )?;

        Ok(Self {
            database_url,
            provider_url,
            provider_auth_key,
            sender_id,
            provider_timeout: Duration::from_secs(timeout_secs),
            max_db_connections,
        })
    }

    /// Provider URL with the auth key carried in the query string.
    pub fn provider_endpoint(&self) -> String {
        let separator = if self.provider_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}AUTH_KEY={}",
            self.provider_url,
            separator,
            urlencoding::encode(&self.provider_auth_key)
        )
    }
}

fn parse_optional<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| {
                error!("Failed to parse {}: {}", name, e);
                ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                }
            })
        }
        _ => Ok(default),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("provider_url", &self.provider_url)
            .field("provider_auth_key", &"<redacted>")
            .field("sender_id", &self.sender_id)
            .field("provider_timeout", &self.provider_timeout)
            .field("max_db_connections", &self.max_db_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn full() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://user:secret@db/prod"),
            ("MSGCLUB_URL", "https://msg.example/api/whatsapp"),
            ("MSGCLUB_AUTH_KEY", "k3y&x=1"),
            ("SENDER_ID", "PLANT"),
        ]
    }

    #[test]
    fn loads_required_fields_with_defaults() {
        let config = Config::from_lookup(env(&full())).unwrap();
        assert_eq!(config.sender_id, "PLANT");
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.max_db_connections, 5);
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let mut pairs = full();
        pairs.retain(|(k, _)| *k != "SENDER_ID");
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SENDER_ID")));
    }

    #[test]
    fn blank_field_counts_as_missing() {
        let pairs: Vec<_> = full()
            .into_iter()
            .map(|(k, v)| if k == "MSGCLUB_AUTH_KEY" { (k, "  ") } else { (k, v) })
            .collect();
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MSGCLUB_AUTH_KEY")));
    }

    #[test]
    fn unparsable_timeout_is_invalid() {
        let mut pairs = full();
        pairs.push(("MSGCLUB_TIMEOUT_SECS", "soon"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "MSGCLUB_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn endpoint_encodes_auth_key() {
        let config = Config::from_lookup(env(&full())).unwrap();
        assert_eq!(
            config.provider_endpoint(),
            "https://msg.example/api/whatsapp?AUTH_KEY=k3y%26x%3D1"
        );

        let mut with_query = config.clone();
        with_query.provider_url = "https://msg.example/send?v=2".to_string();
        assert_eq!(
            with_query.provider_endpoint(),
            "https://msg.example/send?v=2&AUTH_KEY=k3y%26x%3D1"
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let config = Config::from_lookup(env(&full())).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("k3y"));
    }
}
