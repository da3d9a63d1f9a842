//! Environment Configuration
//!
//! Object-storage connection settings and small helpers for reading typed
//! values from the environment.

use std::env;
use std::time::Duration;

/// Event code for objects fetched with GET
pub const OBJECT_ACCESSED_GET: &str = "s3:ObjectAccessed:Get";

/// Error when a configuration value is present but malformed
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Object storage (S3-compatible) connection settings
#[derive(Clone)]
pub struct ObjectStorageConfig {
    /// Endpoint URL, e.g. `http://localhost:9000`
    pub endpoint: String,
    /// SigV4 signing region
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Bucket whose access notifications are consumed
    pub bucket: String,
    /// Notification event codes to subscribe to
    pub events: Vec<String>,
}

impl std::fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("events", &self.events)
            .finish()
    }
}

impl ObjectStorageConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:9000";
    pub const DEFAULT_REGION: &'static str = "us-east-1";
    pub const DEFAULT_BUCKET: &'static str = "downloads";

    /// Load from process environment
    ///
    /// Returns `None` when either credential is missing or empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = (non_empty("S3_ACCESS_KEY"), non_empty("S3_SECRET_KEY"));
        let (access_key, secret_key) = match credentials {
            (Some(access_key), Some(secret_key)) => (access_key, secret_key),
            (None, None) => return None,
            (access_key, _) => {
                tracing::warn!(
                    missing = if access_key.is_none() { "S3_ACCESS_KEY" } else { "S3_SECRET_KEY" },
                    "Only one object storage credential is set, ignoring both"
                );
                return None;
            }
        };

        let events = non_empty("S3_NOTIFICATION_EVENTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|events| !events.is_empty())
            .unwrap_or_else(|| vec![OBJECT_ACCESSED_GET.to_string()]);

        Some(Self {
            endpoint: non_empty("S3_ENDPOINT")
                .unwrap_or_else(|| Self::DEFAULT_ENDPOINT.to_string()),
            region: non_empty("S3_REGION").unwrap_or_else(|| Self::DEFAULT_REGION.to_string()),
            access_key,
            secret_key,
            bucket: non_empty("S3_BUCKET").unwrap_or_else(|| Self::DEFAULT_BUCKET.to_string()),
            events,
        })
    }
}

/// Read a whole-second duration from the environment
///
/// Missing variables fall back to `default`. Zero and non-numeric values
/// are rejected.
pub fn duration_secs_from_env(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_duration_secs(name, &raw),
        Err(_) => Ok(default),
    }
}

/// Read a positive integer from the environment
pub fn positive_usize_from_env(name: &str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(0) => Err(invalid(name, "must be greater than zero")),
            Ok(value) => Ok(value),
            Err(e) => Err(invalid(name, &e.to_string())),
        },
        Err(_) => Ok(default),
    }
}

pub fn parse_duration_secs(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid(name, "must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(invalid(name, &e.to_string())),
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_credentials_yield_none() {
        assert!(ObjectStorageConfig::from_lookup(lookup(&[])).is_none());
        assert!(ObjectStorageConfig::from_lookup(lookup(&[("S3_ACCESS_KEY", "ak")])).is_none());
        assert!(
            ObjectStorageConfig::from_lookup(lookup(&[
                ("S3_ACCESS_KEY", "ak"),
                ("S3_SECRET_KEY", "  ")
            ]))
            .is_none()
        );
    }

    #[test]
    fn test_defaults_applied() {
        let config = ObjectStorageConfig::from_lookup(lookup(&[
            ("S3_ACCESS_KEY", "ak"),
            ("S3_SECRET_KEY", "sk"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, ObjectStorageConfig::DEFAULT_ENDPOINT);
        assert_eq!(config.region, ObjectStorageConfig::DEFAULT_REGION);
        assert_eq!(config.bucket, ObjectStorageConfig::DEFAULT_BUCKET);
        assert_eq!(config.events, vec![OBJECT_ACCESSED_GET.to_string()]);
    }

    #[test]
    fn test_event_list_parsing() {
        let config = ObjectStorageConfig::from_lookup(lookup(&[
            ("S3_ACCESS_KEY", "ak"),
            ("S3_SECRET_KEY", "sk"),
            (
                "S3_NOTIFICATION_EVENTS",
                "s3:ObjectAccessed:Get, s3:ObjectAccessed:Head,",
            ),
        ]))
        .unwrap();

        assert_eq!(
            config.events,
            vec!["s3:ObjectAccessed:Get", "s3:ObjectAccessed:Head"]
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ObjectStorageConfig::from_lookup(lookup(&[
            ("S3_ACCESS_KEY", "ak"),
            ("S3_SECRET_KEY", "super-secret"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(
            parse_duration_secs("X", "3600").unwrap(),
            Duration::from_secs(3600)
        );
        assert!(parse_duration_secs("X", "0").is_err());
        assert!(parse_duration_secs("X", "soon").is_err());
    }
}
