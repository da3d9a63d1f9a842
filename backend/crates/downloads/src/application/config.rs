//! Application Configuration
//!
//! Configuration for the download-accounting application layer.

use std::time::Duration;

use crate::error::{DownloadError, DownloadResult};

/// Upper bound on the tracking window (one year)
pub const MAX_TRACKING_WINDOW: Duration = Duration::from_secs(365 * 24 * 3600);

/// Download counter configuration
#[derive(Clone)]
pub struct CounterConfig {
    /// Sliding window during which repeat visits are not re-counted
    pub tracking_window: Duration,
    /// Period of the expired-tracker sweep
    pub sweep_interval: Duration,
    /// Secret salt for client fingerprints
    pub ip_salt: Vec<u8>,
    /// Maximum notifications processed concurrently
    pub max_in_flight: usize,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            tracking_window: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(3600),
            ip_salt: Vec::new(),
            max_in_flight: 16,
        }
    }
}

impl std::fmt::Debug for CounterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterConfig")
            .field("tracking_window", &self.tracking_window)
            .field("sweep_interval", &self.sweep_interval)
            .field("ip_salt", &"<redacted>")
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

impl CounterConfig {
    /// Create config with a random salt (for development)
    ///
    /// Fingerprints change across restarts, so dedup does not survive them.
    pub fn with_random_salt() -> Self {
        use rand::RngCore;
        let mut salt = vec![0u8; 32];
        rand::rng().fill_bytes(&mut salt);
        Self {
            ip_salt: salt,
            ..Default::default()
        }
    }

    pub fn with_salt(salt: impl Into<Vec<u8>>) -> Self {
        Self {
            ip_salt: salt.into(),
            ..Default::default()
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> DownloadResult<()> {
        if self.ip_salt.is_empty() {
            return Err(DownloadError::InvalidConfig(
                "fingerprint salt must not be empty".to_string(),
            ));
        }
        if self.tracking_window.is_zero() || self.tracking_window > MAX_TRACKING_WINDOW {
            return Err(DownloadError::InvalidConfig(
                "tracking window must be between one second and one year".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(DownloadError::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(DownloadError::InvalidConfig(
                "max in-flight notifications must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Tracking window as a chrono duration for timestamp arithmetic
    pub fn tracking_window_chrono(&self) -> chrono::Duration {
        let window = self.tracking_window.min(MAX_TRACKING_WINDOW);
        chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(365))
    }
}
