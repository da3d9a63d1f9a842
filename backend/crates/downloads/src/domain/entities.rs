//! Domain Entities
//!
//! Core business entities for download accounting.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_objects::IpHash;

/// DownloadTracker entity - "client `ip_hash` was counted for `path` until `expires_at`"
///
/// At most one tracker exists per `(path, ip_hash)`. Every observation
/// pushes the stored expiry forward to `observed_at + window`; it never
/// moves it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTracker {
    /// Raw object key, not the parsed target
    pub path: String,
    pub ip_hash: IpHash,
    pub observed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DownloadTracker {
    /// Create a tracker observed now
    pub fn new(path: impl Into<String>, ip_hash: IpHash, window: Duration) -> Self {
        Self::observed_at(path, ip_hash, Utc::now(), window)
    }

    /// Create a tracker observed at a given instant
    pub fn observed_at(
        path: impl Into<String>,
        ip_hash: IpHash,
        observed_at: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            ip_hash,
            observed_at,
            expires_at: observed_at + window,
        }
    }
}

/// Result of observing a visit against the tracker store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// A new tracking window began; the visit should be counted
    pub is_fresh_download: bool,
}

/// Decide whether a visit opens a new window given the previous expiry
///
/// `None` means no tracker existed. A window that ends exactly at
/// `observed_at` has lapsed.
pub fn opens_window(
    previous_expires_at: Option<DateTime<Utc>>,
    observed_at: DateTime<Utc>,
) -> bool {
    match previous_expires_at {
        None => true,
        Some(expires_at) => observed_at >= expires_at,
    }
}

/// Expiry to store after an observation
///
/// Observations of one pair can be applied out of order; a late, older
/// visit must not shorten a window a newer visit already extended.
pub fn extended_expiry(
    previous_expires_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
) -> DateTime<Utc> {
    previous_expires_at.map_or(expires_at, |previous| previous.max(expires_at))
}
