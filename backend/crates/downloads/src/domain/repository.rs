//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};

use crate::domain::entities::{DownloadTracker, Observation};
use crate::domain::value_objects::Slug;
use crate::error::DownloadResult;

/// Download tracker repository trait
#[trait_variant::make(TrackerRepository: Send)]
pub trait LocalTrackerRepository {
    /// Record a visit and report whether it opens a new tracking window
    ///
    /// Must be atomic per `(path, ip_hash)`: concurrent observations of the
    /// same pair yield at most one fresh result per window. The stored
    /// expiry is always replaced with `tracker.expires_at`.
    async fn observe(&self, tracker: &DownloadTracker) -> DownloadResult<Observation>;

    /// Delete trackers whose window ended at or before `now`
    async fn sweep_expired(&self, now: DateTime<Utc>) -> DownloadResult<u64>;
}

/// Catalog download counter repository trait
///
/// Increments happen in place at the storage layer; callers never
/// read-modify-write the counter themselves.
#[trait_variant::make(DownloadCounterRepository: Send)]
pub trait LocalDownloadCounterRepository {
    /// Increment every matching mod version by one, returning rows touched
    async fn increment_mod_version(
        &self,
        mod_slug: &Slug,
        version_slug: &Slug,
    ) -> DownloadResult<u64>;

    /// Increment every matching launcher version by one, returning rows touched
    async fn increment_launcher_version(&self, version_slug: &Slug) -> DownloadResult<u64>;
}
