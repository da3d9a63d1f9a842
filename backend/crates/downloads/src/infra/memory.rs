//! In-Memory Repository Implementation
//!
//! Same contract as the PostgreSQL repository, kept in process. Each
//! operation runs inside one mutex critical section, which gives the
//! per-key atomicity `observe` requires. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::domain::entities::{DownloadTracker, Observation, extended_expiry, opens_window};
use crate::domain::repository::{DownloadCounterRepository, TrackerRepository};
use crate::domain::value_objects::Slug;
use crate::error::DownloadResult;

type TrackerKey = (String, String);

/// In-memory tracker store and catalog counters
#[derive(Debug, Default)]
pub struct MemoryDownloadRepository {
    trackers: Mutex<HashMap<TrackerKey, DateTime<Utc>>>,
    mod_versions: Mutex<HashMap<(String, String), u64>>,
    launcher_versions: Mutex<HashMap<String, u64>>,
}

impl MemoryDownloadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mod version in the catalog with zero downloads
    pub fn insert_mod_version(&self, mod_slug: &str, version_slug: &str) {
        lock(&self.mod_versions)
            .entry((mod_slug.to_string(), version_slug.to_string()))
            .or_insert(0);
    }

    /// Register a launcher version in the catalog with zero downloads
    pub fn insert_launcher_version(&self, version_slug: &str) {
        lock(&self.launcher_versions)
            .entry(version_slug.to_string())
            .or_insert(0);
    }

    pub fn mod_version_downloads(&self, mod_slug: &str, version_slug: &str) -> Option<u64> {
        lock(&self.mod_versions)
            .get(&(mod_slug.to_string(), version_slug.to_string()))
            .copied()
    }

    pub fn launcher_version_downloads(&self, version_slug: &str) -> Option<u64> {
        lock(&self.launcher_versions).get(version_slug).copied()
    }

    /// Current expiry of a tracker, if one exists
    pub fn tracker_expiry(&self, path: &str, ip_hash: &str) -> Option<DateTime<Utc>> {
        lock(&self.trackers)
            .get(&(path.to_string(), ip_hash.to_string()))
            .copied()
    }

    pub fn tracker_count(&self) -> usize {
        lock(&self.trackers).len()
    }
}

impl TrackerRepository for MemoryDownloadRepository {
    async fn observe(&self, tracker: &DownloadTracker) -> DownloadResult<Observation> {
        let mut trackers = lock(&self.trackers);
        let key = (tracker.path.clone(), tracker.ip_hash.as_str().to_string());

        let previous = trackers.get(&key).copied();
        trackers.insert(key, extended_expiry(previous, tracker.expires_at));

        Ok(Observation {
            is_fresh_download: opens_window(previous, tracker.observed_at),
        })
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> DownloadResult<u64> {
        let mut trackers = lock(&self.trackers);
        let before = trackers.len();
        trackers.retain(|_, expires_at| *expires_at > now);
        Ok((before - trackers.len()) as u64)
    }
}

impl DownloadCounterRepository for MemoryDownloadRepository {
    async fn increment_mod_version(
        &self,
        mod_slug: &Slug,
        version_slug: &Slug,
    ) -> DownloadResult<u64> {
        let mut versions = lock(&self.mod_versions);
        let key = (mod_slug.as_str().to_string(), version_slug.as_str().to_string());

        Ok(match versions.get_mut(&key) {
            Some(count) => {
                *count += 1;
                1
            }
            None => 0,
        })
    }

    async fn increment_launcher_version(&self, version_slug: &Slug) -> DownloadResult<u64> {
        let mut versions = lock(&self.launcher_versions);

        Ok(match versions.get_mut(version_slug.as_str()) {
            Some(count) => {
                *count += 1;
                1
            }
            None => 0,
        })
    }
}

// A panic while holding the lock cannot leave a map half-updated, so a
// poisoned lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
