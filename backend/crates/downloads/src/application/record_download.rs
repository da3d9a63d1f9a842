//! Record Download Use Case
//!
//! classify key -> fingerprint client -> observe tracker -> increment counter

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::client::ClientFingerprint;

use crate::application::config::CounterConfig;
use crate::domain::entities::DownloadTracker;
use crate::domain::repository::{DownloadCounterRepository, TrackerRepository};
use crate::domain::services::classify_path;
use crate::domain::value_objects::{DownloadNotification, DownloadTarget, IpHash};
use crate::error::DownloadResult;

/// What happened to a single notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Key is not a known download path; dropped
    Unrecognized,
    /// Client is inside an open tracking window; not counted
    Duplicate { target: DownloadTarget },
    /// Counter incremented on `rows` catalog rows
    Counted { target: DownloadTarget, rows: u64 },
    /// Fresh visit, but the catalog has no such version
    MissingCatalogEntry { target: DownloadTarget },
}

/// Record Download Use Case
pub struct RecordDownloadUseCase<T, C>
where
    T: TrackerRepository,
    C: DownloadCounterRepository,
{
    tracker_repo: Arc<T>,
    counter_repo: Arc<C>,
    config: Arc<CounterConfig>,
}

impl<T, C> RecordDownloadUseCase<T, C>
where
    T: TrackerRepository,
    C: DownloadCounterRepository,
{
    pub fn new(tracker_repo: Arc<T>, counter_repo: Arc<C>, config: Arc<CounterConfig>) -> Self {
        Self {
            tracker_repo,
            counter_repo,
            config,
        }
    }

    /// Process one notification, logging any failure instead of returning it
    ///
    /// Returns `None` when a storage operation failed.
    pub async fn handle(&self, notification: &DownloadNotification) -> Option<RecordOutcome> {
        match self.execute(notification).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                let target = classify_path(&notification.key)
                    .map(|t| t.kind())
                    .unwrap_or("unrecognized");
                tracing::error!(
                    key = %notification.key,
                    source_host = %notification.source_host,
                    target = target,
                    error = %e,
                    "Failed to record download"
                );
                None
            }
        }
    }

    pub async fn execute(
        &self,
        notification: &DownloadNotification,
    ) -> DownloadResult<RecordOutcome> {
        self.execute_at(notification, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        notification: &DownloadNotification,
        now: DateTime<Utc>,
    ) -> DownloadResult<RecordOutcome> {
        let Some(target) = classify_path(&notification.key) else {
            tracing::warn!(
                key = %notification.key,
                source_host = %notification.source_host,
                "Ignoring notification for unrecognized key"
            );
            return Ok(RecordOutcome::Unrecognized);
        };

        let ip_hash = IpHash::from(ClientFingerprint::derive(
            &notification.source_host,
            &self.config.ip_salt,
        ));
        let tracker = DownloadTracker::observed_at(
            notification.key.as_str(),
            ip_hash,
            now,
            self.config.tracking_window_chrono(),
        );

        let observation = self.tracker_repo.observe(&tracker).await?;
        if !observation.is_fresh_download {
            tracing::debug!(
                key = %notification.key,
                target = %target,
                "Repeat download inside tracking window"
            );
            return Ok(RecordOutcome::Duplicate { target });
        }

        let rows = self.increment(&target).await?;

        match rows {
            0 => {
                tracing::warn!(
                    key = %notification.key,
                    target = %target,
                    target_type = target.kind(),
                    "Download references a version missing from the catalog"
                );
                Ok(RecordOutcome::MissingCatalogEntry { target })
            }
            _ => {
                if rows > 1 {
                    tracing::warn!(
                        key = %notification.key,
                        target = %target,
                        rows = rows,
                        "Download matched more than one catalog row"
                    );
                }
                tracing::info!(
                    key = %notification.key,
                    target = %target,
                    rows = rows,
                    "Download counted"
                );
                Ok(RecordOutcome::Counted { target, rows })
            }
        }
    }

    async fn increment(&self, target: &DownloadTarget) -> DownloadResult<u64> {
        match target {
            DownloadTarget::ModVersion {
                mod_slug,
                version_slug,
            } => {
                self.counter_repo
                    .increment_mod_version(mod_slug, version_slug)
                    .await
            }
            DownloadTarget::LauncherVersion { version_slug } => {
                self.counter_repo
                    .increment_launcher_version(version_slug)
                    .await
            }
        }
    }
}
