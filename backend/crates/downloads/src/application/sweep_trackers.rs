//! Sweep Trackers Use Case
//!
//! Reclaims storage held by trackers whose window has lapsed. Counting
//! never depends on whether a sweep has run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::repository::TrackerRepository;
use crate::error::DownloadResult;

/// Sweep Trackers Use Case
pub struct SweepTrackersUseCase<T>
where
    T: TrackerRepository,
{
    tracker_repo: Arc<T>,
}

impl<T> SweepTrackersUseCase<T>
where
    T: TrackerRepository,
{
    pub fn new(tracker_repo: Arc<T>) -> Self {
        Self { tracker_repo }
    }

    pub async fn execute(&self) -> DownloadResult<u64> {
        self.execute_at(Utc::now()).await
    }

    pub async fn execute_at(&self, now: DateTime<Utc>) -> DownloadResult<u64> {
        let deleted = self.tracker_repo.sweep_expired(now).await?;
        tracing::info!(trackers_deleted = deleted, "Swept expired download trackers");
        Ok(deleted)
    }
}

/// Spawn the recurring sweep
///
/// The first sweep runs one full `interval` after spawning. A failed sweep
/// is logged and the schedule continues. Cancelling `cancel` ends the task
/// between ticks.
pub fn spawn_sweeper<T>(
    use_case: Arc<SweepTrackersUseCase<T>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    T: TrackerRepository + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = interval.as_secs(),
            "Download tracker sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = use_case.execute().await {
                        tracing::warn!(
                            error = %e,
                            "Download tracker sweep failed, retrying next interval"
                        );
                    }
                }
            }
        }

        tracing::info!("Download tracker sweeper stopped");
    })
}
