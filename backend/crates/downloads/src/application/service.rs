//! Download Counter Service
//!
//! Owns the notification subscription, fans notifications out to the
//! record use case and owns the sweeper's lifecycle.
//!
//! ```text
//! Idle --start(Some)--> Listening --stop/join--> Stopped
//!   \--start(None)--> Degraded --stop--> Stopped
//! ```

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::application::config::CounterConfig;
use crate::application::record_download::RecordDownloadUseCase;
use crate::application::sweep_trackers::{SweepTrackersUseCase, spawn_sweeper};
use crate::domain::repository::{DownloadCounterRepository, TrackerRepository};
use crate::domain::value_objects::DownloadNotification;
use crate::error::DownloadResult;

/// Push stream of object access notifications
///
/// Subscribing hands back the receiving end of a channel. The source stops
/// producing once `cancel` fires or the receiver is dropped.
pub trait NotificationSource: Send + 'static {
    fn subscribe(self, cancel: CancellationToken) -> mpsc::Receiver<DownloadNotification>;
}

impl NotificationSource for mpsc::Receiver<DownloadNotification> {
    fn subscribe(self, _cancel: CancellationToken) -> mpsc::Receiver<DownloadNotification> {
        self
    }
}

/// Lifecycle state of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Constructed, not yet listening
    Idle,
    /// Subscribed and sweeping
    Listening,
    /// Started without object storage; nothing is counted
    Degraded,
    /// Shut down; cannot be restarted
    Stopped,
}

/// Download Counter Service
pub struct DownloadCounterService<T, C>
where
    T: TrackerRepository + Send + Sync + 'static,
    C: DownloadCounterRepository + Send + Sync + 'static,
{
    record: Arc<RecordDownloadUseCase<T, C>>,
    sweep: Arc<SweepTrackersUseCase<T>>,
    config: Arc<CounterConfig>,
    state: ServiceState,
    cancel: CancellationToken,
    tasks: TaskTracker,
    consumer: Option<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
}

impl<T, C> DownloadCounterService<T, C>
where
    T: TrackerRepository + Send + Sync + 'static,
    C: DownloadCounterRepository + Send + Sync + 'static,
{
    pub fn new(
        tracker_repo: Arc<T>,
        counter_repo: Arc<C>,
        config: CounterConfig,
    ) -> DownloadResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        Ok(Self {
            record: Arc::new(RecordDownloadUseCase::new(
                tracker_repo.clone(),
                counter_repo,
                config.clone(),
            )),
            sweep: Arc::new(SweepTrackersUseCase::new(tracker_repo)),
            config,
            state: ServiceState::Idle,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
            consumer: None,
            sweeper: None,
        })
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Start listening
    ///
    /// `None` means the storage client could not be built; the service then
    /// enters degraded mode and never subscribes. Only the first call on an
    /// idle service has any effect.
    pub fn start<S>(&mut self, source: Option<S>) -> ServiceState
    where
        S: NotificationSource,
    {
        if self.state != ServiceState::Idle {
            tracing::warn!(state = ?self.state, "Download counter service already started");
            return self.state;
        }

        let Some(source) = source else {
            tracing::warn!(
                "Object storage credentials missing; download counting is disabled"
            );
            self.state = ServiceState::Degraded;
            return self.state;
        };

        let receiver = source.subscribe(self.cancel.child_token());

        self.sweeper = Some(spawn_sweeper(
            self.sweep.clone(),
            self.config.sweep_interval,
            self.cancel.clone(),
        ));

        self.consumer = Some(tokio::spawn(consume(
            receiver,
            self.record.clone(),
            self.tasks.clone(),
            Arc::new(Semaphore::new(self.config.max_in_flight)),
            self.cancel.clone(),
        )));

        tracing::info!(
            tracking_window_secs = self.config.tracking_window.as_secs(),
            max_in_flight = self.config.max_in_flight,
            "Download counter service listening"
        );

        self.state = ServiceState::Listening;
        self.state
    }

    /// Unsubscribe, cancel the sweeper and wait for in-flight notifications
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        self.shutdown().await;
    }

    /// Wait until the notification stream ends, then shut down
    ///
    /// Every notification already delivered is processed before returning.
    pub async fn join(&mut self) {
        if let Some(consumer) = self.consumer.as_mut() {
            if let Err(e) = consumer.await {
                tracing::error!(error = %e, "Notification consumer task failed");
            }
            self.consumer = None;
        }
        self.cancel.cancel();
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.await {
                tracing::error!(error = %e, "Notification consumer task failed");
            }
        }
        if let Some(sweeper) = self.sweeper.take() {
            if let Err(e) = sweeper.await {
                tracing::error!(error = %e, "Tracker sweeper task failed");
            }
        }

        self.tasks.close();
        self.tasks.wait().await;

        if self.state != ServiceState::Stopped {
            tracing::info!(previous = ?self.state, "Download counter service stopped");
            self.state = ServiceState::Stopped;
        }
    }
}

/// Consumer loop: one receiver, bounded concurrent processing
async fn consume<T, C>(
    mut receiver: mpsc::Receiver<DownloadNotification>,
    record: Arc<RecordDownloadUseCase<T, C>>,
    tasks: TaskTracker,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
) where
    T: TrackerRepository + Send + Sync + 'static,
    C: DownloadCounterRepository + Send + Sync + 'static,
{
    loop {
        let notification = tokio::select! {
            _ = cancel.cancelled() => break,
            received = receiver.recv() => match received {
                Some(notification) => notification,
                None => break,
            },
        };

        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let record = record.clone();
        tasks.spawn(async move {
            record.handle(&notification).await;
            drop(permit);
        });
    }

    // Dropping the receiver unsubscribes from the source
    drop(receiver);
    tracing::debug!("Notification consumer finished");
}
