//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.
//! Contains use case implementations and the counter service.

pub mod config;
pub mod record_download;
pub mod service;
pub mod sweep_trackers;

// Re-exports
pub use config::CounterConfig;
pub use record_download::{RecordDownloadUseCase, RecordOutcome};
pub use service::{DownloadCounterService, NotificationSource, ServiceState};
pub use sweep_trackers::{SweepTrackersUseCase, spawn_sweeper};
