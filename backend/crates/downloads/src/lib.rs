//! Download Accounting Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Classification, tracker entities, repository traits
//! - `application/` - Record/sweep use cases and the counter service
//! - `infra/` - PostgreSQL, in-memory and object storage implementations
//!
//! ## Counting Model
//! - Object access notifications are classified by key into mod or launcher versions
//! - Clients are identified only by a salted digest of their address
//! - A `(path, client)` pair is counted once per sliding tracking window
//! - Counters are incremented in place by the storage layer, never in memory

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::CounterConfig;
pub use application::service::{DownloadCounterService, NotificationSource, ServiceState};
pub use error::{DownloadError, DownloadResult};
pub use infra::memory::MemoryDownloadRepository;
pub use infra::minio::MinioNotificationListener;
pub use infra::postgres::PgDownloadRepository;

pub mod models {
    pub use crate::domain::entities::*;
    pub use crate::domain::value_objects::*;
}

pub mod store {
    pub use crate::infra::postgres::PgDownloadRepository as DownloadStore;
}
