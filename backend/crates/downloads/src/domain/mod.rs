//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (DownloadTracker, Observation)
//! - Domain value objects (Slug, DownloadTarget, IpHash, DownloadNotification)
//! - Domain services (path classification)
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
