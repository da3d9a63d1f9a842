//! Infrastructure Layer
//!
//! Database, in-process and object storage implementations.

pub mod memory;
pub mod minio;
pub mod postgres;
