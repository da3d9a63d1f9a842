//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (HMAC-SHA256, hex)
//! - Client fingerprinting (salted address digests)
//! - Object storage configuration
//! - AWS SigV4 request signing (via `aws-sigv4`)

pub mod client;
pub mod config;
pub mod crypto;
pub mod sigv4;
