//! Client identification utilities
//!
//! Derives a privacy-preserving identity for a client from its network
//! address. The raw address is never stored; only a salted digest is.

use std::fmt;
use std::net::IpAddr;

use crate::crypto::{hmac_sha256, to_hex};

/// Digest length in bytes (128 bits)
pub const FINGERPRINT_LEN: usize = 16;

/// Salted one-way fingerprint of a client address
///
/// The digest is HMAC-SHA256 keyed with a service-wide secret salt,
/// truncated to 128 bits. Without the salt, the address space cannot be
/// brute-forced back to the original address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientFingerprint {
    hash: [u8; FINGERPRINT_LEN],
}

impl ClientFingerprint {
    /// Derive a fingerprint from a raw client address and the salt
    ///
    /// ## Arguments
    /// * `address` - Client host as reported by the transport (IP literal or hostname)
    /// * `salt` - Service-wide secret salt
    pub fn derive(address: &str, salt: &[u8]) -> Self {
        let canonical = canonical_address(address);
        let digest = hmac_sha256(salt, canonical.as_bytes());

        let mut hash = [0u8; FINGERPRINT_LEN];
        hash.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        Self { hash }
    }

    /// Hex-encoded digest (32 lowercase characters, for storage)
    pub fn to_hex(&self) -> String {
        to_hex(&self.hash)
    }
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Normalise an address so equivalent spellings of the same IP hash identically
///
/// Bracketed IPv6 (`[::1]`) is unwrapped. Anything that does not parse as an
/// IP literal is used verbatim after trimming.
fn canonical_address(address: &str) -> String {
    let trimmed = address.trim();
    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    match unbracketed.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => trimmed.to_string(),
    }
}
