//! Domain Value Objects
//!
//! Immutable value types for the download-accounting domain.

use std::fmt;

use platform::client::ClientFingerprint;

/// Catalog slug: 1-64 characters of `[A-Za-z0-9._-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    pub const MAX_LEN: usize = 64;

    pub fn new(raw: &str) -> Option<Self> {
        if Self::is_valid(raw) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn is_valid(raw: &str) -> bool {
        (1..=Self::MAX_LEN).contains(&raw.len())
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog entity a download path refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DownloadTarget {
    ModVersion { mod_slug: Slug, version_slug: Slug },
    LauncherVersion { version_slug: Slug },
}

impl DownloadTarget {
    /// Short type label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadTarget::ModVersion { .. } => "mod_version",
            DownloadTarget::LauncherVersion { .. } => "launcher_version",
        }
    }
}

impl fmt::Display for DownloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadTarget::ModVersion {
                mod_slug,
                version_slug,
            } => write!(f, "mod {}@{}", mod_slug, version_slug),
            DownloadTarget::LauncherVersion { version_slug } => {
                write!(f, "launcher {}", version_slug)
            }
        }
    }
}

/// Hex-encoded client fingerprint, half of the tracker key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpHash(String);

impl IpHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ClientFingerprint> for IpHash {
    fn from(fp: ClientFingerprint) -> Self {
        Self(fp.to_hex())
    }
}

impl From<String> for IpHash {
    fn from(hex: String) -> Self {
        Self(hex)
    }
}

impl fmt::Display for IpHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object access notification, reduced to what accounting needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadNotification {
    /// Object key as reported by storage
    pub key: String,
    /// Requesting client host
    pub source_host: String,
}

impl DownloadNotification {
    pub fn new(key: impl Into<String>, source_host: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source_host: source_host.into(),
        }
    }
}
