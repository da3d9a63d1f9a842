//! Domain Services
//!
//! Pure domain logic: mapping object keys to catalog targets.

use crate::domain::value_objects::{DownloadTarget, Slug};

/// Prefix of mod version files: `mods/<mod>/<version>/<file>`
pub const MOD_PREFIX: &str = "mods";
/// Prefix of launcher builds: `launcher/<version>/<file>`
pub const LAUNCHER_PREFIX: &str = "launcher";

/// Classify an object key
///
/// Returns `None` for any key that is not a mod or launcher download. The
/// trailing file part may contain further slashes but must be non-empty.
pub fn classify_path(key: &str) -> Option<DownloadTarget> {
    let (prefix, rest) = key.split_once('/')?;

    match prefix {
        MOD_PREFIX => {
            let mut parts = rest.splitn(3, '/');
            let mod_slug = Slug::new(parts.next()?)?;
            let version_slug = Slug::new(parts.next()?)?;
            non_empty(parts.next())?;
            Some(DownloadTarget::ModVersion {
                mod_slug,
                version_slug,
            })
        }
        LAUNCHER_PREFIX => {
            let mut parts = rest.splitn(2, '/');
            let version_slug = Slug::new(parts.next()?)?;
            non_empty(parts.next())?;
            Some(DownloadTarget::LauncherVersion { version_slug })
        }
        _ => None,
    }
}

fn non_empty(part: Option<&str>) -> Option<&str> {
    part.filter(|p| !p.is_empty())
}
