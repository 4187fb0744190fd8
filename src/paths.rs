//! Path translation between the library and MPD.
//!
//! The library stores absolute filesystem paths while MPD addresses songs
//! relative to its music directory. Both directions are needed: resolving a
//! track reported by MPD to a library item, and turning a library pick into
//! a URI that `add` accepts.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Convert an absolute path into a music-directory-relative MPD URI.
pub fn to_mpd_uri(music_dir: &Path, absolute: &Path) -> Result<String> {
    if !absolute.is_absolute() {
        return Err(anyhow!(
            "expected an absolute path, got '{}'",
            absolute.display()
        ));
    }

    let relative = absolute.strip_prefix(music_dir).map_err(|_| {
        anyhow!(
            "path '{}' is not inside the music directory '{}'",
            absolute.display(),
            music_dir.display()
        )
    })?;

    let uri = relative.to_string_lossy();
    if uri.is_empty() {
        return Err(anyhow!(
            "path '{}' is the music directory itself",
            absolute.display()
        ));
    }

    // MPD expects forward slashes regardless of platform.
    if cfg!(windows) {
        Ok(uri.replace('\\', "/"))
    } else {
        Ok(uri.into_owned())
    }
}

/// Resolve an MPD-relative URI to an absolute path under the music directory.
pub fn to_absolute(music_dir: &Path, uri: &str) -> PathBuf {
    music_dir.join(uri)
}
