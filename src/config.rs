//! Configuration loading and data directory setup.
//!
//! Settings live in a JSON file in the platform config directory
//! (`~/.config/hark/config.json` on Linux); every key has a default so the
//! file is optional. `MPD_HOST` and `MPD_PORT` act as environment fallbacks
//! for the connection settings, matching what other MPD clients honour.
//!
//! The library database goes in the platform data directory
//! (`~/.local/share/hark/library.db` on Linux).

use anyhow::{anyhow, Context, Result};
use chrono::{Local, TimeZone};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// MPD connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpdConfig {
    pub host: String,
    pub port: u16,
    /// Redacted from logs; empty means no authentication.
    pub password: Option<String>,
}

impl Default for MpdConfig {
    fn default() -> Self {
        let host = std::env::var("MPD_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("MPD_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(6600);

        Self {
            host,
            port,
            password: None,
        }
    }
}

/// Queue topping-up settings for `hark dj`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoQueueConfig {
    /// Target number of upcoming items to keep queued.
    pub items: usize,
    /// Queue whole albums instead of individual songs.
    pub album: bool,
}

impl Default for AutoQueueConfig {
    fn default() -> Self {
        Self {
            items: 20,
            album: false,
        }
    }
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mpd: MpdConfig,

    /// Upper cap on the play threshold, seconds.
    pub play_time: f64,
    /// Fraction of the duration that counts as played.
    pub play_percent: f64,
    /// Lower floor on the skip threshold, seconds.
    pub skip_time: f64,
    /// Fraction of the duration under which a listen counts as skipped.
    pub skip_percent: f64,

    /// Window around the expected song end inside which a transition is
    /// taken as the song finishing naturally. Raise on lossy networks.
    pub end_tolerance: f64,

    /// Music root MPD serves from. Detected from mpd.conf when unset.
    pub directory: Option<PathBuf>,
    /// strftime format for last-played log output.
    pub time_format: String,

    pub auto_queue: AutoQueueConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mpd: MpdConfig::default(),
            play_time: 240.0,
            play_percent: 0.5,
            skip_time: 20.0,
            skip_percent: 0.0,
            end_tolerance: 1.0,
            directory: None,
            time_format: "%Y-%m-%d %H:%M:%S".to_string(),
            auto_queue: AutoQueueConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration file, or defaults when none exists.
    pub fn load() -> Result<Self> {
        let path = config_file_path()?;
        if !path.exists() {
            debug!("no config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// The music root used for URI translation. Falls back to parsing
    /// mpd.conf from its usual locations, then to common music directories.
    pub fn music_directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.directory {
            return Ok(dir.clone());
        }

        if let Some(dir) = music_dir_from_mpd_conf() {
            info!("using music directory from mpd.conf: {}", dir.display());
            return Ok(dir);
        }

        if let Some(dir) = common_music_directory() {
            info!("using music directory: {}", dir.display());
            return Ok(dir);
        }

        Err(anyhow!(
            "could not determine the music directory. Set \"directory\" in the \
             config file, or make sure mpd.conf is readable."
        ))
    }

    /// Format a unix timestamp for log output using `time_format`.
    pub fn format_timestamp(&self, unix_seconds: i64) -> String {
        match Local.timestamp_opt(unix_seconds, 0).single() {
            Some(time) => time.format(&self.time_format).to_string(),
            None => unix_seconds.to_string(),
        }
    }
}

fn config_file_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("could not determine the system config directory"))?;
    Ok(config_dir.join("hark").join("config.json"))
}

/// Returns the platform-appropriate data directory, creating it if needed.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow!("could not determine the system data directory"))?;

    let hark_dir = data_dir.join("hark");
    fs::create_dir_all(&hark_dir).with_context(|| {
        format!(
            "failed to create data directory at {}. Check file permissions.",
            hark_dir.display()
        )
    })?;

    Ok(hark_dir)
}

/// Path of the library database file.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.db"))
}

/// Look for a `music_directory` setting in the usual mpd.conf locations.
fn music_dir_from_mpd_conf() -> Option<PathBuf> {
    let candidates = [
        dirs::config_dir().map(|p| p.join("mpd").join("mpd.conf")),
        dirs::home_dir().map(|p| p.join(".mpdconf")),
        Some(PathBuf::from("/etc/mpd.conf")),
        Some(PathBuf::from("/usr/local/etc/mpd.conf")),
    ];

    for path in candidates.into_iter().flatten() {
        if let Some(dir) = parse_mpd_conf(&path) {
            return Some(dir);
        }
    }

    None
}

/// Extract `music_directory "..."` from one mpd.conf, if present and valid.
fn parse_mpd_conf(path: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(path).ok()?;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || !line.starts_with("music_directory") {
            continue;
        }

        let value = line.split_whitespace().nth(1)?;
        let value = value.trim_matches('"').trim_matches('\'');

        let dir = if let Some(rest) = value.strip_prefix("~/") {
            dirs::home_dir()?.join(rest)
        } else {
            PathBuf::from(value)
        };

        if dir.is_dir() {
            debug!("music_directory from {}: {}", path.display(), dir.display());
            return Some(dir);
        }
        warn!(
            "music_directory in {} does not exist: {}",
            path.display(),
            dir.display()
        );
    }

    None
}

fn common_music_directory() -> Option<PathBuf> {
    let candidates = [
        dirs::audio_dir(),
        dirs::home_dir().map(|p| p.join("Music")),
        Some(PathBuf::from("/var/lib/mpd/music")),
    ];

    candidates.into_iter().flatten().find(|dir| dir.is_dir())
}
