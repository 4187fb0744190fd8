//! MPD playback tracker that turns player events into play/skip verdicts.
//!
//! Core modules:
//! - [`coverage`] - Merged play-interval accounting for one song
//! - [`events`] - Classification of raw `idle player` wakeups
//! - [`session`] - Single-song state machine driving a coverage log
//! - [`outcome`] - Threshold derivation and the played/skipped/neither verdict
//! - [`tracker`] - The observation loop feeding verdicts to the library
//! - [`autoqueue`] - Queue topping-up from random library picks
//!
//! ### Supporting modules
//!
//! - [`mpd_client`] - Typed wrapper over the MPD protocol connection
//! - [`library`] - SQLite store for items, albums, and statistics
//! - [`config`] - Configuration file and data directory management
//! - [`paths`] - Absolute vs. music-directory-relative path translation
//! - [`clock`] - Substitutable wall-clock source
//! - [`cli`] - Command-line interface definitions
//!
//! ## How tracking works
//!
//! MPD's `idle player` notification does not say *what* changed, so the
//! tracker keeps the previous status snapshot and classifies each wakeup by
//! comparing it with the next one ([`events::classify`]). The classified
//! event advances a per-song [`session::SongSession`], which records
//! `[start, end)` play ranges into a [`coverage::CoverageLog`]. When the
//! session ends, the merged coverage is weighed against per-song thresholds
//! ([`outcome`]) and the verdict lands in the library: play counts, skip
//! counts, last-played timestamps, and an album-level last-played once every
//! album member has been heard.
//!
//! ```no_run
//! use hark::config::Config;
//! use hark::library::Library;
//! use hark::mpd_client::MpdHandle;
//! use hark::tracker::Tracker;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let mpd = MpdHandle::new(&config.mpd.host, config.mpd.port, None);
//! let library = Library::open_default()?;
//! Tracker::new(config, mpd, library)?.run()?;
//! # Ok(())
//! # }
//! ```

pub mod autoqueue;
pub mod cli;
pub mod clock;
pub mod config;
pub mod coverage;
pub mod events;
pub mod library;
pub mod mpd_client;
pub mod outcome;
pub mod paths;
pub mod session;
pub mod tracker;
