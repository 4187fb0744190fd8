//! MPD connection handling.
//!
//! Thin wrapper around the `mpd` protocol crate. Everything the rest of the
//! crate sees comes out of here as one of two owned record types with the
//! optional fields made explicit:
//!
//! - [`Track`]: the current song, identity compared by the full record;
//! - [`PlayerSnapshot`]: one `status` + `currentsong` round-trip.
//!
//! Wire payloads are string maps with inconsistent presence; converting them
//! at this boundary keeps the state machine free of stringly-typed lookups.
//!
//! A command that fails drops the connection so the next call reconnects.
//! Callers decide whether a failure is transient (retry the call) or fatal
//! (initial connect refused).

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::net::ToSocketAddrs;

use crate::events::PlayState;

pub use mpd::Subsystem;

/// One song as loaded in the MPD queue.
///
/// Equality means "the same song instance in the queue": every field takes
/// part, including the queue id, so re-adding the same file later compares
/// unequal. Comparing by queue position alone would misfire when MPD
/// replaces the queue mid-play.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Music-directory-relative path, as MPD reports it.
    pub file: String,
    /// Queue song id, when the song sits in the queue.
    pub queue_id: Option<u32>,
    /// Queue position.
    pub queue_pos: Option<u32>,
    /// Length in seconds. Streams and broken tags leave this empty.
    pub duration: Option<f64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl Track {
    /// Human-readable label for log lines.
    pub fn describe(&self) -> String {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => format!("{artist} - {title}"),
            (None, Some(title)) => title.clone(),
            _ => self.file.clone(),
        }
    }
}

/// Look up a tag by name, case-insensitively. MPD capitalises tag names
/// (`Artist`, `Album`) but proxies and old servers are not consistent.
fn tag_value(tags: &[(String, String)], name: &str) -> Option<String> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

impl From<mpd::Song> for Track {
    fn from(song: mpd::Song) -> Self {
        let tag = |name: &str| tag_value(&song.tags, name);
        let (queue_id, queue_pos) = match song.place {
            Some(place) => (Some(place.id.0), Some(place.pos)),
            None => (None, None),
        };

        Self {
            queue_id,
            queue_pos,
            duration: song.duration.map(|d| d.as_secs_f64()),
            artist: tag("artist"),
            album: tag("album"),
            title: song.title.clone(),
            file: song.file,
        }
    }
}

/// Player state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub state: PlayState,
    /// Seconds into the current song; absent when nothing is loaded and
    /// occasionally absent mid-song on some MPD versions.
    pub elapsed: Option<f64>,
    /// Queue index of the current song.
    pub queue_pos: Option<u32>,
    pub queue_len: u32,
    pub track: Option<Track>,
}

fn play_state(state: mpd::State) -> PlayState {
    match state {
        mpd::State::Play => PlayState::Play,
        mpd::State::Pause => PlayState::Pause,
        mpd::State::Stop => PlayState::Stop,
    }
}

/// Handle to one MPD connection, reconnecting lazily after errors.
pub struct MpdHandle {
    host: String,
    port: u16,
    password: Option<String>,
    client: Option<mpd::Client>,
}

impl MpdHandle {
    pub fn new(host: &str, port: u16, password: Option<&str>) -> Self {
        Self {
            host: host.to_string(),
            port,
            password: password.map(str::to_string),
            client: None,
        }
    }

    /// Connect and authenticate. Used both for the initial connection
    /// (failure is fatal to the caller) and for reconnects after a dropped
    /// command.
    pub fn connect(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port)
            .to_socket_addrs()
            .context("failed to resolve MPD address")?
            .next()
            .context("no address resolved for MPD host")?;

        let mut client = mpd::Client::connect(addr)
            .with_context(|| format!("failed to connect to MPD at {}:{}", self.host, self.port))?;

        if let Some(password) = &self.password {
            client
                .login(password)
                .context("MPD rejected the configured password")?;
        }

        debug!("connected to MPD at {}:{}", self.host, self.port);
        self.client = Some(client);
        Ok(())
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.client.is_none() {
            warn!("reconnecting to MPD");
            self.connect()?;
        }
        Ok(())
    }

    /// Run one command, dropping the connection on failure so the next call
    /// starts from a fresh socket.
    fn command<T>(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut mpd::Client) -> std::result::Result<T, mpd::error::Error>,
    ) -> Result<T> {
        self.ensure_connected()?;
        let Some(client) = self.client.as_mut() else {
            bail!("not connected to MPD");
        };

        match f(client) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.client = None;
                Err(e).with_context(|| format!("MPD {what} failed"))
            }
        }
    }

    /// Fetch `status` and `currentsong` as one snapshot.
    pub fn snapshot(&mut self) -> Result<PlayerSnapshot> {
        let status = self.command("status", |c| c.status())?;
        let song = self.command("currentsong", |c| c.currentsong())?;

        Ok(PlayerSnapshot {
            state: play_state(status.state),
            elapsed: status.elapsed.map(|d| d.as_secs_f64()),
            queue_pos: status.song.map(|place| place.pos),
            queue_len: status.queue_len,
            track: song.map(Track::from),
        })
    }

    /// Block until one of the subscribed subsystems changes.
    pub fn wait(&mut self, subsystems: &[Subsystem]) -> Result<Vec<Subsystem>> {
        use mpd::Idle;
        self.command("idle", |c| c.wait(subsystems))
    }

    /// Files currently in the queue, in queue order.
    pub fn queue_files(&mut self) -> Result<Vec<String>> {
        let queue = self.command("playlistinfo", |c| c.queue())?;
        Ok(queue.into_iter().map(|song| song.file).collect())
    }

    /// Toggle MPD's random playback mode.
    pub fn set_random(&mut self, enabled: bool) -> Result<()> {
        self.command("random", |c| c.random(enabled))
    }

    /// Append a music-directory-relative URI to the queue.
    pub fn add(&mut self, uri: &str) -> Result<()> {
        let song = mpd::Song {
            file: uri.to_string(),
            ..Default::default()
        };
        self.command("add", |c| c.push(song).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(file: &str, queue_id: Option<u32>) -> Track {
        Track {
            file: file.to_string(),
            queue_id,
            queue_pos: queue_id.map(|_| 0),
            duration: Some(300.0),
            title: Some("Title".to_string()),
            artist: Some("Artist".to_string()),
            album: Some("Album".to_string()),
        }
    }

    #[test]
    fn track_equality_is_full_record() {
        assert_eq!(track("a/b.flac", Some(7)), track("a/b.flac", Some(7)));
        // Same file re-added under a new queue id is a different instance.
        assert_ne!(track("a/b.flac", Some(7)), track("a/b.flac", Some(8)));
        assert_ne!(track("a/b.flac", Some(7)), track("a/c.flac", Some(7)));
    }

    #[test]
    fn describe_prefers_tags_over_path() {
        let full = track("a/b.flac", None);
        assert_eq!(full.describe(), "Artist - Title");

        let bare = Track {
            artist: None,
            title: None,
            ..track("a/b.flac", None)
        };
        assert_eq!(bare.describe(), "a/b.flac");
    }

    #[test]
    fn tag_lookup_is_case_insensitive() {
        let tags = vec![
            ("Album".to_string(), "Album Name".to_string()),
            ("ARTIST".to_string(), "Tag Artist".to_string()),
        ];

        assert_eq!(tag_value(&tags, "album").as_deref(), Some("Album Name"));
        assert_eq!(tag_value(&tags, "artist").as_deref(), Some("Tag Artist"));
        assert_eq!(tag_value(&tags, "genre"), None);
    }
}
