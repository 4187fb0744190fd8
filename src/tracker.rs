//! Playback tracking loop.
//!
//! The tracker is a single consumer of MPD's `player` idle stream: one idle
//! await, one status fetch, one classification per wakeup. Each wakeup is
//! classified against the previous snapshot ([`crate::events`]) and drives
//! the current [`SongSession`]; when the session terminates, the merged
//! coverage becomes a verdict that is written to the library before the next
//! session starts. That ordering keeps verdicts at-most-once per listen.
//!
//! Failure policy: the initial connect is fatal. A failed idle or status
//! call is retried once over a fresh connection; failing again abandons the
//! current session (its verdict is `neither`) and the loop resumes waiting
//! for a song. Verdict application errors are logged and never stop the
//! tracker.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::events::{self, PlayState, PlayerEvent};
use crate::library::{Item, Library};
use crate::mpd_client::{MpdHandle, PlayerSnapshot, Subsystem, Track};
use crate::outcome::{Thresholds, Verdict};
use crate::paths;
use crate::session::SongSession;

/// How one song observation ended.
enum Observation {
    /// The session ran to a terminating event.
    Finished {
        session: SongSession,
        event: PlayerEvent,
        /// The snapshot that terminated the session; the next session may
        /// open directly from it.
        snapshot: PlayerSnapshot,
    },
    /// MPD stopped answering mid-session; no verdict can be derived.
    Aborted,
}

/// Long-running playback observer for one MPD connection.
pub struct Tracker {
    mpd: MpdHandle,
    library: Library,
    config: Config,
    music_dir: PathBuf,
    clock: Box<dyn Clock>,
}

impl Tracker {
    pub fn new(config: Config, mpd: MpdHandle, library: Library) -> Result<Self> {
        let music_dir = config.music_directory()?;
        Ok(Self {
            mpd,
            library,
            config,
            music_dir,
            clock: Box::new(SystemClock),
        })
    }

    /// Run until the connection is lost for good or the process is killed.
    pub fn run(&mut self) -> Result<()> {
        self.mpd.connect().context("cannot start tracker")?;
        info!("tracker started");

        let mut snapshot = self.wait_for_song()?;
        loop {
            let Some(track) = snapshot.track.clone() else {
                snapshot = self.wait_for_song()?;
                continue;
            };
            info!("tracking: {}", track.describe());

            match self.observe(track.clone(), snapshot)? {
                Observation::Finished {
                    session,
                    event,
                    snapshot: last,
                } => {
                    let covered = session.total_covered();
                    let thresholds = Thresholds::for_duration(&self.config, track.duration);
                    let verdict = Verdict::from_coverage(covered, &thresholds);
                    debug!("{covered:.1}s covered -> {verdict}");

                    if let Err(e) = self.apply_verdict(&track, verdict) {
                        warn!("failed to apply verdict for {}: {e:#}", track.describe());
                    }

                    // A replay or song change already carries the opening
                    // snapshot of the next session; a stop means waiting.
                    snapshot = match event {
                        PlayerEvent::NewSong | PlayerEvent::Replay
                            if last.state != PlayState::Stop =>
                        {
                            last
                        }
                        _ => self.wait_for_song()?,
                    };
                }
                Observation::Aborted => {
                    info!("session abandoned; no verdict recorded");
                    snapshot = self.wait_for_song()?;
                }
            }
        }
    }

    /// Block until MPD has a song loaded and is not stopped.
    fn wait_for_song(&mut self) -> Result<PlayerSnapshot> {
        loop {
            let snapshot = self.mpd.snapshot().context("lost connection to MPD")?;
            if snapshot.state != PlayState::Stop && snapshot.track.is_some() {
                return Ok(snapshot);
            }

            debug!("player stopped; waiting for a song");
            self.mpd
                .wait(&[Subsystem::Player])
                .context("lost connection to MPD")?;
        }
    }

    /// Observe one song session from its opening snapshot to termination.
    fn observe(&mut self, track: Track, opening: PlayerSnapshot) -> Result<Observation> {
        let now = self.clock.now();
        let mut session = SongSession::begin(track, opening.state, opening.elapsed, now);
        let mut prev_state = opening.state;

        loop {
            if let Err(e) = self.wait_player() {
                warn!("giving up on current session: {e:#}");
                return Ok(Observation::Aborted);
            }

            let next = match self.snapshot_with_retry() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("giving up on current session: {e:#}");
                    return Ok(Observation::Aborted);
                }
            };

            let now = self.clock.now();
            let song_changed = next.track.as_ref() != Some(session.track());
            let near_end =
                events::near_expected_end(session.expected_end(), now, self.config.end_tolerance);
            let event = events::classify(prev_state, next.state, song_changed, near_end);
            debug!("player event: {event:?}");

            session.apply(event, next.elapsed, now);
            prev_state = next.state;

            if session.is_terminated() {
                return Ok(Observation::Finished {
                    session,
                    event,
                    snapshot: next,
                });
            }
        }
    }

    fn wait_player(&mut self) -> Result<()> {
        if let Err(e) = self.mpd.wait(&[Subsystem::Player]) {
            warn!("MPD idle failed, retrying once: {e:#}");
            self.mpd
                .wait(&[Subsystem::Player])
                .context("MPD idle failed twice")?;
        }
        Ok(())
    }

    fn snapshot_with_retry(&mut self) -> Result<PlayerSnapshot> {
        match self.mpd.snapshot() {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!("status fetch failed, retrying once: {e:#}");
                self.mpd.snapshot().context("status fetch failed twice")
            }
        }
    }

    /// Write one verdict to the library.
    fn apply_verdict(&mut self, track: &Track, verdict: Verdict) -> Result<()> {
        match verdict {
            Verdict::Neither => {
                debug!("neither played nor skipped: {}", track.describe());
                Ok(())
            }
            Verdict::Played => {
                let Some(item) = self.lookup(track)? else {
                    return Ok(());
                };

                let now = self.clock.now() as i64;
                let plays = self.library.record_play(item.id, now)?;
                println!("✓ PLAYED: {} (plays: {plays})", track.describe());
                info!(
                    "{} played {plays} times, last at {}",
                    track.describe(),
                    self.config.format_timestamp(now)
                );

                if let Some(album_id) = item.album_id {
                    if let Some(stamp) = self.library.rollup_album_last_played(album_id)? {
                        if let Some(album) = self.library.album(album_id)? {
                            info!(
                                "album {} - {} last played at {}",
                                album.artist,
                                album.title,
                                self.config.format_timestamp(stamp)
                            );
                        }
                    }
                }

                Ok(())
            }
            Verdict::Skipped => {
                let Some(item) = self.lookup(track)? else {
                    return Ok(());
                };

                let skips = self.library.record_skip(item.id)?;
                println!("✗ SKIPPED: {} (skips: {skips})", track.describe());
                info!("{} skipped ({skips} skips)", track.describe());
                Ok(())
            }
        }
    }

    fn lookup(&self, track: &Track) -> Result<Option<Item>> {
        let absolute = paths::to_absolute(&self.music_dir, &track.file);
        let item = self.library.item_by_path(&absolute.to_string_lossy())?;
        if item.is_none() {
            warn!("not in library, dropping verdict: {}", track.file);
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn seeded_tracker() -> (TempDir, Tracker) {
        let dir = TempDir::new().expect("failed to create temp directory");
        let db_path = dir.path().join("library.db");

        let library = Library::open(&db_path).unwrap();
        drop(library);

        // Seed one album with two items directly.
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "INSERT INTO albums (id, artist, title, directory)
             VALUES (1, 'Artist', 'Album', '/music/Artist/Album')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO items (path, album_id, artist, title) VALUES
             ('/music/Artist/Album/one.flac', 1, 'Artist', 'One'),
             ('/music/Artist/Album/two.flac', 1, 'Artist', 'Two')",
            [],
        )
        .unwrap();
        drop(conn);

        let config = Config {
            directory: Some(PathBuf::from("/music")),
            ..Config::default()
        };
        let mpd = MpdHandle::new("localhost", 6600, None);
        let library = Library::open(&db_path).unwrap();
        let tracker = Tracker::new(config, mpd, library).unwrap();

        (dir, tracker)
    }

    fn track(file: &str) -> Track {
        Track {
            file: file.to_string(),
            queue_id: Some(1),
            queue_pos: Some(0),
            duration: Some(300.0),
            title: None,
            artist: None,
            album: None,
        }
    }

    #[test]
    fn played_verdict_updates_item() {
        let (_dir, mut tracker) = seeded_tracker();
        let track = track("Artist/Album/one.flac");

        tracker.apply_verdict(&track, Verdict::Played).unwrap();

        let item = tracker
            .library
            .item_by_path("/music/Artist/Album/one.flac")
            .unwrap()
            .unwrap();
        assert_eq!(item.play_count, 1);
        assert!(item.last_played.is_some());
        assert_eq!(item.skip_count, 0);
    }

    #[test]
    fn album_last_played_set_after_every_member_played() {
        let (_dir, mut tracker) = seeded_tracker();

        tracker
            .apply_verdict(&track("Artist/Album/one.flac"), Verdict::Played)
            .unwrap();
        assert_eq!(tracker.library.album(1).unwrap().unwrap().last_played, None);

        tracker
            .apply_verdict(&track("Artist/Album/two.flac"), Verdict::Played)
            .unwrap();
        let album = tracker.library.album(1).unwrap().unwrap();
        assert!(album.last_played.is_some());

        // The album stamp is the oldest member stamp.
        let one = tracker
            .library
            .item_by_path("/music/Artist/Album/one.flac")
            .unwrap()
            .unwrap();
        let two = tracker
            .library
            .item_by_path("/music/Artist/Album/two.flac")
            .unwrap()
            .unwrap();
        assert_eq!(
            album.last_played,
            one.last_played.min(two.last_played)
        );
    }

    #[test]
    fn skipped_verdict_leaves_last_played_unset() {
        let (_dir, mut tracker) = seeded_tracker();
        let track = track("Artist/Album/one.flac");

        tracker.apply_verdict(&track, Verdict::Skipped).unwrap();

        let item = tracker
            .library
            .item_by_path("/music/Artist/Album/one.flac")
            .unwrap()
            .unwrap();
        assert_eq!(item.skip_count, 1);
        assert_eq!(item.play_count, 0);
        assert_eq!(item.last_played, None);
    }

    #[test]
    fn neither_verdict_writes_nothing() {
        let (_dir, mut tracker) = seeded_tracker();
        let track = track("Artist/Album/one.flac");

        tracker.apply_verdict(&track, Verdict::Neither).unwrap();

        let item = tracker
            .library
            .item_by_path("/music/Artist/Album/one.flac")
            .unwrap()
            .unwrap();
        assert_eq!(item.play_count, 0);
        assert_eq!(item.skip_count, 0);
        assert_eq!(item.last_played, None);
    }

    #[test]
    fn unknown_track_is_logged_and_dropped() {
        let (_dir, mut tracker) = seeded_tracker();
        let track = track("Other/Album/stranger.flac");
        // Must not error; the next song still has to be observable.
        tracker.apply_verdict(&track, Verdict::Played).unwrap();
    }
}
