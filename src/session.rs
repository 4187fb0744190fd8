//! Single-song playback session.
//!
//! A session observes one song instance from the moment the tracker picks it
//! up (either freshly loaded, or mid-song when the tracker attaches to an
//! already-running player) until a terminating event ends it. It owns the
//! song's [`CoverageLog`] and the "play-from" triple: the position and wall
//! time at which the current uninterrupted play run began.
//!
//! MPD only reports the current position, so the end of a play run is either
//! read from status (pause, where the position survives) or extrapolated
//! from wall time (seek, song change, where the new status already describes
//! the *next* position).

use log::{debug, warn};

use crate::coverage::CoverageLog;
use crate::events::{PlayState, PlayerEvent};
use crate::mpd_client::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Song loaded, playback not yet started.
    Queued,
    Playing,
    Paused,
    /// Session over; further events are ignored.
    Terminated,
}

/// State machine tracking one song's playback.
#[derive(Debug)]
pub struct SongSession {
    track: Track,
    state: SessionState,
    coverage: CoverageLog,
    /// Position at which the current play run began. Meaningful only while
    /// `state == Playing`.
    play_from_pos: f64,
    /// Wall time at which the current play run began.
    play_from_wall: f64,
}

impl SongSession {
    /// Start observing `track`, given the player state at session start.
    ///
    /// A session beginning at `elapsed > 0` assumes everything up to that
    /// point was heard and seeds the log with `(0, elapsed)`. For sessions
    /// opened at a natural song boundary elapsed is near zero and the seed
    /// is negligible; for a mid-song attach it deliberately credits the
    /// part we never saw.
    pub fn begin(track: Track, state: PlayState, elapsed: Option<f64>, now: f64) -> Self {
        let mut coverage = CoverageLog::new(track.duration);
        let elapsed = elapsed.unwrap_or(0.0);

        if elapsed > 0.0 {
            coverage.add(0.0, elapsed);
        }

        let mut session = Self {
            track,
            state: SessionState::Queued,
            coverage,
            play_from_pos: 0.0,
            play_from_wall: 0.0,
        };

        match state {
            PlayState::Play => {
                session.start_run(elapsed, now);
                session.state = SessionState::Playing;
            }
            PlayState::Pause => session.state = SessionState::Paused,
            PlayState::Stop => {}
        }

        session
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Wall time at which the song would end if playback continues
    /// untouched. `None` while not playing or when the duration is unknown,
    /// which disables replay and playlist-end detection.
    pub fn expected_end(&self) -> Option<f64> {
        if self.state != SessionState::Playing {
            return None;
        }
        self.track
            .duration
            .map(|duration| self.play_from_wall + duration - self.play_from_pos)
    }

    /// Seconds of the song covered so far.
    pub fn total_covered(&self) -> f64 {
        self.coverage.total_covered()
    }

    /// Advance the state machine by one classified event.
    ///
    /// `elapsed` is the position from the status that triggered the event;
    /// `now` the wall time of that status fetch.
    pub fn apply(&mut self, event: PlayerEvent, elapsed: Option<f64>, now: f64) {
        use PlayerEvent::*;
        use SessionState::*;

        match (self.state, event) {
            (Terminated, _) => {}

            (Queued, Play) | (Paused, Play) => {
                let position = self.position(elapsed);
                self.start_run(position, now);
                self.state = Playing;
                debug!("playing from {position:.1}");
            }
            (Queued, Pause) | (Paused, Pause) => {
                // Position moved while paused, or a redundant notification.
                // No play run is open, nothing to record.
                self.state = Paused;
            }
            (Queued, NewSong) | (Paused, NewSong) => {
                debug!("song changed without an open play run");
                self.state = Terminated;
            }
            (Queued, Stop) | (Paused, Stop) => {
                self.coverage.clear();
                debug!("stopped; discarding coverage");
                self.state = Terminated;
            }
            (Queued, PlaylistEnd) | (Paused, PlaylistEnd) => {
                // No run is open, so there is nothing to credit, but unlike
                // a stop the recorded coverage stands.
                self.state = Terminated;
            }

            (Playing, Pause) => {
                let position = self.position(elapsed);
                self.coverage.add(self.play_from_pos, position);
                self.state = Paused;
                debug!("paused at {position:.1}");
            }
            (Playing, Seek) => {
                let reached = self.extrapolated_position(now);
                self.coverage.add(self.play_from_pos, reached);
                let position = self.position(elapsed);
                self.start_run(position, now);
                debug!("seeked from {reached:.1} to {position:.1}");
            }
            (Playing, Replay) => {
                // The song wrapped around; credit the run to the end. A
                // fresh session picks up the new pass.
                self.close_run_at_end(now);
                debug!("replay; crediting to end of song");
                self.state = Terminated;
            }
            (Playing, NewSong) => {
                let reached = self.extrapolated_position(now);
                self.coverage.add(self.play_from_pos, reached);
                debug!("new song; previous track played to {reached:.1}");
                self.state = Terminated;
            }
            (Playing, Stop) => {
                // A deliberate stop voids the listen entirely.
                self.coverage.clear();
                debug!("stopped mid-song; discarding coverage");
                self.state = Terminated;
            }
            (Playing, PlaylistEnd) => {
                self.close_run_at_end(now);
                debug!("playlist ended");
                self.state = Terminated;
            }

            (Queued, Seek) | (Queued, Replay) | (Paused, Seek) | (Paused, Replay)
            | (Playing, Play) => {
                debug!("ignoring {event:?} in state {:?}", self.state);
            }
        }
    }

    fn start_run(&mut self, position: f64, now: f64) {
        self.play_from_pos = position;
        self.play_from_wall = now;
    }

    /// Position reported by status, falling back to the start of the current
    /// run when MPD omitted `elapsed` (the run then contributes nothing).
    fn position(&self, elapsed: Option<f64>) -> f64 {
        match elapsed {
            Some(position) => position,
            None => {
                warn!("status carried no elapsed time; assuming no progress");
                self.play_from_pos
            }
        }
    }

    /// Where playback has reached by `now`, extrapolated from the start of
    /// the run. Used when the triggering status already describes the next
    /// song or position.
    fn extrapolated_position(&self, now: f64) -> f64 {
        self.play_from_pos + (now - self.play_from_wall)
    }

    fn close_run_at_end(&mut self, now: f64) {
        match self.track.duration {
            Some(duration) => self.coverage.add(self.play_from_pos, duration),
            // Replay/playlist-end need a known duration to be classified at
            // all, so this arm only defends against inconsistent callers.
            None => {
                let reached = self.extrapolated_position(now);
                self.coverage.add(self.play_from_pos, reached);
            }
        }
    }
}
