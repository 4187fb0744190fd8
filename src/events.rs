//! Player event classification.
//!
//! MPD's `idle player` notification says only "something about the player
//! changed" - the transition itself has to be reconstructed by comparing the
//! status before and after the notification. Most transitions are obvious
//! from the state pair, but two pairs are ambiguous:
//!
//! - `play -> play` with the same song is either a seek or a replay (the
//!   user restarted the track right as it ended);
//! - `-> stop` is either the user hitting stop or the playlist running out.
//!
//! Both are disambiguated by wall-clock proximity to the moment the song
//! would naturally have ended: a transition landing within the tolerance of
//! that moment is taken as the song finishing on its own. The tolerance
//! absorbs network round-trips and MPD's one-second elapsed granularity.

/// MPD player state, as reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Play,
    Pause,
    Stop,
}

/// What happened to the player between two consecutive status snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback started or resumed on the tracked song.
    Play,
    /// The tracked song was paused.
    Pause,
    /// Position jumped within the tracked song.
    Seek,
    /// The tracked song ended and immediately started over.
    Replay,
    /// A different song is now loaded.
    NewSong,
    /// The user stopped playback mid-song.
    Stop,
    /// Playback stopped because the queue ran out, right as the song ended.
    PlaylistEnd,
}

/// True when `now` falls within `tolerance` seconds of the expected natural
/// end of the song. With no expected end (unknown duration, or the song is
/// not playing) nothing can be "near the end".
pub fn near_expected_end(expected_end_wall: Option<f64>, now: f64, tolerance: f64) -> bool {
    match expected_end_wall {
        Some(end) => (now - end).abs() < tolerance,
        None => false,
    }
}

/// Classify one `idle player` wakeup from the surrounding state snapshots.
///
/// `song_changed` must come from full-record equality of the two current
/// songs; queue position alone is not enough, MPD can swap the queue out
/// underneath a stable position.
pub fn classify(
    prev_state: PlayState,
    new_state: PlayState,
    song_changed: bool,
    near_end: bool,
) -> PlayerEvent {
    match new_state {
        PlayState::Stop => {
            if near_end {
                PlayerEvent::PlaylistEnd
            } else {
                PlayerEvent::Stop
            }
        }
        _ if song_changed => PlayerEvent::NewSong,
        PlayState::Pause => PlayerEvent::Pause,
        PlayState::Play => match prev_state {
            // Same song, still playing: position moved. Near the expected
            // end that is the track wrapping around, otherwise a seek.
            PlayState::Play => {
                if near_end {
                    PlayerEvent::Replay
                } else {
                    PlayerEvent::Seek
                }
            }
            PlayState::Pause | PlayState::Stop => PlayerEvent::Play,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlayState::*;
    use PlayerEvent::{NewSong, PlaylistEnd, Replay, Seek};

    #[test]
    fn pause_and_resume() {
        assert_eq!(classify(Play, Pause, false, false), PlayerEvent::Pause);
        assert_eq!(classify(Pause, Play, false, false), PlayerEvent::Play);
    }

    #[test]
    fn same_song_play_to_play_is_seek_or_replay() {
        assert_eq!(classify(Play, Play, false, false), Seek);
        assert_eq!(classify(Play, Play, false, true), Replay);
    }

    #[test]
    fn song_change_wins_for_play_and_pause() {
        assert_eq!(classify(Play, Play, true, false), NewSong);
        assert_eq!(classify(Play, Play, true, true), NewSong);
        assert_eq!(classify(Pause, Play, true, false), NewSong);
        assert_eq!(classify(Play, Pause, true, false), NewSong);
    }

    #[test]
    fn stop_vs_playlist_end() {
        for prev in [Play, Pause, Stop] {
            assert_eq!(classify(prev, PlayState::Stop, false, true), PlaylistEnd);
            assert_eq!(classify(prev, PlayState::Stop, false, false), PlayerEvent::Stop);
        }
    }

    #[test]
    fn stop_outranks_song_change() {
        // The queue may have been replaced and stopped in one swoop; the
        // stop still ends the session.
        assert_eq!(classify(Play, Stop, true, false), PlayerEvent::Stop);
    }

    #[test]
    fn playback_from_stopped_player() {
        assert_eq!(classify(Stop, Play, false, false), PlayerEvent::Play);
    }

    #[test]
    fn near_end_window() {
        assert!(near_expected_end(Some(1000.0), 1000.4, 1.0));
        assert!(near_expected_end(Some(1000.0), 999.1, 1.0));
        assert!(!near_expected_end(Some(1000.0), 1001.0, 1.0));
        assert!(!near_expected_end(Some(1000.0), 990.0, 1.0));
        assert!(!near_expected_end(None, 1000.0, 1.0));
    }

    #[test]
    fn tolerance_is_configurable() {
        assert!(near_expected_end(Some(1000.0), 1002.0, 3.0));
        assert!(!near_expected_end(Some(1000.0), 1002.0, 1.0));
    }

    #[test]
    fn no_expected_end_collapses_replay_to_seek() {
        // Unknown duration: callers pass near_end = false, so a wraparound
        // is indistinguishable from a seek and must classify as one.
        let near = near_expected_end(None, 1000.0, 1.0);
        assert_eq!(classify(Play, Play, false, near), Seek);
        assert_eq!(classify(Play, Stop, false, near), PlayerEvent::Stop);
    }
}
