//! Playback verdicts.
//!
//! Once a song session ends, its merged coverage is weighed against two
//! thresholds derived from the song duration and the configured limits:
//!
//! - play threshold: `min(play_time, duration * play_percent)`
//! - skip threshold: `max(skip_time, duration * skip_percent)`
//!
//! With the defaults a 300 second track is "played" after 150 seconds of
//! listening and "skipped" under 20; anything between is neither.

use std::fmt;

use crate::config::Config;

/// Per-song verdict thresholds, in seconds of coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub play: f64,
    pub skip: f64,
}

impl Thresholds {
    /// Derive thresholds for a song. Without a duration the percentage terms
    /// are meaningless and the flat time limits apply on their own.
    pub fn for_duration(config: &Config, duration: Option<f64>) -> Self {
        match duration {
            Some(duration) => Self {
                play: config.play_time.min(duration * config.play_percent),
                skip: config.skip_time.max(duration * config.skip_percent),
            },
            None => Self {
                play: config.play_time,
                skip: config.skip_time,
            },
        }
    }
}

/// The outcome of one song-listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Played,
    Skipped,
    Neither,
}

impl Verdict {
    /// Classify total coverage against the thresholds.
    ///
    /// Zero coverage is always `Neither` (a stopped session clears its
    /// coverage for exactly this reason). The played test runs before the
    /// skipped test, so a pathological configuration where both thresholds
    /// straddle the coverage resolves to `Played`.
    pub fn from_coverage(covered: f64, thresholds: &Thresholds) -> Self {
        if covered == 0.0 {
            Verdict::Neither
        } else if covered > thresholds.play {
            Verdict::Played
        } else if covered < thresholds.skip {
            Verdict::Skipped
        } else {
            Verdict::Neither
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Played => "played",
            Verdict::Skipped => "skipped",
            Verdict::Neither => "neither",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_for_a_five_minute_track() {
        let config = Config::default();
        let t = Thresholds::for_duration(&config, Some(300.0));
        // min(240, 300 * 0.5) and max(20, 300 * 0)
        assert_eq!(t.play, 150.0);
        assert_eq!(t.skip, 20.0);
    }

    #[test]
    fn long_tracks_hit_the_play_time_cap() {
        let config = Config::default();
        let t = Thresholds::for_duration(&config, Some(1200.0));
        assert_eq!(t.play, 240.0);
    }

    #[test]
    fn missing_duration_falls_back_to_flat_limits() {
        let config = Config::default();
        let t = Thresholds::for_duration(&config, None);
        assert_eq!(t.play, config.play_time);
        assert_eq!(t.skip, config.skip_time);
    }

    #[test]
    fn verdict_bands() {
        let t = Thresholds {
            play: 150.0,
            skip: 20.0,
        };
        assert_eq!(Verdict::from_coverage(160.0, &t), Verdict::Played);
        assert_eq!(Verdict::from_coverage(10.0, &t), Verdict::Skipped);
        assert_eq!(Verdict::from_coverage(60.0, &t), Verdict::Neither);
    }

    #[test]
    fn zero_coverage_is_neither() {
        let t = Thresholds {
            play: 150.0,
            skip: 20.0,
        };
        assert_eq!(Verdict::from_coverage(0.0, &t), Verdict::Neither);
    }

    #[test]
    fn threshold_boundaries_are_exclusive() {
        let t = Thresholds {
            play: 150.0,
            skip: 20.0,
        };
        // Exactly on a threshold is neither played nor skipped.
        assert_eq!(Verdict::from_coverage(150.0, &t), Verdict::Neither);
        assert_eq!(Verdict::from_coverage(20.0, &t), Verdict::Neither);
    }

    #[test]
    fn played_wins_over_skipped_with_crossed_thresholds() {
        // skip threshold above play threshold is a misconfiguration; the
        // played test takes precedence.
        let t = Thresholds {
            play: 30.0,
            skip: 100.0,
        };
        assert_eq!(Verdict::from_coverage(50.0, &t), Verdict::Played);
    }

    #[test]
    fn exactly_one_verdict_is_returned() {
        let config = Config::default();
        let t = Thresholds::for_duration(&config, Some(300.0));
        for covered in [0.0, 5.0, 20.0, 60.0, 150.0, 151.0, 300.0] {
            let verdict = Verdict::from_coverage(covered, &t);
            assert!(matches!(
                verdict,
                Verdict::Played | Verdict::Skipped | Verdict::Neither
            ));
        }
    }
}
