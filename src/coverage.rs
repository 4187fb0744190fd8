//! Merged playback coverage for a single song.
//!
//! MPD never reports "I just played X seconds", so the tracker reconstructs
//! listening time from `[start, end)` position ranges recorded at every
//! play/pause/seek boundary. Ranges may overlap (a seek backwards replays a
//! stretch that was already heard); the total is the measure of their union,
//! so replaying the same 30 seconds five times still counts as 30 seconds.

use log::debug;

/// Append-only set of play intervals for one song, in seconds from song start.
///
/// Intervals are stored as recorded and merged lazily when the total is
/// requested. Duplicate or overlapping inserts are harmless by union
/// semantics.
#[derive(Debug, Clone, Default)]
pub struct CoverageLog {
    duration: Option<f64>,
    intervals: Vec<(f64, f64)>,
}

impl CoverageLog {
    /// Create an empty log. `duration` bounds future inserts; `None` when the
    /// song did not report one, in which case only negative bounds are clamped.
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            intervals: Vec::new(),
        }
    }

    /// Record that the range `start..end` was played.
    ///
    /// Bounds are clamped to `[0, duration]`. Ranges that are empty or
    /// inverted after clamping are dropped.
    pub fn add(&mut self, start: f64, end: f64) {
        let limit = self.duration.unwrap_or(f64::INFINITY);
        let start = start.clamp(0.0, limit);
        let end = end.clamp(0.0, limit);

        if start >= end {
            debug!("dropping empty play range ({start:.1}, {end:.1})");
            return;
        }

        self.intervals.push((start, end));
    }

    /// Discard all recorded ranges.
    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Seconds of the song covered by the union of all recorded ranges.
    ///
    /// Sorts a copy of the ranges by start and sweeps once, extending the
    /// current run while the next range starts inside it.
    pub fn total_covered(&self) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }

        let mut spans = self.intervals.clone();
        spans.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut total = 0.0;
        let (mut run_start, mut run_end) = spans[0];

        for (start, end) in spans.into_iter().skip(1) {
            if start <= run_end {
                run_end = run_end.max(end);
            } else {
                total += run_end - run_start;
                run_start = start;
                run_end = end;
            }
        }

        total + (run_end - run_start)
    }
}
