// Sequence - one arrangement section, a group of patterns
// Maps song-absolute time onto pattern-local time

use std::sync::Arc;

use crate::sequencer::pattern::Pattern;
use crate::sequencer::queue::PlaybackQueue;

/// An ordered group of patterns active during one region of the song.
///
/// Patterns are shared references: several sequences may play the same
/// pattern data at different positions (or on different channels via
/// per-channel builds, see the `score` module).
#[derive(Debug, Clone)]
pub struct Sequence {
    patterns: Vec<Arc<Pattern>>,
    start_tick: u64,
    length: u64,
}

impl Sequence {
    pub fn new(start_tick: u64, length: u64) -> Self {
        Self {
            patterns: Vec::new(),
            start_tick,
            length,
        }
    }

    pub fn push_pattern(&mut self, pattern: Arc<Pattern>) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[Arc<Pattern>] {
        &self.patterns
    }

    /// Position within the song, in ticks.
    pub fn start_tick(&self) -> u64 {
        self.start_tick
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.length
    }

    /// Whether this sequence is active at the given song tick.
    pub fn contains(&self, song_tick: f64) -> bool {
        song_tick >= self.start_tick as f64 && song_tick < self.end_tick() as f64
    }

    /// Scan `[song_start, song_end)` (song-absolute ticks) and insert found
    /// events into `queue`, offsets relative to `song_start`.
    ///
    /// The local end is clamped to the sequence length so a pattern restart
    /// coinciding with the next sequence's start cannot double-fire. The
    /// local start may be negative when the window opens before this
    /// sequence does; patterns hold no events there, and offsets stay
    /// window-relative either way.
    pub fn scan_events(&self, song_start: f64, song_end: f64, queue: &mut PlaybackQueue) {
        let local_start = song_start - self.start_tick as f64;
        let local_end = (song_end - self.start_tick as f64).min(self.length as f64);
        if local_end <= local_start {
            return;
        }

        let mut bucket = Vec::new();
        for pattern in &self.patterns {
            pattern.scan_events_in_range(local_start, local_end, &mut bucket);
        }
        for event in bucket {
            queue.insert(event);
        }
    }
}
