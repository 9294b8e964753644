// Pattern - a loopable bag of timed MIDI events
// One instrument part within a single loop cycle

use crate::midi::MidiEvent;
use crate::sequencer::queue::ScannedEvent;

/// An unordered collection of events within one loop cycle.
///
/// Events live in a dense vector in insertion order; identity is positional,
/// there are no generated IDs. `length` is the loop duration in ticks. Built
/// once at load time and immutable afterwards.
///
/// Scans are half-open `[start, end)` so an event sitting exactly on the seam
/// between two adjacent scan windows fires in exactly one of them. Offsets
/// are interpreted modulo `length`, so an event stored at `tick == length`
/// (permitted by the construction invariant) behaves as tick 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    events: Vec<MidiEvent>,
    length: u64,
}

impl Pattern {
    /// Create an empty pattern spanning `length` ticks.
    pub fn new(length: u64) -> Self {
        Self {
            events: Vec::new(),
            length,
        }
    }

    /// Loop duration in ticks.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Add an event. The offset must lie within the loop cycle.
    pub fn push(&mut self, event: MidiEvent) {
        assert!(
            event.tick <= self.length,
            "event tick {} outside pattern length {}",
            event.tick,
            self.length
        );
        self.events.push(event);
    }

    /// Collect events falling in `[start, end)` ticks into `out`, offsets
    /// relative to `start`.
    ///
    /// The query is interpreted against the repeating loop cycle: whole
    /// cycles before `start` are stripped first, then the window is walked
    /// one cycle segment at a time. A window deep in a later repetition and
    /// a window wider than one loop both resolve to the right repetitions,
    /// each stored event firing once per cycle it covers, offsets never
    /// negative.
    pub fn scan_events_in_range(&self, start: f64, end: f64, out: &mut Vec<ScannedEvent>) {
        if self.length == 0 || end <= start {
            return;
        }
        let length = self.length as f64;
        // the span before the first cycle (a window opening before the
        // pattern starts) is silence, so never strip cycles from a negative
        // start
        let cycles = (start / length).floor().max(0.0);
        let mut from = start - cycles * length;
        let mut to = end - cycles * length;
        let mut shift = 0.0;
        loop {
            self.collect(from, to.min(length), shift, out);
            if to <= length {
                break;
            }
            shift += length - from;
            to -= length;
            from = 0.0;
        }
    }

    fn collect(&self, start: f64, end: f64, shift: f64, out: &mut Vec<ScannedEvent>) {
        for event in &self.events {
            let tick = (event.tick % self.length) as f64;
            if tick >= start && tick < end {
                out.push(ScannedEvent::new(tick - start + shift, event.message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiMessage;

    fn pattern_with_ticks(length: u64, ticks: &[u64]) -> Pattern {
        let mut pattern = Pattern::new(length);
        for &tick in ticks {
            pattern.push(MidiEvent::new(tick, MidiMessage::note_on(0, 60, 100)));
        }
        pattern
    }

    fn offsets(pattern: &Pattern, start: f64, end: f64) -> Vec<f64> {
        let mut out = Vec::new();
        pattern.scan_events_in_range(start, end, &mut out);
        out.iter().map(|e| e.offset).collect()
    }

    #[test]
    fn test_scan_in_range() {
        let pattern = pattern_with_ticks(1920, &[0, 240, 480]);
        assert_eq!(offsets(&pattern, 0.0, 256.0), vec![0.0, 240.0]);
        assert_eq!(offsets(&pattern, 240.0, 481.0), vec![0.0, 240.0]);
    }

    #[test]
    fn test_half_open_boundaries() {
        let pattern = pattern_with_ticks(1920, &[240]);
        // included when the window opens on it, excluded when it closes on it
        assert_eq!(offsets(&pattern, 240.0, 256.0), vec![0.0]);
        assert_eq!(offsets(&pattern, 224.0, 240.0), Vec::<f64>::new());
    }

    #[test]
    fn test_adjacent_windows_fire_once() {
        let pattern = pattern_with_ticks(1920, &[16]);
        let first = offsets(&pattern, 0.0, 16.0);
        let second = offsets(&pattern, 16.0, 32.0);
        assert_eq!(first.len() + second.len(), 1);
        assert_eq!(second, vec![0.0]);
    }

    #[test]
    fn test_wrapped_scan() {
        let pattern = pattern_with_ticks(32, &[2, 30]);
        // window [24, 40) wraps: tick 30 at offset 6, tick 2 at offset 10
        assert_eq!(
            offsets(&pattern, 24.0, 40.0),
            vec![30.0 - 24.0, 32.0 - 24.0 + 2.0]
        );
    }

    #[test]
    fn test_wrap_idempotence() {
        let pattern = pattern_with_ticks(32, &[0, 7, 31]);
        let cycle0 = offsets(&pattern, 0.0, 32.0);
        let cycle1 = offsets(&pattern, 32.0, 64.0);
        assert_eq!(cycle0, cycle1);
    }

    #[test]
    fn test_event_at_length_fires_as_zero() {
        let pattern = pattern_with_ticks(32, &[32]);
        assert_eq!(offsets(&pattern, 0.0, 16.0), vec![0.0]);
    }

    #[test]
    fn test_later_cycle_windows_fire_once_each() {
        let pattern = pattern_with_ticks(32, &[0]);
        // adjacent windows in the second repetition: only the one covering
        // the cycle start fires, at its in-window offset
        assert!(offsets(&pattern, 40.0, 56.0).is_empty());
        assert_eq!(offsets(&pattern, 56.0, 72.0), vec![8.0]);
        assert!(offsets(&pattern, 72.0, 88.0).is_empty());
    }

    #[test]
    fn test_window_wider_than_one_cycle() {
        let pattern = pattern_with_ticks(32, &[0, 7]);
        // a stalled driver can query several repetitions at once
        assert_eq!(
            offsets(&pattern, 0.0, 100.0),
            vec![0.0, 7.0, 32.0, 39.0, 64.0, 71.0, 96.0]
        );
    }

    #[test]
    fn test_empty_or_inverted_range() {
        let pattern = pattern_with_ticks(32, &[0]);
        assert!(offsets(&pattern, 8.0, 8.0).is_empty());
        assert!(offsets(&pattern, 8.0, 4.0).is_empty());
        assert!(offsets(&Pattern::new(0), 0.0, 16.0).is_empty());
    }

    #[test]
    #[should_panic(expected = "outside pattern length")]
    fn test_push_past_length_panics() {
        pattern_with_ticks(32, &[33]);
    }
}
