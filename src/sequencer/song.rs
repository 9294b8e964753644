// Song - the full arrangement and its scan-state machine
// Ordered, contiguous sequences plus the one mutable cursor

use std::sync::Arc;

use crate::midi::{controller, MidiMessage};
use crate::sequencer::pattern::Pattern;
use crate::sequencer::queue::{PlaybackQueue, ScannedEvent};
use crate::sequencer::sequence::Sequence;
use crate::sequencer::timebase::Timebase;

/// The full ordered arrangement: sequences, tempo header, song length.
///
/// Sequences are contiguous and non-overlapping by construction:
/// `push_sequence` always appends at the running end of the song. `cursor`
/// (which sequence is current while scanning) is the only mutable scan
/// state; it is touched exclusively by `scan_events`, which is non-reentrant
/// by `&mut self`.
#[derive(Debug, Clone)]
pub struct Song {
    sequences: Vec<Sequence>,
    length: u64,
    bpm: f64,
    ticks_per_beat: u32,
    cursor: Option<usize>,
    boundary_events: Vec<ScannedEvent>,
}

impl Song {
    pub fn new(ticks_per_beat: u32, bpm: f64) -> Self {
        assert!(ticks_per_beat > 0, "ticks per beat must be > 0");
        assert!(bpm > 0.0 && bpm.is_finite(), "BPM must be positive");
        Self {
            sequences: Vec::new(),
            length: 0,
            bpm,
            ticks_per_beat,
            cursor: None,
            boundary_events: Vec::new(),
        }
    }

    /// Append a sequence of `length` ticks at the end of the arrangement.
    pub fn push_sequence(&mut self, length: u64, patterns: Vec<Arc<Pattern>>) {
        let mut sequence = Sequence::new(self.length, length);
        for pattern in patterns {
            sequence.push_pattern(pattern);
        }
        self.sequences.push(sequence);
        self.length += length;
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Total arrangement length in ticks.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// Index of the sequence the scanner currently sits in, if any scan has
    /// happened yet.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Forget scan state, as if the song had never been played.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.boundary_events.clear();
    }

    /// Scan `[start_seconds, end_seconds)` and append found events to
    /// `queue`, offsets in ticks relative to the window start.
    ///
    /// The window is converted to ticks with the caller's `timebase` (the
    /// transport's live tempo), not the song header, so the conversion always
    /// matches the clock that produced the window.
    ///
    /// Crossing into the next sequence, or over the song end (wrap to the
    /// top), records a boundary event retrievable via
    /// [`take_boundary_events`](Self::take_boundary_events) and re-scans the
    /// newly entered sequence over the rest of the window, so its first
    /// events are not missed within the same scan call.
    pub fn scan_events(
        &mut self,
        start_seconds: f64,
        end_seconds: f64,
        timebase: &Timebase,
        queue: &mut PlaybackQueue,
    ) {
        if self.sequences.is_empty() || self.length == 0 {
            return;
        }
        let mut start = timebase.seconds_to_ticks(start_seconds);
        let mut end = timebase.seconds_to_ticks(end_seconds);
        if end <= start {
            return;
        }

        // Relocate the cursor when the window start left the sequence it was
        // in: first scan, seek, rewind. A window that opens just before tick
        // zero (a loop wrap lands there) falls through to the first sequence.
        let cursor = self.cursor;
        let mut index = match cursor {
            Some(i) if self.sequences[i].contains(start) => i,
            // A window opening exactly on the end of the current sequence is
            // the seam of a continuous slide (the previous window's half-open
            // end excluded the crossing); the boundary happens here, at the
            // very start of the window. Genuine seeks land elsewhere and stay
            // silent.
            Some(i) if start == self.sequences[i].end_tick() as f64 => {
                self.boundary_events.push(ScannedEvent::new(
                    0.0,
                    MidiMessage::control_change(0, controller::ALL_SOUND_OFF, 0),
                ));
                if i + 1 < self.sequences.len() {
                    i + 1
                } else {
                    // seam on the song end: wrap to the top
                    start -= self.length as f64;
                    end -= self.length as f64;
                    0
                }
            }
            _ => match self.sequences.iter().position(|s| s.contains(start)) {
                Some(i) => i,
                None if start < 0.0 && end > 0.0 => 0,
                None => return, // playhead past the end of the arrangement
            },
        };

        loop {
            self.sequences[index].scan_events(start, end, queue);

            let boundary = if index + 1 < self.sequences.len() {
                self.sequences[index + 1].start_tick() as f64
            } else {
                self.length as f64
            };
            if boundary < start || boundary >= end {
                break;
            }

            // The active sequence ends inside this window. Record the
            // crossing so the transport can broadcast all-notes-off, then
            // move on and re-scan.
            self.boundary_events.push(ScannedEvent::new(
                boundary - start,
                MidiMessage::control_change(0, controller::ALL_SOUND_OFF, 0),
            ));

            if index + 1 < self.sequences.len() {
                index += 1;
            } else {
                // song wrap: shift the window back by one song length and
                // start over from the first sequence
                start -= self.length as f64;
                end -= self.length as f64;
                index = 0;
            }
        }

        self.cursor = Some(index);
    }

    /// Drain the boundary events recorded by the scans since the last drain.
    /// The song knows nothing about channels; the transport turns each of
    /// these into a per-channel broadcast.
    pub fn take_boundary_events(&mut self) -> Vec<ScannedEvent> {
        std::mem::take(&mut self.boundary_events)
    }
}
