// PlaybackQueue - events found by one scan, in dispatch order
// Kept sorted on insert; drained and cleared every driver step

use crate::midi::{MessageKind, MidiMessage};

/// An event located by a scan, with its offset in ticks from the window
/// start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScannedEvent {
    pub offset: f64,
    pub message: MidiMessage,
}

impl ScannedEvent {
    pub fn new(offset: f64, message: MidiMessage) -> Self {
        Self { offset, message }
    }

    // NoteOff sorts before anything else at the same offset, so a retrigger
    // of the same pitch releases before it strikes again
    fn class(&self) -> u8 {
        match self.message.kind {
            MessageKind::NoteOff => 0,
            _ => 1,
        }
    }
}

/// The events of the current scan window, ordered by offset with note-offs
/// first among equals.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    events: Vec<ScannedEvent>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Insert keeping the ordering invariant. Equal keys insert after their
    /// peers, so arrival order is preserved within a key.
    pub fn insert(&mut self, event: ScannedEvent) {
        let class = event.class();
        let at = self.events.partition_point(|queued| {
            queued.offset < event.offset
                || (queued.offset == event.offset && queued.class() <= class)
        });
        self.events.insert(at, event);
    }

    /// Put an event ahead of everything already queued, bypassing the
    /// ordering. Used for boundary broadcasts that must precede any note
    /// starting on the same tick.
    pub fn push_front(&mut self, event: ScannedEvent) {
        self.events.insert(0, event);
    }

    pub fn events(&self) -> &[ScannedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_at(offset: f64, pitch: u8) -> ScannedEvent {
        ScannedEvent::new(offset, MidiMessage::note_on(0, pitch, 100))
    }

    fn off_at(offset: f64, pitch: u8) -> ScannedEvent {
        ScannedEvent::new(offset, MidiMessage::note_off(0, pitch))
    }

    #[test]
    fn test_insert_sorts_by_offset() {
        let mut queue = PlaybackQueue::new();
        queue.insert(on_at(8.0, 64));
        queue.insert(on_at(0.0, 60));
        queue.insert(on_at(4.0, 62));

        let offsets: Vec<f64> = queue.events().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0.0, 4.0, 8.0]);
    }

    #[test]
    fn test_note_off_precedes_note_on_at_same_offset() {
        let mut queue = PlaybackQueue::new();
        queue.insert(on_at(4.0, 60));
        queue.insert(off_at(4.0, 60));

        assert_eq!(queue.events()[0].message.kind, MessageKind::NoteOff);
        assert_eq!(queue.events()[1].message.kind, MessageKind::NoteOn);
    }

    #[test]
    fn test_equal_keys_keep_arrival_order() {
        let mut queue = PlaybackQueue::new();
        queue.insert(on_at(4.0, 60));
        queue.insert(on_at(4.0, 64));
        queue.insert(on_at(4.0, 67));

        let pitches: Vec<u8> = queue.events().iter().map(|e| e.message.data1).collect();
        assert_eq!(pitches, vec![60, 64, 67]);
    }

    #[test]
    fn test_push_front_bypasses_ordering() {
        let mut queue = PlaybackQueue::new();
        queue.insert(on_at(0.0, 60));
        queue.push_front(ScannedEvent::new(
            10.0,
            MidiMessage::control_change(0, 0x7B, 0),
        ));

        assert_eq!(queue.events()[0].message.kind, MessageKind::ControlChange);
        assert_eq!(queue.len(), 2);
        queue.clear();
        assert!(queue.is_empty());
    }
}
