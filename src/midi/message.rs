// MIDI messages and timed events
// Immutable value types carried through the scan/dispatch pipeline

/// Controller numbers used by the arrangement machinery.
pub mod controller {
    /// Channel mode message: silence everything on the channel at once.
    pub const ALL_SOUND_OFF: u8 = 0x78;
    /// Channel mode message: release every held note on the channel.
    pub const ALL_NOTES_OFF: u8 = 0x7B;
}

/// Meta event types recognized in song descriptors.
pub mod meta {
    pub const MARKER: u8 = 6;
    pub const END_OF_TRACK: u8 = 47;
}

/// Status kinds understood by the sequencer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    ControlChange,
    Meta,
}

impl MessageKind {
    /// Raw MIDI status byte for this kind (channel bits zero).
    pub fn status_byte(&self) -> u8 {
        match self {
            MessageKind::NoteOff => 0x80,
            MessageKind::NoteOn => 0x90,
            MessageKind::ControlChange => 0xB0,
            MessageKind::Meta => 0xFF,
        }
    }

    /// Parse a raw status byte, ignoring the channel nibble.
    /// Returns `None` for statuses the engine does not handle.
    pub fn from_status_byte(status: u8) -> Option<Self> {
        match status {
            0xFF => Some(MessageKind::Meta),
            s => match s & 0xF0 {
                0x80 => Some(MessageKind::NoteOff),
                0x90 => Some(MessageKind::NoteOn),
                0xB0 => Some(MessageKind::ControlChange),
                _ => None,
            },
        }
    }
}

/// A channel message with its two data bytes.
///
/// `data1`/`data2` are pitch/velocity for notes and controller number/value
/// for control changes. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    pub kind: MessageKind,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub fn new(kind: MessageKind, channel: u8, data1: u8, data2: u8) -> Self {
        Self {
            kind,
            channel,
            data1,
            data2,
        }
    }

    pub fn note_on(channel: u8, pitch: u8, velocity: u8) -> Self {
        assert!(pitch <= 127, "MIDI pitch must be 0-127");
        assert!(velocity <= 127, "MIDI velocity must be 0-127");
        Self::new(MessageKind::NoteOn, channel, pitch, velocity)
    }

    pub fn note_off(channel: u8, pitch: u8) -> Self {
        assert!(pitch <= 127, "MIDI pitch must be 0-127");
        Self::new(MessageKind::NoteOff, channel, pitch, 0)
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self::new(MessageKind::ControlChange, channel, controller, value)
    }

    pub fn marker(index: u8) -> Self {
        Self::new(MessageKind::Meta, 0, meta::MARKER, index)
    }
}

/// A message pinned to a musical offset.
///
/// `tick` is relative to the owning container's local origin: pattern-local
/// inside a `Pattern`, song-absolute once an arrangement position is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub tick: u64,
    pub message: MidiMessage,
}

impl MidiEvent {
    pub fn new(tick: u64, message: MidiMessage) -> Self {
        Self { tick, message }
    }
}
