// Stepline - pattern sequencer transport engine
// Scans a song arrangement with a lookahead window and dispatches timed
// MIDI-style events to channel-addressed sinks

pub mod midi;
pub mod score;
pub mod sequencer;
pub mod sink;

// Re-export commonly used types for convenience
pub use midi::{controller, meta, MessageKind, MidiEvent, MidiMessage};
pub use score::{build_song, ScoreError, SongDescriptor};
pub use sequencer::{
    Pattern, PlaybackQueue, ScannedEvent, Sequence, Song, Timebase, Transport, TransportError,
};
pub use sink::{EventSink, PlayheadView, SinkPayload};
