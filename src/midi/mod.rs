// MIDI value types shared by the whole engine

pub mod message;

pub use message::{controller, meta, MessageKind, MidiEvent, MidiMessage};
