// Collaborator traits - how the transport talks to the outside world
// Generators receive timed events, views receive the playhead position

use crate::midi::MessageKind;

/// Payload handed to an [`EventSink`] for one event.
///
/// `time` is an absolute engine-clock timestamp (seconds) at which the sink
/// should realize the event. It lies a few milliseconds in the future: the
/// transport dispatches ahead of time and the sink does its own fine-grained
/// scheduling against the audio clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkPayload {
    pub data1: u8,
    pub data2: u8,
    pub time: f64,
}

/// A channel-addressed consumer of dispatched events, typically a sound
/// generator. Calls are fire-and-forget and must not block.
pub trait EventSink {
    fn on_data(&mut self, kind: MessageKind, payload: SinkPayload);
}

/// A consumer of the playhead position, typically a canvas or piano roll.
/// Called once per driver step whether or not playback is running.
pub trait PlayheadView {
    fn set_playhead(&mut self, tick: f64);
}
