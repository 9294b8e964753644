// Sequencer module - the transport/scheduler core
// Timebase math, the pattern/sequence/song hierarchy, and the transport

pub mod pattern;
pub mod queue;
pub mod sequence;
pub mod song;
pub mod timebase;
pub mod transport;

pub use pattern::Pattern;
pub use queue::{PlaybackQueue, ScannedEvent};
pub use sequence::Sequence;
pub use song::Song;
pub use timebase::{Timebase, LOOKAHEAD_TICKS};
pub use transport::{Transport, TransportError};
