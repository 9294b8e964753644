// Score - the inbound song descriptor model and the song builder

pub mod builder;
pub mod descriptor;

pub use builder::{build_song, ScoreError};
pub use descriptor::{
    EventDescriptor, NoteTuple, PatternDescriptor, RawEventDescriptor, SequenceDescriptor,
    SongDescriptor, SongHeader,
};
