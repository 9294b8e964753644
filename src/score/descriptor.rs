// Song descriptor types - the JSON-shaped schema songs arrive in
// Field names mirror the external schema's camelCase

use serde::{Deserialize, Serialize};

/// A complete song description: header, sequence table, pattern table.
///
/// The arrangement is `song.sequences`, an ordered list of ids into the
/// `sequences` table; each sequence in turn references the `patterns` table
/// by id. All musical positions in a descriptor are in beats; the builder
/// converts them to ticks at the header's resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongDescriptor {
    pub song: SongHeader,
    #[serde(default)]
    pub sequences: Vec<SequenceDescriptor>,
    #[serde(default)]
    pub patterns: Vec<PatternDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongHeader {
    #[serde(rename = "beatsPerMinute")]
    pub beats_per_minute: f64,
    #[serde(rename = "ticksPerBeat")]
    pub ticks_per_beat: u32,
    /// Arrangement order, by sequence id.
    #[serde(default)]
    pub sequences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDescriptor {
    pub id: String,
    /// Channel the sequence's note events address.
    #[serde(default)]
    pub channel: u8,
    /// Section length in beats.
    pub length: f64,
    /// Pattern ids played during this section.
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDescriptor {
    pub id: String,
    /// Loop length in beats. When absent, the builder falls back to an
    /// end-of-track meta event, then to the last event's position.
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
}

/// One pattern event, in either of the schema's two shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDescriptor {
    /// `["note", startBeat, durationBeats, pitch, velocity]`
    Note(NoteTuple),
    /// A raw MIDI-like record with a status byte and two data bytes.
    Raw(RawEventDescriptor),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTuple(pub String, pub f64, pub f64, pub u8, pub u8);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEventDescriptor {
    /// Position in beats from the pattern start.
    #[serde(alias = "deltaTime")]
    pub time: f64,
    /// Raw status byte (0x80 note off, 0x90 note on, 0xB0 control change,
    /// 0xFF meta).
    #[serde(rename = "type")]
    pub status: u8,
    #[serde(default)]
    pub channel: u8,
    #[serde(default)]
    pub data1: u8,
    #[serde(default)]
    pub data2: u8,
}
