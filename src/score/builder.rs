// Song builder - assembles a playable Song from a descriptor
// Malformed references degrade with a warning instead of failing the build

use std::collections::HashMap;
use std::sync::Arc;

use crate::midi::{meta, MessageKind, MidiEvent, MidiMessage};
use crate::score::descriptor::{EventDescriptor, PatternDescriptor, SongDescriptor};
use crate::sequencer::{Pattern, Song};

/// Score error types
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("song tempo must be positive and finite, got {0}")]
    InvalidTempo(f64),

    #[error("song resolution (ticksPerBeat) must be > 0")]
    InvalidResolution,
}

/// Build a [`Song`] from a descriptor.
///
/// A bad tempo or resolution is a hard error; dangling sequence and pattern
/// references are skipped with a warning so a partially broken file still
/// plays what it can. Patterns are built once per `(id, channel)` pair and
/// shared between the sequences that reference them.
pub fn build_song(descriptor: &SongDescriptor) -> Result<Song, ScoreError> {
    let header = &descriptor.song;
    if !(header.beats_per_minute > 0.0) || !header.beats_per_minute.is_finite() {
        return Err(ScoreError::InvalidTempo(header.beats_per_minute));
    }
    if header.ticks_per_beat == 0 {
        return Err(ScoreError::InvalidResolution);
    }
    let tpb = header.ticks_per_beat;

    let mut song = Song::new(tpb, header.beats_per_minute);
    let mut built: HashMap<(String, u8), Arc<Pattern>> = HashMap::new();

    for sequence_id in &header.sequences {
        let Some(sequence) = descriptor.sequences.iter().find(|s| &s.id == sequence_id) else {
            log::warn!("song references unknown sequence '{sequence_id}', skipping");
            continue;
        };

        let mut patterns = Vec::new();
        for pattern_id in &sequence.patterns {
            let key = (pattern_id.clone(), sequence.channel);
            if let Some(pattern) = built.get(&key) {
                patterns.push(Arc::clone(pattern));
                continue;
            }
            let Some(data) = descriptor.patterns.iter().find(|p| &p.id == pattern_id) else {
                log::warn!(
                    "sequence '{}' references unknown pattern '{pattern_id}', skipping",
                    sequence.id
                );
                continue;
            };
            let pattern = Arc::new(build_pattern(data, tpb, sequence.channel));
            built.insert(key, Arc::clone(&pattern));
            patterns.push(pattern);
        }

        let length_ticks = beats_to_ticks(sequence.length, tpb);
        song.push_sequence(length_ticks, patterns);
    }

    Ok(song)
}

fn beats_to_ticks(beats: f64, tpb: u32) -> u64 {
    (beats * tpb as f64).round().max(0.0) as u64
}

/// Build one pattern, resolving note tuples against the owning sequence's
/// channel. Meta events are not stored; end-of-track only contributes the
/// pattern length.
fn build_pattern(data: &PatternDescriptor, tpb: u32, channel: u8) -> Pattern {
    let mut events: Vec<MidiEvent> = Vec::new();
    let mut end_of_track: Option<u64> = None;

    for event in &data.events {
        match event {
            EventDescriptor::Note(tuple) => {
                if tuple.0 != "note" {
                    log::warn!(
                        "pattern '{}' has unknown event tag '{}', skipping",
                        data.id,
                        tuple.0
                    );
                    continue;
                }
                if tuple.3 > 127 || tuple.4 > 127 {
                    log::warn!(
                        "pattern '{}' note has out-of-range pitch/velocity, skipping",
                        data.id
                    );
                    continue;
                }
                let start = beats_to_ticks(tuple.1, tpb);
                let end = beats_to_ticks(tuple.1 + tuple.2, tpb);
                events.push(MidiEvent::new(
                    start,
                    MidiMessage::note_on(channel, tuple.3, tuple.4),
                ));
                events.push(MidiEvent::new(end, MidiMessage::note_off(channel, tuple.3)));
            }
            EventDescriptor::Raw(raw) => {
                let tick = beats_to_ticks(raw.time, tpb);
                match MessageKind::from_status_byte(raw.status) {
                    Some(MessageKind::Meta) => {
                        if raw.data1 == meta::END_OF_TRACK {
                            end_of_track = Some(tick);
                        }
                    }
                    Some(kind) => {
                        events.push(MidiEvent::new(
                            tick,
                            MidiMessage::new(kind, raw.channel, raw.data1, raw.data2),
                        ));
                    }
                    None => {
                        log::warn!(
                            "pattern '{}' has unsupported status byte {:#04x}, skipping",
                            data.id,
                            raw.status
                        );
                    }
                }
            }
        }
    }

    let length = match (data.length, end_of_track) {
        (Some(beats), _) => beats_to_ticks(beats, tpb),
        (None, Some(tick)) => tick,
        (None, None) => events.iter().map(|e| e.tick).max().unwrap_or(0),
    };

    let mut pattern = Pattern::new(length);
    for mut event in events {
        if event.tick > length {
            if event.message.kind == MessageKind::NoteOff {
                // a note held past the loop end releases at the loop seam
                event.tick = length;
            } else {
                log::warn!(
                    "pattern '{}' event at tick {} lies past length {}, skipping",
                    data.id,
                    event.tick,
                    length
                );
                continue;
            }
        }
        pattern.push(event);
    }
    pattern
}
