// Transport - the lookahead scheduler
// Owns the play cursor, scan window, playback queue and channel targets

use std::collections::BTreeMap;

use crate::midi::{controller, MessageKind, MidiMessage};
use crate::sequencer::queue::{PlaybackQueue, ScannedEvent};
use crate::sequencer::song::Song;
use crate::sequencer::timebase::Timebase;
use crate::sink::{EventSink, PlayheadView, SinkPayload};

/// Transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("tempo must be positive and finite, got {0}")]
    InvalidTempo(f64),

    #[error("ticks per beat must be > 0, got {0}")]
    InvalidResolution(u32),

    #[error("loop start {start} must lie before loop end {end}")]
    InvalidLoop { start: u64, end: u64 },

    #[error("no target registered for channel {0}")]
    UnknownChannel(u8),
}

/// How far the playhead may run past the scan window before it slides,
/// roughly one 60 Hz frame. A missed frame self-heals: the next window is
/// simply wider.
const FRAME_SLACK: f64 = 0.0167;

/// The scheduler driving playback.
///
/// An external driver calls [`step`](Self::step) at its chosen cadence
/// (nominally once per render frame) with a monotonically increasing
/// engine-clock sample; the transport assumes no timer mechanism of its own.
/// Each step advances the playhead, scans the song one lookahead window
/// ahead when needed, and fans the found events out to per-channel sinks
/// with absolute timestamps a few milliseconds in the future, leaving
/// fine-grained timing to the sinks' own scheduling.
///
/// Single-threaded by design: every operation completes synchronously
/// within one step and `&mut self` rules out reentrancy.
pub struct Transport {
    timebase: Timebase,
    song: Option<Song>,
    targets: BTreeMap<u8, Box<dyn EventSink>>,
    views: Vec<Box<dyn PlayheadView>>,
    queue: PlaybackQueue,

    /// Playback position in linear seconds.
    now: f64,
    /// Engine-clock time of linear second zero.
    abs_origin: f64,
    /// Engine-clock sample from the previous step.
    abs_old_now: f64,

    scan_start: f64,
    scan_end: f64,
    needs_scan: bool,

    loop_start: f64,
    loop_end: f64,
    looping: bool,

    running: bool,
}

impl Transport {
    pub fn new(ticks_per_beat: u32, bpm: f64) -> Result<Self, TransportError> {
        let timebase = Timebase::new(ticks_per_beat, bpm)?;
        Ok(Self {
            timebase,
            song: None,
            targets: BTreeMap::new(),
            views: Vec::new(),
            queue: PlaybackQueue::new(),
            now: 0.0,
            abs_origin: 0.0,
            abs_old_now: 0.0,
            scan_start: 0.0,
            scan_end: timebase.lookahead(),
            needs_scan: true,
            loop_start: 0.0,
            loop_end: 0.0,
            looping: false,
            running: false,
        })
    }

    /// Advance one driver frame. `abs_now` is the engine clock in seconds.
    ///
    /// Views are updated every step; everything else only happens while
    /// running. Fails fast if a scanned event addresses a channel with no
    /// registered target (all referenced channels must be registered before
    /// [`start`](Self::start)).
    pub fn step(&mut self, abs_now: f64) -> Result<(), TransportError> {
        if self.running {
            self.now += abs_now - self.abs_old_now;
            self.abs_old_now = abs_now;

            self.refresh_scan_window(false);
            self.scan();
            let dispatched = self.dispatch();
            self.queue.clear();
            dispatched?;

            // if the end of the loop occurs within the lookahead window,
            // set the playhead back by exactly one loop length
            if self.looping && self.loop_end - (self.now + self.timebase.lookahead()) < 0.0 {
                self.set_now_seconds(self.loop_start - (self.loop_end - self.now));
            }
        }
        self.update_views();
        Ok(())
    }

    /// Slide or (when `forced`) reset the scan window. Forced resets follow
    /// the playhead; ordinary slides continue where the last window ended so
    /// no span is scanned twice or skipped.
    fn refresh_scan_window(&mut self, forced: bool) {
        if forced {
            self.scan_start = self.now;
            self.scan_end = self.scan_start + self.timebase.lookahead();
            self.needs_scan = true;
        } else if self.scan_end - self.now < -FRAME_SLACK {
            self.scan_start = self.scan_end;
            self.scan_end = self.now + self.timebase.lookahead();
            self.needs_scan = true;
        }
    }

    /// Run the song scan for the current window, once per window.
    fn scan(&mut self) {
        if !self.needs_scan {
            return;
        }
        self.needs_scan = false;

        let Some(song) = self.song.as_mut() else {
            return;
        };
        song.scan_events(self.scan_start, self.scan_end, &self.timebase, &mut self.queue);

        // A sequence or song boundary inside the window becomes one
        // all-notes-off per registered channel, placed at the queue front so
        // it is processed before any note starting on the same tick.
        for boundary in song.take_boundary_events() {
            for &channel in self.targets.keys() {
                self.queue.push_front(ScannedEvent::new(
                    boundary.offset,
                    MidiMessage::control_change(channel, controller::ALL_NOTES_OFF, 0),
                ));
            }
        }
    }

    /// Send every queued event to its channel target. Timestamps are derived
    /// from the scan window start, so they are exact regardless of frame
    /// jitter in the polled clock.
    fn dispatch(&mut self) -> Result<(), TransportError> {
        let scan_start_ticks = self.timebase.seconds_to_ticks(self.scan_start);
        for event in self.queue.events() {
            let channel = event.message.channel;
            let sink = self
                .targets
                .get_mut(&channel)
                .ok_or(TransportError::UnknownChannel(channel))?;
            sink.on_data(
                event.message.kind,
                SinkPayload {
                    data1: event.message.data1,
                    data2: event.message.data2,
                    time: self.abs_origin
                        + self.timebase.ticks_to_seconds(scan_start_ticks + event.offset),
                },
            );
        }
        Ok(())
    }

    fn update_views(&mut self) {
        let tick = self.timebase.seconds_to_ticks(self.now);
        for view in &mut self.views {
            view.set_playhead(tick);
        }
    }

    /// Start playback from the current position.
    pub fn start(&mut self, abs_now: f64) {
        self.queue.clear();
        self.abs_origin = abs_now - self.now;
        self.abs_old_now = abs_now;
        self.running = true;
        self.refresh_scan_window(true);
    }

    /// Stop playback and silence every registered target immediately.
    ///
    /// The all-notes-off bypasses the lookahead: its timestamp is the pause
    /// instant itself, so no stale note-on can sound afterwards. The pending
    /// queue is discarded.
    pub fn pause(&mut self, abs_now: f64) {
        self.running = false;
        self.queue.clear();
        for sink in self.targets.values_mut() {
            sink.on_data(
                MessageKind::ControlChange,
                SinkPayload {
                    data1: controller::ALL_NOTES_OFF,
                    data2: 0,
                    time: abs_now,
                },
            );
        }
    }

    /// Move the playhead to the start of the song.
    pub fn rewind(&mut self) {
        self.set_now_seconds(0.0);
    }

    /// Move the playhead to a position in ticks.
    pub fn set_now(&mut self, tick: f64) {
        self.set_now_seconds(self.timebase.ticks_to_seconds(tick));
    }

    /// Move the playhead to a position in linear seconds and rebuild the
    /// scan window there.
    pub fn set_now_seconds(&mut self, seconds: f64) {
        self.now = seconds;
        self.abs_origin = self.abs_old_now - self.now;
        self.refresh_scan_window(true);
    }

    /// Change the tempo. The playhead and loop points are rescaled so the
    /// musical position in ticks is unchanged; the scan window is rebuilt at
    /// the new tempo so no already-scanned event survives with a stale time.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), TransportError> {
        let factor = self.timebase.set_bpm(bpm)?;
        self.apply_tempo_factor(factor);
        Ok(())
    }

    /// Change the tick resolution. Linear time keeps its value; ticks are
    /// reinterpreted at the new resolution.
    pub fn set_ticks_per_beat(&mut self, ticks_per_beat: u32) -> Result<(), TransportError> {
        self.timebase.set_ticks_per_beat(ticks_per_beat)?;
        self.refresh_scan_window(true);
        Ok(())
    }

    fn apply_tempo_factor(&mut self, factor: f64) {
        self.now *= factor;
        self.loop_start *= factor;
        self.loop_end *= factor;
        self.abs_origin = self.abs_old_now - self.now;
        self.refresh_scan_window(true);
    }

    /// Install the song to play. Adopts the song's resolution and tempo; the
    /// current musical position in ticks is preserved across the change.
    pub fn set_song(&mut self, song: Song) -> Result<(), TransportError> {
        self.timebase.set_ticks_per_beat(song.ticks_per_beat())?;
        let factor = self.timebase.set_bpm(song.bpm())?;
        self.song = Some(song);
        self.apply_tempo_factor(factor);
        Ok(())
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    /// Register the sink receiving events addressed to `channel`. Every
    /// channel a song references must be registered before starting.
    pub fn add_target(&mut self, channel: u8, sink: Box<dyn EventSink>) {
        self.targets.insert(channel, sink);
    }

    pub fn add_view(&mut self, view: Box<dyn PlayheadView>) {
        self.views.push(view);
    }

    /// Loop the region `[start_tick, end_tick)`.
    pub fn set_loop(&mut self, start_tick: u64, end_tick: u64) -> Result<(), TransportError> {
        if start_tick >= end_tick {
            return Err(TransportError::InvalidLoop {
                start: start_tick,
                end: end_tick,
            });
        }
        self.loop_start = self.timebase.ticks_to_seconds(start_tick as f64);
        self.loop_end = self.timebase.ticks_to_seconds(end_tick as f64);
        self.looping = true;
        Ok(())
    }

    pub fn clear_loop(&mut self) {
        self.loop_start = 0.0;
        self.loop_end = 0.0;
        self.looping = false;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn loop_duration_ticks(&self) -> f64 {
        self.timebase.seconds_to_ticks(self.loop_end - self.loop_start)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Playback position in linear seconds.
    pub fn now_seconds(&self) -> f64 {
        self.now
    }

    /// Playback position in ticks.
    pub fn now_ticks(&self) -> f64 {
        self.timebase.seconds_to_ticks(self.now)
    }

    /// Engine-clock time corresponding to a tick position.
    pub fn abs_time_at(&self, tick: f64) -> f64 {
        self.abs_origin + self.timebase.ticks_to_seconds(tick)
    }

    pub fn bpm(&self) -> f64 {
        self.timebase.bpm()
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.timebase.ticks_per_beat()
    }

    pub fn timebase(&self) -> &Timebase {
        &self.timebase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let transport = Transport::new(480, 120.0).unwrap();
        assert!(!transport.is_running());
        assert_eq!(transport.now_seconds(), 0.0);
        assert_eq!(transport.bpm(), 120.0);
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(Transport::new(0, 120.0).is_err());
        assert!(Transport::new(480, 0.0).is_err());

        let mut transport = Transport::new(480, 120.0).unwrap();
        assert!(matches!(
            transport.set_bpm(-5.0),
            Err(TransportError::InvalidTempo(_))
        ));
        assert!(matches!(
            transport.set_loop(16, 16),
            Err(TransportError::InvalidLoop { .. })
        ));
        assert!(matches!(
            transport.set_loop(32, 16),
            Err(TransportError::InvalidLoop { .. })
        ));
    }

    #[test]
    fn test_tempo_change_preserves_musical_position() {
        let mut transport = Transport::new(480, 120.0).unwrap();
        transport.set_now(960.0);
        let before = transport.now_ticks();
        assert!((before - 960.0).abs() < 1e-9);

        transport.set_bpm(91.3).unwrap();
        assert!((transport.now_ticks() - before).abs() < 1e-6);

        transport.set_bpm(187.0).unwrap();
        transport.set_bpm(60.0).unwrap();
        assert!((transport.now_ticks() - before).abs() < 1e-6);
    }

    #[test]
    fn test_tempo_change_rescales_loop_points() {
        let mut transport = Transport::new(480, 120.0).unwrap();
        transport.set_loop(0, 1920).unwrap();
        assert!((transport.loop_duration_ticks() - 1920.0).abs() < 1e-6);

        transport.set_bpm(60.0).unwrap();
        // the loop is still 1920 ticks long, though twice as many seconds
        assert!((transport.loop_duration_ticks() - 1920.0).abs() < 1e-6);
    }

    #[test]
    fn test_clear_loop() {
        let mut transport = Transport::new(480, 120.0).unwrap();
        transport.set_loop(0, 16).unwrap();
        assert!(transport.is_looping());
        transport.clear_loop();
        assert!(!transport.is_looping());
    }

    #[test]
    fn test_step_while_stopped_advances_nothing() {
        let mut transport = Transport::new(480, 120.0).unwrap();
        transport.step(1.0).unwrap();
        transport.step(2.0).unwrap();
        assert_eq!(transport.now_seconds(), 0.0);
    }
}
