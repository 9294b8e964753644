// Timebase - tick/time conversion math
// Resolution and tempo in one place, so every conversion agrees

use crate::sequencer::transport::TransportError;

/// Width of the lookahead window, in ticks.
///
/// At 480 ticks per beat and 120 BPM this is about one 60 Hz frame.
pub const LOOKAHEAD_TICKS: f64 = 16.0;

/// Converts between musical ticks and linear seconds.
///
/// A plain value type: the transport owns one and hands out references. All
/// conversions are pure functions of the current resolution and tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timebase {
    ticks_per_beat: u32,
    bpm: f64,
}

impl Timebase {
    pub fn new(ticks_per_beat: u32, bpm: f64) -> Result<Self, TransportError> {
        if ticks_per_beat == 0 {
            return Err(TransportError::InvalidResolution(ticks_per_beat));
        }
        if !(bpm > 0.0 && bpm.is_finite()) {
            return Err(TransportError::InvalidTempo(bpm));
        }
        Ok(Self {
            ticks_per_beat,
            bpm,
        })
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_beat() / self.ticks_per_beat as f64
    }

    pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks * self.seconds_per_tick()
    }

    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        seconds / self.seconds_per_tick()
    }

    /// Lookahead window width in seconds at the current settings.
    pub fn lookahead(&self) -> f64 {
        self.seconds_per_tick() * LOOKAHEAD_TICKS
    }

    /// Change the tempo. Returns the ratio of old to new tempo, the factor
    /// by which any linear-seconds position must be multiplied to keep its
    /// tick value unchanged.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<f64, TransportError> {
        if !(bpm > 0.0 && bpm.is_finite()) {
            return Err(TransportError::InvalidTempo(bpm));
        }
        let factor = self.bpm / bpm;
        self.bpm = bpm;
        Ok(factor)
    }

    pub fn set_ticks_per_beat(&mut self, ticks_per_beat: u32) -> Result<(), TransportError> {
        if ticks_per_beat == 0 {
            return Err(TransportError::InvalidResolution(ticks_per_beat));
        }
        self.ticks_per_beat = ticks_per_beat;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_conversions() {
        // 120 BPM, 480 ticks per beat: one beat is half a second
        let tb = Timebase::new(480, 120.0).unwrap();
        assert!((tb.seconds_per_beat() - 0.5).abs() < 1e-12);
        assert!((tb.ticks_to_seconds(480.0) - 0.5).abs() < 1e-12);
        assert!((tb.seconds_to_ticks(0.5) - 480.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let tb = Timebase::new(96, 137.2).unwrap();
        for ticks in [0.0, 1.0, 95.5, 960.0, 123456.0] {
            let back = tb.seconds_to_ticks(tb.ticks_to_seconds(ticks));
            assert!((back - ticks).abs() < 1e-6);
        }
    }

    #[test]
    fn test_lookahead_scales_with_tempo() {
        let mut tb = Timebase::new(480, 120.0).unwrap();
        let at_120 = tb.lookahead();
        tb.set_bpm(60.0).unwrap();
        assert!((tb.lookahead() - at_120 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_tempo_factor() {
        let mut tb = Timebase::new(480, 120.0).unwrap();
        let factor = tb.set_bpm(60.0).unwrap();
        assert!((factor - 2.0).abs() < 1e-12);
        // a position keeps its tick value when scaled by the factor
        let seconds = 1.25 * factor;
        assert!((tb.seconds_to_ticks(seconds) - 1200.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        assert!(Timebase::new(0, 120.0).is_err());
        assert!(Timebase::new(480, 0.0).is_err());
        assert!(Timebase::new(480, f64::NAN).is_err());
        assert!(Timebase::new(480, f64::INFINITY).is_err());

        let mut tb = Timebase::new(480, 120.0).unwrap();
        assert!(tb.set_bpm(-1.0).is_err());
        assert!(tb.set_ticks_per_beat(0).is_err());
        // failed setters leave the value untouched
        assert_eq!(tb.bpm(), 120.0);
        assert_eq!(tb.ticks_per_beat(), 480);
    }
}
