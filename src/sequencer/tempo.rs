use crate::error::{MetronomeError, MetronomeResult};

/// Seconds on the audio device clock
pub type ClockTime = f64;

/// Tempo in beats per minute. Always positive and finite once constructed
/// through [`TempoRange::validate`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tempo(f64);

impl Tempo {
    pub fn bpm(&self) -> f64 {
        self.0
    }

    /// Seconds between two ticks
    pub fn interval_secs(&self) -> f64 {
        60.0 / self.0
    }
}

/// Inclusive tempo bounds accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoRange {
    pub min: f64,
    pub max: f64,
}

impl TempoRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, bpm: f64) -> bool {
        bpm.is_finite() && bpm > 0.0 && bpm >= self.min && bpm <= self.max
    }

    /// Reject anything that is not a positive tempo inside the range.
    pub fn validate(&self, bpm: f64) -> MetronomeResult<Tempo> {
        if self.contains(bpm) {
            Ok(Tempo(bpm))
        } else {
            Err(MetronomeError::OutOfRange {
                value: bpm,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Clamp into range. Used by input handling, never by the controller.
    pub fn clamp(&self, bpm: f64) -> f64 {
        if bpm.is_nan() {
            return self.min;
        }
        bpm.clamp(self.min, self.max)
    }
}

impl Default for TempoRange {
    fn default() -> Self {
        Self::new(1.0, 320.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_sixty_over_bpm() {
        let range = TempoRange::default();
        assert_eq!(range.validate(120.0).unwrap().interval_secs(), 0.5);
        assert_eq!(range.validate(60.0).unwrap().interval_secs(), 1.0);
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = TempoRange::default();
        assert!(range.validate(1.0).is_ok());
        assert!(range.validate(320.0).is_ok());
        assert!(range.validate(320.5).is_err());
        assert!(range.validate(0.5).is_err());
    }

    #[test]
    fn rejects_non_positive_and_nan() {
        let range = TempoRange::new(0.0, 320.0);
        assert!(range.validate(0.0).is_err());
        assert!(range.validate(-5.0).is_err());
        assert!(range.validate(f64::NAN).is_err());
        assert!(range.validate(f64::INFINITY).is_err());
    }

    #[test]
    fn out_of_range_reports_bounds() {
        let err = TempoRange::default().validate(321.0).unwrap_err();
        assert_eq!(
            err,
            MetronomeError::OutOfRange {
                value: 321.0,
                min: 1.0,
                max: 320.0
            }
        );
    }

    #[test]
    fn clamp_keeps_values_in_range() {
        let range = TempoRange::default();
        assert_eq!(range.clamp(400.0), 320.0);
        assert_eq!(range.clamp(-3.0), 1.0);
        assert_eq!(range.clamp(f64::NAN), 1.0);
        assert_eq!(range.clamp(99.0), 99.0);
    }
}
