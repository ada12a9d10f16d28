use crate::audio::AudioClock;

use super::tempo::{ClockTime, Tempo};

/// Default look-ahead window in seconds
pub const DEFAULT_LOOKAHEAD: f64 = 0.1;

/// Longest accepted look-ahead window in seconds
pub const MAX_LOOKAHEAD: f64 = 2.0;

/// Look-ahead tick scheduler.
///
/// Tick times are derived by adding a fixed interval to a cursor, never by
/// re-reading the clock, so wake-up jitter never turns into drift.
#[derive(Debug, Clone, Default)]
pub struct TickScheduler {
    next_tick_time: ClockTime,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock time of the next tick that has not been scheduled yet
    pub fn next_tick_time(&self) -> ClockTime {
        self.next_tick_time
    }

    /// Restart the cursor. Called on the stopped -> running transition.
    pub fn reset(&mut self, start_time: ClockTime) {
        self.next_tick_time = start_time;
    }

    /// Schedule every tick due before `now + window`. Returns how many were
    /// handed to the clock; after a stall this can be several at once.
    pub fn advance<C: AudioClock + ?Sized>(
        &mut self,
        clock: &C,
        now: ClockTime,
        tempo: Tempo,
        window: f64,
    ) -> usize {
        let horizon = now + window;
        let interval = tempo.interval_secs();
        let mut scheduled = 0;
        while self.next_tick_time < horizon {
            clock.schedule_tick(self.next_tick_time);
            self.next_tick_time += interval;
            scheduled += 1;
        }
        scheduled
    }
}
