pub mod device;
pub mod sample;

pub use device::DeviceClock;
pub use sample::{load_sample, Sample};

use crate::sequencer::ClockTime;

/// Monotonic audio-device clock that can play the tick sample at a given time.
pub trait AudioClock {
    /// Current device time in seconds. Never decreases.
    fn now(&self) -> ClockTime;

    /// Queue one playback of the tick sample at device time `at`.
    /// Times already in the past play as soon as possible.
    fn schedule_tick(&self, at: ClockTime);
}
