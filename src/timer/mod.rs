pub mod wake;

pub use wake::{Pulse, PulseTimer, WakeTimer};
