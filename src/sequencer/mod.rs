pub mod controller;
pub mod scheduler;
pub mod tempo;

pub use controller::MetronomeController;
pub use scheduler::{DEFAULT_LOOKAHEAD, MAX_LOOKAHEAD};
pub use tempo::{ClockTime, TempoRange};
