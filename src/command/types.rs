/// Control requests from the front end to the metronome
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    // Transport
    Start,
    Stop,
    Toggle,

    // Tempo
    SetTempo(f64),
    /// Relative change, clamped into the tempo range before it is applied
    NudgeTempo(f64),
}

impl Command {
    /// Human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::Start => "Start".to_string(),
            Command::Stop => "Stop".to_string(),
            Command::Toggle => "Toggle start/stop".to_string(),
            Command::SetTempo(bpm) => format!("Set tempo to {}", bpm),
            Command::NudgeTempo(delta) => format!("Nudge tempo by {:+}", delta),
        }
    }
}
