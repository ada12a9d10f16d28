use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::audio::AudioClock;
use crate::command::Command;
use crate::config::MetronomeConfig;
use crate::error::MetronomeResult;
use crate::timer::{Pulse, PulseTimer};

use super::scheduler::TickScheduler;
use super::tempo::{Tempo, TempoRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningState {
    #[default]
    Stopped,
    Running,
}

/// Owns tempo and transport state; turns wake-up pulses into scheduler advances.
pub struct MetronomeController<C: AudioClock, T: PulseTimer> {
    clock: C,
    timer: T,
    scheduler: TickScheduler,
    state: RunningState,
    tempo: Tempo,
    range: TempoRange,
    lookahead: f64,
    poll_interval: Duration,
}

impl<C: AudioClock, T: PulseTimer> MetronomeController<C, T> {
    pub fn new(clock: C, timer: T, config: &MetronomeConfig) -> MetronomeResult<Self> {
        config.validate()?;
        let range = config.tempo_range();
        let tempo = range.validate(config.initial_tempo)?;
        let poll_interval = config.poll_interval();

        timer.set_interval(poll_interval);

        Ok(Self {
            clock,
            timer,
            scheduler: TickScheduler::new(),
            state: RunningState::Stopped,
            tempo,
            range,
            lookahead: config.lookahead_secs,
            poll_interval,
        })
    }

    pub fn start(&mut self) {
        if self.state == RunningState::Running {
            return;
        }
        let now = self.clock.now();
        self.scheduler.reset(now);
        self.state = RunningState::Running;
        self.timer.start(self.poll_interval);
        log::info!("Started at {:.3}s, {} BPM", now, self.tempo.bpm());
    }

    pub fn stop(&mut self) {
        if self.state == RunningState::Stopped {
            return;
        }
        self.timer.stop();
        self.state = RunningState::Stopped;
        log::info!("Stopped at {:.3}s", self.clock.now());
    }

    pub fn toggle(&mut self) {
        match self.state {
            RunningState::Stopped => self.start(),
            RunningState::Running => self.stop(),
        }
    }

    /// Replace the tempo. Rejected values leave the previous tempo in place.
    pub fn set_tempo(&mut self, bpm: f64) -> MetronomeResult<()> {
        match self.range.validate(bpm) {
            Ok(tempo) => {
                self.tempo = tempo;
                log::info!("Tempo set to {} BPM", bpm);
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected tempo: {}", e);
                Err(e)
            }
        }
    }

    /// Handle one delivered pulse. The running state is read at delivery,
    /// so pulses that were in flight when `stop` ran do nothing.
    pub fn on_pulse(&mut self) -> usize {
        if self.state != RunningState::Running {
            return 0;
        }
        let now = self.clock.now();
        let scheduled = self
            .scheduler
            .advance(&self.clock, now, self.tempo, self.lookahead);
        if scheduled > 1 {
            log::debug!(
                "Caught up {} ticks at {:.3}s, next at {:.3}s",
                scheduled,
                now,
                self.scheduler.next_tick_time()
            );
        }
        scheduled
    }

    /// Deliver every queued pulse in order without blocking.
    /// Returns the number of ticks scheduled.
    pub fn pump(&mut self, pulses: &Receiver<Pulse>) -> usize {
        let mut scheduled = 0;
        while let Ok(Pulse) = pulses.try_recv() {
            scheduled += self.on_pulse();
        }
        scheduled
    }

    pub fn apply(&mut self, cmd: Command) -> MetronomeResult<()> {
        log::debug!("{}", cmd.description());
        match cmd {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Toggle => self.toggle(),
            Command::SetTempo(bpm) => self.set_tempo(bpm)?,
            Command::NudgeTempo(delta) => {
                let target = self.range.clamp(self.tempo.bpm() + delta);
                self.set_tempo(target)?;
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state == RunningState::Running
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn tempo_range(&self) -> TempoRange {
        self.range
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
