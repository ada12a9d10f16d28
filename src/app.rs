use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::Block;
use ratatui::Terminal;

use crate::audio::{load_sample, AudioClock, DeviceClock, Sample};
use crate::command::Command;
use crate::config::MetronomeConfig;
use crate::sequencer::MetronomeController;
use crate::timer::{Pulse, WakeTimer};
use crate::ui::{
    beat_lit, render_footer, render_header, render_tempo_input, render_transport, TempoInput,
    Theme, TransportInfo,
};

/// Pulses queued beyond this are dropped; one is enough to wake the scheduler
const PULSE_QUEUE: usize = 16;

/// Keyboard poll timeout; bounds how late a queued pulse is handled
const UI_POLL: Duration = Duration::from_millis(5);

/// How long status messages stay in the footer
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

type Metronome = MetronomeController<DeviceClock, WakeTimer>;

/// Application state
pub struct App {
    /// Current theme
    theme: Theme,
    /// Scheduler, device clock and wake timer
    metronome: Metronome,
    /// Wake-up pulses from the timer thread
    pulses: Receiver<Pulse>,
    /// Tempo being typed
    tempo_input: TempoInput,
    /// Whether the app should quit
    should_quit: bool,
    /// Temporary status message (e.g. a rejected tempo)
    status_message: Option<(String, Instant)>,
}

impl App {
    /// Open the audio device, load the tick sample and start the timer thread
    pub fn new(config: MetronomeConfig, theme: Theme) -> Result<Self> {
        config.validate()?;

        let clock = DeviceClock::open()?;

        let (timer, pulses) = WakeTimer::spawn(PULSE_QUEUE)?;

        let sample = match &config.sample_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read sample: {}", path.display()))?;
                load_sample(bytes, clock.sample_rate())?
                    .wait()
                    .with_context(|| format!("Failed to decode sample: {}", path.display()))?
            }
            None => Sample::click(clock.sample_rate()),
        };
        clock.set_sample(sample.with_volume(config.volume))?;

        let metronome = MetronomeController::new(clock, timer, &config)?;

        Ok(Self {
            theme,
            metronome,
            pulses,
            tempo_input: TempoInput::new(),
            should_quit: false,
            status_message: None,
        })
    }

    /// Run the interactive terminal UI
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = Self::setup_terminal()?;

        let result = self.main_loop(&mut terminal);

        self.dispatch(Command::Stop);
        Self::restore_terminal(&mut terminal)?;

        result
    }

    /// Run without a UI: start immediately and tick until `duration` passes
    pub fn run_headless(&mut self, duration: Option<Duration>) -> Result<()> {
        let deadline = match duration {
            Some(d) => Some(
                Instant::now()
                    .checked_add(d)
                    .context("Headless duration is too long")?,
            ),
            None => None,
        };
        log::info!(
            "Running headless at {} BPM (poll {:?}, lookahead {}s)",
            self.metronome.tempo().bpm(),
            self.metronome.poll_interval(),
            self.metronome.lookahead()
        );
        self.metronome.apply(Command::Start)?;

        loop {
            let wait = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) => remaining,
                    None => break,
                },
                None => Duration::from_secs(1),
            };
            match self.pulses.recv_timeout(wait) {
                Ok(Pulse) => {
                    self.metronome.on_pulse();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    anyhow::bail!("Wake timer stopped unexpectedly");
                }
            }
        }

        self.metronome.apply(Command::Stop)?;
        let status = *self.metronome.clock().status.read();
        log::info!(
            "Played {} ticks ({} dropped)",
            status.ticks_played,
            status.ticks_dropped
        );
        Ok(())
    }

    /// Setup the terminal for TUI
    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    /// Restore terminal to normal state
    fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Main event loop
    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.metronome.pump(&self.pulses);

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(UI_POLL)? {
                if let Event::Key(key) = event::read()? {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply a command, reporting rejections in the footer
    fn dispatch(&mut self, cmd: Command) {
        if let Err(e) = self.metronome.apply(cmd) {
            self.set_status(e.to_string());
        }
    }

    /// Set a temporary status message shown in the footer
    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Handle key press events
    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.tempo_input.is_empty() {
                    self.should_quit = true;
                } else {
                    self.tempo_input.clear();
                }
            }
            KeyCode::Char(' ') => self.dispatch(Command::Toggle),
            KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('=') => {
                self.dispatch(Command::NudgeTempo(1.0))
            }
            KeyCode::Down | KeyCode::Char('-') => self.dispatch(Command::NudgeTempo(-1.0)),
            KeyCode::PageUp => self.dispatch(Command::NudgeTempo(10.0)),
            KeyCode::PageDown => self.dispatch(Command::NudgeTempo(-10.0)),
            KeyCode::Char(c) if c.is_ascii_digit() => self.tempo_input.push(c),
            KeyCode::Backspace => self.tempo_input.pop(),
            KeyCode::Enter => {
                if let Some(bpm) = self.tempo_input.take() {
                    self.dispatch(Command::SetTempo(bpm));
                }
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Clear with background color
        let bg_block = Block::default().style(Style::default().bg(self.theme.background));
        frame.render_widget(bg_block, area);

        // Layout: header, transport, tempo entry, footer
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Transport
                Constraint::Length(3), // Tempo entry
                Constraint::Min(0),
                Constraint::Length(3), // Footer
            ])
            .split(area);

        let clock = self.metronome.clock();
        let tempo = self.metronome.tempo();
        let info = TransportInfo {
            running: self.metronome.is_running(),
            bpm: tempo.bpm(),
            interval_secs: tempo.interval_secs(),
            beat_lit: beat_lit(clock.now(), clock.last_tick_time()),
            ticks_played: clock.status.read().ticks_played,
        };

        render_header(frame, chunks[0], clock.device_name(), &self.theme);
        render_transport(frame, chunks[1], &info, &self.theme);
        render_tempo_input(
            frame,
            chunks[2],
            &self.tempo_input,
            self.metronome.tempo_range(),
            &self.theme,
        );

        let status = self
            .status_message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < STATUS_TIMEOUT)
            .map(|(msg, _)| msg.as_str());
        render_footer(frame, chunks[4], status, &self.theme);
    }
}
