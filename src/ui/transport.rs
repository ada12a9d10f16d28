use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::theme::Theme;
use crate::sequencer::TempoRange;

/// How long the beat indicator stays lit after a tick, in seconds
pub const BEAT_FLASH_SECS: f64 = 0.1;

/// Longest tempo entry accepted from the keyboard
const MAX_INPUT_DIGITS: usize = 3;

/// Snapshot of metronome state for one frame
pub struct TransportInfo {
    pub running: bool,
    pub bpm: f64,
    pub interval_secs: f64,
    pub beat_lit: bool,
    pub ticks_played: u64,
}

/// Digits typed by the user before Enter commits them as a tempo
#[derive(Debug, Default)]
pub struct TempoInput {
    digits: String,
}

impl TempoInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a digit; ignored once the entry is full
    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() && self.digits.len() < MAX_INPUT_DIGITS {
            self.digits.push(c);
        }
    }

    pub fn pop(&mut self) {
        self.digits.pop();
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Take the entry as a tempo value, leaving the input empty
    pub fn take(&mut self) -> Option<f64> {
        let value = self.digits.parse().ok();
        self.digits.clear();
        value
    }
}

/// True while the last tick is recent enough to light the indicator
pub fn beat_lit(now: f64, last_tick: Option<f64>) -> bool {
    match last_tick {
        Some(t) => now >= t && now - t < BEAT_FLASH_SECS,
        None => false,
    }
}

pub fn render_header(frame: &mut Frame, area: Rect, device_name: &str, theme: &Theme) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" TICKOXIDE ", Style::default().fg(theme.accent).bold()),
        Span::styled(format!(" {}", device_name), Style::default().fg(theme.idle)),
    ]))
    .style(Style::default().bg(theme.background))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.idle))
            .style(Style::default().bg(theme.background)),
    );
    frame.render_widget(header, area);
}

pub fn render_transport(frame: &mut Frame, area: Rect, info: &TransportInfo, theme: &Theme) {
    let status = if info.running { "PLAY" } else { "STOP" };
    let status_style = if info.running {
        Style::default().fg(theme.accent).bold()
    } else {
        Style::default().fg(theme.idle)
    };
    let beat_style = if info.beat_lit {
        Style::default().fg(theme.accent).bold()
    } else {
        Style::default().fg(theme.idle)
    };

    let transport_text = vec![
        Span::styled(format!(" {} ", status), status_style),
        Span::styled(" | ", Style::default().fg(theme.idle)),
        Span::styled(
            format!("BPM: {}", info.bpm),
            Style::default().fg(theme.text),
        ),
        Span::styled(" | ", Style::default().fg(theme.idle)),
        Span::styled(
            format!("Interval: {:.0}ms", info.interval_secs * 1000.0),
            Style::default().fg(theme.text),
        ),
        Span::styled(" | ", Style::default().fg(theme.idle)),
        Span::styled(" \u{25cf} ", beat_style),
        Span::styled(
            format!("Ticks: {}", info.ticks_played),
            Style::default().fg(theme.idle),
        ),
    ];

    let transport = Paragraph::new(Line::from(transport_text))
        .style(Style::default().bg(theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.idle))
                .style(Style::default().bg(theme.background)),
        );

    frame.render_widget(transport, area);
}

pub fn render_tempo_input(
    frame: &mut Frame,
    area: Rect,
    input: &TempoInput,
    range: TempoRange,
    theme: &Theme,
) {
    let line = if input.is_empty() {
        Line::from(Span::styled(
            format!(" type a tempo ({}-{}) and press Enter", range.min, range.max),
            Style::default().fg(theme.idle),
        ))
    } else {
        Line::from(vec![
            Span::styled(" Tempo: ", Style::default().fg(theme.text)),
            Span::styled(input.as_str().to_string(), Style::default().fg(theme.text).bold()),
            Span::styled("_", Style::default().fg(theme.accent)),
        ])
    };
    let widget = Paragraph::new(line).style(Style::default().bg(theme.background)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.idle))
            .style(Style::default().bg(theme.background)),
    );
    frame.render_widget(widget, area);
}

pub fn render_footer(frame: &mut Frame, area: Rect, status: Option<&str>, theme: &Theme) {
    let text = match status {
        Some(msg) => Line::from(Span::styled(
            format!(" {}", msg),
            Style::default().fg(theme.accent),
        )),
        None => Line::from(Span::styled(
            " SPACE start/stop  \u{2191}\u{2193} \u{b1}1  PgUp/PgDn \u{b1}10  0-9+Enter set  q quit",
            Style::default().fg(theme.idle),
        )),
    };
    let footer = Paragraph::new(text).style(Style::default().bg(theme.background)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.idle))
            .style(Style::default().bg(theme.background)),
    );
    frame.render_widget(footer, area);
}
