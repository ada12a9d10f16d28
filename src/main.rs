mod app;
mod audio;
mod command;
mod config;
mod error;
mod sequencer;
mod timer;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use app::App;
use config::MetronomeConfig;
use ui::Theme;

/// Tickoxide - drift-free terminal metronome
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting tempo in BPM
    #[arg(long)]
    tempo: Option<f64>,

    /// WAV file to use as the tick sound
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Wake-up timer period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// How far ahead ticks are scheduled, in seconds
    #[arg(long)]
    lookahead: Option<f64>,

    /// Lowest accepted tempo
    #[arg(long)]
    min_tempo: Option<f64>,

    /// Highest accepted tempo
    #[arg(long)]
    max_tempo: Option<f64>,

    /// Tick volume (0.0-1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Theme to use for the interface
    #[arg(long, default_value = "default")]
    theme: String,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Run without the terminal UI, starting immediately
    #[arg(long)]
    headless: bool,

    /// Seconds to run in headless mode (runs until killed if omitted)
    #[arg(long, requires = "headless")]
    duration: Option<f64>,

    /// Write logs to this file (the TUI otherwise keeps logging off)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Layer command-line overrides on top of the file (or default) config
    fn to_config(&self) -> Result<MetronomeConfig> {
        let mut config = match &self.config {
            Some(path) => MetronomeConfig::load(path)?,
            None => MetronomeConfig::default(),
        };
        if let Some(tempo) = self.tempo {
            config.initial_tempo = tempo;
        }
        if let Some(sample) = &self.sample {
            config.sample_path = Some(sample.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(lookahead) = self.lookahead {
            config.lookahead_secs = lookahead;
        }
        if let Some(min) = self.min_tempo {
            config.min_tempo = min;
        }
        if let Some(max) = self.max_tempo {
            config.max_tempo = max;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let default_filter = if args.headless || args.log_file.is_some() {
        "info"
    } else {
        "off"
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Convert `--duration` seconds, rejecting values `Duration` cannot hold
fn headless_duration(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        anyhow::bail!("Duration must be positive, got {}", secs);
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Duration out of range: {} seconds", secs))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --list-themes
    if args.list_themes {
        println!("Available themes:");
        for theme in Theme::available_themes() {
            println!("  {}", theme);
        }
        return Ok(());
    }

    init_logging(&args)?;

    let config = args.to_config()?;

    let duration = args.duration.map(headless_duration).transpose()?;

    // Load theme
    let theme = Theme::from_name(&args.theme).unwrap_or_else(|| {
        eprintln!(
            "Warning: Unknown theme '{}', using default. Use --list-themes to see available themes.",
            args.theme
        );
        Theme::default()
    });

    let mut app = App::new(config, theme)?;
    if args.headless {
        app.run_headless(duration)
    } else {
        app.run()
    }
}
