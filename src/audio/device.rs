use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;

use super::{AudioClock, Sample};
use crate::error::{MetronomeError, MetronomeResult};
use crate::sequencer::ClockTime;

/// Upper bound on simultaneously sounding ticks
const MAX_VOICES: usize = 32;

/// Audio-thread playback info, read by the UI for the beat indicator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackStatus {
    pub ticks_played: u64,
    pub last_tick_frame: Option<u64>,
    /// Ticks refused because every voice was busy
    pub ticks_dropped: u64,
}

/// Messages from the scheduler side to the audio callback
#[derive(Debug)]
enum VoiceCommand {
    SetSample(Sample),
    Play { frame: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Voice {
    start_frame: u64,
    position: usize,
}

/// Per-frame mixer of single-use tick voices. Lives on the audio thread.
#[derive(Debug)]
struct TickMixer {
    sample: Option<Sample>,
    voices: Vec<Voice>,
    ticks_played: u64,
    last_tick_frame: Option<u64>,
    ticks_dropped: u64,
}

impl TickMixer {
    fn new() -> Self {
        Self {
            sample: None,
            voices: Vec::with_capacity(MAX_VOICES),
            ticks_played: 0,
            last_tick_frame: None,
            ticks_dropped: 0,
        }
    }

    fn handle(&mut self, cmd: VoiceCommand, block_start: u64) {
        match cmd {
            VoiceCommand::SetSample(sample) => self.sample = Some(sample),
            VoiceCommand::Play { frame } => {
                if self.voices.len() >= MAX_VOICES {
                    // Counted only; the audio thread never logs
                    self.ticks_dropped += 1;
                    return;
                }
                // Late ticks start at the head of this block
                self.voices.push(Voice {
                    start_frame: frame.max(block_start),
                    position: 0,
                });
            }
        }
    }

    /// Mix one mono frame at absolute frame index `frame`
    fn next_frame(&mut self, frame: u64) -> f32 {
        let Some(sample) = &self.sample else {
            return 0.0;
        };
        let data = sample.frames();
        let mut out = 0.0;
        for voice in self.voices.iter_mut() {
            if voice.start_frame > frame {
                continue;
            }
            if voice.position == 0 {
                self.ticks_played += 1;
                self.last_tick_frame = Some(frame);
            }
            if let Some(s) = data.get(voice.position) {
                out += s;
                voice.position += 1;
            }
        }
        out
    }

    /// Release finished voices
    fn collect(&mut self) {
        match &self.sample {
            Some(sample) => {
                let len = sample.len();
                self.voices.retain(|v| v.position < len);
            }
            None => self.voices.clear(),
        }
    }

    fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            ticks_played: self.ticks_played,
            last_tick_frame: self.last_tick_frame,
            ticks_dropped: self.ticks_dropped,
        }
    }
}

/// Output device whose rendered-frame count is the metronome's clock
pub struct DeviceClock {
    _stream: Stream,
    frames: Arc<AtomicU64>,
    sample_rate: u32,
    device_name: String,
    voice_tx: Sender<VoiceCommand>,
    /// Dropped-tick count already reported in the log
    drops_reported: AtomicU64,
    pub status: Arc<RwLock<PlaybackStatus>>,
}

impl DeviceClock {
    /// Open the default output device and start its stream
    pub fn open() -> MetronomeResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MetronomeError::DeviceUnavailable("no output device available".into()))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let config = device
            .default_output_config()
            .map_err(|e| MetronomeError::DeviceUnavailable(e.to_string()))?;
        let sample_format = config.sample_format();
        let config: StreamConfig = config.into();

        let frames = Arc::new(AtomicU64::new(0));
        let status = Arc::new(RwLock::new(PlaybackStatus::default()));
        let (voice_tx, voice_rx) = bounded(256);

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, voice_rx, frames.clone(), status.clone())?
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, voice_rx, frames.clone(), status.clone())?
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, voice_rx, frames.clone(), status.clone())?
            }
            format => {
                return Err(MetronomeError::DeviceUnavailable(format!(
                    "unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| MetronomeError::DeviceUnavailable(e.to_string()))?;

        log::info!(
            "Opened output device '{}' ({} Hz, {} channels)",
            device_name,
            config.sample_rate.0,
            config.channels
        );

        Ok(Self {
            _stream: stream,
            frames,
            sample_rate: config.sample_rate.0,
            device_name,
            voice_tx,
            drops_reported: AtomicU64::new(0),
            status,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        voice_rx: Receiver<VoiceCommand>,
        frames: Arc<AtomicU64>,
        status: Arc<RwLock<PlaybackStatus>>,
    ) -> MetronomeResult<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels.max(1) as usize;
        let mut mixer = TickMixer::new();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let block_start = frames.load(Ordering::Acquire);

                    while let Ok(cmd) = voice_rx.try_recv() {
                        mixer.handle(cmd, block_start);
                    }

                    let mut rendered = 0u64;
                    for frame in data.chunks_mut(channels) {
                        let value = soft_clip(mixer.next_frame(block_start + rendered));
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = T::from_sample(value);
                        }
                        rendered += 1;
                    }
                    mixer.collect();

                    frames.fetch_add(rendered, Ordering::Release);

                    if let Some(mut status) = status.try_write() {
                        *status = mixer.status();
                    }
                },
                |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| MetronomeError::DeviceUnavailable(e.to_string()))?;

        Ok(stream)
    }

    /// Install the tick sample. Must happen before the first tick is scheduled.
    pub fn set_sample(&self, sample: Sample) -> MetronomeResult<()> {
        sample.ensure_playable(self.sample_rate)?;
        self.voice_tx
            .send(VoiceCommand::SetSample(sample))
            .map_err(|_| MetronomeError::DeviceUnavailable("audio stream closed".into()))
    }

    /// Log ticks the audio thread refused since the last report
    fn report_dropped_ticks(&self) {
        let dropped = self.status.read().ticks_dropped;
        let reported = self.drops_reported.swap(dropped, Ordering::Relaxed);
        if dropped > reported {
            log::warn!(
                "All {} voices busy, dropped {} tick(s)",
                MAX_VOICES,
                dropped - reported
            );
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Device time of the most recently started tick
    pub fn last_tick_time(&self) -> Option<ClockTime> {
        self.status
            .read()
            .last_tick_frame
            .map(|f| frames_to_secs(f, self.sample_rate))
    }
}

impl AudioClock for DeviceClock {
    fn now(&self) -> ClockTime {
        frames_to_secs(self.frames.load(Ordering::Acquire), self.sample_rate)
    }

    fn schedule_tick(&self, at: ClockTime) {
        self.report_dropped_ticks();
        let frame = secs_to_frames(at, self.sample_rate);
        match self.voice_tx.try_send(VoiceCommand::Play { frame }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("Voice queue full, dropping tick at {:.3}s", at);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("Audio stream closed, tick at {:.3}s not played", at);
            }
        }
    }
}

fn frames_to_secs(frames: u64, sample_rate: u32) -> ClockTime {
    frames as f64 / sample_rate as f64
}

fn secs_to_frames(secs: ClockTime, sample_rate: u32) -> u64 {
    (secs.max(0.0) * sample_rate as f64).round() as u64
}

/// Soft clipping function to prevent harsh digital clipping
fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0 - (-x + 1.0).exp() * 0.5
    } else if x < -1.0 {
        -1.0 + (x + 1.0).exp() * 0.5
    } else {
        x
    }
}
