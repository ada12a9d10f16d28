use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};

use crate::error::{MetronomeError, MetronomeResult};

/// Length of the built-in click
const CLICK_DURATION_MS: f32 = 15.0;
const CLICK_FREQUENCY: f32 = 1000.0;

/// Decoded tick sound: mono f32 frames at the device sample rate
#[derive(Debug, Clone)]
pub struct Sample {
    frames: Arc<[f32]>,
    sample_rate: u32,
}

impl Sample {
    pub fn from_frames(frames: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            frames: frames.into(),
            sample_rate,
        }
    }

    /// Decode WAV bytes into a mono sample resampled to `target_rate`.
    pub fn decode(bytes: &[u8], target_rate: u32) -> MetronomeResult<Self> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| MetronomeError::Decode(e.to_string()))?;

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<_, _>>()
            }
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>(),
        }
        .map_err(|e| MetronomeError::Decode(e.to_string()))?;

        if samples.is_empty() {
            return Err(MetronomeError::Decode("sample contains no audio".into()));
        }

        // Down-mix by averaging channels
        let mono: Vec<f32> = if channels > 1 {
            samples
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples
        };

        let frames = resample_linear(&mono, spec.sample_rate, target_rate);
        Ok(Self::from_frames(frames, target_rate))
    }

    /// Short decaying sine burst used when no sample file is configured
    pub fn click(sample_rate: u32) -> Self {
        let rate = sample_rate as f32;
        let len = (CLICK_DURATION_MS * rate / 1000.0).round().max(1.0) as usize;
        let phase_increment = 2.0 * PI * CLICK_FREQUENCY / rate;
        let frames = (0..len)
            .map(|i| {
                let t = i as f32 / len as f32;
                (i as f32 * phase_increment).sin() * (-t * 6.0).exp()
            })
            .collect();
        Self::from_frames(frames, sample_rate)
    }

    /// Copy with every frame scaled by `volume`
    pub fn with_volume(&self, volume: f32) -> Self {
        let frames: Vec<f32> = self.frames.iter().map(|s| s * volume).collect();
        Self::from_frames(frames, self.sample_rate)
    }

    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }

    /// A sample can only be mixed if it has audio at the device's own rate
    pub fn ensure_playable(&self, device_rate: u32) -> MetronomeResult<()> {
        if self.is_empty() {
            return Err(MetronomeError::Decode("sample contains no audio".into()));
        }
        if self.sample_rate() != device_rate {
            return Err(MetronomeError::Decode(format!(
                "sample is {} Hz but the device runs at {} Hz",
                self.sample_rate(),
                device_rate
            )));
        }
        Ok(())
    }
}

fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = ((input.len() as f64 / ratio) as usize).max(1);
    (0..new_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let s0 = input.get(idx).copied().unwrap_or(0.0);
            let s1 = input.get(idx + 1).copied().unwrap_or(s0);
            s0 + (s1 - s0) * frac
        })
        .collect()
}

/// A sample being decoded on a background thread
pub struct PendingSample {
    rx: Receiver<MetronomeResult<Sample>>,
}

impl PendingSample {
    /// Block until decoding finishes
    pub fn wait(self) -> MetronomeResult<Sample> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(MetronomeError::Decode("decoder thread exited".into())))
    }
}

/// Decode `bytes` off the calling thread.
pub fn load_sample(bytes: Vec<u8>, target_rate: u32) -> MetronomeResult<PendingSample> {
    let (tx, rx) = bounded(1);
    std::thread::Builder::new()
        .name("sample-decode".into())
        .spawn(move || {
            let result = Sample::decode(&bytes, target_rate);
            match &result {
                Ok(sample) => log::info!(
                    "Decoded tick sample: {} frames ({:.3}s)",
                    sample.len(),
                    sample.duration_secs()
                ),
                Err(e) => log::error!("{}", e),
            }
            let _ = tx.send(result);
        })
        .map_err(|e| MetronomeError::EnvironmentUnsupported(format!("cannot spawn decoder: {}", e)))?;
    Ok(PendingSample { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn spec(channels: u16, sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn decodes_mono_pcm() {
        let bytes = wav_bytes(spec(1, 48000), &[0, 16384, -16384, 0]);
        let sample = Sample::decode(&bytes, 48000).unwrap();
        assert_eq!(sample.frames(), &[0.0, 0.5, -0.5, 0.0]);
    }

    #[test]
    fn averages_stereo_frames() {
        let bytes = wav_bytes(spec(2, 48000), &[16384, 0, -16384, -16384]);
        let sample = Sample::decode(&bytes, 48000).unwrap();
        assert_eq!(sample.frames(), &[0.25, -0.5]);
    }

    #[test]
    fn resamples_to_device_rate() {
        let input = vec![0i16; 2205];
        let bytes = wav_bytes(spec(1, 22050), &input);
        let sample = Sample::decode(&bytes, 44100).unwrap();
        assert_eq!(sample.len(), 4410);
        assert_eq!(sample.sample_rate(), 44100);
    }

    #[test]
    fn malformed_bytes_are_decode_errors() {
        let err = Sample::decode(b"definitely not a wav file", 48000).unwrap_err();
        assert!(matches!(err, MetronomeError::Decode(_)));
    }

    #[test]
    fn empty_wav_is_rejected() {
        let bytes = wav_bytes(spec(1, 48000), &[]);
        assert!(matches!(
            Sample::decode(&bytes, 48000),
            Err(MetronomeError::Decode(_))
        ));
    }

    #[test]
    fn click_is_short_and_bounded() {
        let click = Sample::click(48000);
        assert_eq!(click.len(), 720);
        assert!(click.frames().iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn volume_scales_frames() {
        let sample = Sample::from_frames(vec![1.0, -0.5], 48000).with_volume(0.5);
        assert_eq!(sample.frames(), &[0.5, -0.25]);
    }

    #[test]
    fn playable_only_at_device_rate() {
        assert!(Sample::click(48000).ensure_playable(48000).is_ok());
        assert!(matches!(
            Sample::click(44100).ensure_playable(48000),
            Err(MetronomeError::Decode(_))
        ));
        assert!(Sample::from_frames(Vec::new(), 48000)
            .ensure_playable(48000)
            .is_err());
    }

    #[test]
    fn background_decode_delivers_result() {
        let bytes = wav_bytes(spec(1, 48000), &[0, 16384]);
        let pending = load_sample(bytes, 48000).unwrap();
        assert_eq!(pending.wait().unwrap().len(), 2);

        let pending = load_sample(vec![1, 2, 3], 48000).unwrap();
        assert!(pending.wait().is_err());
    }
}
