//! Programmatic tone synthesis for the resuscitation timer.
//!
//! Two sounds, no bundled assets: a short soft sine tick for metronome beats
//! and a longer, louder square-wave alarm for round boundaries.

use crate::Result;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Default output sample rate
pub const SAMPLE_RATE: u32 = 44_100;

/// Oscillator shape
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
}

/// Sounds the timer can emit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Metronome beat
    Tick,
    /// Round boundary
    Alarm,
}

/// Oscillator parameters for one tone
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    pub gain: f32,
    pub duration: Duration,
}

impl Tone {
    pub fn spec(self) -> ToneSpec {
        match self {
            Tone::Tick => ToneSpec {
                waveform: Waveform::Sine,
                frequency_hz: 600.0,
                gain: 0.3,
                duration: Duration::from_millis(100),
            },
            Tone::Alarm => ToneSpec {
                waveform: Waveform::Square,
                frequency_hz: 880.0,
                gain: 0.5,
                duration: Duration::from_millis(600),
            },
        }
    }

    /// File stem used when tones are exported
    pub fn name(self) -> &'static str {
        match self {
            Tone::Tick => "tick",
            Tone::Alarm => "alarm",
        }
    }
}

/// Render `tone` as mono f32 samples in [-gain, gain]
pub fn synthesize(tone: Tone, sample_rate: u32) -> Vec<f32> {
    let spec = tone.spec();
    let count = (spec.duration.as_secs_f64() * f64::from(sample_rate)).round() as usize;
    let step = spec.frequency_hz / sample_rate as f32;

    (0..count)
        .map(|i| {
            let phase = (i as f32 * step).fract();
            let raw = match spec.waveform {
                Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
                Waveform::Square => {
                    if phase < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
            };
            raw * spec.gain
        })
        .collect()
}

/// Write mono samples as a 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data_len = (samples.len() * 2) as u32;
    let mut writer = BufWriter::new(std::fs::File::create(path)?);

    // RIFF header
    writer.write_all(b"RIFF")?;
    writer.write_all(&(36 + data_len).to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    // fmt chunk: PCM, mono, 16-bit
    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&(sample_rate * 2).to_le_bytes())?;
    writer.write_all(&2u16.to_le_bytes())?;
    writer.write_all(&16u16.to_le_bytes())?;

    writer.write_all(b"data")?;
    writer.write_all(&data_len.to_le_bytes())?;
    for sample in samples {
        let pcm = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_all(&pcm.to_le_bytes())?;
    }

    writer.flush()?;
    tracing::debug!("Wrote {} samples to {:?}", samples.len(), path);
    Ok(())
}
