//! WAV file output for testing and offline rendering.
//!
//! Uses `hound` to write processed audio to WAV files so circuits can
//! be auditioned without a host. Never used by the audio path.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

use crate::CircuitProcessor;

/// Default offline rendering rate: 48 kHz, 32-bit float, mono.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Generate a sine test signal.
pub fn sine_wave(freq_hz: f64, duration_secs: f64, sample_rate: u32) -> Vec<f64> {
    let n = (duration_secs * sample_rate as f64) as usize;
    let mut buf = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        buf.push(0.5 * (2.0 * std::f64::consts::PI * freq_hz * t).sin());
    }
    buf
}

/// Generate a guitar-like test signal (decaying harmonic stack).
pub fn guitar_pluck(freq_hz: f64, duration_secs: f64, sample_rate: u32) -> Vec<f64> {
    let n = (duration_secs * sample_rate as f64) as usize;
    let mut buf = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        let envelope = (-3.0 * t).exp();
        let w = 2.0 * std::f64::consts::PI * freq_hz * t;
        let tone = w.sin() + 0.5 * (2.0 * w).sin() + 0.25 * (3.0 * w).sin() + 0.125 * (4.0 * w).sin();
        buf.push(0.4 * envelope * tone);
    }
    buf
}

/// Run a buffer through a circuit and write the result to a WAV file.
pub fn render_to_wav<P: CircuitProcessor>(
    circuit: &mut P,
    input: &[f64],
    path: &Path,
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    circuit.prepare(sample_rate as f64, input.len().max(1));

    let mut writer = WavWriter::create(path, wav_spec(sample_rate))?;
    for &sample in input {
        writer.write_sample(circuit.process_sample(sample) as f32)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write raw f64 samples to a WAV file.
pub fn write_wav(
    samples: &[f64],
    path: &Path,
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = WavWriter::create(path, wav_spec(sample_rate))?;
    for &s in samples {
        writer.write_sample(s as f32)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_wave_length_and_amplitude() {
        let buf = sine_wave(440.0, 1.0, 48000);
        assert_eq!(buf.len(), 48000);
        let peak = buf.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        assert!((peak - 0.5).abs() < 1e-3);
    }

    #[test]
    fn pluck_decays() {
        let buf = guitar_pluck(196.0, 1.0, 48000);
        let head: f64 = buf[..4800].iter().map(|x| x * x).sum();
        let tail: f64 = buf[43200..].iter().map(|x| x * x).sum();
        assert!(tail < head * 0.1, "pluck should decay: head={head}, tail={tail}");
    }
}
