//! Multichannel WAV output for rendered voltages.
//!
//! Each output channel becomes one WAV channel. Voltages are divided by a
//! full-scale value so that, for example, +/-10 V maps onto +/-1.0.

use anyhow::bail;
use corvid_core::NUM_CHANNELS;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    pub duration_secs: f64,
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info(path: &Path) -> anyhow::Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len());
    let num_frames = total_samples / u64::from(spec.channels.max(1));
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Streams engine frames into an 8-channel WAV file.
pub struct FrameWriter {
    writer: WavWriter<BufWriter<File>>,
    bits_per_sample: u16,
    full_scale: f32,
}

impl FrameWriter {
    /// Create `path` for writing. `bits_per_sample` is 16, 24 or 32; 32-bit
    /// files hold floats, the others integer PCM.
    pub fn create(
        path: &Path,
        sample_rate: u32,
        bits_per_sample: u16,
        full_scale: f32,
    ) -> anyhow::Result<Self> {
        if !matches!(bits_per_sample, 16 | 24 | 32) {
            bail!("unsupported bit depth {bits_per_sample} (expected 16, 24 or 32)");
        }
        if !(full_scale.is_finite() && full_scale > 0.0) {
            bail!("full scale must be a positive number of volts, got {full_scale}");
        }
        let spec = WavSpec {
            channels: NUM_CHANNELS as u16,
            sample_rate,
            bits_per_sample,
            sample_format: if bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        };
        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            bits_per_sample,
            full_scale,
        })
    }

    /// Append frames, one sample per channel each.
    pub fn write_frames(&mut self, frames: &[[f32; NUM_CHANNELS]]) -> anyhow::Result<()> {
        if self.bits_per_sample == 32 {
            for &volts in frames.iter().flatten() {
                self.writer.write_sample(volts / self.full_scale)?;
            }
        } else {
            let max_val = (1i32 << (self.bits_per_sample - 1)) as f32;
            for &volts in frames.iter().flatten() {
                let sample = volts / self.full_scale;
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                self.writer.write_sample(int_sample)?;
            }
        }
        Ok(())
    }

    /// Flush the header and close the file.
    pub fn finalize(self) -> anyhow::Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}
