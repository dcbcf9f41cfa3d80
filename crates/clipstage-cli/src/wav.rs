//! WAV file reading and writing.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};

/// Format of a decoded file, kept so the output can match it.
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    /// Channels in the source file (the decoded signal is always mono).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
}

/// Read a WAV file as mono `f32` samples in `[-1, 1]`.
///
/// Multi-channel files are mixed down by averaging each frame.
pub fn read_mono<P: AsRef<Path>>(path: P) -> anyhow::Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let hound_spec = reader.spec();
    let spec = WavSpec {
        channels: hound_spec.channels,
        sample_rate: hound_spec.sample_rate,
        bits_per_sample: hound_spec.bits_per_sample,
    };
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<f32> = match hound_spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = pcm_full_scale(spec.bits_per_sample)?;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec))
}

/// Full-scale value of a signed PCM sample with the given bit depth.
fn pcm_full_scale(bits_per_sample: u16) -> anyhow::Result<f32> {
    if bits_per_sample == 0 || bits_per_sample > 32 {
        anyhow::bail!("Unsupported PCM bit depth {bits_per_sample} (expected 1 to 32)");
    }
    Ok((1i64 << (bits_per_sample - 1)) as f32)
}

/// Write mono samples; 32-bit output is IEEE float, other depths are PCM.
pub fn write_mono<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    bits_per_sample: u16,
) -> anyhow::Result<()> {
    if !matches!(bits_per_sample, 16 | 24 | 32) {
        anyhow::bail!("Unsupported bit depth {bits_per_sample} (expected 16, 24 or 32)");
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample,
        sample_format: if bits_per_sample == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer = WavWriter::create(path, spec)?;

    if bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}
