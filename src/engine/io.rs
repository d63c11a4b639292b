//! Audio file I/O
//!
//! Reads and writes WAV files through `hound`. Audio is kept at its own
//! sample rate and channel count; the compressor adapts to whatever
//! format a stream starts with.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;

use crate::dsp::AudioBuffer;
use crate::error::{DynacompError, Result};

/// Bit depths accepted for export
pub const SUPPORTED_BIT_DEPTHS: [u16; 3] = [16, 24, 32];

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24 (integer) or 32 (float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer (CD quality)
    pub fn cd_quality() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 32-bit float, lossless for processed audio
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Import a WAV file as interleaved f32
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file
/// * `UnsupportedFormat` - If the sample encoding is not handled
/// * `EmptyAudio` - If the file holds no samples
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(DynacompError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| DynacompError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(DynacompError::UnsupportedFormat {
            format: "0-channel audio".to_string(),
        });
    }

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples.is_empty() {
        return Err(DynacompError::EmptyAudio);
    }

    let buffer = AudioBuffer::from_interleaved(samples, channels, spec.sample_rate)?;
    info!(
        "Imported {}: {} ch, {} Hz, {}-bit, {:.2}s",
        path.display(),
        channels,
        spec.sample_rate,
        spec.bits_per_sample,
        buffer.duration()
    );

    Ok(buffer)
}

/// Export an AudioBuffer to a WAV file
///
/// Write failures come back as `Io`, which is not recoverable.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    if !SUPPORTED_BIT_DEPTHS.contains(&format.bit_depth) {
        return Err(DynacompError::UnsupportedFormat {
            format: format!("{}-bit audio (only 16, 24, 32 supported)", format.bit_depth),
        });
    }

    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(hound_to_io)?;

    match format.bit_depth {
        16 => {
            for &sample in buffer.samples() {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
        }
        24 => {
            for &sample in buffer.samples() {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
        }
        _ => {
            for &sample in buffer.samples() {
                writer.write_sample(sample).map_err(hound_to_io)?;
            }
        }
    }

    writer.finalize().map_err(hound_to_io)?;
    info!("Exported {} ({}-bit)", path.display(), format.bit_depth);

    Ok(())
}

/// Generate a mono sine test tone at full scale
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_frames = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(1, num_frames, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    for (i, sample) in buffer.samples_mut().iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn hound_to_io(e: hound::Error) -> DynacompError {
    match e {
        hound::Error::IoError(io) => DynacompError::Io(io),
        other => DynacompError::Io(std::io::Error::other(other.to_string())),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |bits: &str, e: hound::Error| DynacompError::InvalidAudio {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| invalid("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("16-bit", e)),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("32-bit int", e)),
            _ => Err(DynacompError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_test_tone() {
        let tone = generate_test_tone(440.0, 0.5, 48000);
        assert_eq!(tone.num_channels(), 1);
        assert_eq!(tone.num_frames(), 24000);
        assert!(tone.peak(0) > 0.99 && tone.peak(0) <= 1.0);
    }

    #[test]
    fn test_round_trip_stereo_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let samples: Vec<f32> = (0..2000).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        let buffer = AudioBuffer::from_interleaved(samples, 2, 44100).unwrap();

        export_audio(&buffer, &path, ExportFormat::float()).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded, buffer);
    }

    #[test]
    fn test_round_trip_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone16.wav");

        let buffer = generate_test_tone(1000.0, 0.2, 22050);
        export_audio(&buffer, &path, ExportFormat::cd_quality()).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.num_frames(), buffer.num_frames());
        assert_eq!(loaded.sample_rate(), 22050);
        for (a, b) in loaded.samples().iter().zip(buffer.samples()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_round_trip_24bit_multichannel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("six.wav");

        let buffer = AudioBuffer::from_interleaved(vec![0.25; 6 * 100], 6, 48000).unwrap();
        export_audio(&buffer, &path, ExportFormat::default()).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.num_channels(), 6);
        assert!((loaded.samples()[0] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let dir = tempdir().unwrap();
        let buffer = AudioBuffer::new(1, 10, 8000);
        let path = dir.path().join("x.wav");
        let err = export_audio(&buffer, &path, ExportFormat::new(12)).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_import_nonexistent_file() {
        let err = import_audio(Path::new("/nonexistent/nothing.wav")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_import_garbage_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();
        let err = import_audio(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AUDIO");
    }

    #[test]
    fn test_import_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let buffer = AudioBuffer::new(2, 0, 44100);
        export_audio(&buffer, &path, ExportFormat::cd_quality()).unwrap();
        let err = import_audio(&path).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_AUDIO");
    }
}
