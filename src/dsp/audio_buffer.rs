//! Audio buffer type for DSP processing

use crate::error::{DynacompError, Result};

/// Interleaved audio buffer for DSP processing
///
/// Samples are stored in interleaved format: [L0, R0, L1, R1, ...]
/// This is the layout the effect consumes and WAV files store.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved sample data
    samples: Vec<f32>,
    /// Number of channels (1 = mono, 2 = stereo)
    num_channels: usize,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent audio buffer with the given parameters
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: u32) -> Self {
        let num_channels = num_channels.max(1);
        Self {
            samples: vec![0.0; num_channels * num_frames],
            num_channels,
            sample_rate,
        }
    }

    /// Create a buffer from existing interleaved samples
    pub fn from_interleaved(
        samples: Vec<f32>,
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(DynacompError::UnsupportedFormat {
                format: "0-channel audio".to_string(),
            });
        }
        if samples.len() % num_channels != 0 {
            return Err(DynacompError::InvalidAudio {
                reason: format!(
                    "Sample count {} is not divisible by channel count {}",
                    samples.len(),
                    num_channels
                ),
                source: None,
            });
        }
        Ok(Self {
            samples,
            num_channels,
            sample_rate,
        })
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.num_channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get a reference to all interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get a mutable reference to all interleaved samples
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Check if buffer contains valid audio (no NaN/Inf)
    pub fn is_valid(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }

    /// Absolute peak for a channel (linear)
    pub fn peak(&self, channel: usize) -> f32 {
        if channel >= self.num_channels {
            return 0.0;
        }

        self.samples
            .iter()
            .skip(channel)
            .step_by(self.num_channels)
            .map(|&s| s.abs())
            .fold(0.0f32, f32::max)
    }

    /// Calculate RMS level in dB for a channel
    pub fn rms_db(&self, channel: usize) -> f64 {
        if channel >= self.num_channels || self.is_empty() {
            return f64::NEG_INFINITY;
        }

        let sum_sq: f64 = self
            .samples
            .iter()
            .skip(channel)
            .step_by(self.num_channels)
            .map(|&s| (s as f64).powi(2))
            .sum();

        let rms = (sum_sq / self.num_frames() as f64).sqrt();

        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Calculate peak level in dB for a channel
    pub fn peak_db(&self, channel: usize) -> f64 {
        let peak = self.peak(channel);
        if peak > 0.0 {
            20.0 * (peak as f64).log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Fraction of samples sitting at or beyond full scale
    pub fn clipping_ratio(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let clipped = self.samples.iter().filter(|&&s| s.abs() >= 1.0).count();
        clipped as f64 / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buf = AudioBuffer::new(2, 1000, 44100);
        assert_eq!(buf.num_channels(), 2);
        assert_eq!(buf.num_frames(), 1000);
        assert_eq!(buf.sample_rate(), 44100);
        assert_eq!(buf.samples().len(), 2000);
    }

    #[test]
    fn test_from_interleaved_rejects_ragged() {
        assert!(AudioBuffer::from_interleaved(vec![0.0; 5], 2, 44100).is_err());
        assert!(AudioBuffer::from_interleaved(vec![0.0; 4], 0, 44100).is_err());
        assert!(AudioBuffer::from_interleaved(vec![0.0; 4], 2, 44100).is_ok());
    }

    #[test]
    fn test_rms_db() {
        let mut buf = AudioBuffer::new(1, 1000, 44100);
        // Fill with sine wave at unity amplitude
        for (i, sample) in buf.samples_mut().iter_mut().enumerate() {
            let t = i as f32 / 44100.0;
            *sample = (2.0 * std::f32::consts::PI * 441.0 * t).sin();
        }
        // RMS of sine wave is 1/sqrt(2) = -3.01 dB
        let rms = buf.rms_db(0);
        assert!((rms - (-3.01)).abs() < 0.1);
    }

    #[test]
    fn test_peak_per_channel() {
        let buf = AudioBuffer::from_interleaved(vec![0.1, -0.8, -0.3, 0.2], 2, 48000).unwrap();
        assert_eq!(buf.peak(0), 0.3);
        assert_eq!(buf.peak(1), 0.8);
        assert_eq!(buf.peak(2), 0.0);
    }

    #[test]
    fn test_is_valid() {
        let mut buf = AudioBuffer::new(1, 100, 44100);
        assert!(buf.is_valid());

        buf.samples_mut()[50] = f32::NAN;
        assert!(!buf.is_valid());
    }
}
