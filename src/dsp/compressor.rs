//! Dynamic range compressor
//!
//! A lookahead peak compressor. Incoming audio is cut into chunks of
//! [`CHUNK_TIME_MS`]; the peak of every chunk is recorded and the oldest
//! chunk is released once [`CHUNKS`] of them are held. The released chunk
//! is scaled by a gain ramp running from the previous envelope peak to
//! the peak of the whole window, so a loud passage pulls the gain down
//! before it is heard. The envelope may drop by at most [`DECAY`] per
//! chunk, and every output sample passes through a hard limiter at full
//! scale.
//!
//! Gain for an envelope peak `p` is `(target / p) ^ strength`: strength 0
//! leaves audio untouched, strength 1 brings every peak to `target`.

use crate::dsp::effect::{Effect, EffectParams};
use crate::error::{DynacompError, Result};
use crate::impl_effect_common;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Constants
// ============================================================================

/// Length of one analysis chunk in milliseconds
pub const CHUNK_TIME_MS: u64 = 200;

/// Number of chunks held in the lookahead window
pub const CHUNKS: usize = 5;

/// Largest fraction the envelope peak may fall per chunk
pub const DECAY: f32 = 0.3;

/// Floor for detected peaks, keeps silence from producing unbounded gain
pub const MIN_PEAK: f32 = 0.01;

/// Hard limiter ceiling (full scale)
pub const CEILING: f32 = 1.0;

const MIN_LEVEL: f32 = 0.0;
const MAX_LEVEL: f32 = 1.0;

// ============================================================================
// Parameters
// ============================================================================

/// User-facing compressor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    /// Desired output peak level, linear (0.0 to 1.0)
    pub target: f32,
    /// Effect strength (0.0 = no change, 1.0 = full normalization)
    pub strength: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            target: 0.5,
            strength: 0.5,
        }
    }
}

impl CompressorParams {
    /// Create parameters, clamping both values into range
    pub fn new(target: f32, strength: f32) -> Self {
        let mut params = Self { target, strength };
        params.clamp();
        params
    }

    /// Validate parameters against their ranges
    pub fn validate(&self) -> Result<()> {
        check_level("target", self.target)?;
        check_level("strength", self.strength)?;
        Ok(())
    }

    /// Clamp parameters to valid ranges
    ///
    /// NaN falls back to the default for that field.
    pub fn clamp(&mut self) {
        let defaults = Self::default();
        self.target = clamp_level(self.target, defaults.target);
        self.strength = clamp_level(self.strength, defaults.strength);
    }

    /// Gain applied to audio whose envelope peak is `peak`
    #[inline]
    pub fn gain_for_peak(&self, peak: f32) -> f32 {
        (self.target / peak.max(MIN_PEAK)).powf(self.strength)
    }
}

fn check_level(param: &str, value: f32) -> Result<()> {
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&value) {
        return Err(DynacompError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: "0.0 to 1.0".to_string(),
        });
    }
    Ok(())
}

fn clamp_level(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(MIN_LEVEL, MAX_LEVEL)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Absolute peak of a run of samples, floored at [`MIN_PEAK`]
///
/// Non-finite samples count as silence.
#[inline]
pub fn calc_peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(MIN_PEAK, |peak, s| peak.max(s.abs()))
}

/// Hard limiter
#[inline]
fn limit(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-CEILING, CEILING)
    } else {
        0.0
    }
}

// ============================================================================
// Stream State
// ============================================================================

/// Per-stream envelope and lookahead ring
#[derive(Debug, Clone)]
struct StreamState {
    channels: usize,
    sample_rate: u32,
    /// Chunk length in samples (a whole number of frames)
    chunk_size: usize,
    ring: Vec<f32>,
    peaks: [f32; CHUNKS],
    /// Slot of the oldest completed chunk
    head: usize,
    /// Completed chunks waiting in the ring
    held: usize,
    /// Samples written into the chunk being filled
    filled: usize,
    /// Envelope peak; `None` until the first chunk of a stream is released
    current_peak: Option<f32>,
}

impl StreamState {
    fn new(channels: usize, sample_rate: u32) -> Self {
        let frames = ((sample_rate as u64 * CHUNK_TIME_MS / 1000) as usize).max(1);
        let chunk_size = frames * channels;
        Self {
            channels,
            sample_rate,
            chunk_size,
            ring: vec![0.0; chunk_size * CHUNKS],
            peaks: [MIN_PEAK; CHUNKS],
            head: 0,
            held: 0,
            filled: 0,
            current_peak: None,
        }
    }

    fn reset(&mut self) {
        self.head = 0;
        self.held = 0;
        self.filled = 0;
        self.current_peak = None;
        self.peaks = [MIN_PEAK; CHUNKS];
    }

    fn buffered_samples(&self) -> usize {
        self.held * self.chunk_size + self.filled
    }

    fn latency_ms(&self) -> i64 {
        let frames = (self.buffered_samples() / self.channels) as i64;
        frames * 1000 / self.sample_rate as i64
    }

    fn write(&mut self, mut input: &[f32], params: &CompressorParams, bypass: bool, output: &mut Vec<f32>) {
        while !input.is_empty() {
            let slot = (self.head + self.held) % CHUNKS;
            let start = slot * self.chunk_size + self.filled;
            let n = input.len().min(self.chunk_size - self.filled);

            self.ring[start..start + n].copy_from_slice(&input[..n]);
            self.filled += n;
            input = &input[n..];

            if self.filled < self.chunk_size {
                break;
            }

            let base = slot * self.chunk_size;
            self.peaks[slot] = calc_peak(&self.ring[base..base + self.chunk_size]);
            self.filled = 0;
            self.held += 1;

            if self.held == CHUNKS {
                let window_peak = self.peaks.iter().copied().fold(MIN_PEAK, f32::max);
                self.release(self.head, self.chunk_size, window_peak, params, bypass, output);
                self.head = (self.head + 1) % CHUNKS;
                self.held -= 1;
            }
        }
    }

    /// Release everything held, oldest first, then reset
    fn drain(&mut self, params: &CompressorParams, bypass: bool, output: &mut Vec<f32>) {
        // (slot, length, peak) for each pending chunk, the partial one last
        let mut pending = Vec::with_capacity(CHUNKS);
        for i in 0..self.held {
            let slot = (self.head + i) % CHUNKS;
            pending.push((slot, self.chunk_size, self.peaks[slot]));
        }
        if self.filled > 0 {
            let slot = (self.head + self.held) % CHUNKS;
            let base = slot * self.chunk_size;
            pending.push((slot, self.filled, calc_peak(&self.ring[base..base + self.filled])));
        }

        for (i, &(slot, len, _)) in pending.iter().enumerate() {
            let window_peak = pending[i..].iter().map(|p| p.2).fold(MIN_PEAK, f32::max);
            self.release(slot, len, window_peak, params, bypass, output);
        }

        self.reset();
    }

    /// Apply the gain ramp to one chunk and append it to `output`
    fn release(
        &mut self,
        slot: usize,
        len: usize,
        window_peak: f32,
        params: &CompressorParams,
        bypass: bool,
        output: &mut Vec<f32>,
    ) {
        let current = self.current_peak.unwrap_or(window_peak);
        let new_peak = window_peak.max(current * (1.0 - DECAY));
        self.current_peak = Some(new_peak);

        let base = slot * self.chunk_size;
        let chunk = &self.ring[base..base + len];

        if bypass {
            output.extend_from_slice(chunk);
            return;
        }

        let gain_a = params.gain_for_peak(current);
        let gain_b = params.gain_for_peak(new_peak);
        let frames = len.div_ceil(self.channels);

        output.extend(chunk.iter().enumerate().map(|(i, &sample)| {
            let frame = i / self.channels;
            let gain = (gain_a * (frames - frame) as f32 + gain_b * frame as f32) / frames as f32;
            limit(sample * gain)
        }));
    }
}

// ============================================================================
// Compressor Effect
// ============================================================================

/// Dynamic range compressor effect
///
/// # Example
/// ```
/// use dynacomp::dsp::{Compressor, CompressorParams, Effect};
///
/// let mut comp = Compressor::with_params(CompressorParams::new(0.5, 1.0));
/// comp.start(2, 44100);
///
/// let mut out = Vec::new();
/// comp.process(&[0.1; 4410], &mut out);
/// comp.finish(&[], &mut out);
/// assert_eq!(out.len(), 4410);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    params: EffectParams,
    config: CompressorParams,
    state: Option<StreamState>,
}

impl Compressor {
    /// Create a new compressor with default parameters
    pub fn new() -> Self {
        Self::with_params(CompressorParams::default())
    }

    /// Create a new compressor with custom parameters (clamped)
    pub fn with_params(mut config: CompressorParams) -> Self {
        config.clamp();
        Self {
            params: EffectParams::default(),
            config,
            state: None,
        }
    }

    /// Get the current parameters
    pub fn params(&self) -> &CompressorParams {
        &self.config
    }

    /// Replace the parameters (clamped); takes effect on the next chunk
    pub fn set_params(&mut self, mut config: CompressorParams) {
        config.clamp();
        self.config = config;
    }

    /// Set the target level
    pub fn set_target(&mut self, target: f32) {
        self.config.target = clamp_level(target, self.config.target);
    }

    /// Set the effect strength
    pub fn set_strength(&mut self, strength: f32) {
        self.config.strength = clamp_level(strength, self.config.strength);
    }

    fn set_level_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let v = value.as_f64().ok_or_else(|| DynacompError::InvalidParameter {
            param: name.to_string(),
            value: value.to_string(),
            expected: "a number from 0.0 to 1.0".to_string(),
        })? as f32;

        if check_level(name, v).is_err() {
            warn!("compressor {} = {} out of range, clamping", name, v);
        }
        match name {
            "target" => self.set_target(v),
            _ => self.set_strength(v),
        }
        Ok(())
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Compressor {
    impl_effect_common!(Compressor, "compressor", "Dynamic Range Compressor");

    fn start(&mut self, channels: usize, sample_rate: u32) {
        if channels == 0 || sample_rate == 0 {
            warn!(
                "compressor started with {} channels at {} Hz, passing audio through",
                channels, sample_rate
            );
            self.state = None;
            return;
        }
        debug!("compressor start: {} channels, {} Hz", channels, sample_rate);
        self.state = Some(StreamState::new(channels, sample_rate));
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let bypass = !self.params.enabled;
        match self.state.as_mut() {
            Some(state) => state.write(input, &self.config, bypass, output),
            None => output.extend_from_slice(input),
        }
    }

    fn flush(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.reset();
        }
    }

    fn finish(&mut self, input: &[f32], output: &mut Vec<f32>) {
        let bypass = !self.params.enabled;
        match self.state.as_mut() {
            Some(state) => {
                state.write(input, &self.config, bypass, output);
                state.drain(&self.config, bypass, output);
            }
            None => output.extend_from_slice(input),
        }
    }

    fn latency_ms(&self) -> i64 {
        self.state.as_ref().map(StreamState::latency_ms).unwrap_or(0)
    }

    fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(CompressorState {
            id: self.params.id.clone(),
            enabled: self.params.enabled,
            params: self.config,
        })?)
    }

    fn from_json(&mut self, json: &Value) -> Result<()> {
        let state: CompressorState = serde_json::from_value(json.clone())?;
        self.params.id = state.id;
        self.params.enabled = state.enabled;
        self.set_params(state.params);
        Ok(())
    }

    fn get_params(&self) -> Value {
        json!({
            "target": self.config.target,
            "strength": self.config.strength,
            "enabled": self.params.enabled
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "target" | "strength" => self.set_level_param(name, value),
            "enabled" => {
                let v = value.as_bool().ok_or_else(|| DynacompError::InvalidParameter {
                    param: name.to_string(),
                    value: value.to_string(),
                    expected: "true or false".to_string(),
                })?;
                self.params.enabled = v;
                Ok(())
            }
            _ => Err(DynacompError::UnknownParameter {
                param: name.to_string(),
                effect: self.effect_type().to_string(),
            }),
        }
    }
}

/// Serializable state for the compressor
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompressorState {
    id: String,
    enabled: bool,
    params: CompressorParams,
}

// ============================================================================
// Tests
// ============================================================================
