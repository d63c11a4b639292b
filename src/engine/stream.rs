//! Stream driver
//!
//! Plays the part of a player's playback pipeline: it starts an effect
//! for a stream's format, feeds decoded audio in fixed-size blocks, and
//! finishes the stream so nothing stays buffered. Track boundaries and
//! seeks flush the effect so no envelope carries over.

use std::fmt;

use log::debug;

use crate::dsp::{AudioBuffer, Effect};
use crate::error::{DynacompError, Result};

/// Default block size in frames, similar to what audio backends hand out
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No stream open
    #[default]
    Idle,
    /// A stream is started and accepting blocks
    Streaming,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Idle => write!(f, "Idle"),
            StreamState::Streaming => write!(f, "Streaming"),
        }
    }
}

/// Feeds audio through a streaming effect block by block
pub struct StreamProcessor {
    effect: Box<dyn Effect>,
    block_frames: usize,
    state: StreamState,
    channels: usize,
    sample_rate: u32,
    /// Samples handed to the effect since the stream started or last seek
    samples_in: u64,
    /// Position of the last seek, in milliseconds
    seek_base_ms: i64,
}

impl StreamProcessor {
    /// Create a driver around `effect`, feeding `block_frames` frames at a time
    pub fn new(effect: Box<dyn Effect>, block_frames: usize) -> Result<Self> {
        if block_frames == 0 {
            return Err(DynacompError::InvalidParameter {
                param: "block_frames".to_string(),
                value: "0".to_string(),
                expected: "at least 1 frame".to_string(),
            });
        }
        Ok(Self {
            effect,
            block_frames,
            state: StreamState::Idle,
            channels: 0,
            sample_rate: 0,
            samples_in: 0,
            seek_base_ms: 0,
        })
    }

    pub fn effect(&self) -> &dyn Effect {
        self.effect.as_ref()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Open a stream with the given format
    pub fn begin(&mut self, channels: usize, sample_rate: u32) {
        self.effect.start(channels, sample_rate);
        self.state = StreamState::Streaming;
        self.channels = channels;
        self.sample_rate = sample_rate;
        self.samples_in = 0;
        self.seek_base_ms = 0;
    }

    /// Push one block of interleaved samples
    pub fn push(&mut self, block: &[f32], output: &mut Vec<f32>) {
        self.effect.process(block, output);
        self.samples_in += block.len() as u64;
    }

    /// Jump to `position_ms`; buffered audio and envelope are dropped
    pub fn seek(&mut self, position_ms: i64) {
        debug!(
            "seek to {} ms, dropping {} ms of buffered audio",
            position_ms,
            self.effect.latency_ms()
        );
        self.effect.flush();
        self.samples_in = 0;
        self.seek_base_ms = position_ms;
    }

    /// Close the stream, appending everything the effect still holds
    pub fn end(&mut self, output: &mut Vec<f32>) {
        self.effect.finish(&[], output);
        self.state = StreamState::Idle;
    }

    /// Position of the decoder, in milliseconds
    pub fn decoder_time_ms(&self) -> i64 {
        if self.channels == 0 || self.sample_rate == 0 {
            return self.seek_base_ms;
        }
        let frames = self.samples_in as i64 / self.channels as i64;
        self.seek_base_ms + frames * 1000 / self.sample_rate as i64
    }

    /// Position actually leaving the effect, in milliseconds
    pub fn output_time_ms(&self) -> i64 {
        self.effect.decoder_to_output_time(self.decoder_time_ms())
    }

    /// Run a whole buffer through the effect as one stream
    ///
    /// The result has the same format and length as the input.
    pub fn run(&mut self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let channels = input.num_channels();
        let block = self
            .block_frames
            .checked_mul(channels)
            .ok_or_else(|| DynacompError::InvalidParameter {
                param: "block_frames".to_string(),
                value: self.block_frames.to_string(),
                expected: format!("a block that fits in memory for {} channels", channels),
            })?;

        self.begin(channels, input.sample_rate());

        let mut out = Vec::with_capacity(input.samples().len());
        for piece in input.samples().chunks(block) {
            self.push(piece, &mut out);
        }
        self.end(&mut out);

        debug!(
            "stream done: {} frames in {} blocks, peak {:.3} -> {:.3}",
            input.num_frames(),
            input.samples().len().div_ceil(block),
            (0..channels).map(|c| input.peak(c)).fold(0.0f32, f32::max),
            out.iter().fold(0.0f32, |p, s| p.max(s.abs()))
        );

        AudioBuffer::from_interleaved(out, channels, input.sample_rate())
    }

    /// Run several tracks back to back, one stream each
    pub fn run_playlist(&mut self, tracks: &[AudioBuffer]) -> Result<Vec<AudioBuffer>> {
        tracks
            .iter()
            .map(|track| {
                self.effect.flush();
                self.run(track)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Compressor, CompressorParams};
    use pretty_assertions::assert_eq;

    fn compressor(target: f32, strength: f32) -> Box<dyn Effect> {
        Box::new(Compressor::with_params(CompressorParams::new(target, strength)))
    }

    #[test]
    fn test_zero_block_rejected() {
        assert!(StreamProcessor::new(compressor(0.5, 0.5), 0).is_err());
    }

    #[test]
    fn test_oversized_block_rejected() {
        let mut proc = StreamProcessor::new(compressor(0.5, 0.5), usize::MAX / 2 + 1).unwrap();
        let input = AudioBuffer::from_interleaved(vec![0.3; 2 * 100], 2, 8000).unwrap();

        let err = proc.run(&input).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert_eq!(proc.state(), StreamState::Idle);
    }

    #[test]
    fn test_huge_block_still_fits_mono() {
        let mut proc = StreamProcessor::new(compressor(0.5, 0.5), usize::MAX).unwrap();
        let input = AudioBuffer::from_interleaved(vec![0.3; 2500], 1, 1000).unwrap();

        let out = proc.run(&input).unwrap();
        assert_eq!(out.num_frames(), 2500);
    }

    #[test]
    fn test_run_preserves_format_and_length() {
        let mut proc = StreamProcessor::new(compressor(0.5, 0.5), 100).unwrap();
        let input = AudioBuffer::from_interleaved(vec![0.3; 2 * 3333], 2, 8000).unwrap();

        let out = proc.run(&input).unwrap();

        assert_eq!(out.num_channels(), 2);
        assert_eq!(out.sample_rate(), 8000);
        assert_eq!(out.num_frames(), 3333);
        assert_eq!(proc.state(), StreamState::Idle);
    }

    #[test]
    fn test_block_size_does_not_change_result() {
        let input = AudioBuffer::from_interleaved(
            (0..4000).map(|i| ((i as f32) * 0.02).sin() * 0.7).collect(),
            1,
            1000,
        )
        .unwrap();

        let mut small = StreamProcessor::new(compressor(0.4, 0.8), 7).unwrap();
        let mut large = StreamProcessor::new(compressor(0.4, 0.8), 1500).unwrap();

        assert_eq!(small.run(&input).unwrap(), large.run(&input).unwrap());
    }

    #[test]
    fn test_positions_track_latency() {
        let mut proc = StreamProcessor::new(compressor(0.5, 0.5), 100).unwrap();
        proc.begin(1, 1000);
        assert_eq!(proc.state(), StreamState::Streaming);

        let mut out = Vec::new();
        proc.push(&[0.2; 1100], &mut out);

        // 1100 ms decoded, 200 ms released, 900 ms held
        assert_eq!(proc.decoder_time_ms(), 1100);
        assert_eq!(proc.output_time_ms(), 200);
        assert_eq!(out.len(), 200);
    }

    #[test]
    fn test_seek_flushes_effect() {
        let mut proc = StreamProcessor::new(compressor(0.5, 0.5), 100).unwrap();
        proc.begin(1, 1000);

        let mut out = Vec::new();
        proc.push(&[0.2; 700], &mut out);
        proc.seek(30_000);

        assert_eq!(proc.effect().latency_ms(), 0);
        assert_eq!(proc.decoder_time_ms(), 30_000);
        assert_eq!(proc.output_time_ms(), 30_000);
    }

    #[test]
    fn test_playlist_tracks_are_independent() {
        let loud = AudioBuffer::from_interleaved(vec![0.9; 3000], 1, 1000).unwrap();
        let quiet = AudioBuffer::from_interleaved(vec![0.05; 3000], 1, 1000).unwrap();

        let mut proc = StreamProcessor::new(compressor(0.5, 1.0), 256).unwrap();
        let outputs = proc.run_playlist(&[loud, quiet.clone()]).unwrap();

        let mut alone = StreamProcessor::new(compressor(0.5, 1.0), 256).unwrap();
        assert_eq!(outputs[1], alone.run(&quiet).unwrap());
    }
}
