//! DSP Effects Library
//!
//! Streaming effects driven block by block. All effects implement the
//! [`Effect`] trait for uniform processing.

mod audio_buffer;
mod compressor;
mod effect;

pub use audio_buffer::AudioBuffer;
pub use compressor::{
    calc_peak, Compressor, CompressorParams, CEILING, CHUNKS, CHUNK_TIME_MS, DECAY, MIN_PEAK,
};
pub use effect::{Effect, EffectParams};

