//! Dynacomp - Streaming Dynamic Range Compressor
//!
//! A lookahead peak compressor that evens out loudness across a stream,
//! pulling loud passages down and quiet ones up toward a target level.
//!
//! # Architecture
//!
//! - `dsp`: the [`dsp::Effect`] lifecycle and the [`dsp::Compressor`]
//! - `engine`: WAV I/O and the block-feeding [`engine::StreamProcessor`]
//! - `config`: persisted compressor settings
//! - `cli`: the `dynacomp` command-line front-end

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use error::{DynacompError, Result};
