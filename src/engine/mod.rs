//! Audio Engine Module
//!
//! Everything around the effect:
//! - WAV file I/O
//! - Stream driver feeding audio through an effect block by block

pub mod io;
pub mod stream;

pub use io::{export_audio, generate_test_tone, import_audio, ExportFormat};
pub use stream::{StreamProcessor, StreamState, DEFAULT_BLOCK_FRAMES};
