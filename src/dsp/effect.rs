//! Effect trait definition
//!
//! Streaming effects follow the playback lifecycle: `start` for a new
//! stream format, `process` per block, `flush` on seeks and track
//! changes, `finish` at end of stream. Effects may hold audio back, so
//! `process` appends to an output vector instead of working in place.

use crate::error::Result;
use serde_json::Value;

/// Parameters common to all effects
#[derive(Debug, Clone)]
pub struct EffectParams {
    /// Unique identifier for this effect instance
    pub id: String,
    /// Whether the effect is enabled
    pub enabled: bool,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enabled: true,
        }
    }
}

/// Base trait for all streaming DSP effects
///
/// Samples are interleaved f32. Everything an effect buffers is released
/// by `finish`, so the total output of a stream matches its total input.
pub trait Effect: Send {
    /// Prepare for a stream with the given format
    ///
    /// Discards any state from a previous stream.
    fn start(&mut self, channels: usize, sample_rate: u32);

    /// Consume interleaved input, appending whatever is ready to `output`
    fn process(&mut self, input: &[f32], output: &mut Vec<f32>);

    /// Drop buffered audio and envelope state (seek or stream change)
    fn flush(&mut self);

    /// Process the last block of a stream and drain everything buffered
    fn finish(&mut self, input: &[f32], output: &mut Vec<f32>);

    /// Audio currently held inside the effect, in milliseconds
    fn latency_ms(&self) -> i64 {
        0
    }

    /// Map a decoder position to the position being heard
    fn decoder_to_output_time(&self, time_ms: i64) -> i64 {
        time_ms - self.latency_ms()
    }

    /// Map a heard position back to the decoder position
    fn output_to_decoder_time(&self, time_ms: i64) -> i64 {
        time_ms + self.latency_ms()
    }

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Get the unique instance ID
    fn id(&self) -> &str;

    /// Set the unique instance ID
    fn set_id(&mut self, id: String);

    /// Check if effect is enabled
    fn is_enabled(&self) -> bool;

    /// Enable or disable the effect
    fn set_enabled(&mut self, enabled: bool);

    /// Serialize effect parameters to JSON
    fn to_json(&self) -> Result<Value>;

    /// Deserialize effect parameters from JSON
    fn from_json(&mut self, json: &Value) -> Result<()>;

    /// Get all parameters as JSON
    fn get_params(&self) -> Value;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Clone the effect into a boxed trait object
    fn box_clone(&self) -> Box<dyn Effect>;
}

impl Clone for Box<dyn Effect> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Helper macro to implement common Effect trait methods
#[macro_export]
macro_rules! impl_effect_common {
    ($type:ty, $effect_type:expr, $display_name:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn id(&self) -> &str {
            &self.params.id
        }

        fn set_id(&mut self, id: String) {
            self.params.id = id;
        }

        fn is_enabled(&self) -> bool {
            self.params.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.params.enabled = enabled;
        }

        fn box_clone(&self) -> Box<dyn Effect> {
            Box::new(self.clone())
        }
    };
}
