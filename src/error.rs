//! Error handling for dynacomp
//!
//! The sample path never fails. Everything around it (files, settings,
//! parameter updates) reports through [`DynacompError`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for dynacomp operations
pub type Result<T> = std::result::Result<T, DynacompError>;

/// Main error type for dynacomp operations
#[derive(Error, Debug)]
pub enum DynacompError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Parameter Errors
    #[error("Invalid parameter {param} = {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Unknown parameter '{param}' for effect '{effect}'")]
    UnknownParameter { param: String, effect: String },

    // Settings Errors
    #[error("Config error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DynacompError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DynacompError::FileNotFound { .. } => "FILE_NOT_FOUND",
            DynacompError::InvalidAudio { .. } => "INVALID_AUDIO",
            DynacompError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            DynacompError::EmptyAudio => "EMPTY_AUDIO",
            DynacompError::InvalidParameter { .. } => "INVALID_PARAMETER",
            DynacompError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            DynacompError::Config { .. } => "CONFIG_ERROR",
            DynacompError::Io(_) => "IO_ERROR",
            DynacompError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// A batch run skips files that fail with a recoverable error and
    /// keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DynacompError::FileNotFound { .. }
                | DynacompError::InvalidAudio { .. }
                | DynacompError::UnsupportedFormat { .. }
                | DynacompError::EmptyAudio
                | DynacompError::InvalidParameter { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DynacompError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            DynacompError::InvalidAudio { .. } => vec![
                "Check if the file plays in another application",
                "The file may be corrupted - try re-exporting from source",
            ],
            DynacompError::UnsupportedFormat { .. } => vec![
                "Convert to 16/24/32-bit integer or 32-bit float WAV",
            ],
            DynacompError::InvalidParameter { .. } => vec![
                "Target and strength both take values from 0.0 to 1.0",
            ],
            DynacompError::Config { .. } => vec![
                "Fix or delete the settings file to fall back to defaults",
                "Run 'dynacomp config reset' to write fresh defaults",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DynacompError::FileNotFound {
            path: "test.wav".to_string(),
            source: None,
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert_eq!(DynacompError::EmptyAudio.error_code(), "EMPTY_AUDIO");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = DynacompError::InvalidParameter {
            param: "target".to_string(),
            value: "2".to_string(),
            expected: "0.0 to 1.0".to_string(),
        };
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_error_not_recoverable() {
        let err = DynacompError::Config {
            path: PathBuf::from("dynacomp.json"),
            reason: "expected value".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("dynacomp.json"));
    }
}
