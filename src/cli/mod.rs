//! CLI Module
//!
//! Command-line interface for the dynacomp compressor.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::DEFAULT_BLOCK_FRAMES;

/// Dynacomp - streaming dynamic range compressor
#[derive(Parser, Debug)]
#[command(name = "dynacomp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (defaults to $DYNACOMP_CONFIG, then ./dynacomp.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Compressor overrides and stream options shared by processing commands
#[derive(Args, Debug, Clone)]
pub struct ProcessOptions {
    /// Target output level, 0.0 to 1.0 (overrides settings)
    #[arg(short, long)]
    pub target: Option<f32>,

    /// Effect strength, 0.0 to 1.0 (overrides settings)
    #[arg(short, long)]
    pub strength: Option<f32>,

    /// Frames handed to the compressor per block
    #[arg(long, default_value_t = DEFAULT_BLOCK_FRAMES)]
    pub block_frames: usize,

    /// Output bit depth: 16, 24 or 32 (float)
    #[arg(long, default_value_t = 24)]
    pub bit_depth: u16,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress a single WAV file
    #[command(name = "process")]
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        #[command(flatten)]
        options: ProcessOptions,
    },

    /// Compress every WAV file under a directory, one stream per file
    #[command(name = "batch")]
    Batch {
        /// Directory to scan
        input_dir: PathBuf,

        /// Directory receiving processed files (same relative layout)
        output_dir: PathBuf,

        #[command(flatten)]
        options: ProcessOptions,
    },

    /// Show per-channel levels before and after compression
    #[command(name = "analyze")]
    Analyze {
        /// Input WAV file
        input: PathBuf,

        #[command(flatten)]
        options: ProcessOptions,
    },

    /// Show or change stored settings
    #[command(name = "config", subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,

    /// Update stored compressor settings
    Set {
        /// Target output level, 0.0 to 1.0
        #[arg(short, long)]
        target: Option<f32>,

        /// Effect strength, 0.0 to 1.0
        #[arg(short, long)]
        strength: Option<f32>,
    },

    /// Overwrite the settings file with defaults
    Reset,
}
