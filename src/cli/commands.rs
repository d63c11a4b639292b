//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use super::ProcessOptions;
use crate::config::Settings;
use crate::dsp::{AudioBuffer, Compressor, CompressorParams};
use crate::engine::{export_audio, import_audio, ExportFormat, StreamProcessor};
use crate::error::Result;

/// Outcome of a batch run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: Vec<PathBuf>,
}

/// Levels reported by `analyze`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReport {
    /// Loudest sample across channels before processing
    pub input_peak: f32,
    /// Loudest sample across channels after processing
    pub output_peak: f32,
    /// Input held NaN or infinite samples, which come out as silence
    pub had_non_finite: bool,
}

/// Stored settings with command-line overrides applied
pub fn effective_params(settings: &Settings, options: &ProcessOptions) -> CompressorParams {
    let mut params = settings.compressor;
    if let Some(target) = options.target {
        params.target = target;
    }
    if let Some(strength) = options.strength {
        params.strength = strength;
    }
    if let Err(e) = params.validate() {
        warn!("{}, clamping", e);
    }
    params.clamp();
    params
}

fn build_processor(params: CompressorParams, options: &ProcessOptions) -> Result<StreamProcessor> {
    StreamProcessor::new(Box::new(Compressor::with_params(params)), options.block_frames)
}

/// Compress a single WAV file.
pub fn process(
    settings_path: &Path,
    input: &Path,
    output: &Path,
    options: &ProcessOptions,
) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let params = effective_params(&settings, options);
    let mut processor = build_processor(params, options)?;

    process_file(&mut processor, input, output, ExportFormat::new(options.bit_depth))?;

    println!(
        "{} -> {} (target {:.2}, strength {:.2})",
        input.display(),
        output.display(),
        params.target,
        params.strength
    );
    Ok(())
}

fn process_file(
    processor: &mut StreamProcessor,
    input: &Path,
    output: &Path,
    format: ExportFormat,
) -> Result<()> {
    let audio = import_audio(input)?;
    let processed = processor.run(&audio)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    export_audio(&processed, output, format)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Compress every WAV file under `input_dir`, one stream per file.
///
/// Files that fail with a recoverable error (unreadable or malformed
/// input) are skipped and reported. Output I/O errors stop the run, since
/// a bad output directory fails every remaining file the same way.
pub fn batch(
    settings_path: &Path,
    input_dir: &Path,
    output_dir: &Path,
    options: &ProcessOptions,
) -> Result<BatchSummary> {
    let settings = Settings::load(settings_path)?;
    let params = effective_params(&settings, options);
    let mut processor = build_processor(params, options)?;
    let format = ExportFormat::new(options.bit_depth);

    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_wav(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    info!("Batch: {} WAV files under {}", files.len(), input_dir.display());

    let mut summary = BatchSummary::default();
    for file in files {
        let relative = file.strip_prefix(input_dir).unwrap_or(&file);
        let target = output_dir.join(relative);

        match process_file(&mut processor, &file, &target, format) {
            Ok(()) => {
                println!("{} -> {}", file.display(), target.display());
                summary.processed += 1;
            }
            Err(e) if e.is_recoverable() => {
                warn!("Skipping {}: {} [{}]", file.display(), e, e.error_code());
                summary.skipped.push(file);
            }
            Err(e) => return Err(e),
        }
    }

    println!(
        "Processed {} file(s), skipped {}",
        summary.processed,
        summary.skipped.len()
    );
    Ok(summary)
}

/// Print per-channel levels before and after compression.
pub fn analyze(
    settings_path: &Path,
    input: &Path,
    options: &ProcessOptions,
) -> Result<LevelReport> {
    let settings = Settings::load(settings_path)?;
    let params = effective_params(&settings, options);
    let mut processor = build_processor(params, options)?;

    let audio = import_audio(input)?;
    let processed = processor.run(&audio)?;

    let report = LevelReport {
        input_peak: max_peak(&audio),
        output_peak: max_peak(&processed),
        had_non_finite: !audio.is_valid(),
    };
    if report.had_non_finite {
        warn!("{} contains NaN or infinite samples", input.display());
    }

    println!("{}", input.display());
    println!(
        "{} ch, {} Hz, {:.2}s (target {:.2}, strength {:.2})",
        audio.num_channels(),
        audio.sample_rate(),
        audio.duration(),
        params.target,
        params.strength
    );
    println!("{:-<60}", "");
    print_levels("before", &audio);
    print_levels("after", &processed);
    if report.had_non_finite {
        println!("non-finite input samples were replaced with silence");
    }

    Ok(report)
}

fn max_peak(audio: &AudioBuffer) -> f32 {
    (0..audio.num_channels())
        .map(|ch| audio.peak(ch))
        .fold(0.0f32, f32::max)
}

fn print_levels(label: &str, audio: &AudioBuffer) {
    for ch in 0..audio.num_channels() {
        println!(
            "{:<7} ch{}: peak {:>7.2} dBFS, rms {:>7.2} dBFS",
            label,
            ch,
            audio.peak_db(ch),
            audio.rms_db(ch)
        );
    }
    println!("{:<7} clipped: {:.3}%", label, audio.clipping_ratio() * 100.0);
}

/// Print the current settings.
pub fn config_show(settings_path: &Path) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    println!("# {}", settings_path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// Update stored settings.
pub fn config_set(settings_path: &Path, target: Option<f32>, strength: Option<f32>) -> Result<()> {
    let mut settings = Settings::load(settings_path)?;
    if let Some(target) = target {
        settings.compressor.target = target;
    }
    if let Some(strength) = strength {
        settings.compressor.strength = strength;
    }
    settings.compressor.validate()?;
    settings.save(settings_path)?;

    println!(
        "Saved {} (target {:.2}, strength {:.2})",
        settings_path.display(),
        settings.compressor.target,
        settings.compressor.strength
    );
    Ok(())
}

/// Overwrite stored settings with defaults.
pub fn config_reset(settings_path: &Path) -> Result<()> {
    Settings::default().save(settings_path)?;
    println!("Reset {}", settings_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;
    use tempfile::tempdir;

    fn options(target: Option<f32>, strength: Option<f32>) -> ProcessOptions {
        ProcessOptions {
            target,
            strength,
            block_frames: 512,
            bit_depth: 32,
        }
    }

    #[test]
    fn test_overrides_and_clamping() {
        let settings = Settings::default();

        let params = effective_params(&settings, &options(None, None));
        assert_eq!(params, CompressorParams::default());

        let params = effective_params(&settings, &options(Some(0.9), Some(7.0)));
        assert_eq!(params.target, 0.9);
        assert_eq!(params.strength, 1.0);
    }

    #[test]
    fn test_config_set_rejects_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        assert!(config_set(&path, Some(1.5), None).is_err());
        assert!(!path.exists());

        config_set(&path, Some(0.7), None).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.compressor.target, 0.7);
        assert_eq!(settings.compressor.strength, 0.5);

        config_reset(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_process_writes_compressed_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("quiet.wav");
        let output = dir.path().join("nested").join("loud.wav");

        let samples: Vec<f32> = (0..16000).map(|i| ((i as f32) * 0.3).sin() * 0.1).collect();
        let tone = AudioBuffer::from_interleaved(samples, 2, 8000).unwrap();
        export_audio(&tone, &input, ExportFormat::float()).unwrap();

        let settings_path = dir.path().join("settings.json");
        process(&settings_path, &input, &output, &options(Some(0.4), Some(1.0))).unwrap();

        let written = import_audio(&output).unwrap();
        assert_eq!(written.num_channels(), 2);
        assert_eq!(written.num_frames(), tone.num_frames());
        assert!(written.peak(0) > tone.peak(0));
        assert!(written.peak(0) <= 0.4 + 1e-3);
    }

    #[test]
    fn test_process_missing_input_fails() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.wav");

        let err = process(
            &dir.path().join("settings.json"),
            &dir.path().join("missing.wav"),
            &output,
            &options(None, None),
        )
        .unwrap_err();

        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert!(!output.exists());
    }

    #[test]
    fn test_analyze_reports_levels() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let tone = AudioBuffer::from_interleaved(vec![0.1; 4000], 1, 1000).unwrap();
        export_audio(&tone, &input, ExportFormat::float()).unwrap();

        let report = analyze(
            &dir.path().join("settings.json"),
            &input,
            &options(Some(0.5), Some(1.0)),
        )
        .unwrap();

        assert_eq!(report.input_peak, 0.1);
        assert!((report.output_peak - 0.5).abs() < 1e-3);
        assert!(!report.had_non_finite);
    }

    #[test]
    fn test_analyze_flags_non_finite_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("nan.wav");
        let mut samples = vec![0.2; 2000];
        samples[10] = f32::NAN;
        let audio = AudioBuffer::from_interleaved(samples, 1, 1000).unwrap();
        export_audio(&audio, &input, ExportFormat::float()).unwrap();

        let report = analyze(&dir.path().join("settings.json"), &input, &options(None, None)).unwrap();

        assert!(report.had_non_finite);
        assert!(report.output_peak.is_finite());
    }

    #[test]
    fn test_batch_skips_bad_files() {
        let dir = tempdir().unwrap();
        let input_dir = dir.path().join("in");
        let output_dir = dir.path().join("out");
        fs::create_dir_all(input_dir.join("sub")).unwrap();

        let tone = generate_test_tone(220.0, 0.5, 8000);
        export_audio(&tone, &input_dir.join("a.wav"), ExportFormat::float()).unwrap();
        export_audio(&tone, &input_dir.join("sub").join("b.WAV"), ExportFormat::float()).unwrap();
        fs::write(input_dir.join("broken.wav"), b"nope").unwrap();
        fs::write(input_dir.join("notes.txt"), b"ignored").unwrap();

        let settings_path = dir.path().join("settings.json");
        let summary = batch(&settings_path, &input_dir, &output_dir, &options(None, None)).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, vec![input_dir.join("broken.wav")]);
        assert!(output_dir.join("a.wav").exists());
        assert!(output_dir.join("sub").join("b.WAV").exists());
    }

    #[test]
    fn test_batch_stops_on_unwritable_output() {
        let dir = tempdir().unwrap();
        let input_dir = dir.path().join("in");
        fs::create_dir_all(&input_dir).unwrap();
        let tone = generate_test_tone(220.0, 0.5, 8000);
        export_audio(&tone, &input_dir.join("a.wav"), ExportFormat::float()).unwrap();

        // A plain file where the output directory should be
        let output_dir = dir.path().join("out");
        fs::write(&output_dir, b"in the way").unwrap();

        let err = batch(
            &dir.path().join("settings.json"),
            &input_dir,
            &output_dir,
            &options(None, None),
        )
        .unwrap_err();

        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(!err.is_recoverable());
    }
}
