use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use genre_classifier::analysis::extract_file;
use genre_classifier::audio::spawn_preview;
use genre_classifier::error::{log_analysis_error, log_inference_error, ClassifyError};
use genre_classifier::inference::{classify_file, InferenceContext};
use genre_classifier::report::{PredictionReport, FAILURE_LINE};
use genre_classifier::AppConfig;

/// Extensions accepted as input audio
const SUPPORTED_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "genre_cli",
    about = "Predict the musical genre of a WAV or MP3 clip"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/genre_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding scaler.json, label_encoder.json and model.json
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an audio file
    Predict {
        file: PathBuf,
        /// Play the first seconds of the file while predicting
        #[arg(long)]
        play: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the 57 named feature columns of an audio file as JSON
    Features { file: PathBuf },
    /// Print a summary of the loaded artifacts
    Describe,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    genre_classifier::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);
    if let Some(dir) = &cli.artifacts_dir {
        config.artifacts = genre_classifier::ArtifactConfig::in_dir(dir);
    }

    match cli.command {
        Commands::Predict { file, play, format } => run_predict(&config, &file, play, format),
        Commands::Features { file } => run_features(&config, &file),
        Commands::Describe => run_describe(&config),
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn reject_unsupported(path: &Path) -> Option<ExitCode> {
    if is_supported(path) {
        return None;
    }
    eprintln!(
        "unsupported file: {} (expected one of: {})",
        path.display(),
        SUPPORTED_EXTENSIONS.join(", ")
    );
    Some(ExitCode::from(EXIT_USAGE))
}

fn run_predict(
    config: &AppConfig,
    file: &Path,
    play: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    if let Some(code) = reject_unsupported(file) {
        return Ok(code);
    }

    let preview = play.then(|| spawn_preview(file, config.playback.preview_secs));

    let (outcome, classes) = match InferenceContext::load(&config.artifacts) {
        Ok(context) => (
            classify_file(&context, file, &config.analysis),
            context.classes().to_vec(),
        ),
        Err(err) => (Err(ClassifyError::Inference(err)), Vec::new()),
    };

    match &outcome {
        Err(ClassifyError::Analysis(err)) => log_analysis_error(err, "predict"),
        Err(ClassifyError::Inference(err)) => log_inference_error(err, "predict"),
        Ok(_) => {}
    }

    let report = PredictionReport::from_outcome(file, &outcome, &classes);
    match format {
        OutputFormat::Text => println!("{}", report.console_line()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(handle) = preview {
        // Failures were already logged by the playback thread
        let _ = handle.wait();
    }

    Ok(ExitCode::from(if report.is_ok() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }))
}

fn run_features(config: &AppConfig, file: &Path) -> Result<ExitCode> {
    if let Some(code) = reject_unsupported(file) {
        return Ok(code);
    }

    match extract_file(file, &config.analysis) {
        Ok(features) => {
            let json = serde_json::to_string_pretty(&features)
                .with_context(|| format!("serializing features of {}", file.display()))?;
            println!("{json}");
            Ok(ExitCode::from(EXIT_OK))
        }
        Err(err) => {
            log_analysis_error(&err, "features");
            eprintln!("{FAILURE_LINE}");
            Ok(ExitCode::from(EXIT_FAILURE))
        }
    }
}

fn run_describe(config: &AppConfig) -> Result<ExitCode> {
    match InferenceContext::load(&config.artifacts) {
        Ok(context) => {
            println!("{}", serde_json::to_string_pretty(&context.summary())?);
            Ok(ExitCode::from(EXIT_OK))
        }
        Err(err) => {
            log_inference_error(&err, "describe");
            eprintln!("Could not load artifacts: {}", err);
            Ok(ExitCode::from(EXIT_FAILURE))
        }
    }
}
