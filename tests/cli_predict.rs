use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 22_050;

fn cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_genre_cli"));
    command.env("RUST_LOG", "warn");
    command
}

/// Artifacts that always predict "rock"
fn write_artifacts(dir: &Path) {
    let weights = vec![vec![0.0f32; 57]; 2];
    let files = [
        (
            "scaler.json",
            json!({ "mean": vec![0.0f32; 57], "scale": vec![1.0f32; 57] }),
        ),
        ("label_encoder.json", json!({ "classes": ["jazz", "rock"] })),
        (
            "model.json",
            json!({
                "layers": [
                    { "weights": weights, "bias": [0.0, 2.0], "activation": "softmax" }
                ]
            }),
        ),
    ];
    for (name, value) in files {
        std::fs::write(dir.join(name), value.to_string()).expect("write artifact");
    }
}

fn write_tone(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    let len = (seconds * SAMPLE_RATE as f32) as usize;
    for i in 0..len {
        let t = i as f32 / SAMPLE_RATE as f32;
        let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 12_000.0;
        writer.write_sample(sample as i16).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        write_artifacts(dir.path());
        write_tone(&dir.path().join("tone.wav"), 2.0);
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        cli()
            .arg("--artifacts-dir")
            .arg(self.dir.path())
            .args(args)
            .output()
            .expect("run genre_cli")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout utf8")
}

#[test]
fn predict_prints_genre() {
    let ws = Workspace::new();
    let tone = ws.path("tone.wav");
    let output = ws.run(&["predict", tone.to_str().unwrap()]);

    assert!(
        output.status.success(),
        "predict exited with {:?}",
        output.status.code()
    );
    assert_eq!(stdout(&output).trim(), "Predicted Genre: rock");
}

#[test]
fn predict_with_preview_still_reports_genre() {
    let ws = Workspace::new();
    let config = ws.path("config.json");
    std::fs::write(&config, r#"{ "playback": { "preview_secs": 0.5 } }"#).unwrap();
    let tone = ws.path("tone.wav");

    let output = ws.run(&[
        "--config",
        config.to_str().unwrap(),
        "predict",
        tone.to_str().unwrap(),
        "--play",
    ]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).trim(), "Predicted Genre: rock");
}

#[test]
fn predict_json_report() {
    let ws = Workspace::new();
    let tone = ws.path("tone.wav");
    let output = ws.run(&["predict", tone.to_str().unwrap(), "--format", "json"]);

    assert!(output.status.success());
    let report: Value = serde_json::from_str(&stdout(&output)).expect("valid JSON report");
    assert_eq!(report["status"], "ok");
    assert_eq!(report["genre"], "rock");
    assert_eq!(report["scores"][0]["genre"], "rock");
    assert_eq!(report["scores"].as_array().map(Vec::len), Some(2));
}

#[test]
fn unsupported_extension_is_rejected() {
    let ws = Workspace::new();
    let flac = ws.path("song.flac");
    std::fs::write(&flac, b"fLaC").unwrap();
    let output = ws.run(&["predict", flac.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported file"), "stderr: {stderr}");
    assert!(stdout(&output).is_empty());
}

#[test]
fn undecodable_file_prints_generic_failure() {
    let ws = Workspace::new();
    let broken = ws.path("broken.wav");
    std::fs::write(&broken, b"RIFF....not really a wav").unwrap();
    let output = ws.run(&["predict", broken.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), "Error during prediction");
}

#[test]
fn missing_artifacts_fail_prediction() {
    let dir = TempDir::new().unwrap();
    let tone = dir.path().join("tone.wav");
    write_tone(&tone, 1.0);

    let output = cli()
        .arg("--artifacts-dir")
        .arg(dir.path().join("nowhere"))
        .args(["predict", tone.to_str().unwrap(), "--format", "json"])
        .output()
        .expect("run genre_cli");

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_str(&stdout(&output)).expect("valid JSON report");
    assert_eq!(report["status"], "error");
    assert_eq!(report["error"]["code"], 4001);
}

#[test]
fn features_prints_named_columns() {
    let ws = Workspace::new();
    let tone = ws.path("tone.wav");
    let output = ws.run(&["features", tone.to_str().unwrap()]);

    assert!(output.status.success());
    let features: Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    let columns = features.as_object().expect("object of columns");
    assert_eq!(columns.len(), 57);
    assert!(columns.contains_key("tempo"));
    assert!(columns.contains_key("mfcc20_var"));
    let zcr = features["zero_crossing_rate_mean"].as_f64().unwrap();
    assert!((zcr - 2.0 * 440.0 / 22_050.0).abs() < 0.003, "zcr {zcr}");
}

#[test]
fn describe_lists_classes() {
    let ws = Workspace::new();
    let output = ws.run(&["describe"]);

    assert!(output.status.success());
    let summary: Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(summary["n_features"], 57);
    assert_eq!(summary["classes"], json!(["jazz", "rock"]));
    assert_eq!(summary["layers"][0]["activation"], "softmax");
}
