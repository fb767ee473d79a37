//! Integration tests for corvid-cli.
//!
//! These run the `corvid` binary against patch files in a temp directory.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `corvid` binary built by cargo.
fn corvid_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_corvid"))
}

fn run(args: &[&str]) -> Output {
    corvid_bin()
        .args(args)
        .output()
        .expect("failed to run corvid")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const PATCH: &str = r#"
name = "Smoke"

[engine]
sample_rate = 1000
bpm = 120

[[channels]]
channel = 1
program = [{ to = 5.0, time = 0.0 }, { to = 0.0, time = 0.25 }]
trigger = true
done = 1

[[channels]]
channel = 2
clock = { division = 1.0 }

[[channels]]
channel = 3
input = { mode = "change", threshold = 1.0, direction = "rising" }
input_done = 7
"#;

fn write_patch(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// help and quantize
// ---------------------------------------------------------------------------

#[test]
fn help_lists_subcommands() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for cmd in ["render", "check", "quantize", "info"] {
        assert!(text.contains(cmd), "help should mention '{cmd}'");
    }
}

#[test]
fn quantize_snaps_to_scale() {
    let output = run(&["quantize", "0.3", "-0.1", "--notes", "0,4,7"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("0.3333"), "got: {text}");
    assert!(text.contains("(step 4)"), "got: {text}");
    assert!(text.contains("(step 0)"), "got: {text}");
}

#[test]
fn quantize_requires_notes() {
    let output = run(&["quantize", "1.0"]);
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_accepts_valid_patch() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(dir.path(), "ok.toml", PATCH);
    let output = run(&["check", &path]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(": ok"));
}

#[test]
fn check_lists_every_problem() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(
        dir.path(),
        "bad.toml",
        r#"
[[channels]]
channel = 9

[[channels]]
channel = 2
trigger = true
"#,
    );
    let output = run(&["check", &path]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("2 problem(s)"), "got: {text}");
    assert!(text.contains("channel 9 out of range (1-8)"), "got: {text}");
    assert!(text.contains("trigger set without a program"), "got: {text}");
}

// ---------------------------------------------------------------------------
// render and info
// ---------------------------------------------------------------------------

#[test]
fn render_writes_eight_channel_wav() {
    let dir = TempDir::new().unwrap();
    let patch = write_patch(dir.path(), "smoke.toml", PATCH);
    let wav = dir.path().join("smoke.wav");
    let wav_str = wav.to_string_lossy().into_owned();

    let output = run(&[
        "render",
        &patch,
        &wav_str,
        "--duration",
        "1.0",
        "--input",
        "3=2.5",
    ]);
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let text = stdout(&output);
    assert!(text.contains("1 completion(s)"), "got: {text}");
    assert!(text.contains("1 input event(s)"), "got: {text}");

    let mut reader = hound::WavReader::open(&wav).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 8);
    assert_eq!(spec.sample_rate, 1000);
    assert_eq!(reader.len(), 8 * 1000);
    let first: Vec<f32> = reader.samples::<f32>().take(8).map(Result::unwrap).collect();
    assert_eq!(first[0], 0.5);

    let info = run(&["info", &wav_str]);
    assert!(info.status.success());
    let text = stdout(&info);
    assert!(text.contains("Channels:    8"), "got: {text}");
    assert!(text.contains("1000 frames"), "got: {text}");
}

#[test]
fn render_rejects_invalid_patch() {
    let dir = TempDir::new().unwrap();
    let patch = write_patch(dir.path(), "bad.toml", "[[channels]]\nchannel = 0\n");
    let wav = dir.path().join("never.wav");
    let output = run(&["render", &patch, &wav.to_string_lossy()]);
    assert!(!output.status.success());
    assert!(!wav.exists());
}

#[test]
fn info_summarizes_patch() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(dir.path(), "smoke.toml", PATCH);
    let output = run(&["info", &path]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Patch:       Smoke"), "got: {text}");
    assert!(text.contains("clock-armed"), "got: {text}");
    assert!(text.contains("program-running"), "got: {text}");
    assert!(text.contains("input change"), "got: {text}");
}
