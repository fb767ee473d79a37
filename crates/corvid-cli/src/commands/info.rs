//! Display patch summaries and rendered WAV metadata.

use super::common::load_patch;
use crate::wav::{WavFormat, read_wav_info};
use clap::Args;
use corvid_core::ChannelId;
use std::path::{Path, PathBuf};

/// Display patch or WAV file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Patch file (TOML) or rendered WAV file
    pub file: PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let is_wav = args
        .file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        wav_info(&args.file)
    } else {
        patch_info(&args.file)
    }
}

fn patch_info(path: &Path) -> anyhow::Result<()> {
    let patch = load_patch(path)?;
    let engine = patch.build_engine()?;
    let settings = &patch.engine;

    println!("Patch:       {}", patch.display_name());
    if let Some(description) = &patch.description {
        println!("Description: {description}");
    }
    println!("Tempo:       {} BPM", settings.bpm);
    println!("Sample Rate: {} Hz", settings.sample_rate);
    println!(
        "Pulse:       {} V for {} ms",
        settings.pulse_level,
        settings.pulse_seconds * 1000.0
    );
    println!();

    for id in ChannelId::all() {
        let summary = patch
            .channel(id.number())
            .map_or_else(|| "idle".to_string(), |ch| ch.summary());
        println!(
            "  {}: {:<16} {}",
            id,
            engine.mode(id.number())?.as_str(),
            summary
        );
    }
    Ok(())
}

fn wav_info(path: &Path) -> anyhow::Result<()> {
    let info = read_wav_info(path)?;

    let format_str = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };

    println!("File:        {}", path.display());
    println!("Format:      {} {}-bit", format_str, info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    let file_size = std::fs::metadata(path)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
