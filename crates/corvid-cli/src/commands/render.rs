//! Offline rendering of a patch to a WAV file.

use super::common::{load_patch, parse_channel_volts};
use crate::wav::FrameWriter;
use anyhow::bail;
use clap::Args;
use corvid_core::{
    CallbackHandle, ChannelId, InputEvent, InputSink, NUM_CHANNELS, Notifier, NotifyError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Patch file (TOML)
    #[arg(value_name = "PATCH")]
    patch: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Length to render, in seconds
    #[arg(short, long, default_value = "4.0")]
    duration: f64,

    /// Override the patch sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Override the patch tempo
    #[arg(long)]
    bpm: Option<f32>,

    /// Constant input voltage (e.g., "3=2.5"); repeat for more inputs
    #[arg(long = "input", value_parser = parse_channel_volts, number_of_values = 1)]
    inputs: Vec<(usize, f32)>,

    /// Volts written as full scale
    #[arg(long, default_value = "10.0")]
    full_scale: f32,

    /// Processing block size
    #[arg(long, default_value = "512")]
    block_size: usize,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

/// Counts callbacks and logs them with the render position.
struct RenderLog {
    sample_rate: f64,
    frame: u64,
    completions: [u32; NUM_CHANNELS],
    input_events: [u32; NUM_CHANNELS],
}

impl RenderLog {
    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: f64::from(sample_rate),
            frame: 0,
            completions: [0; NUM_CHANNELS],
            input_events: [0; NUM_CHANNELS],
        }
    }

    fn seconds(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }
}

impl Notifier for RenderLog {
    fn program_done(
        &mut self,
        channel: ChannelId,
        handle: CallbackHandle,
    ) -> Result<(), NotifyError> {
        self.completions[channel.index()] += 1;
        tracing::info!(
            channel = channel.number(),
            %handle,
            seconds = self.seconds(),
            "program finished"
        );
        Ok(())
    }
}

impl InputSink for RenderLog {
    fn input_event(
        &mut self,
        channel: ChannelId,
        handle: CallbackHandle,
        event: InputEvent,
    ) -> Result<(), NotifyError> {
        self.input_events[channel.index()] += 1;
        let seconds = self.seconds();
        match event {
            InputEvent::Stream(volts) => {
                tracing::debug!(channel = channel.number(), %handle, seconds, volts, "input sample");
            }
            InputEvent::Change(high) => {
                tracing::info!(channel = channel.number(), %handle, seconds, high, "input changed");
            }
        }
        Ok(())
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !(args.duration.is_finite() && args.duration > 0.0) {
        bail!("duration must be a positive number of seconds");
    }
    if args.block_size == 0 {
        bail!("block size must be at least 1");
    }

    println!("Loading {}...", args.patch.display());
    let mut patch = load_patch(&args.patch)?;
    if let Some(sample_rate) = args.sample_rate {
        patch.engine.sample_rate = sample_rate;
    }
    if let Some(bpm) = args.bpm {
        patch.engine.bpm = bpm;
    }
    let mut engine = patch.build_engine()?;
    let sample_rate = patch.engine.sample_rate;
    let dt = engine.config().sample_time();

    let mut inputs = [0.0; NUM_CHANNELS];
    for &(channel, volts) in &args.inputs {
        inputs[ChannelId::new(channel)?.index()] = volts;
    }

    let total_frames = (args.duration * f64::from(sample_rate)).round() as u64;
    if total_frames == 0 {
        bail!("duration is shorter than one sample");
    }
    println!(
        "Rendering '{}': {:.2}s at {} Hz, {} BPM",
        patch.display_name(),
        args.duration,
        sample_rate,
        engine.bpm()
    );

    let mut writer = FrameWriter::create(
        &args.output,
        sample_rate,
        args.bit_depth,
        args.full_scale,
    )?;

    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut log = RenderLog::new(sample_rate);
    let mut low = [f32::INFINITY; NUM_CHANNELS];
    let mut high = [f32::NEG_INFINITY; NUM_CHANNELS];
    let mut failed = 0u32;
    let mut block = vec![[0.0; NUM_CHANNELS]; args.block_size];

    let mut remaining = total_frames;
    while remaining > 0 {
        let len = remaining.min(args.block_size as u64) as usize;
        for frame in &mut block[..len] {
            let input_report = engine.process_inputs(dt, &inputs, &mut log);
            let report = engine.process_sample(dt, frame, &mut log);
            failed += (input_report.failed | report.failed).count_ones();
            log.frame += 1;

            for (i, &v) in frame.iter().enumerate() {
                low[i] = low[i].min(v);
                high[i] = high[i].max(v);
            }
        }
        writer.write_frames(&block[..len])?;
        remaining -= len as u64;
        pb.set_position(total_frames - remaining);
    }

    pb.finish_with_message("done");
    writer.finalize()?;

    let released = engine.release_all();
    tracing::debug!(handles = released.len(), "released callbacks");
    if failed > 0 {
        tracing::warn!(failed, "some callbacks reported errors");
    }

    println!("\nOutputs:");
    for id in ChannelId::all() {
        let i = id.index();
        println!(
            "  {}: {:<22} {:>8.3} .. {:>8.3} V  {} completion(s), {} input event(s)",
            id,
            engine.mode(id.number())?.as_str(),
            low[i],
            high[i],
            log.completions[i],
            log.input_events[i]
        );
    }

    println!("\nWrote {}", args.output.display());
    Ok(())
}
