//! Quantize voltages from the command line.

use anyhow::bail;
use clap::Args;
use corvid_core::{DEFAULT_TEMPERAMENT, DEFAULT_VOLTS_PER_OCTAVE, Scale};

/// Snap voltages to a scale.
#[derive(Args)]
pub struct QuantizeArgs {
    /// Voltages to quantize
    #[arg(value_name = "VOLTS", required = true, allow_negative_numbers = true)]
    volts: Vec<f32>,

    /// Scale degrees in steps from the root (e.g., "0,2,4,5,7,9,11")
    #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    notes: Vec<f32>,

    /// Steps per octave
    #[arg(short, long, default_value_t = DEFAULT_TEMPERAMENT)]
    temperament: f32,

    /// Volts per octave
    #[arg(long, default_value_t = DEFAULT_VOLTS_PER_OCTAVE)]
    vpo: f32,
}

/// Run the quantize command.
pub fn run(args: QuantizeArgs) -> anyhow::Result<()> {
    let all = args
        .volts
        .iter()
        .chain(&args.notes)
        .chain([&args.temperament, &args.vpo]);
    if let Some(bad) = all.copied().find(|v| !v.is_finite()) {
        bail!("all values must be finite, got {bad}");
    }

    let scale = Scale::new(&args.notes, args.temperament, args.vpo);
    println!(
        "Scale: {} note(s), {} steps/octave, {} V/octave",
        scale.notes().len(),
        scale.temperament(),
        scale.volts_per_octave()
    );
    for &v in &args.volts {
        let q = scale.quantize(v);
        println!("  {v:>8.4} V -> {q:>8.4} V  (step {})", step_of(&scale, q));
    }
    Ok(())
}

/// Step number of a quantized voltage, counted from 0 V.
fn step_of(scale: &Scale, volts: f32) -> i64 {
    (volts / scale.volts_per_octave() * scale.temperament()).round() as i64
}
