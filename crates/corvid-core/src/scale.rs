//! Scale quantizer.
//!
//! A [`Scale`] is a lattice of pitches: every note offset, repeated in every
//! octave, converted to volts. [`Scale::quantize`] snaps a voltage onto the
//! nearest lattice point, preferring the lower pitch on an exact tie.
//!
//! # Example
//!
//! ```rust
//! use corvid_core::Scale;
//!
//! let major = Scale::new(&[0.0, 2.0, 4.0, 5.0, 7.0, 9.0, 11.0], 12.0, 1.0);
//! // 0.2 V sits between D (1/6 V) and E (1/3 V); D is closer.
//! assert!((major.quantize(0.2) - 2.0 / 12.0).abs() < 1e-6);
//! ```

use alloc::vec::Vec;
use libm::{fabsf, floorf, fmodf};

/// Default divisions of the octave.
pub const DEFAULT_TEMPERAMENT: f32 = 12.0;

/// Default volts per octave.
pub const DEFAULT_VOLTS_PER_OCTAVE: f32 = 1.0;

/// Note offsets + temperament + volts/octave.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    /// Offsets as given, in scale steps from the root.
    notes: Vec<f32>,
    /// Offsets folded into `0..temperament`; the lattice is the same.
    folded: Vec<f32>,
    temperament: f32,
    volts_per_octave: f32,
}

impl Scale {
    /// Build a scale. Non-positive temperament or volts/octave fall back to
    /// the defaults. Offsets need not be sorted or unique.
    pub fn new(notes: &[f32], temperament: f32, volts_per_octave: f32) -> Self {
        let temperament = if temperament > 0.0 {
            temperament
        } else {
            DEFAULT_TEMPERAMENT
        };
        let volts_per_octave = if volts_per_octave > 0.0 {
            volts_per_octave
        } else {
            DEFAULT_VOLTS_PER_OCTAVE
        };
        let folded = notes
            .iter()
            .map(|&n| {
                let r = fmodf(n, temperament);
                if r < 0.0 { r + temperament } else { r }
            })
            .collect();
        Self {
            notes: notes.to_vec(),
            folded,
            temperament,
            volts_per_octave,
        }
    }

    /// Twelve-tone scale at 1 V/oct.
    pub fn chromatic_octave(notes: &[f32]) -> Self {
        Self::new(notes, DEFAULT_TEMPERAMENT, DEFAULT_VOLTS_PER_OCTAVE)
    }

    /// Offsets as configured.
    pub fn notes(&self) -> &[f32] {
        &self.notes
    }

    /// Steps per octave.
    pub fn temperament(&self) -> f32 {
        self.temperament
    }

    /// Volts per octave.
    pub fn volts_per_octave(&self) -> f32 {
        self.volts_per_octave
    }

    /// Whether quantization is a pass-through.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Nearest lattice voltage to `volts`; ties go to the lower pitch.
    pub fn quantize(&self, volts: f32) -> f32 {
        if self.folded.is_empty() {
            return volts;
        }
        let t = self.temperament;
        let steps = volts / self.volts_per_octave * t;
        let octave = floorf(steps / t);

        let mut best = steps;
        let mut best_dist = f32::INFINITY;
        // Folded offsets live in [0, t), so the winner is within one octave.
        for oct in [octave - 1.0, octave, octave + 1.0] {
            for &offset in &self.folded {
                let candidate = oct * t + offset;
                let dist = fabsf(candidate - steps);
                if dist < best_dist || (dist == best_dist && candidate < best) {
                    best = candidate;
                    best_dist = dist;
                }
            }
        }
        best / t * self.volts_per_octave
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAJOR: [f32; 7] = [0.0, 2.0, 4.0, 5.0, 7.0, 9.0, 11.0];

    #[test]
    fn point_two_volts_snaps_to_d() {
        let scale = Scale::chromatic_octave(&MAJOR);
        let q = scale.quantize(0.2);
        assert!((q - 0.16667).abs() < 1e-4, "got {q}");
    }

    #[test]
    fn empty_scale_passes_through() {
        let scale = Scale::chromatic_octave(&[]);
        assert!(scale.is_empty());
        assert_eq!(scale.quantize(0.123), 0.123);
    }

    #[test]
    fn tie_prefers_lower_pitch() {
        // Four steps per octave; 0.25 V sits exactly between steps 0 and 2.
        let scale = Scale::new(&[0.0, 2.0], 4.0, 1.0);
        let q = scale.quantize(0.25);
        assert!(q.abs() < 1e-6, "got {q}");
    }

    #[test]
    fn wraps_across_octaves() {
        let scale = Scale::chromatic_octave(&MAJOR);
        // Just below 1 V: B (11/12) vs C' (1.0); 0.99 is closer to C'.
        assert!((scale.quantize(0.99) - 1.0).abs() < 1e-5);
        // Negative voltages use the octave below.
        assert!((scale.quantize(-0.03) - 0.0).abs() < 1e-5);
        assert!((scale.quantize(-0.05) - (-1.0 / 12.0)).abs() < 1e-5);
        assert!((scale.quantize(-0.12) - (-1.0 / 12.0)).abs() < 1e-5);
    }

    #[test]
    fn unsorted_and_out_of_range_offsets_form_same_lattice() {
        let a = Scale::chromatic_octave(&[7.0, 0.0, 4.0]);
        let b = Scale::chromatic_octave(&[-5.0, 12.0, 16.0, 4.0]);
        for v in [-1.3_f32, -0.2, 0.0, 0.31, 0.77, 2.5] {
            assert!((a.quantize(v) - b.quantize(v)).abs() < 1e-5, "v={v}");
        }
    }

    #[test]
    fn custom_temperament_and_volts_per_octave() {
        // Five-tone equal temperament at 1.2 V/oct, every step present.
        let scale = Scale::new(&[0.0, 1.0, 2.0, 3.0, 4.0], 5.0, 1.2);
        let step = 1.2 / 5.0;
        assert!((scale.quantize(step * 2.4) - step * 2.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_settings_fall_back_to_defaults() {
        let scale = Scale::new(&MAJOR, 0.0, -1.0);
        assert_eq!(scale.temperament(), DEFAULT_TEMPERAMENT);
        assert_eq!(scale.volts_per_octave(), DEFAULT_VOLTS_PER_OCTAVE);
    }
}
