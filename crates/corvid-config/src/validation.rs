//! Patch validation.
//!
//! Checks a [`Patch`] before any of it reaches an engine. Every problem is
//! collected rather than stopping at the first, so `corvid check` can report
//! them all at once.
//!
//! # Example
//!
//! ```rust
//! use corvid_config::{ChannelPatch, Patch, ValidationError, validate_patch};
//!
//! let patch = Patch::new("bad")
//!     .with_channel(ChannelPatch::new(9))
//!     .with_channel(ChannelPatch::new(1).with_volts(f32::NAN));
//!
//! match validate_patch(&patch) {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("expected two errors, got {other:?}"),
//! }
//! ```

use std::collections::BTreeSet;

use corvid_core::{Direction, NUM_CHANNELS};
use thiserror::Error;

use crate::patch::{
    ChannelPatch, ClockPatch, InputPatch, InputWatch, Patch, ScalePatch, SegmentPatch,
};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Channel number outside 1-8.
    #[error("channel {0} out of range (1-8)")]
    ChannelOutOfRange(usize),

    /// The same channel listed twice.
    #[error("channel {0} configured more than once")]
    DuplicateChannel(usize),

    /// A number that must be finite is not.
    #[error("channel {channel}: {field} must be a finite number")]
    NotFinite {
        /// Channel number.
        channel: usize,
        /// Field path within the channel entry.
        field: String,
    },

    /// Unknown input direction tag.
    #[error("channel {channel}: unknown input direction '{direction}'")]
    UnknownDirection {
        /// Channel number.
        channel: usize,
        /// The tag as written.
        direction: String,
    },

    /// Settings that cannot coexist on one channel.
    #[error("channel {channel}: {reason}")]
    Conflict {
        /// Channel number.
        channel: usize,
        /// What clashes.
        reason: String,
    },

    /// Bad `[engine]` setting.
    #[error("engine {field}: {reason}")]
    Engine {
        /// Setting name.
        field: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a whole patch. One error is returned as-is; several come back as
/// [`ValidationError::Multiple`].
pub fn validate_patch(patch: &Patch) -> ValidationResult<()> {
    let mut errors = Vec::new();
    validate_engine(patch, &mut errors);

    let mut seen = BTreeSet::new();
    for channel in &patch.channels {
        if !seen.insert(channel.channel) {
            errors.push(ValidationError::DuplicateChannel(channel.channel));
        }
        validate_channel(channel, &mut errors);
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

fn validate_engine(patch: &Patch, errors: &mut Vec<ValidationError>) {
    let engine = &patch.engine;
    if engine.sample_rate == 0 {
        errors.push(ValidationError::Engine {
            field: "sample_rate",
            reason: "must be positive".to_string(),
        });
    }
    for (field, value) in [
        ("bpm", engine.bpm),
        ("pulse_level", engine.pulse_level),
        ("pulse_seconds", engine.pulse_seconds),
        ("slew_span", engine.slew_span),
    ] {
        if !value.is_finite() {
            errors.push(ValidationError::Engine {
                field,
                reason: format!("{value} is not a finite number"),
            });
        }
    }
    for (field, value) in [
        ("pulse_seconds", engine.pulse_seconds),
        ("slew_span", engine.slew_span),
    ] {
        if value.is_finite() && value <= 0.0 {
            errors.push(ValidationError::Engine {
                field,
                reason: "must be positive".to_string(),
            });
        }
    }
}

/// Validate one channel entry, appending to `errors`.
pub fn validate_channel(patch: &ChannelPatch, errors: &mut Vec<ValidationError>) {
    let channel = patch.channel;
    if !(1..=NUM_CHANNELS).contains(&channel) {
        errors.push(ValidationError::ChannelOutOfRange(channel));
    }

    let mut finite = |field: String, value: f32| {
        if !value.is_finite() {
            errors.push(ValidationError::NotFinite { channel, field });
        }
    };

    if let Some(v) = patch.volts {
        finite("volts".into(), v);
    }
    if let Some(s) = patch.slew {
        finite("slew".into(), s);
    }
    check_segments("program", &patch.program, &mut finite);
    for (key, &value) in &patch.dynamics {
        finite(format!("dynamics.{key}"), value);
    }

    match &patch.clock {
        Some(ClockPatch::Divide { division, pulse }) => {
            finite("clock.division".into(), *division);
            if let Some(pulse) = pulse {
                check_segments("clock.pulse", pulse, &mut finite);
            }
        }
        Some(ClockPatch::Disabled(_)) | None => {}
    }

    if let Some(ScalePatch::Notes {
        notes,
        temperament,
        volts_per_octave,
    }) = &patch.scale
    {
        for (i, &n) in notes.iter().enumerate() {
            finite(format!("scale.notes[{i}]"), n);
        }
        finite("scale.temperament".into(), *temperament);
        finite("scale.volts_per_octave".into(), *volts_per_octave);
    }

    if let Some(InputPatch::Watch(watch)) = &patch.input {
        match watch {
            InputWatch::Stream { interval } => finite("input.interval".into(), *interval),
            InputWatch::Change {
                threshold,
                hysteresis,
                direction,
            } => {
                finite("input.threshold".into(), *threshold);
                finite("input.hysteresis".into(), *hysteresis);
                if Direction::from_tag(direction).is_none() {
                    errors.push(ValidationError::UnknownDirection {
                        channel,
                        direction: direction.clone(),
                    });
                }
            }
        }
    }

    let clocked = matches!(patch.clock, Some(ClockPatch::Divide { .. }));
    if clocked && !patch.program.is_empty() {
        errors.push(ValidationError::Conflict {
            channel,
            reason: "program and clock are mutually exclusive".to_string(),
        });
    }
    if patch.trigger && patch.program.is_empty() {
        errors.push(ValidationError::Conflict {
            channel,
            reason: "trigger set without a program".to_string(),
        });
    }
}

fn check_segments(field: &str, segments: &[SegmentPatch], finite: &mut impl FnMut(String, f32)) {
    for (i, s) in segments.iter().enumerate() {
        finite(format!("{field}[{i}].to"), s.to);
        finite(format!("{field}[{i}].time"), s.time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_is_valid() {
        assert_eq!(validate_patch(&Patch::default()), Ok(()));
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let patch = Patch::new("x").with_channel(ChannelPatch::new(0));
        assert_eq!(
            validate_patch(&patch),
            Err(ValidationError::ChannelOutOfRange(0))
        );
    }

    #[test]
    fn duplicate_channels_are_reported() {
        let patch = Patch::new("x")
            .with_channel(ChannelPatch::new(2))
            .with_channel(ChannelPatch::new(2));
        assert_eq!(
            validate_patch(&patch),
            Err(ValidationError::DuplicateChannel(2))
        );
    }

    #[test]
    fn non_finite_segment_fields_are_named() {
        let mut ch = ChannelPatch::new(1);
        ch.program = vec![SegmentPatch::new(1.0, 0.1), SegmentPatch::new(f32::NAN, 0.1)];
        let patch = Patch::new("x").with_channel(ch);
        let err = validate_patch(&patch).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotFinite {
                channel: 1,
                field: "program[1].to".to_string()
            }
        );
        assert_eq!(err.to_string(), "channel 1: program[1].to must be a finite number");
    }

    #[test]
    fn program_and_clock_conflict() {
        let ch = ChannelPatch::new(3)
            .with_program(&[corvid_core::Segment::new(1.0, 1.0)], false)
            .with_clock(1.0);
        let patch = Patch::new("x").with_channel(ch);
        assert!(matches!(
            validate_patch(&patch),
            Err(ValidationError::Conflict { channel: 3, .. })
        ));
    }

    #[test]
    fn trigger_without_program_is_rejected() {
        let mut ch = ChannelPatch::new(1);
        ch.trigger = true;
        let patch = Patch::new("x").with_channel(ch);
        assert!(validate_patch(&patch).is_err());
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let mut ch = ChannelPatch::new(4);
        ch.input = Some(InputPatch::Watch(InputWatch::Change {
            threshold: 1.0,
            hysteresis: 0.1,
            direction: "up".to_string(),
        }));
        let patch = Patch::new("x").with_channel(ch);
        assert!(matches!(
            validate_patch(&patch),
            Err(ValidationError::UnknownDirection { channel: 4, .. })
        ));
    }

    #[test]
    fn engine_settings_are_checked() {
        let mut patch = Patch::new("x");
        patch.engine.sample_rate = 0;
        patch.engine.slew_span = -1.0;
        match validate_patch(&patch) {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected two errors, got {other:?}"),
        }
    }

    #[test]
    fn zero_pulse_length_is_rejected() {
        let mut patch = Patch::new("x");
        patch.engine.pulse_seconds = 0.0;
        let err = validate_patch(&patch).unwrap_err();
        assert_eq!(err.to_string(), "engine pulse_seconds: must be positive");
    }

    #[test]
    fn multiple_display_joins_messages() {
        let err = ValidationError::Multiple(vec![
            ValidationError::ChannelOutOfRange(9),
            ValidationError::DuplicateChannel(1),
        ]);
        assert_eq!(
            err.to_string(),
            "multiple validation errors: channel 9 out of range (1-8); channel 1 configured more than once"
        );
    }
}
