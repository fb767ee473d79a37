//! Patch files for the corvid control-voltage engine.
//!
//! A patch is a TOML file describing engine-wide settings and the initial
//! configuration of each output channel: voltage and slew, an assigned
//! program, clock mode, scale quantization, sticky overrides and input
//! detectors. Patches are validated as a whole before anything touches an
//! engine.
//!
//! # Features
//!
//! - **Patch format**: load and save [`Patch`] TOML files
//! - **Validation**: collect every problem in a patch ([`validate_patch`])
//! - **Engine setup**: [`Patch::build_engine`] / [`Patch::apply`]
//!
//! # Example
//!
//! ```rust
//! use corvid_config::{ChannelPatch, Patch};
//! use corvid_core::Segment;
//!
//! let patch = Patch::new("Envelope")
//!     .with_bpm(100.0)
//!     .with_channel(
//!         ChannelPatch::new(1).with_program(&[Segment::new(5.0, 0.1), Segment::new(0.0, 1.0)], true),
//!     )
//!     .with_channel(ChannelPatch::new(2).with_clock(0.5));
//!
//! let toml = patch.to_toml().unwrap();
//! let engine = Patch::from_toml(&toml).unwrap().build_engine().unwrap();
//! assert_eq!(engine.bpm(), 100.0);
//! ```

mod error;
mod patch;

/// Patch validation.
pub mod validation;

pub use error::ConfigError;
pub use patch::{
    ChannelPatch, ClockPatch, Disabled, EngineSettings, InputPatch, InputWatch, Patch,
    ScalePatch, SegmentPatch,
};
pub use validation::{ValidationError, ValidationResult, validate_channel, validate_patch};
