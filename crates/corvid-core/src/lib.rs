//! Corvid Core - sample-accurate control-voltage engine
//!
//! Eight output channels, each driven by one of three sources at a time:
//!
//! - a plain target voltage approached through a linear slew
//! - a segment program ([`Program`]) started on demand
//! - a clock divider that fires a pulse every N beats of the shared
//!   [`BeatClock`]
//!
//! The final voltage of each channel can be snapped to a musical [`Scale`]
//! before it is written.
//!
//! # Core Abstractions
//!
//! - [`CvEngine`] - the eight channels, their inputs, and the beat clock
//! - [`Segment`] / [`Shape`] - one `(target, duration)` leg of a program
//! - [`Dynamics`] - per-channel sticky overrides consulted on segment load
//! - [`Notifier`] / [`InputSink`] - host callback seams, keyed by opaque
//!   [`CallbackHandle`]s
//! - [`CvError`] - synchronous configuration errors
//!
//! # no_std Support
//!
//! The engine needs `alloc` (programs and override keys are heap-backed) but
//! not `std`. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! corvid-core = { version = "0.1", default-features = false }
//! ```
//!
//! Enable the `tracing` feature to get debug events for mode changes, clock
//! pulses and program completion, plus warnings for failed host callbacks.
//!
//! # Example
//!
//! ```rust
//! use corvid_core::{CvEngine, NullNotifier};
//!
//! let mut engine = CvEngine::default();
//! engine.set_clock_mode(1, 1.0, None).unwrap();
//!
//! // 1.1 s at 120 BPM crosses beats one and two: two pulses.
//! let mut frame = [0.0; 8];
//! let mut rising_edges = 0;
//! let mut last = 0.0;
//! for _ in 0..1100 {
//!     engine.process_sample(0.001, &mut frame, &mut NullNotifier);
//!     if frame[0] > 2.5 && last <= 2.5 {
//!         rising_edges += 1;
//!     }
//!     last = frame[0];
//! }
//! assert_eq!(rising_edges, 2);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: processing never allocates; programs are built when
//!   they are assigned
//! - **Atomic configuration**: a call that fails changes nothing
//! - **Host-agnostic**: callbacks are tokens, never closures stored inside
//!   the engine

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod channel;
pub mod clock;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod input;
pub mod notify;
pub mod program;
pub mod scale;
pub mod segment;
pub mod slew;

pub use channel::{Channel, ChannelId, ChannelMode, NUM_CHANNELS};
pub use clock::{BeatClock, ClockDivider, DEFAULT_BPM, DEFAULT_PULSE_LEVEL, DEFAULT_PULSE_SECONDS};
pub use dynamics::{DURATION_KEY, Dynamics, TARGET_KEY};
pub use engine::{CvEngine, EngineConfig};
pub use error::CvError;
pub use input::{Direction, InputDetector, InputEvent, InputMode};
pub use notify::{CallbackHandle, InputSink, Notifier, NotifyError, NullNotifier, TickReport};
pub use program::{INSTANT_EPSILON, Program, ProgramStep};
pub use scale::{DEFAULT_TEMPERAMENT, DEFAULT_VOLTS_PER_OCTAVE, Scale};
pub use segment::{Segment, Shape};
pub use slew::{DEFAULT_SLEW_SPAN, SlewRamp};
