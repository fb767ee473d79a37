//! One output channel and its mode state machine.
//!
//! A channel's voltage is owned by exactly one [`Source`] at a time:
//!
//! - `Slew`: the plain target + ramp set by voltage/slew/shape commands.
//! - `Program`: an assigned segment program, idle until triggered.
//! - `Clock`: a clock divider that spawns either a custom pulse program or the
//!   built-in fixed-level pulse on every division boundary.
//!
//! Installing any mode tears down whatever was there before; the last command
//! wins. When a program or pulse runs out, the channel holds its final voltage
//! under slew control with no ramp.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::clock::ClockDivider;
use crate::dynamics::Dynamics;
use crate::engine::EngineConfig;
use crate::error::CvError;
use crate::notify::{CallbackHandle, Notifier, TickReport};
use crate::program::Program;
use crate::scale::Scale;
use crate::segment::{Segment, Shape};
use crate::slew::SlewRamp;

/// Number of output (and input) channels.
pub const NUM_CHANNELS: usize = 8;

/// 1-based channel number, validated to `1..=8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Validate a script-side channel number.
    pub fn new(number: usize) -> Result<Self, CvError> {
        if (1..=NUM_CHANNELS).contains(&number) {
            Ok(Self(number as u8))
        } else {
            Err(CvError::InvalidChannel(number))
        }
    }

    /// Channel for a 0-based array index. Panics past the last channel.
    pub(crate) fn from_index(index: usize) -> Self {
        assert!(index < NUM_CHANNELS, "channel index {index} out of range");
        Self(index as u8 + 1)
    }

    /// 1-based number.
    pub fn number(self) -> usize {
        self.0 as usize
    }

    /// 0-based array index.
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Bit for this channel in a [`TickReport`] mask.
    pub fn bit(self) -> u8 {
        1 << (self.0 - 1)
    }

    /// Every channel in processing order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..NUM_CHANNELS).map(Self::from_index)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable state of a channel's mode machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// Plain target + slew.
    Slew,
    /// A program is assigned but not running.
    ProgramIdle,
    /// An assigned program is running.
    ProgramRunning,
    /// Clocked, between pulses.
    ClockArmed,
    /// Clocked, custom pulse program running.
    CustomPulseRunning,
    /// Clocked, holding the built-in pulse level.
    DefaultPulseHolding,
}

impl ChannelMode {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Slew => "slew",
            ChannelMode::ProgramIdle => "program-idle",
            ChannelMode::ProgramRunning => "program-running",
            ChannelMode::ClockArmed => "clock-armed",
            ChannelMode::CustomPulseRunning => "custom-pulse",
            ChannelMode::DefaultPulseHolding => "default-pulse",
        }
    }

    /// Whether the channel is in clock mode.
    pub fn is_clocked(&self) -> bool {
        matches!(
            self,
            ChannelMode::ClockArmed
                | ChannelMode::CustomPulseRunning
                | ChannelMode::DefaultPulseHolding
        )
    }
}

/// Clocked-mode state.
#[derive(Debug, Clone)]
struct ClockMode {
    /// Restarted from the channel's voltage on every pulse.
    pulse_program: Option<Program>,
    /// Seconds left on the built-in pulse; zero when not holding.
    hold_remaining: f32,
}

/// Whatever currently owns the channel voltage.
#[derive(Debug, Clone)]
enum Source {
    Slew,
    Program(Program),
    Clock(ClockMode),
}

/// State of one output channel.
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    /// Internal voltage, unquantized
    current: f32,
    /// Last written voltage, quantized when a scale is set
    output: f32,
    slew: SlewRamp,
    shape: Shape,
    /// Tag exactly as set, even when it folds to [`Shape::Unknown`]
    shape_tag: String,
    divider: ClockDivider,
    source: Source,
    scale: Option<Scale>,
    dynamics: Dynamics,
    done: Option<CallbackHandle>,
}

impl Channel {
    /// Idle channel at 0 V.
    pub fn new(id: ChannelId, slew_span: f32) -> Self {
        Self {
            id,
            current: 0.0,
            output: 0.0,
            slew: SlewRamp::with_span(slew_span),
            shape: Shape::Linear,
            shape_tag: Shape::Linear.as_str().to_string(),
            divider: ClockDivider::default(),
            source: Source::Slew,
            scale: None,
            dynamics: Dynamics::new(),
            done: None,
        }
    }

    /// Channel number.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Internal voltage (before quantization).
    pub fn voltage(&self) -> f32 {
        self.current
    }

    /// Voltage written on the last tick.
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Slew target.
    pub fn target(&self) -> f32 {
        self.slew.target()
    }

    /// Slew time in seconds.
    pub fn slew_seconds(&self) -> f32 {
        self.slew.seconds()
    }

    /// Shape tag for plain voltage changes.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Shape tag as it was set.
    pub fn shape_tag(&self) -> &str {
        &self.shape_tag
    }

    /// Beats per clock pulse.
    pub fn clock_division(&self) -> f32 {
        self.divider.division()
    }

    /// Active scale, if any.
    pub fn scale(&self) -> Option<&Scale> {
        self.scale.as_ref()
    }

    /// Sticky override store.
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// Completion callback token.
    pub fn completion(&self) -> Option<CallbackHandle> {
        self.done
    }

    /// Assigned program, if the channel is in program mode.
    pub fn program(&self) -> Option<&Program> {
        match &self.source {
            Source::Program(p) => Some(p),
            _ => None,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> ChannelMode {
        match &self.source {
            Source::Slew => ChannelMode::Slew,
            Source::Program(p) if p.is_running() => ChannelMode::ProgramRunning,
            Source::Program(_) => ChannelMode::ProgramIdle,
            Source::Clock(c) if c.pulse_program.as_ref().is_some_and(Program::is_running) => {
                ChannelMode::CustomPulseRunning
            }
            Source::Clock(c) if c.hold_remaining > 0.0 => ChannelMode::DefaultPulseHolding,
            Source::Clock(_) => ChannelMode::ClockArmed,
        }
    }

    pub(crate) fn dynamics_mut(&mut self) -> &mut Dynamics {
        &mut self.dynamics
    }

    /// Drop the current mode, leaving the channel holding where it is.
    fn teardown(&mut self) {
        if !matches!(self.source, Source::Slew) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                channel = self.id.number(),
                from = self.mode().as_str(),
                "mode torn down"
            );
            self.slew.set_target(self.current);
        }
        self.source = Source::Slew;
    }

    pub(crate) fn set_voltage(&mut self, volts: f32) {
        self.teardown();
        self.slew.set_target(volts);
        if self.slew.is_instant() {
            self.current = volts;
        }
    }

    pub(crate) fn set_slew(&mut self, seconds: f32) {
        self.teardown();
        self.slew.set_seconds(seconds);
    }

    pub(crate) fn set_shape(&mut self, tag: &str) {
        self.teardown();
        self.shape = Shape::from_tag(tag);
        self.shape_tag = tag.to_string();
    }

    pub(crate) fn set_program(&mut self, segments: Vec<Segment>) {
        self.teardown();
        self.source = Source::Program(Program::new(segments));
    }

    /// Start the assigned program from the current voltage. Returns whether
    /// anything started.
    pub(crate) fn trigger_program(&mut self) -> bool {
        if matches!(self.source, Source::Clock(_)) {
            self.teardown();
            return false;
        }
        let Source::Program(program) = &mut self.source else {
            return false;
        };
        program.start(self.current, &self.dynamics);
        self.slew.set_target(self.current);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            channel = self.id.number(),
            from = self.current,
            segments = program.len(),
            "program triggered"
        );
        program.is_running()
    }

    pub(crate) fn set_clock(&mut self, division: f32, pulse: Option<Vec<Segment>>, beat: f64) {
        self.teardown();
        self.divider.set_division(division);
        self.divider.rearm(beat);
        self.source = Source::Clock(ClockMode {
            pulse_program: pulse.filter(|s| !s.is_empty()).map(Program::new),
            hold_remaining: 0.0,
        });
        self.current = 0.0;
        self.slew.hold(0.0);
    }

    pub(crate) fn clear_clock(&mut self) {
        self.teardown();
    }

    pub(crate) fn set_clock_division(&mut self, division: f32) {
        self.divider.set_division(division);
    }

    pub(crate) fn rearm_clock(&mut self, beat: f64) {
        self.divider.rearm(beat);
    }

    pub(crate) fn set_scale(&mut self, scale: Option<Scale>) {
        self.scale = scale;
    }

    pub(crate) fn set_completion(
        &mut self,
        handle: Option<CallbackHandle>,
    ) -> Option<CallbackHandle> {
        core::mem::replace(&mut self.done, handle)
    }

    /// Advance one tick: clock, then program, then slew.
    pub(crate) fn process(
        &mut self,
        dt: f32,
        beat: f64,
        config: &EngineConfig,
        notifier: &mut dyn Notifier,
    ) -> TickReport {
        if let Source::Clock(clock) = &mut self.source {
            if clock.hold_remaining > 0.0 {
                clock.hold_remaining -= dt;
                if clock.hold_remaining <= 0.0 {
                    clock.hold_remaining = 0.0;
                    self.current = 0.0;
                    self.slew.hold(0.0);
                }
            }

            if self.divider.poll(beat) {
                #[cfg(feature = "tracing")]
                tracing::debug!(channel = self.id.number(), beat, "clock pulse");
                match clock.pulse_program.as_mut() {
                    Some(program) => {
                        program.start(self.current, &self.dynamics);
                        clock.hold_remaining = 0.0;
                    }
                    None => {
                        self.current = config.pulse_level;
                        self.slew.hold(config.pulse_level);
                        clock.hold_remaining = config.pulse_seconds;
                    }
                }
            }
        }

        let program = match &mut self.source {
            Source::Program(p) => Some(p),
            Source::Clock(c) => c.pulse_program.as_mut(),
            Source::Slew => None,
        };

        let mut finished = false;
        match program {
            Some(program) if program.is_running() => {
                let step = program.process(dt, &self.dynamics);
                self.current = step.voltage;
                if !step.running {
                    self.slew.hold(step.voltage);
                    finished = true;
                }
            }
            _ => self.current = self.slew.advance(self.current, dt),
        }

        let mut report = TickReport::default();
        if finished {
            report.completed = self.id.bit();
            if let Some(handle) = self.done {
                match notifier.program_done(self.id, handle) {
                    Ok(()) => report.notified = self.id.bit(),
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            channel = self.id.number(),
                            error = %_err,
                            "completion callback failed"
                        );
                        report.failed = self.id.bit();
                    }
                }
            }
        }

        self.output = match &self.scale {
            Some(scale) => scale.quantize(self.current),
            None => self.current,
        };
        report
    }
}
