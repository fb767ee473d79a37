//! The eight-channel engine.
//!
//! [`CvEngine`] owns every channel, the input detectors and the shared beat
//! clock. Its configuration methods validate their arguments completely before
//! touching any state, so a call that returns an error leaves the engine
//! exactly as it was. Processing methods never fail: host callback errors are
//! logged and summarized in a [`TickReport`].
//!
//! # Example
//!
//! ```rust
//! use corvid_core::{CvEngine, NullNotifier, Segment};
//!
//! let mut engine = CvEngine::default();
//! engine.set_program(1, &[Segment::new(5.0, 0.5)]).unwrap();
//! engine.trigger_program(1).unwrap();
//!
//! let mut frame = [0.0; 8];
//! for _ in 0..512 {
//!     engine.process_sample(1.0 / 1024.0, &mut frame, &mut NullNotifier);
//! }
//! assert!(frame[0] > 4.9);
//! ```

use alloc::vec::Vec;

use crate::channel::{Channel, ChannelId, ChannelMode, NUM_CHANNELS};
use crate::clock::{BeatClock, DEFAULT_BPM, DEFAULT_PULSE_LEVEL, DEFAULT_PULSE_SECONDS};
use crate::error::CvError;
use crate::input::{InputDetector, InputMode};
use crate::notify::{CallbackHandle, InputSink, Notifier, TickReport};
use crate::scale::Scale;
use crate::segment::Segment;
use crate::slew::DEFAULT_SLEW_SPAN;

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Ticks per second used by [`CvEngine::tick`].
    pub sample_rate: f32,
    /// Initial tempo.
    pub bpm: f32,
    /// Level of the built-in clock pulse, in volts.
    pub pulse_level: f32,
    /// Length of the built-in clock pulse, in seconds.
    pub pulse_seconds: f32,
    /// Voltage span crossed in one slew time.
    pub slew_span: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            bpm: DEFAULT_BPM,
            pulse_level: DEFAULT_PULSE_LEVEL,
            pulse_seconds: DEFAULT_PULSE_SECONDS,
            slew_span: DEFAULT_SLEW_SPAN,
        }
    }
}

impl EngineConfig {
    /// Seconds per tick at the configured rate.
    pub fn sample_time(&self) -> f32 {
        1.0 / self.sample_rate
    }

    /// Replace unusable settings with the defaults: non-finite values, a
    /// non-positive sample rate, pulse length or slew span. Tempo is
    /// clamped to at least 1 BPM.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let positive = |value: f32, default: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                default
            }
        };
        Self {
            sample_rate: positive(self.sample_rate, defaults.sample_rate),
            bpm: if self.bpm.is_finite() {
                self.bpm.max(1.0)
            } else {
                defaults.bpm
            },
            pulse_level: if self.pulse_level.is_finite() {
                self.pulse_level
            } else {
                defaults.pulse_level
            },
            pulse_seconds: positive(self.pulse_seconds, defaults.pulse_seconds),
            slew_span: positive(self.slew_span, defaults.slew_span),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct InputSlot {
    detector: InputDetector,
    callback: Option<CallbackHandle>,
}

/// Eight output channels, eight inputs and one beat clock.
#[derive(Debug, Clone)]
pub struct CvEngine {
    channels: [Channel; NUM_CHANNELS],
    inputs: [InputSlot; NUM_CHANNELS],
    clock: BeatClock,
    config: EngineConfig,
}

impl Default for CvEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn finite(channel: usize, param: &'static str, value: f32) -> Result<f32, CvError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CvError::not_finite(channel, param, value))
    }
}

/// Check every segment, then copy them out with negative durations zeroed.
fn validate_segments(channel: usize, segments: &[Segment]) -> Result<Vec<Segment>, CvError> {
    for (i, segment) in segments.iter().enumerate() {
        let reason = if !segment.target.is_finite() {
            "target must be a finite number"
        } else if !segment.duration.is_finite() {
            "duration must be a finite number"
        } else {
            continue;
        };
        return Err(CvError::MalformedSegment {
            channel,
            index: i + 1,
            reason: reason.into(),
        });
    }
    Ok(segments
        .iter()
        .map(|s| Segment {
            duration: s.duration.max(0.0),
            ..*s
        })
        .collect())
}

impl CvEngine {
    /// Engine with every channel idle at 0 V. Unusable settings fall back to
    /// the defaults (see [`EngineConfig::normalized`]).
    pub fn new(config: EngineConfig) -> Self {
        let config = config.normalized();
        let channels =
            core::array::from_fn(|i| Channel::new(ChannelId::from_index(i), config.slew_span));
        Self {
            channels,
            inputs: core::array::from_fn(|_| InputSlot::default()),
            clock: BeatClock::new(config.bpm),
            config,
        }
    }

    /// Settings the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of a channel.
    pub fn channel(&self, channel: usize) -> Result<&Channel, CvError> {
        let id = ChannelId::new(channel)?;
        Ok(&self.channels[id.index()])
    }

    /// All channels in order.
    pub fn channels(&self) -> &[Channel; NUM_CHANNELS] {
        &self.channels
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut Channel, CvError> {
        let id = ChannelId::new(channel)?;
        Ok(&mut self.channels[id.index()])
    }

    // --- configuration -----------------------------------------------------

    /// Set the slew target. Lands immediately when the slew time is zero.
    pub fn set_voltage(&mut self, channel: usize, volts: f32) -> Result<(), CvError> {
        let ch = self.channel_mut(channel)?;
        let volts = finite(channel, "volts", volts)?;
        ch.set_voltage(volts);
        Ok(())
    }

    /// Set the time to cross the full slew span. Negative becomes zero.
    pub fn set_slew_time(&mut self, channel: usize, seconds: f32) -> Result<(), CvError> {
        let ch = self.channel_mut(channel)?;
        let seconds = finite(channel, "slew", seconds)?;
        ch.set_slew(seconds);
        Ok(())
    }

    /// Store the shape tag for plain voltage changes. Any string is
    /// accepted; unrecognised tags render linearly but read back unchanged.
    pub fn set_shape(&mut self, channel: usize, tag: &str) -> Result<(), CvError> {
        self.channel_mut(channel)?.set_shape(tag);
        Ok(())
    }

    /// Replace the channel's program. It stays idle until triggered.
    pub fn set_program(&mut self, channel: usize, segments: &[Segment]) -> Result<(), CvError> {
        let ch = self.channel_mut(channel)?;
        let segments = validate_segments(channel, segments)?;
        ch.set_program(segments);
        Ok(())
    }

    /// Start the assigned program from the current voltage.
    ///
    /// Returns whether a program started. Without a program this does
    /// nothing; in clock mode it cancels the clock.
    pub fn trigger_program(&mut self, channel: usize) -> Result<bool, CvError> {
        Ok(self.channel_mut(channel)?.trigger_program())
    }

    /// Set (or clear) the completion callback. Returns the one it replaces.
    pub fn set_completion_callback(
        &mut self,
        channel: usize,
        handle: Option<CallbackHandle>,
    ) -> Result<Option<CallbackHandle>, CvError> {
        Ok(self.channel_mut(channel)?.set_completion(handle))
    }

    /// Enter clock mode: a pulse every `division` beats, starting with the
    /// next boundary. `pulse` replaces the built-in pulse.
    pub fn set_clock_mode(
        &mut self,
        channel: usize,
        division: f32,
        pulse: Option<&[Segment]>,
    ) -> Result<(), CvError> {
        let beat = self.clock.beat();
        let ch = self.channel_mut(channel)?;
        let division = finite(channel, "division", division)?;
        let pulse = pulse
            .map(|segments| validate_segments(channel, segments))
            .transpose()?;
        ch.set_clock(division, pulse, beat);
        Ok(())
    }

    /// Leave clock mode (or any other mode), holding the current voltage.
    pub fn clear_clock_mode(&mut self, channel: usize) -> Result<(), CvError> {
        self.channel_mut(channel)?.clear_clock();
        Ok(())
    }

    /// Change the division without leaving or entering clock mode.
    pub fn set_clock_division(&mut self, channel: usize, division: f32) -> Result<(), CvError> {
        let ch = self.channel_mut(channel)?;
        let division = finite(channel, "division", division)?;
        ch.set_clock_division(division);
        Ok(())
    }

    /// Quantize the channel's output to a scale. An empty note list removes
    /// quantization.
    pub fn set_scale(
        &mut self,
        channel: usize,
        notes: &[f32],
        temperament: f32,
        volts_per_octave: f32,
    ) -> Result<(), CvError> {
        let ch = self.channel_mut(channel)?;
        if let Some(i) = notes.iter().position(|n| !n.is_finite()) {
            return Err(CvError::InvalidParameter {
                channel,
                param: "scale",
                reason: alloc::format!("note #{} must be a finite number", i + 1),
            });
        }
        let temperament = finite(channel, "temperament", temperament)?;
        let volts_per_octave = finite(channel, "volts_per_octave", volts_per_octave)?;
        let scale = (!notes.is_empty()).then(|| Scale::new(notes, temperament, volts_per_octave));
        ch.set_scale(scale);
        Ok(())
    }

    /// Remove quantization.
    pub fn clear_scale(&mut self, channel: usize) -> Result<(), CvError> {
        self.channel_mut(channel)?.set_scale(None);
        Ok(())
    }

    /// Write (`Some`) or remove (`None`) a sticky override. Returns the value
    /// that was there before.
    pub fn set_override(
        &mut self,
        channel: usize,
        key: &str,
        value: Option<f32>,
    ) -> Result<Option<f32>, CvError> {
        let ch = self.channel_mut(channel)?;
        match value {
            Some(v) => {
                let v = finite(channel, "dynamic", v)?;
                let old = ch.dynamics().get(key);
                ch.dynamics_mut().set(key, v);
                Ok(old)
            }
            None => Ok(ch.dynamics_mut().remove(key)),
        }
    }

    /// Read a sticky override.
    pub fn get_override(&self, channel: usize, key: &str) -> Result<Option<f32>, CvError> {
        Ok(self.channel(channel)?.dynamics().get(key))
    }

    /// Watch an input. Returns the callback this replaces.
    pub fn set_input_mode(
        &mut self,
        channel: usize,
        mode: InputMode,
        callback: Option<CallbackHandle>,
    ) -> Result<Option<CallbackHandle>, CvError> {
        let id = ChannelId::new(channel)?;
        if !mode.is_finite() {
            return Err(CvError::InvalidMode {
                channel,
                reason: alloc::format!("{} mode needs finite settings", mode.as_str()),
            });
        }
        let slot = &mut self.inputs[id.index()];
        slot.detector.set_mode(mode);
        Ok(core::mem::replace(&mut slot.callback, callback))
    }

    /// Current input mode.
    pub fn input_mode(&self, channel: usize) -> Result<InputMode, CvError> {
        let id = ChannelId::new(channel)?;
        Ok(self.inputs[id.index()].detector.mode())
    }

    /// Last voltage seen on an input.
    pub fn input_voltage(&self, channel: usize) -> Result<f32, CvError> {
        let id = ChannelId::new(channel)?;
        Ok(self.inputs[id.index()].detector.voltage())
    }

    // --- queries -----------------------------------------------------------

    /// Internal voltage, before quantization.
    pub fn get_voltage(&self, channel: usize) -> Result<f32, CvError> {
        Ok(self.channel(channel)?.voltage())
    }

    /// Voltage written on the last tick.
    pub fn output_voltage(&self, channel: usize) -> Result<f32, CvError> {
        Ok(self.channel(channel)?.output())
    }

    /// Slew time in seconds.
    pub fn get_slew_time(&self, channel: usize) -> Result<f32, CvError> {
        Ok(self.channel(channel)?.slew_seconds())
    }

    /// Shape tag exactly as last set.
    pub fn get_shape(&self, channel: usize) -> Result<&str, CvError> {
        Ok(self.channel(channel)?.shape_tag())
    }

    /// Beats per clock pulse.
    pub fn get_clock_division(&self, channel: usize) -> Result<f32, CvError> {
        Ok(self.channel(channel)?.clock_division())
    }

    /// Current mode.
    pub fn mode(&self, channel: usize) -> Result<ChannelMode, CvError> {
        Ok(self.channel(channel)?.mode())
    }

    // --- transport ---------------------------------------------------------

    /// Set the tempo. Clamped to at least 1 BPM.
    pub fn set_bpm(&mut self, bpm: f32) -> Result<(), CvError> {
        if !bpm.is_finite() {
            return Err(CvError::not_finite(0, "bpm", bpm));
        }
        self.clock.set_bpm(bpm);
        Ok(())
    }

    /// Current tempo.
    pub fn bpm(&self) -> f32 {
        self.clock.bpm()
    }

    /// Beats since start or the last reset.
    pub fn beat(&self) -> f64 {
        self.clock.beat()
    }

    /// Return to beat zero. Clocked channels fire on the next boundary after
    /// zero.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
        for ch in &mut self.channels {
            ch.rearm_clock(0.0);
        }
    }

    // --- processing --------------------------------------------------------

    /// Advance every channel by `dt` seconds and write their outputs.
    pub fn process_sample(
        &mut self,
        dt: f32,
        out: &mut [f32; NUM_CHANNELS],
        notifier: &mut dyn Notifier,
    ) -> TickReport {
        self.clock.advance(dt);
        let beat = self.clock.beat();
        let mut report = TickReport::default();
        for (ch, slot) in self.channels.iter_mut().zip(out.iter_mut()) {
            report.merge(ch.process(dt, beat, &self.config, notifier));
            *slot = ch.output();
        }
        report
    }

    /// [`process_sample`](Self::process_sample) at the configured sample
    /// rate.
    pub fn tick(
        &mut self,
        out: &mut [f32; NUM_CHANNELS],
        notifier: &mut dyn Notifier,
    ) -> TickReport {
        let dt = self.config.sample_time();
        self.process_sample(dt, out, notifier)
    }

    /// Process one frame per element of `out`, each `dt` seconds long.
    pub fn process_block(
        &mut self,
        dt: f32,
        out: &mut [[f32; NUM_CHANNELS]],
        notifier: &mut dyn Notifier,
    ) -> TickReport {
        let mut report = TickReport::default();
        for frame in out {
            report.merge(self.process_sample(dt, frame, notifier));
        }
        report
    }

    /// Feed one tick of input voltages through the detectors.
    ///
    /// `completed` marks inputs that produced an event this tick.
    pub fn process_inputs(
        &mut self,
        dt: f32,
        voltages: &[f32; NUM_CHANNELS],
        sink: &mut dyn InputSink,
    ) -> TickReport {
        let mut report = TickReport::default();
        for (id, (slot, &v)) in ChannelId::all().zip(self.inputs.iter_mut().zip(voltages)) {
            let Some(event) = slot.detector.process(v, dt) else {
                continue;
            };
            report.completed |= id.bit();
            let Some(handle) = slot.callback else {
                continue;
            };
            match sink.input_event(id, handle, event) {
                Ok(()) => report.notified |= id.bit(),
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(channel = id.number(), error = %_err, "input callback failed");
                    report.failed |= id.bit();
                }
            }
        }
        report
    }

    /// Drop every callback handle the engine holds, returning them so the
    /// host can free whatever they refer to.
    pub fn release_all(&mut self) -> Vec<CallbackHandle> {
        let outputs = self.channels.iter_mut().filter_map(|ch| ch.set_completion(None));
        let mut handles: Vec<_> = outputs.collect();
        handles.extend(self.inputs.iter_mut().filter_map(|slot| slot.callback.take()));
        handles
    }
}
