//! Patch file format and operations.

use std::collections::BTreeMap;
use std::path::Path;

use corvid_core::input::{
    DEFAULT_CHANGE_HYSTERESIS, DEFAULT_CHANGE_THRESHOLD, DEFAULT_STREAM_INTERVAL,
};
use corvid_core::{
    CallbackHandle, CvError, CvEngine, DEFAULT_BPM, DEFAULT_PULSE_LEVEL, DEFAULT_PULSE_SECONDS,
    DEFAULT_SLEW_SPAN, DEFAULT_TEMPERAMENT, DEFAULT_VOLTS_PER_OCTAVE, Direction, EngineConfig,
    InputMode, Segment, Shape,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_patch;

/// A saved engine setup: engine settings plus the initial state of each
/// channel.
///
/// # TOML Format
///
/// ```toml
/// name = "Two envelopes and a clock"
///
/// [engine]
/// sample_rate = 48000
/// bpm = 96
///
/// [[channels]]
/// channel = 1
/// program = [{ to = 5.0, time = 0.01 }, { to = 0.0, time = 0.5, shape = "exp" }]
/// trigger = true
/// done = 1
///
/// [[channels]]
/// channel = 2
/// clock = { division = 0.5 }
///
/// [[channels]]
/// channel = 3
/// slew = 0.2
/// volts = 1.3
/// scale = { notes = [0, 2, 4, 5, 7, 9, 11] }
///
/// [[channels]]
/// channel = 4
/// input = { mode = "change", threshold = 1.0, direction = "rising" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Patch {
    /// Name of the patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Engine-wide settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Per-channel settings; channels not listed stay idle at 0 V.
    #[serde(default)]
    pub channels: Vec<ChannelPatch>,
}

/// The `[engine]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Ticks per second when rendering.
    pub sample_rate: u32,
    /// Tempo in beats per minute.
    pub bpm: f32,
    /// Built-in clock pulse level, in volts.
    pub pulse_level: f32,
    /// Built-in clock pulse length, in seconds.
    pub pulse_seconds: f32,
    /// Volts crossed in one slew time.
    pub slew_span: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            bpm: DEFAULT_BPM,
            pulse_level: DEFAULT_PULSE_LEVEL,
            pulse_seconds: DEFAULT_PULSE_SECONDS,
            slew_span: DEFAULT_SLEW_SPAN,
        }
    }
}

impl EngineSettings {
    /// Settings in the form the engine takes.
    pub fn to_config(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate as f32,
            bpm: self.bpm,
            pulse_level: self.pulse_level,
            pulse_seconds: self.pulse_seconds,
            slew_span: self.slew_span,
        }
    }
}

/// One `{ to, time, shape }` program leg.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentPatch {
    /// Target voltage.
    pub to: f32,
    /// Seconds to reach it.
    pub time: f32,
    /// Shape tag; unknown tags render as linear.
    #[serde(default = "default_shape", skip_serializing_if = "is_default_shape")]
    pub shape: String,
}

fn default_shape() -> String {
    Shape::Linear.as_str().to_string()
}

fn is_default_shape(shape: &str) -> bool {
    shape == Shape::Linear.as_str()
}

impl SegmentPatch {
    /// Linear leg.
    pub fn new(to: f32, time: f32) -> Self {
        Self {
            to,
            time,
            shape: default_shape(),
        }
    }

    /// Engine segment.
    pub fn to_segment(&self) -> Segment {
        Segment::new(self.to, self.time).with_shape(Shape::from_tag(&self.shape))
    }
}

impl From<&Segment> for SegmentPatch {
    fn from(segment: &Segment) -> Self {
        Self {
            to: segment.target,
            time: segment.duration,
            shape: segment.shape.as_str().to_string(),
        }
    }
}

/// The string `"none"`, used to switch a mode off explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disabled {
    /// `"none"`
    #[serde(rename = "none")]
    Off,
}

/// `clock = { division, pulse }` or `clock = "none"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ClockPatch {
    /// Leave clock mode.
    Disabled(Disabled),
    /// Pulse every `division` beats.
    Divide {
        /// Beats per pulse.
        division: f32,
        /// Custom pulse program; the built-in pulse when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pulse: Option<Vec<SegmentPatch>>,
    },
}

/// `scale = { notes, temperament, volts_per_octave }` or `scale = "none"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScalePatch {
    /// No quantization.
    Disabled(Disabled),
    /// Quantize to these offsets.
    Notes {
        /// Scale steps from the root.
        notes: Vec<f32>,
        /// Steps per octave.
        #[serde(default = "default_temperament")]
        temperament: f32,
        /// Volts per octave.
        #[serde(default = "default_volts_per_octave")]
        volts_per_octave: f32,
    },
}

fn default_temperament() -> f32 {
    DEFAULT_TEMPERAMENT
}

fn default_volts_per_octave() -> f32 {
    DEFAULT_VOLTS_PER_OCTAVE
}

/// `input = { mode = ... }` or `input = "none"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InputPatch {
    /// Stop watching.
    Disabled(Disabled),
    /// Watch in a mode.
    Watch(InputWatch),
}

/// Input modes, tagged by `mode`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum InputWatch {
    /// Periodic voltage reports.
    Stream {
        /// Seconds between reports.
        #[serde(default = "default_interval")]
        interval: f32,
    },
    /// Threshold crossings.
    Change {
        /// Rising edge level.
        #[serde(default = "default_threshold")]
        threshold: f32,
        /// Falling edges at `threshold - hysteresis`.
        #[serde(default = "default_hysteresis")]
        hysteresis: f32,
        /// `rising`, `falling` or `both`.
        #[serde(default = "default_direction")]
        direction: String,
    },
}

fn default_interval() -> f32 {
    DEFAULT_STREAM_INTERVAL
}

fn default_threshold() -> f32 {
    DEFAULT_CHANGE_THRESHOLD
}

fn default_hysteresis() -> f32 {
    DEFAULT_CHANGE_HYSTERESIS
}

fn default_direction() -> String {
    Direction::Both.as_str().to_string()
}

impl InputWatch {
    /// Engine input mode, or `None` for an unknown direction tag.
    pub fn to_mode(&self) -> Option<InputMode> {
        match self {
            InputWatch::Stream { interval } => Some(InputMode::stream(*interval)),
            InputWatch::Change {
                threshold,
                hysteresis,
                direction,
            } => Direction::from_tag(direction)
                .map(|d| InputMode::change(*threshold, *hysteresis, d)),
        }
    }
}

/// One `[[channels]]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelPatch {
    /// Channel number, 1-8.
    pub channel: usize,

    /// Initial slew target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volts: Option<f32>,

    /// Slew time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slew: Option<f32>,

    /// Shape tag for plain voltage changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,

    /// Program to assign.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub program: Vec<SegmentPatch>,

    /// Start the program once the patch is applied.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trigger: bool,

    /// Completion callback token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<u64>,

    /// Clock mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockPatch>,

    /// Output quantization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScalePatch>,

    /// Sticky overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dynamics: BTreeMap<String, f32>,

    /// Input detector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputPatch>,

    /// Input callback token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_done: Option<u64>,
}

impl ChannelPatch {
    /// Empty entry for `channel`.
    pub fn new(channel: usize) -> Self {
        Self {
            channel,
            ..Self::default()
        }
    }

    /// Set the initial voltage.
    pub fn with_volts(mut self, volts: f32) -> Self {
        self.volts = Some(volts);
        self
    }

    /// Set the slew time.
    pub fn with_slew(mut self, seconds: f32) -> Self {
        self.slew = Some(seconds);
        self
    }

    /// Assign a program, optionally starting it.
    pub fn with_program(mut self, segments: &[Segment], trigger: bool) -> Self {
        self.program = segments.iter().map(SegmentPatch::from).collect();
        self.trigger = trigger;
        self
    }

    /// Enter clock mode with the built-in pulse.
    pub fn with_clock(mut self, division: f32) -> Self {
        self.clock = Some(ClockPatch::Divide {
            division,
            pulse: None,
        });
        self
    }

    /// Quantize to a twelve-tone scale.
    pub fn with_scale(mut self, notes: &[f32]) -> Self {
        self.scale = Some(ScalePatch::Notes {
            notes: notes.to_vec(),
            temperament: DEFAULT_TEMPERAMENT,
            volts_per_octave: DEFAULT_VOLTS_PER_OCTAVE,
        });
        self
    }

    /// Set a sticky override.
    pub fn with_dynamic(mut self, key: impl Into<String>, value: f32) -> Self {
        self.dynamics.insert(key.into(), value);
        self
    }

    /// Set the completion token.
    pub fn with_done(mut self, token: u64) -> Self {
        self.done = Some(token);
        self
    }

    /// Short description of the configured mode.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        match &self.clock {
            Some(ClockPatch::Divide { division, pulse }) => parts.push(format!(
                "clock /{division}{}",
                if pulse.is_some() { " (custom pulse)" } else { "" }
            )),
            Some(ClockPatch::Disabled(_)) | None => {}
        }
        if !self.program.is_empty() {
            parts.push(format!(
                "program x{}{}",
                self.program.len(),
                if self.trigger { " (triggered)" } else { "" }
            ));
        }
        if let Some(v) = self.volts {
            parts.push(format!("{v} V"));
        }
        if let Some(s) = self.slew {
            parts.push(format!("slew {s} s"));
        }
        if let Some(ScalePatch::Notes { notes, .. }) = &self.scale {
            parts.push(format!("scale of {}", notes.len()));
        }
        if let Some(InputPatch::Watch(watch)) = &self.input {
            parts.push(match watch {
                InputWatch::Stream { .. } => "input stream".to_string(),
                InputWatch::Change { .. } => "input change".to_string(),
            });
        }
        if parts.is_empty() {
            "idle".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Push this entry into `engine`. Order matters: anything that resets the
    /// mode goes before the mode itself.
    fn apply(&self, engine: &mut CvEngine) -> Result<(), ConfigError> {
        let ch = self.channel;
        for (key, &value) in &self.dynamics {
            engine.set_override(ch, key, Some(value))?;
        }
        engine.set_completion_callback(ch, self.done.map(CallbackHandle))?;

        match &self.scale {
            Some(ScalePatch::Notes {
                notes,
                temperament,
                volts_per_octave,
            }) => engine.set_scale(ch, notes, *temperament, *volts_per_octave)?,
            Some(ScalePatch::Disabled(_)) => engine.clear_scale(ch)?,
            None => {}
        }

        if let Some(seconds) = self.slew {
            engine.set_slew_time(ch, seconds)?;
        }
        if let Some(tag) = &self.shape {
            engine.set_shape(ch, tag)?;
        }
        if let Some(volts) = self.volts {
            engine.set_voltage(ch, volts)?;
        }

        if !self.program.is_empty() {
            let segments: Vec<Segment> =
                self.program.iter().map(SegmentPatch::to_segment).collect();
            engine.set_program(ch, &segments)?;
            if self.trigger {
                engine.trigger_program(ch)?;
            }
        }

        match &self.clock {
            Some(ClockPatch::Divide { division, pulse }) => {
                let pulse: Option<Vec<Segment>> = pulse
                    .as_ref()
                    .map(|p| p.iter().map(SegmentPatch::to_segment).collect());
                engine.set_clock_mode(ch, *division, pulse.as_deref())?;
            }
            Some(ClockPatch::Disabled(_)) => engine.clear_clock_mode(ch)?,
            None => {}
        }

        match &self.input {
            Some(InputPatch::Watch(watch)) => {
                let mode = watch.to_mode().ok_or_else(|| CvError::InvalidMode {
                    channel: ch,
                    reason: "unknown input direction".to_string(),
                })?;
                engine.set_input_mode(ch, mode, self.input_done.map(CallbackHandle))?;
            }
            Some(InputPatch::Disabled(_)) => {
                engine.set_input_mode(ch, InputMode::None, None)?;
            }
            None => {}
        }
        Ok(())
    }
}

impl Patch {
    /// Create an empty patch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tempo.
    pub fn with_bpm(mut self, bpm: f32) -> Self {
        self.engine.bpm = bpm;
        self
    }

    /// Add a channel entry.
    pub fn with_channel(mut self, channel: ChannelPatch) -> Self {
        self.channels.push(channel);
        self
    }

    /// Load a patch from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a patch from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the patch to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the patch to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Entry for `channel`, if present.
    pub fn channel(&self, channel: usize) -> Option<&ChannelPatch> {
        self.channels.iter().find(|c| c.channel == channel)
    }

    /// Display name, falling back to "Untitled".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled")
    }

    /// Validate, then configure `engine` channel by channel.
    pub fn apply(&self, engine: &mut CvEngine) -> Result<(), ConfigError> {
        validate_patch(self)?;
        engine.set_bpm(self.engine.bpm)?;
        for channel in &self.channels {
            channel.apply(engine)?;
        }
        Ok(())
    }

    /// Fresh engine built from the `[engine]` table with the patch applied.
    pub fn build_engine(&self) -> Result<CvEngine, ConfigError> {
        let mut engine = CvEngine::new(self.engine.to_config());
        self.apply(&mut engine)?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_core::{ChannelMode, TARGET_KEY};

    const EXAMPLE: &str = r#"
name = "Example"

[engine]
bpm = 96

[[channels]]
channel = 1
program = [{ to = 5.0, time = 0.01 }, { to = 0.0, time = 0.5, shape = "exp" }]
trigger = true
done = 1

[[channels]]
channel = 2
clock = { division = 0.5 }

[[channels]]
channel = 3
slew = 0.2
volts = 1.3
scale = { notes = [0, 2, 4, 5, 7, 9, 11] }

[[channels]]
channel = 4
input = { mode = "change", threshold = 1.0, direction = "rising" }
"#;

    #[test]
    fn parses_every_section() {
        let patch = Patch::from_toml(EXAMPLE).unwrap();
        assert_eq!(patch.display_name(), "Example");
        assert_eq!(patch.engine.bpm, 96.0);
        assert_eq!(patch.engine.sample_rate, 48000);
        assert_eq!(patch.channels.len(), 4);

        let ch1 = patch.channel(1).unwrap();
        assert_eq!(ch1.program.len(), 2);
        assert_eq!(ch1.program[1].to_segment().shape, Shape::Exponential);
        assert!(ch1.trigger);
        assert_eq!(ch1.done, Some(1));

        assert_eq!(
            patch.channel(2).unwrap().clock,
            Some(ClockPatch::Divide {
                division: 0.5,
                pulse: None
            })
        );
        assert!(matches!(
            patch.channel(3).unwrap().scale,
            Some(ScalePatch::Notes { temperament, .. }) if temperament == 12.0
        ));
        assert!(matches!(
            patch.channel(4).unwrap().input,
            Some(InputPatch::Watch(InputWatch::Change { .. }))
        ));
    }

    #[test]
    fn none_strings_disable_modes() {
        let patch = Patch::from_toml(
            r#"
[[channels]]
channel = 5
clock = "none"
scale = "none"
input = "none"
"#,
        )
        .unwrap();
        let ch = patch.channel(5).unwrap();
        assert_eq!(ch.clock, Some(ClockPatch::Disabled(Disabled::Off)));
        assert_eq!(ch.scale, Some(ScalePatch::Disabled(Disabled::Off)));
        assert_eq!(ch.input, Some(InputPatch::Disabled(Disabled::Off)));
    }

    #[test]
    fn toml_round_trip() {
        let patch = Patch::from_toml(EXAMPLE).unwrap();
        let text = patch.to_toml().unwrap();
        assert_eq!(Patch::from_toml(&text).unwrap(), patch);
    }

    #[test]
    fn build_engine_applies_channels() {
        let patch = Patch::from_toml(EXAMPLE).unwrap();
        let engine = patch.build_engine().unwrap();
        assert_eq!(engine.bpm(), 96.0);
        assert_eq!(engine.mode(1).unwrap(), ChannelMode::ProgramRunning);
        assert_eq!(engine.mode(2).unwrap(), ChannelMode::ClockArmed);
        assert_eq!(engine.get_slew_time(3).unwrap(), 0.2);
        assert_eq!(engine.channel(1).unwrap().completion(), Some(CallbackHandle(1)));
        assert!(matches!(engine.input_mode(4).unwrap(), InputMode::Change { .. }));
    }

    #[test]
    fn dynamics_are_applied_before_trigger() {
        let patch = Patch::new("dyn").with_channel(
            ChannelPatch::new(1)
                .with_dynamic(TARGET_KEY, 2.0)
                .with_program(&[Segment::new(1.0, 0.0)], true),
        );
        let mut engine = patch.build_engine().unwrap();
        let mut frame = [0.0; 8];
        engine.process_sample(0.001, &mut frame, &mut corvid_core::NullNotifier);
        assert_eq!(frame[0], 2.0);
    }

    #[test]
    fn summary_describes_mode() {
        assert_eq!(ChannelPatch::new(1).summary(), "idle");
        assert_eq!(ChannelPatch::new(1).with_clock(2.0).summary(), "clock /2");
        assert_eq!(
            ChannelPatch::new(1)
                .with_program(&[Segment::new(1.0, 1.0)], true)
                .summary(),
            "program x1 (triggered)"
        );
    }
}
