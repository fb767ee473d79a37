//! Input jack detectors.
//!
//! Each of the eight inputs can watch its voltage in one of two ways:
//!
//! - **Stream**: report the voltage every `interval` seconds.
//! - **Change**: Schmitt-trigger edge detection with a hysteresis band below
//!   the threshold, reporting rising and/or falling edges.
//!
//! Detectors only produce [`InputEvent`]s; delivery to the host goes through
//! the engine and its [`InputSink`](crate::InputSink).

use libm::fmodf;

/// Default stream interval in seconds.
pub const DEFAULT_STREAM_INTERVAL: f32 = 0.1;

/// Default change threshold in volts.
pub const DEFAULT_CHANGE_THRESHOLD: f32 = 1.0;

/// Default change hysteresis in volts.
pub const DEFAULT_CHANGE_HYSTERESIS: f32 = 0.1;

/// Which edges a change detector reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Low-to-high crossings only.
    Rising,
    /// High-to-low crossings only.
    Falling,
    /// Both.
    #[default]
    Both,
}

impl Direction {
    /// Parse `"rising"`, `"falling"` or `"both"`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "rising" => Some(Direction::Rising),
            "falling" => Some(Direction::Falling),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }

    /// Canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Rising => "rising",
            Direction::Falling => "falling",
            Direction::Both => "both",
        }
    }

    fn accepts(self, rising: bool) -> bool {
        match self {
            Direction::Rising => rising,
            Direction::Falling => !rising,
            Direction::Both => true,
        }
    }
}

/// What an input is watching for.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum InputMode {
    /// Not watching.
    #[default]
    None,
    /// Periodic voltage reports.
    Stream {
        /// Seconds between reports.
        interval: f32,
    },
    /// Threshold crossings.
    Change {
        /// Rising edge level, in volts.
        threshold: f32,
        /// Falling edges trigger at `threshold - hysteresis`.
        hysteresis: f32,
        /// Which edges to report.
        direction: Direction,
    },
}

impl InputMode {
    /// Stream mode; non-positive intervals use the default.
    pub fn stream(interval: f32) -> Self {
        let interval = if interval > 0.0 {
            interval
        } else {
            DEFAULT_STREAM_INTERVAL
        };
        InputMode::Stream { interval }
    }

    /// Change mode; negative hysteresis becomes zero.
    pub fn change(threshold: f32, hysteresis: f32, direction: Direction) -> Self {
        InputMode::Change {
            threshold,
            hysteresis: hysteresis.max(0.0),
            direction,
        }
    }

    /// Name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::None => "none",
            InputMode::Stream { .. } => "stream",
            InputMode::Change { .. } => "change",
        }
    }

    /// Whether every number in the mode is finite.
    pub fn is_finite(&self) -> bool {
        match *self {
            InputMode::None => true,
            InputMode::Stream { interval } => interval.is_finite(),
            InputMode::Change {
                threshold,
                hysteresis,
                ..
            } => threshold.is_finite() && hysteresis.is_finite(),
        }
    }
}

/// Something an input detector noticed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Periodic report of the current voltage.
    Stream(f32),
    /// Edge crossing; `true` for rising.
    Change(bool),
}

/// State for one input jack.
#[derive(Debug, Clone, Default)]
pub struct InputDetector {
    mode: InputMode,
    voltage: f32,
    timer: f32,
    above: bool,
}

impl InputDetector {
    /// Idle detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch mode, resetting the stream timer and seeding the edge state
    /// from the last seen voltage. Modes built as bare variants get the same
    /// normalization as [`InputMode::stream`] and [`InputMode::change`].
    pub fn set_mode(&mut self, mode: InputMode) {
        let mode = match mode {
            InputMode::None => InputMode::None,
            InputMode::Stream { interval } => InputMode::stream(interval),
            InputMode::Change {
                threshold,
                hysteresis,
                direction,
            } => InputMode::change(threshold, hysteresis, direction),
        };
        self.mode = mode;
        self.timer = 0.0;
        self.above = match mode {
            InputMode::Change { threshold, .. } => self.voltage > threshold,
            _ => false,
        };
    }

    /// Current mode.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Last voltage seen.
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    /// Feed one tick of input.
    pub fn process(&mut self, voltage: f32, dt: f32) -> Option<InputEvent> {
        self.voltage = voltage;
        match self.mode {
            InputMode::None => None,
            InputMode::Stream { interval } => {
                self.timer += dt;
                if self.timer >= interval {
                    // One report per tick, however many intervals passed.
                    self.timer = fmodf(self.timer, interval);
                    Some(InputEvent::Stream(voltage))
                } else {
                    None
                }
            }
            InputMode::Change {
                threshold,
                hysteresis,
                direction,
            } => {
                let edge = if !self.above && voltage > threshold {
                    self.above = true;
                    Some(true)
                } else if self.above && voltage < threshold - hysteresis {
                    self.above = false;
                    Some(false)
                } else {
                    None
                };
                edge.filter(|&rising| direction.accepts(rising))
                    .map(InputEvent::Change)
            }
        }
    }
}
