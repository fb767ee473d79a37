//! Beat clock and per-channel clock dividers.
//!
//! One [`BeatClock`] per engine accumulates a fractional beat count from the
//! tick time and tempo. The count is kept in `f64`: at audio rates an `f32`
//! stops advancing after about a thousand beats. Each clocked channel watches it through a
//! [`ClockDivider`] that fires when the beat count crosses a multiple of its
//! division.
//!
//! A divider fires at most once per tick. If a single tick is long enough to
//! cross several division boundaries the extra pulses are dropped, not
//! queued.

use libm::floor;

/// Default tempo in beats per minute.
pub const DEFAULT_BPM: f32 = 120.0;

/// Level of the built-in clock pulse, in volts.
pub const DEFAULT_PULSE_LEVEL: f32 = 5.0;

/// Length of the built-in clock pulse, in seconds.
pub const DEFAULT_PULSE_SECONDS: f32 = 0.001;

/// Divisions at or below this are replaced by one beat.
const MIN_DIVISION: f32 = 0.00001;

/// Monotonic beat counter shared by every channel.
///
/// # Example
///
/// ```rust
/// use corvid_core::BeatClock;
///
/// let mut clock = BeatClock::new(120.0);
/// for _ in 0..1000 {
///     clock.advance(0.001);
/// }
/// // One second at 120 BPM is two beats.
/// assert!((clock.beat() - 2.0).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct BeatClock {
    bpm: f32,
    beat: f64,
}

impl BeatClock {
    /// Clock at `bpm`, positioned at beat zero.
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            beat: 0.0,
        }
    }

    /// Set the tempo. Clamped to at least 1 BPM.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }

    /// Current tempo.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Beats elapsed so far.
    #[inline]
    pub fn beat(&self) -> f64 {
        self.beat
    }

    /// Advance by `dt` seconds.
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        self.beat += f64::from(dt) * f64::from(self.bpm) / 60.0;
    }

    /// Return to beat zero.
    pub fn reset(&mut self) {
        self.beat = 0.0;
    }
}

impl Default for BeatClock {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

/// Fires once every `division` beats.
#[derive(Debug, Clone)]
pub struct ClockDivider {
    division: f32,
    last_beat: f64,
}

impl ClockDivider {
    /// Divider watching from `beat` onward.
    pub fn new(division: f32, beat: f64) -> Self {
        Self {
            division: normalize_division(division),
            last_beat: beat,
        }
    }

    /// Beats per pulse.
    pub fn division(&self) -> f32 {
        self.division
    }

    /// Change beats per pulse without touching the last observed beat.
    pub fn set_division(&mut self, division: f32) {
        self.division = normalize_division(division);
    }

    /// Beat value seen on the previous poll.
    pub fn last_beat(&self) -> f64 {
        self.last_beat
    }

    /// Forget history: the next boundary after `beat` is the next pulse.
    pub fn rearm(&mut self, beat: f64) {
        self.last_beat = beat;
    }

    /// Observe `beat`; `true` when a division boundary was crossed since the
    /// last poll.
    #[inline]
    pub fn poll(&mut self, beat: f64) -> bool {
        let division = f64::from(self.division);
        let fired = floor(beat / division) > floor(self.last_beat / division);
        self.last_beat = beat;
        fired
    }
}

impl Default for ClockDivider {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

fn normalize_division(division: f32) -> f32 {
    if division > MIN_DIVISION { division } else { 1.0 }
}
