//! Linear slew toward a target voltage.
//!
//! The ramp moves at a constant rate derived from a fixed full-scale span, not
//! from the distance still to travel: a 1 s slew crosses the whole span in one
//! second, and a short hop takes proportionally less. This matches how the
//! output stage of the hardware behaves.

use libm::fabsf;

/// Voltage span covered by a full slew time.
pub const DEFAULT_SLEW_SPAN: f32 = 15.0;

/// Slew times at or below this snap immediately.
pub const INSTANT_SLEW: f32 = 0.00001;

/// Distance from target at which the ramp snaps onto it.
pub const SETTLE_EPSILON: f32 = 0.0001;

/// Target + ramp time for a channel's plain voltage output.
#[derive(Debug, Clone)]
pub struct SlewRamp {
    target: f32,
    seconds: f32,
    span: f32,
}

impl SlewRamp {
    /// Instant ramp resting at 0 V.
    pub fn new() -> Self {
        Self::with_span(DEFAULT_SLEW_SPAN)
    }

    /// Instant ramp with a custom full-scale span.
    pub fn with_span(span: f32) -> Self {
        Self {
            target: 0.0,
            seconds: 0.0,
            span: if span > 0.0 { span } else { DEFAULT_SLEW_SPAN },
        }
    }

    /// Set the voltage to move toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Target voltage.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Set the time to cross the full span. Negative values become zero.
    pub fn set_seconds(&mut self, seconds: f32) {
        self.seconds = seconds.max(0.0);
    }

    /// Time to cross the full span.
    pub fn seconds(&self) -> f32 {
        self.seconds
    }

    /// Whether changes land immediately.
    #[inline]
    pub fn is_instant(&self) -> bool {
        self.seconds <= INSTANT_SLEW
    }

    /// Hold `voltage` with no ramp.
    pub fn hold(&mut self, voltage: f32) {
        self.target = voltage;
        self.seconds = 0.0;
    }

    /// Next voltage after `dt` seconds, starting from `current`.
    #[inline]
    pub fn advance(&self, current: f32, dt: f32) -> f32 {
        if self.is_instant() {
            return self.target;
        }
        let diff = self.target - current;
        if fabsf(diff) < SETTLE_EPSILON {
            return self.target;
        }
        let max_step = self.span / self.seconds * dt;
        if fabsf(diff) <= max_step {
            self.target
        } else if diff > 0.0 {
            current + max_step
        } else {
            current - max_step
        }
    }
}

impl Default for SlewRamp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_ramp_snaps() {
        let mut ramp = SlewRamp::new();
        ramp.set_target(3.0);
        assert_eq!(ramp.advance(0.0, 0.001), 3.0);
    }

    #[test]
    fn rate_is_span_over_seconds() {
        let mut ramp = SlewRamp::new();
        ramp.set_seconds(1.0);
        ramp.set_target(10.0);
        // 15 V/s for 0.1 s
        let v = ramp.advance(0.0, 0.1);
        assert!((v - 1.5).abs() < 1e-5);
    }

    #[test]
    fn never_overshoots() {
        let mut ramp = SlewRamp::new();
        ramp.set_seconds(0.01);
        ramp.set_target(1.0);
        let v = ramp.advance(0.9, 0.01);
        assert_eq!(v, 1.0);
        let mut ramp = SlewRamp::new();
        ramp.set_seconds(0.01);
        ramp.set_target(-1.0);
        assert_eq!(ramp.advance(-0.9, 0.01), -1.0);
    }

    #[test]
    fn snaps_within_epsilon() {
        let mut ramp = SlewRamp::new();
        ramp.set_seconds(100.0);
        ramp.set_target(2.0);
        assert_eq!(ramp.advance(2.00005, 0.0001), 2.0);
    }

    #[test]
    fn negative_seconds_normalize_to_zero() {
        let mut ramp = SlewRamp::new();
        ramp.set_seconds(-3.0);
        assert_eq!(ramp.seconds(), 0.0);
        assert!(ramp.is_instant());
    }

    #[test]
    fn hold_disables_ramp() {
        let mut ramp = SlewRamp::new();
        ramp.set_seconds(2.0);
        ramp.hold(4.0);
        assert_eq!(ramp.target(), 4.0);
        assert!(ramp.is_instant());
    }
}
