//! Program segments and their interpolation shapes.
//!
//! A [`Segment`] is one leg of a program: move to `target` volts over
//! `duration` seconds following a [`Shape`]. Segments are plain data and are
//! never mutated once a program owns them.

use core::fmt;
use core::str::FromStr;

/// Interpolation law for a segment or a channel's slew.
///
/// Tags arrive from scripts as open strings. They are folded into this closed
/// set at the boundary; anything unrecognised becomes [`Shape::Unknown`].
///
/// Only the linear law is implemented. Every variant, including the curved
/// ones, renders as a straight line between start and target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shape {
    /// Straight line between start and target.
    #[default]
    Linear,
    /// Accepted tag; renders as linear.
    Exponential,
    /// Accepted tag; renders as linear.
    Logarithmic,
    /// Unrecognised tag; renders as linear.
    Unknown,
}

impl Shape {
    /// Fold a script-side tag into a shape.
    ///
    /// ```rust
    /// use corvid_core::Shape;
    ///
    /// assert_eq!(Shape::from_tag("exp"), Shape::Exponential);
    /// assert_eq!(Shape::from_tag("wobble"), Shape::Unknown);
    /// ```
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "linear" | "lin" => Shape::Linear,
            "exponential" | "exp" => Shape::Exponential,
            "logarithmic" | "log" => Shape::Logarithmic,
            _ => Shape::Unknown,
        }
    }

    /// Canonical tag for this shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Linear => "linear",
            Shape::Exponential => "exponential",
            Shape::Logarithmic => "logarithmic",
            Shape::Unknown => "unknown",
        }
    }

    /// Voltage at progress `t` (0..=1) between `start` and `target`.
    #[inline]
    pub fn interpolate(self, start: f32, target: f32, t: f32) -> f32 {
        match self {
            Shape::Linear | Shape::Exponential | Shape::Logarithmic | Shape::Unknown => {
                start + (target - start) * t
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Shape::from_tag(s))
    }
}

/// One `(target, duration, shape)` leg of a program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Voltage reached at the end of the segment.
    pub target: f32,
    /// Time to reach `target`, in seconds. Zero means instantaneous.
    pub duration: f32,
    /// Interpolation law.
    pub shape: Shape,
}

impl Segment {
    /// Linear segment to `target` over `duration` seconds.
    pub fn new(target: f32, duration: f32) -> Self {
        Self {
            target,
            duration,
            shape: Shape::Linear,
        }
    }

    /// Same segment with a different shape.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Whether both numbers are usable.
    pub fn is_finite(&self) -> bool {
        self.target.is_finite() && self.duration.is_finite()
    }
}

impl From<(f32, f32)> for Segment {
    fn from((target, duration): (f32, f32)) -> Self {
        Segment::new(target, duration)
    }
}

impl From<(f32, f32, Shape)> for Segment {
    fn from((target, duration, shape): (f32, f32, Shape)) -> Self {
        Segment::new(target, duration).with_shape(shape)
    }
}
