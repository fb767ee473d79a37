//! Configuration errors reported synchronously to the caller.
//!
//! Every variant carries the 1-based channel number it concerns so that the
//! scripting side can surface a message like `output 3: slew must be finite`.

use alloc::string::String;
use core::fmt;

/// Errors raised by the per-channel configuration surface.
///
/// Validation is atomic: when a call returns one of these, no state on the
/// engine has been touched.
#[derive(Debug, Clone, PartialEq)]
pub enum CvError {
    /// Channel number outside `1..=8`.
    InvalidChannel(usize),
    /// A numeric parameter was non-finite or otherwise unusable.
    InvalidParameter {
        /// 1-based channel number.
        channel: usize,
        /// Parameter name as the script sees it.
        param: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// A segment in a program list could not be used.
    MalformedSegment {
        /// 1-based channel number.
        channel: usize,
        /// 1-based position of the offending segment.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },
    /// A mode argument was not understood.
    InvalidMode {
        /// 1-based channel number.
        channel: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl CvError {
    /// Shorthand for a non-finite numeric parameter.
    pub(crate) fn not_finite(channel: usize, param: &'static str, value: f32) -> Self {
        CvError::InvalidParameter {
            channel,
            param,
            reason: alloc::format!("expected a finite number, got {value}"),
        }
    }

    /// The channel this error refers to.
    pub fn channel(&self) -> usize {
        match self {
            CvError::InvalidChannel(channel)
            | CvError::InvalidParameter { channel, .. }
            | CvError::MalformedSegment { channel, .. }
            | CvError::InvalidMode { channel, .. } => *channel,
        }
    }
}

impl fmt::Display for CvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(n) => write!(f, "output index {n} out of range (1-8)"),
            Self::InvalidParameter {
                channel,
                param,
                reason,
            } => write!(f, "output {channel}: invalid {param}: {reason}"),
            Self::MalformedSegment {
                channel,
                index,
                reason,
            } => write!(f, "output {channel}: segment #{index}: {reason}"),
            Self::InvalidMode { channel, reason } => write!(f, "output {channel}: {reason}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CvError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_includes_channel_number() {
        let err = CvError::not_finite(3, "slew", f32::NAN);
        let msg = err.to_string();
        assert!(msg.starts_with("output 3: invalid slew"), "got: {msg}");
    }

    #[test]
    fn invalid_channel_display() {
        assert_eq!(
            CvError::InvalidChannel(9).to_string(),
            "output index 9 out of range (1-8)"
        );
    }

    #[test]
    fn malformed_segment_reports_position() {
        let err = CvError::MalformedSegment {
            channel: 2,
            index: 4,
            reason: "duration is NaN".to_string(),
        };
        assert_eq!(err.to_string(), "output 2: segment #4: duration is NaN");
        assert_eq!(err.channel(), 2);
    }
}
