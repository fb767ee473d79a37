//! Host-side callback seam.
//!
//! The engine never runs script code. It holds opaque [`CallbackHandle`]
//! tokens and hands them back to the host through [`Notifier`] (program
//! completion) and [`InputSink`] (input events) during processing. A host
//! failure is reported as a [`NotifyError`]; the engine logs it and carries on
//! with the remaining channels.

use alloc::string::String;
use core::fmt;

use crate::channel::ChannelId;
use crate::input::InputEvent;

/// Opaque token for a host-side callable.
///
/// The engine stores and returns these but never interprets them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(pub u64);

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure raised by the host while running a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl NotifyError {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NotifyError {}

/// Receives program-completion notifications.
pub trait Notifier {
    /// The program on `channel` finished this tick and `handle` is its
    /// completion callback.
    fn program_done(&mut self, channel: ChannelId, handle: CallbackHandle)
    -> Result<(), NotifyError>;
}

impl<F> Notifier for F
where
    F: FnMut(ChannelId, CallbackHandle) -> Result<(), NotifyError>,
{
    fn program_done(
        &mut self,
        channel: ChannelId,
        handle: CallbackHandle,
    ) -> Result<(), NotifyError> {
        self(channel, handle)
    }
}

/// Notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn program_done(&mut self, _: ChannelId, _: CallbackHandle) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Receives input events.
pub trait InputSink {
    /// `event` happened on input `channel`, whose callback is `handle`.
    fn input_event(
        &mut self,
        channel: ChannelId,
        handle: CallbackHandle,
        event: InputEvent,
    ) -> Result<(), NotifyError>;
}

impl<F> InputSink for F
where
    F: FnMut(ChannelId, CallbackHandle, InputEvent) -> Result<(), NotifyError>,
{
    fn input_event(
        &mut self,
        channel: ChannelId,
        handle: CallbackHandle,
        event: InputEvent,
    ) -> Result<(), NotifyError> {
        self(channel, handle, event)
    }
}

/// Per-tick summary, one bit per channel (bit 0 is channel 1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Channels whose program (or input event) completed this tick.
    pub completed: u8,
    /// Channels whose callback ran successfully.
    pub notified: u8,
    /// Channels whose callback returned an error.
    pub failed: u8,
}

impl TickReport {
    /// Whether `channel` completed this tick.
    pub fn completed(&self, channel: ChannelId) -> bool {
        self.completed & channel.bit() != 0
    }

    /// Whether `channel`'s callback ran successfully.
    pub fn notified(&self, channel: ChannelId) -> bool {
        self.notified & channel.bit() != 0
    }

    /// Whether `channel`'s callback failed.
    pub fn failed(&self, channel: ChannelId) -> bool {
        self.failed & channel.bit() != 0
    }

    /// Whether nothing happened.
    pub fn is_quiet(&self) -> bool {
        self.completed == 0 && self.notified == 0 && self.failed == 0
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: TickReport) {
        self.completed |= other.completed;
        self.notified |= other.notified;
        self.failed |= other.failed;
    }
}
