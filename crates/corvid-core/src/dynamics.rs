//! Per-channel sticky override store.
//!
//! Scripts write arbitrary `key -> float` pairs into a channel's dynamics. Two
//! reserved keys are read by the program engine every time it loads a segment
//! and replace that segment's authored target and duration. Nothing here is
//! ever cleared automatically, so an override stays in force for every later
//! segment (and every later run) until the caller removes it.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::segment::Segment;

/// Key that replaces a segment's target voltage.
pub const TARGET_KEY: &str = "_asl_target_V";

/// Key that replaces a segment's duration in seconds.
pub const DURATION_KEY: &str = "_asl_duration_S";

/// Open-ended float store scoped to one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dynamics {
    values: BTreeMap<String, f32>,
}

impl Dynamics {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: f32) {
        self.values.insert(key.into(), value);
    }

    /// Remove `key`, returning what was stored.
    pub fn remove(&mut self, key: &str) -> Option<f32> {
        self.values.remove(key)
    }

    /// Drop every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(key, value)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Effective `(target, duration)` for `segment` after substitution.
    #[inline]
    pub fn resolve(&self, segment: &Segment) -> (f32, f32) {
        let target = self.get(TARGET_KEY).unwrap_or(segment.target);
        let duration = self.get(DURATION_KEY).unwrap_or(segment.duration);
        (target, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_authored_values_without_overrides() {
        let dyns = Dynamics::new();
        assert_eq!(dyns.resolve(&Segment::new(3.0, 0.5)), (3.0, 0.5));
    }

    #[test]
    fn reserved_keys_replace_target_and_duration() {
        let mut dyns = Dynamics::new();
        dyns.set(TARGET_KEY, 2.0);
        assert_eq!(dyns.resolve(&Segment::new(3.0, 0.5)), (2.0, 0.5));
        dyns.set(DURATION_KEY, 0.25);
        assert_eq!(dyns.resolve(&Segment::new(3.0, 0.5)), (2.0, 0.25));
    }

    #[test]
    fn other_keys_are_inert() {
        let mut dyns = Dynamics::new();
        dyns.set("exponential", 3.0);
        assert_eq!(dyns.resolve(&Segment::new(1.0, 1.0)), (1.0, 1.0));
        assert_eq!(dyns.get("exponential"), Some(3.0));
    }

    #[test]
    fn remove_unsets() {
        let mut dyns = Dynamics::new();
        dyns.set(TARGET_KEY, 2.0);
        assert_eq!(dyns.remove(TARGET_KEY), Some(2.0));
        assert!(dyns.is_empty());
        assert_eq!(dyns.remove(TARGET_KEY), None);
    }
}
