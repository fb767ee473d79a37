//! Segment-based envelope sequencer.
//!
//! A [`Program`] walks an ordered list of [`Segment`]s, producing one voltage
//! per call to [`process`](Program::process). Each segment starts from the
//! voltage the previous one reached, so there is never a jump at a boundary.
//! A program started with [`start`](Program::start) begins from whatever
//! voltage the channel currently sits at.
//!
//! The channel's [`Dynamics`] are consulted every time a segment is loaded;
//! the reserved override keys replace the authored target and duration.
//!
//! # Example
//!
//! ```rust
//! use corvid_core::{Dynamics, Program, Segment};
//!
//! let dyns = Dynamics::new();
//! let mut env = Program::new(vec![Segment::new(5.0, 1.0)]);
//! env.start(0.0, &dyns);
//!
//! let dt = 1.0 / 1024.0;
//! let mut last = env.process(dt, &dyns);
//! for _ in 1..1024 {
//!     last = env.process(dt, &dyns);
//! }
//! assert!(!last.running);
//! assert_eq!(last.voltage, 5.0);
//! ```

use alloc::vec::Vec;

use crate::dynamics::Dynamics;
use crate::segment::{Segment, Shape};

/// Durations at or below this are treated as instantaneous.
pub const INSTANT_EPSILON: f32 = 0.00001;

/// Result of advancing a program by one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgramStep {
    /// `false` on the tick the last segment completes (and afterwards).
    pub running: bool,
    /// Voltage for this tick.
    pub voltage: f32,
}

/// Running state of a segment sequence.
#[derive(Debug, Clone)]
pub struct Program {
    segments: Vec<Segment>,
    index: usize,
    /// Voltage at the start of the in-progress segment
    start: f32,
    /// Resolved target of the in-progress segment
    target: f32,
    /// Resolved duration of the in-progress segment
    duration: f32,
    /// Seconds into the in-progress segment; `f64` so long segments still
    /// accumulate small ticks
    elapsed: f64,
    shape: Shape,
    running: bool,
    voltage: f32,
}

impl Program {
    /// Wrap a segment list. The program does nothing until started.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            index: 0,
            start: 0.0,
            target: 0.0,
            duration: 0.0,
            elapsed: 0.0,
            shape: Shape::Linear,
            running: false,
            voltage: 0.0,
        }
    }

    /// (Re)start from `initial` volts.
    ///
    /// An empty program stays stopped.
    pub fn start(&mut self, initial: f32, dynamics: &Dynamics) {
        if self.segments.is_empty() {
            self.running = false;
            return;
        }
        self.running = true;
        self.index = 0;
        self.start = initial;
        self.voltage = initial;
        self.load_segment(dynamics);
    }

    /// Advance by `dt` seconds.
    ///
    /// When the last segment completes the step reports `running == false`
    /// with the final target voltage exactly. Zero-duration segments collapse
    /// in a cascade within the same tick.
    pub fn process(&mut self, dt: f32, dynamics: &Dynamics) -> ProgramStep {
        if !self.running {
            return ProgramStep {
                running: false,
                voltage: self.voltage,
            };
        }

        self.elapsed += f64::from(dt);
        let duration = f64::from(self.duration);
        let t = if self.duration > INSTANT_EPSILON {
            (self.elapsed / duration).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        self.voltage = self.shape.interpolate(self.start, self.target, t);

        while self.elapsed >= f64::from(self.duration) {
            // Land exactly on the target; the next segment starts from here.
            self.start = self.target;
            self.voltage = self.target;
            self.index += 1;

            if self.index >= self.segments.len() {
                self.running = false;
                #[cfg(feature = "tracing")]
                tracing::debug!(voltage = self.voltage, "program finished");
                return ProgramStep {
                    running: false,
                    voltage: self.voltage,
                };
            }

            self.load_segment(dynamics);
        }

        ProgramStep {
            running: true,
            voltage: self.voltage,
        }
    }

    /// Stop without touching the last voltage. Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the program is mid-run.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last voltage produced.
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    /// Index of the in-progress segment.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The authored segment list.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the program has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Set up `segments[self.index]` with overrides applied and elapsed reset.
    fn load_segment(&mut self, dynamics: &Dynamics) {
        let segment = &self.segments[self.index];
        let (target, duration) = dynamics.resolve(segment);

        #[cfg(feature = "tracing")]
        if target != segment.target || duration != segment.duration {
            tracing::trace!(
                segment = self.index,
                target,
                duration,
                "segment resolved through dynamics"
            );
        }

        self.target = target;
        self.duration = duration;
        self.shape = segment.shape;
        self.elapsed = 0.0;

        if self.duration <= INSTANT_EPSILON {
            // Complete already: the next process() rolls straight over.
            self.elapsed = f64::from(self.duration);
            self.voltage = self.target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{DURATION_KEY, TARGET_KEY};
    use alloc::vec;

    const DT: f32 = 1.0 / 1024.0;

    fn run_for(program: &mut Program, dyns: &Dynamics, ticks: usize) -> ProgramStep {
        let mut step = ProgramStep {
            running: program.is_running(),
            voltage: program.voltage(),
        };
        for _ in 0..ticks {
            step = program.process(DT, dyns);
        }
        step
    }

    #[test]
    fn ten_minute_segment_completes_at_48k() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(5.0, 600.0)]);
        program.start(0.0, &dyns);

        let dt = 1.0 / 48_000.0;
        let mut ticks = 0u32;
        while program.process(dt, &dyns).running {
            ticks += 1;
            assert!(ticks < 28_900_000, "segment never completed");
        }
        let ticks = ticks + 1;
        assert!((28_799_998..=28_800_004).contains(&ticks), "took {ticks} ticks");
        assert_eq!(program.voltage(), 5.0);
    }

    #[test]
    fn empty_program_never_runs() {
        let dyns = Dynamics::new();
        let mut program = Program::new(Vec::new());
        program.start(1.0, &dyns);
        assert!(!program.is_running());
        assert!(!program.process(DT, &dyns).running);
    }

    #[test]
    fn single_segment_midpoint_and_end() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(5.0, 1.0)]);
        program.start(0.0, &dyns);

        let mid = run_for(&mut program, &dyns, 512);
        assert!(mid.running);
        assert!((mid.voltage - 2.5).abs() < 1e-4, "got {}", mid.voltage);

        let end = run_for(&mut program, &dyns, 512);
        assert!(!end.running);
        assert_eq!(end.voltage, 5.0);
    }

    #[test]
    fn starts_from_initial_voltage() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(0.0, 1.0)]);
        program.start(4.0, &dyns);
        let step = program.process(DT, &dyns);
        assert!(step.voltage < 4.0 && step.voltage > 3.99);
    }

    #[test]
    fn zero_duration_first_segment_lands_on_first_tick() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(1.0, 0.0), Segment::new(3.0, 0.5)]);
        program.start(0.0, &dyns);

        let first = program.process(DT, &dyns);
        assert!(first.running);
        assert_eq!(first.voltage, 1.0);
        assert_eq!(program.index(), 1);

        let half = run_for(&mut program, &dyns, 256);
        assert!((half.voltage - 2.0).abs() < 1e-4, "got {}", half.voltage);

        let end = run_for(&mut program, &dyns, 256);
        assert!(!end.running);
        assert_eq!(end.voltage, 3.0);
    }

    #[test]
    fn instant_segments_cascade_within_one_tick() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![
            Segment::new(1.0, 0.5),
            Segment::new(2.0, 0.0),
            Segment::new(-1.0, 0.0),
            Segment::new(4.0, 0.5),
        ]);
        program.start(0.0, &dyns);

        let boundary = run_for(&mut program, &dyns, 512);
        assert!(boundary.running);
        assert_eq!(boundary.voltage, -1.0);
        assert_eq!(program.index(), 3);

        let step = program.process(DT, &dyns);
        // Ramping from -1 to 4 over 0.5 s.
        assert!(step.voltage > -1.0 && step.voltage < -0.98);
    }

    #[test]
    fn all_instant_program_finishes_on_first_tick() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(1.0, 0.0), Segment::new(2.0, -1.0)]);
        program.start(0.0, &dyns);
        let step = program.process(DT, &dyns);
        assert!(!step.running);
        assert_eq!(step.voltage, 2.0);
    }

    #[test]
    fn sticky_target_override_applies_to_every_segment() {
        let mut dyns = Dynamics::new();
        dyns.set(TARGET_KEY, 2.0);
        let mut program = Program::new(vec![Segment::new(1.0, 0.5), Segment::new(3.0, 0.5)]);
        program.start(0.0, &dyns);

        let first = run_for(&mut program, &dyns, 512);
        assert_eq!(first.voltage, 2.0);
        let second = run_for(&mut program, &dyns, 256);
        assert_eq!(second.voltage, 2.0);
        let end = run_for(&mut program, &dyns, 256);
        assert!(!end.running);
        assert_eq!(end.voltage, 2.0);
    }

    #[test]
    fn clearing_override_restores_authored_target_on_next_segment() {
        let mut dyns = Dynamics::new();
        dyns.set(TARGET_KEY, 2.0);
        let mut program = Program::new(vec![Segment::new(1.0, 0.5), Segment::new(3.0, 0.5)]);
        program.start(0.0, &dyns);
        run_for(&mut program, &dyns, 256);
        dyns.remove(TARGET_KEY);

        let first = run_for(&mut program, &dyns, 256);
        assert_eq!(first.voltage, 2.0);
        let end = run_for(&mut program, &dyns, 512);
        assert_eq!(end.voltage, 3.0);
    }

    #[test]
    fn duration_override_shortens_segments() {
        let mut dyns = Dynamics::new();
        dyns.set(DURATION_KEY, 0.25);
        let mut program = Program::new(vec![Segment::new(4.0, 1.0)]);
        program.start(0.0, &dyns);
        let end = run_for(&mut program, &dyns, 256);
        assert!(!end.running);
        assert_eq!(end.voltage, 4.0);
    }

    #[test]
    fn stop_keeps_last_voltage_and_is_idempotent() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(8.0, 1.0)]);
        program.start(0.0, &dyns);
        let step = run_for(&mut program, &dyns, 128);
        program.stop();
        program.stop();
        assert!(!program.is_running());
        assert_eq!(program.voltage(), step.voltage);
        assert_eq!(program.process(DT, &dyns).voltage, step.voltage);
    }

    #[test]
    fn restart_resets_index() {
        let dyns = Dynamics::new();
        let mut program = Program::new(vec![Segment::new(1.0, 0.0), Segment::new(2.0, 0.0)]);
        program.start(0.0, &dyns);
        program.process(DT, &dyns);
        assert!(!program.is_running());
        program.start(5.0, &dyns);
        assert!(program.is_running());
        assert_eq!(program.index(), 0);
    }
}
