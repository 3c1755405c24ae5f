// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame clock.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the frame clock calls at each stage of a tick. All method bodies default
//! to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing. When **on**,
//! each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a tick and
//! produces a [`FrameSummary`] at the end.
//!
//! Install a sink with
//! [`FrameClock::set_trace_sink`](crate::clock::FrameClock::set_trace_sink).
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use crate::node::ViewportId;
use crate::time::{Duration, HostTime};
use crate::timing::FrameTick;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a clock tick is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Draining the deferred-call queue.
    Deferred,
    /// Running per-frame targets (viewports).
    Frame,
    /// Advancing and firing countdown timers.
    Timers,
}

/// A lifecycle transition of the frame clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockTransition {
    /// `startup()` ran.
    Started,
    /// The clock was paused.
    Paused,
    /// The clock was resumed.
    Resumed,
    /// The host reported the page hidden.
    Hidden,
    /// The host reported the page visible.
    Visible,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the start of every tick.
#[derive(Clone, Copy, Debug)]
pub struct FrameTickEvent {
    /// Monotonic tick counter.
    pub frame_index: u64,
    /// Host time of the tick.
    pub now: HostTime,
    /// Time since the previous tick.
    pub dt: Duration,
    /// Frame-rate-normalized delta.
    pub delta: f64,
    /// Instantaneous frames per second.
    pub fps: u32,
}

impl From<&FrameTick> for FrameTickEvent {
    fn from(tick: &FrameTick) -> Self {
        Self {
            frame_index: tick.frame_index,
            now: tick.now,
            dt: tick.dt,
            delta: tick.delta,
            fps: tick.fps,
        }
    }
}

/// Marks the beginning of a tick phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a tick phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when a tick skips its targets and timers because `delta` crossed
/// the stall threshold.
#[derive(Clone, Copy, Debug)]
pub struct StallEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// The offending delta.
    pub delta: f64,
    /// The configured threshold.
    pub threshold: f64,
}

/// Emitted when a countdown timer fires.
#[derive(Clone, Copy, Debug)]
pub struct TimerFiredEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Raw id of the timer handle.
    pub timer: u64,
    /// Accumulated elapsed time in milliseconds when it fired.
    pub elapsed_ms: f64,
}

/// Emitted on clock lifecycle transitions.
#[derive(Clone, Copy, Debug)]
pub struct ClockStateEvent {
    /// Host time of the transition.
    pub timestamp: HostTime,
    /// What happened.
    pub transition: ClockTransition,
}

/// Emitted by a viewport after each render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which viewport rendered.
    pub viewport: ViewportId,
    /// Nodes whose content was drawn.
    pub drawn: u32,
    /// Nodes skipped by viewport culling.
    pub culled: u32,
}

/// Per-tick timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Tick counter.
    pub frame_index: u64,
    /// Host time of the tick.
    pub now: HostTime,
    /// Frame-rate-normalized delta.
    pub delta: f64,
    /// Instantaneous frames per second.
    pub fps: u32,
    /// Deferred phase duration in microseconds (0 if not measured).
    pub deferred_micros: u64,
    /// Frame phase duration in microseconds (0 if not measured).
    pub frame_micros: u64,
    /// Timers phase duration in microseconds (0 if not measured).
    pub timers_micros: u64,
    /// Number of timers that fired.
    pub timers_fired: u32,
    /// Whether targets and timers were skipped.
    pub stalled: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame clock.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of every tick.
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        _ = e;
    }

    /// Called at the beginning of a tick phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a tick phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a tick is skipped by the stall guard.
    fn on_stall(&mut self, e: &StallEvent) {
        _ = e;
    }

    /// Called when a countdown timer fires.
    fn on_timer_fired(&mut self, e: &TimerFiredEvent) {
        _ = e;
    }

    /// Called on clock lifecycle transitions.
    fn on_clock_state(&mut self, e: &ClockStateEvent) {
        _ = e;
    }

    /// Called after a viewport render pass.
    fn on_render(&mut self, e: &RenderEvent) {
        _ = e;
    }

    /// Called with a per-tick timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($(#[$doc:meta] $name:ident => $method:ident($ty:ty);)*) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self, e: &$ty) {
                #[cfg(feature = "trace")]
                if let Some(s) = &mut self.sink {
                    s.$method(e);
                }
                #[cfg(not(feature = "trace"))]
                {
                    _ = e;
                }
            }
        )*
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    dispatch! {
        /// Emits a [`FrameTickEvent`].
        frame_tick => on_frame_tick(FrameTickEvent);
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent);
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent);
        /// Emits a [`StallEvent`].
        stall => on_stall(StallEvent);
        /// Emits a [`TimerFiredEvent`].
        timer_fired => on_timer_fired(TimerFiredEvent);
        /// Emits a [`ClockStateEvent`].
        clock_state => on_clock_state(ClockStateEvent);
        /// Emits a [`RenderEvent`].
        render => on_render(RenderEvent);
        /// Emits a [`FrameSummary`].
        frame_summary => on_frame_summary(FrameSummary);
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a tick and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    tick: FrameTickEvent,
    phase_starts: [Option<HostTime>; 3],
    phase_ends: [Option<HostTime>; 3],
    timers_fired: u32,
    stalled: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given tick.
    #[must_use]
    pub fn new(tick: &FrameTickEvent) -> Self {
        Self {
            tick: *tick,
            phase_starts: [None; 3],
            phase_ends: [None; 3],
            timers_fired: 0,
            stalled: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Counts one fired timer.
    pub fn timer_fired(&mut self) {
        self.timers_fired += 1;
    }

    /// Marks the tick as skipped by the stall guard.
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.tick.frame_index,
            now: self.tick.now,
            delta: self.tick.delta,
            fps: self.tick.fps,
            deferred_micros: self.phase_duration(PhaseKind::Deferred),
            frame_micros: self.phase_duration(PhaseKind::Frame),
            timers_micros: self.phase_duration(PhaseKind::Timers),
            timers_fired: self.timers_fired,
            stalled: self.stalled,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).micros(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Deferred => 0,
        PhaseKind::Frame => 1,
        PhaseKind::Timers => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick() -> FrameTickEvent {
        FrameTickEvent {
            frame_index: 42,
            now: HostTime(1_000_000),
            dt: Duration::from_millis(33),
            delta: 1.1,
            fps: 30,
        }
    }

    #[test]
    fn frame_tick_event_from_frame_tick() {
        let tick = FrameTick::measure(
            7,
            HostTime::from_millis(130),
            Some(HostTime::from_millis(100)),
            30.0,
            1.0,
        );
        let evt = FrameTickEvent::from(&tick);
        assert_eq!(evt.frame_index, 7);
        assert_eq!(evt.now, HostTime::from_millis(130));
        assert_eq!(evt.dt, Duration::from_millis(30));
        assert_eq!(evt.fps, 33);
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_frame_tick(&sample_tick());
        sink.on_stall(&StallEvent {
            frame_index: 0,
            delta: 200.0,
            threshold: 160.0,
        });
        sink.on_frame_summary(&FrameSummaryBuilder::new(&sample_tick()).finish());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_tick(&sample_tick());
        tracer.clock_state(&ClockStateEvent {
            timestamp: HostTime(0),
            transition: ClockTransition::Started,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(&sample_tick());
        builder.phase_begin(PhaseKind::Deferred, HostTime(1_000_000));
        builder.phase_end(PhaseKind::Deferred, HostTime(1_000_100));
        builder.phase_begin(PhaseKind::Frame, HostTime(1_000_100));
        builder.phase_end(PhaseKind::Frame, HostTime(1_002_000));
        builder.phase_begin(PhaseKind::Timers, HostTime(1_002_000));
        builder.phase_end(PhaseKind::Timers, HostTime(1_002_050));
        builder.timer_fired();
        builder.timer_fired();

        let summary = builder.finish();
        assert_eq!(summary.deferred_micros, 100);
        assert_eq!(summary.frame_micros, 1900);
        assert_eq!(summary.timers_micros, 50);
        assert_eq!(summary.timers_fired, 2);
        assert!(!summary.stalled, "stall flag defaults to false");
        assert_eq!(summary.frame_index, 42);
    }

    #[test]
    fn summary_builder_missing_phases_are_zero() {
        let mut builder = FrameSummaryBuilder::new(&sample_tick());
        builder.set_stalled(true);
        let summary = builder.finish();
        assert_eq!(summary.deferred_micros, 0);
        assert_eq!(summary.frame_micros, 0);
        assert_eq!(summary.timers_micros, 0);
        assert!(summary.stalled, "stall flag is carried through");
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            ticks: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_tick(&mut self, e: &FrameTickEvent) {
                self.ticks.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { ticks: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_tick(&sample_tick());
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
    }
}
