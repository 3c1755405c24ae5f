// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in milliseconds.

use std::io::Write;

use canopy_core::time::HostTime;
use canopy_core::trace::{
    ClockStateEvent, ClockTransition, FrameSummary, FrameTickEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RenderEvent, StallEvent, TimerFiredEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.as_millis_f64()
}

pub(crate) fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Deferred => "deferred",
        PhaseKind::Frame => "frame",
        PhaseKind::Timers => "timers",
    }
}

pub(crate) fn transition_name(transition: ClockTransition) -> &'static str {
    match transition {
        ClockTransition::Started => "started",
        ClockTransition::Paused => "paused",
        ClockTransition::Resumed => "resumed",
        ClockTransition::Hidden => "hidden",
        ClockTransition::Visible => "visible",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.1}ms dt={:.1}ms delta={:.3} fps={}",
            e.frame_index,
            ms(e.now),
            e.dt.as_millis_f64(),
            e.delta,
            e.fps,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_stall(&mut self, e: &StallEvent) {
        let _ = writeln!(
            self.writer,
            "[stall] frame={} delta={:.1} threshold={:.1}",
            e.frame_index, e.delta, e.threshold,
        );
    }

    fn on_timer_fired(&mut self, e: &TimerFiredEvent) {
        let _ = writeln!(
            self.writer,
            "[timer] frame={} id={} elapsed={:.1}ms",
            e.frame_index, e.timer, e.elapsed_ms,
        );
    }

    fn on_clock_state(&mut self, e: &ClockStateEvent) {
        let _ = writeln!(
            self.writer,
            "[clock] {} at {:.1}ms",
            transition_name(e.transition),
            ms(e.timestamp),
        );
    }

    fn on_render(&mut self, e: &RenderEvent) {
        let _ = writeln!(
            self.writer,
            "[render] frame={} viewport={} drawn={} culled={}",
            e.frame_index, e.viewport.0, e.drawn, e.culled,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let stalled = if s.stalled { "STALLED" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} fps={} deferred={}µs frame={}µs timers={}µs \
             fired={} {stalled}",
            s.frame_index,
            s.fps,
            s.deferred_micros,
            s.frame_micros,
            s.timers_micros,
            s.timers_fired,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::node::ViewportId;
    use canopy_core::time::Duration;

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_tick(&FrameTickEvent {
            frame_index: 1,
            now: HostTime::from_millis(1_000),
            dt: Duration::from_millis(33),
            delta: 1.1,
            fps: 30,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("now=1000.0ms"), "got: {output}");
    }

    #[test]
    fn pretty_print_render_and_stall() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_render(&RenderEvent {
            frame_index: 4,
            viewport: ViewportId(2),
            drawn: 10,
            culled: 3,
        });
        sink.on_stall(&StallEvent {
            frame_index: 5,
            delta: 200.0,
            threshold: 160.0,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[render] frame=4 viewport=2 drawn=10 culled=3");
        assert!(lines[1].starts_with("[stall] frame=5"), "got: {}", lines[1]);
    }
}
