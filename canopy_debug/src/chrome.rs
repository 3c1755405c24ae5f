// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::pretty::{phase_name, transition_name};
use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Host times are already in microseconds and are written unchanged. Stall,
/// timer and render events carry no timestamp of their own; they are placed
/// at the most recent frame tick.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_tick = 0_u64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameTick(e) => {
                last_tick = e.now.micros();
                events.push(json!({
                    "ph": "i",
                    "name": "FrameTick",
                    "cat": "Clock",
                    "ts": last_tick,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "dt_ms": e.dt.as_millis_f64(),
                        "delta": e.delta,
                        "fps": e.fps,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": phase_name(e.phase),
                    "cat": "Frame",
                    "ts": e.timestamp.micros(),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": phase_name(e.phase),
                    "cat": "Frame",
                    "ts": e.timestamp.micros(),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Stall(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Stall",
                    "cat": "Clock",
                    "ts": last_tick,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "delta": e.delta,
                        "threshold": e.threshold,
                    }
                }));
            }
            RecordedEvent::TimerFired(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "TimerFired",
                    "cat": "Timers",
                    "ts": last_tick,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "timer": e.timer,
                        "elapsed_ms": e.elapsed_ms,
                    }
                }));
            }
            RecordedEvent::ClockState(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": transition_name(e.transition),
                    "cat": "Clock",
                    "ts": e.timestamp.micros(),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                }));
            }
            RecordedEvent::Render(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Render",
                    "cat": "Stage",
                    "ts": last_tick,
                    "pid": 0,
                    "tid": e.viewport.0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "drawn": e.drawn,
                        "culled": e.culled,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": s.now.micros(),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "delta": s.delta,
                        "fps": s.fps,
                        "deferred_us": s.deferred_micros,
                        "frame_us": s.frame_micros,
                        "timers_us": s.timers_micros,
                        "timers_fired": s.timers_fired,
                        "stalled": s.stalled,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use canopy_core::node::ViewportId;
    use canopy_core::time::{Duration, HostTime};
    use canopy_core::trace::{
        FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_tick(&FrameTickEvent {
            frame_index: 0,
            now: HostTime(1_000_000),
            dt: Duration(33_000),
            delta: 1.0,
            fps: 30,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Frame,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Frame,
            timestamp: HostTime(1_000_100),
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameTick");
        assert_eq!(parsed[0]["ts"], 1_000_000);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "frame");

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1_000_100);
    }

    #[test]
    fn untimed_events_use_last_tick() {
        let mut rec = RecorderSink::new();
        rec.on_frame_tick(&FrameTickEvent {
            frame_index: 3,
            now: HostTime(2_000),
            dt: Duration(0),
            delta: 0.0,
            fps: 0,
        });
        rec.on_render(&RenderEvent {
            frame_index: 3,
            viewport: ViewportId(4),
            drawn: 2,
            culled: 1,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[1]["name"], "Render");
        assert_eq!(parsed[1]["ts"], 2_000);
        assert_eq!(parsed[1]["tid"], 4);
        assert_eq!(parsed[1]["args"]["culled"], 1);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty(), "no events recorded");
    }
}
