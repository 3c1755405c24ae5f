// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. Floating-point fields are
//! stored as their IEEE-754 bit patterns. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].

use canopy_core::node::ViewportId;
use canopy_core::time::{Duration, HostTime};
use canopy_core::trace::{
    ClockStateEvent, ClockTransition, FrameSummary, FrameTickEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RenderEvent, StallEvent, TimerFiredEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_TICK: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_STALL: u8 = 4;
const TAG_TIMER_FIRED: u8 = 5;
const TAG_CLOCK_STATE: u8 = 6;
const TAG_RENDER: u8 = 7;
const TAG_FRAME_SUMMARY: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Deferred => 0,
            PhaseKind::Frame => 1,
            PhaseKind::Timers => 2,
        });
    }

    fn write_transition(&mut self, t: ClockTransition) {
        self.write_u8(match t {
            ClockTransition::Started => 0,
            ClockTransition::Paused => 1,
            ClockTransition::Resumed => 2,
            ClockTransition::Hidden => 3,
            ClockTransition::Visible => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.write_u8(TAG_FRAME_TICK);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.micros());
        self.write_u64(e.dt.micros());
        self.write_f64(e.delta);
        self.write_u32(e.fps);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.micros());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.micros());
    }

    fn on_stall(&mut self, e: &StallEvent) {
        self.write_u8(TAG_STALL);
        self.write_u64(e.frame_index);
        self.write_f64(e.delta);
        self.write_f64(e.threshold);
    }

    fn on_timer_fired(&mut self, e: &TimerFiredEvent) {
        self.write_u8(TAG_TIMER_FIRED);
        self.write_u64(e.frame_index);
        self.write_u64(e.timer);
        self.write_f64(e.elapsed_ms);
    }

    fn on_clock_state(&mut self, e: &ClockStateEvent) {
        self.write_u8(TAG_CLOCK_STATE);
        self.write_u64(e.timestamp.micros());
        self.write_transition(e.transition);
    }

    fn on_render(&mut self, e: &RenderEvent) {
        self.write_u8(TAG_RENDER);
        self.write_u64(e.frame_index);
        self.write_u32(e.viewport.0);
        self.write_u32(e.drawn);
        self.write_u32(e.culled);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.now.micros());
        self.write_f64(s.delta);
        self.write_u32(s.fps);
        self.write_u64(s.deferred_micros);
        self.write_u64(s.frame_micros);
        self.write_u64(s.timers_micros);
        self.write_u32(s.timers_fired);
        self.write_u8(u8::from(s.stalled));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameTickEvent`].
    FrameTick(FrameTickEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`StallEvent`].
    Stall(StallEvent),
    /// A [`TimerFiredEvent`].
    TimerFired(TimerFiredEvent),
    /// A [`ClockStateEvent`].
    ClockState(ClockStateEvent),
    /// A [`RenderEvent`].
    Render(RenderEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Deferred,
            1 => PhaseKind::Frame,
            _ => PhaseKind::Timers,
        })
    }

    fn read_transition(&mut self) -> Option<ClockTransition> {
        Some(match self.read_u8()? {
            0 => ClockTransition::Started,
            1 => ClockTransition::Paused,
            2 => ClockTransition::Resumed,
            3 => ClockTransition::Hidden,
            _ => ClockTransition::Visible,
        })
    }

    fn decode_frame_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameTick(FrameTickEvent {
            frame_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            dt: Duration(self.read_u64()?),
            delta: self.read_f64()?,
            fps: self.read_u32()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_stall(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Stall(StallEvent {
            frame_index: self.read_u64()?,
            delta: self.read_f64()?,
            threshold: self.read_f64()?,
        }))
    }

    fn decode_timer_fired(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TimerFired(TimerFiredEvent {
            frame_index: self.read_u64()?,
            timer: self.read_u64()?,
            elapsed_ms: self.read_f64()?,
        }))
    }

    fn decode_clock_state(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ClockState(ClockStateEvent {
            timestamp: HostTime(self.read_u64()?),
            transition: self.read_transition()?,
        }))
    }

    fn decode_render(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Render(RenderEvent {
            frame_index: self.read_u64()?,
            viewport: ViewportId(self.read_u32()?),
            drawn: self.read_u32()?,
            culled: self.read_u32()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            now: HostTime(self.read_u64()?),
            delta: self.read_f64()?,
            fps: self.read_u32()?,
            deferred_micros: self.read_u64()?,
            frame_micros: self.read_u64()?,
            timers_micros: self.read_u64()?,
            timers_fired: self.read_u32()?,
            stalled: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_TICK => self.decode_frame_tick(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_STALL => self.decode_stall(),
            TAG_TIMER_FIRED => self.decode_timer_fired(),
            TAG_CLOCK_STATE => self.decode_clock_state(),
            TAG_RENDER => self.decode_render(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
