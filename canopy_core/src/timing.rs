// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-tick timing values.
//!
//! The [`FrameClock`](crate::clock::FrameClock) produces one [`FrameTick`] per
//! animation-frame callback. Per-frame targets receive it by reference and
//! scale their motion by [`FrameTick::delta`] so that movement stays constant
//! regardless of the host's actual refresh cadence.
//!
//! ```text
//!   host rAF ──► FrameClock::tick() ──► FrameTick
//!                                          │
//!            ┌─────────────────────────────┤
//!            ▼                             ▼
//!   FrameTarget::frame(&tick)      timer elapsed += frame_rate * delta
//! ```

use crate::time::{Duration, HostTime};

/// Timing for a single tick of the frame clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Monotonically increasing tick counter.
    pub frame_index: u64,
    /// Host time when the tick ran.
    pub now: HostTime,
    /// Wall-clock time since the previous tick.
    ///
    /// Zero on the very first tick. After a resume it is measured from the
    /// resume, not from the last tick before the pause.
    pub dt: Duration,
    /// `dt` in milliseconds divided by the nominal frame rate.
    ///
    /// A value of 1.0 means "one nominal frame's worth of progress".
    pub delta: f64,
    /// Instantaneous frames per second, `round(1000 / dt_ms)`, or 0 when `dt`
    /// is zero.
    pub fps: u32,
    /// Nominal frame rate the clock was configured with.
    pub frame_rate: f64,
    /// Normalized pixel ratio (1 or 2).
    pub pixel_ratio: f64,
    /// Whether per-frame targets and timers were skipped this tick because
    /// `delta` exceeded the stall threshold.
    pub stalled: bool,
}

impl FrameTick {
    /// Builds the tick for `now` given the previous tick time.
    ///
    /// `previous` of `None` yields a zero `dt`.
    #[must_use]
    pub fn measure(
        frame_index: u64,
        now: HostTime,
        previous: Option<HostTime>,
        frame_rate: f64,
        pixel_ratio: f64,
    ) -> Self {
        let dt = previous.map_or(Duration::ZERO, |p| now.saturating_duration_since(p));
        let dt_ms = dt.as_millis_f64();
        Self {
            frame_index,
            now,
            dt,
            delta: dt_ms / frame_rate,
            fps: fps_for(dt_ms),
            frame_rate,
            pixel_ratio,
            stalled: false,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "fps is clamped to u32 range before conversion"
)]
fn fps_for(dt_ms: f64) -> u32 {
    if dt_ms <= 0.0 {
        return 0;
    }
    (1000.0 / dt_ms).round().min(f64::from(u32::MAX)) as u32
}
