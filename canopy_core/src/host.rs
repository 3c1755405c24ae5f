// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform integrations.
//!
//! The frame clock never talks to a window system directly. A host provides
//! the following pieces through [`FrameHost`]:
//!
//! - **Time**: `now()` on the same monotonic clock as animation frames.
//! - **Tick source**: `request_frame()` asks for exactly one more
//!   animation-frame callback. When it fires the host calls
//!   [`FrameClock::tick`](crate::clock::FrameClock::tick).
//! - **Wall-clock timeout**: `set_timeout()` runs a one-shot callback after a
//!   real-time delay. The clock uses it for the delayed resume after a
//!   visibility change.
//! - **Window metrics**: `window_size()` feeds
//!   [`FrameClock::window_bounds`](crate::clock::FrameClock::window_bounds).
//! - **Raster capability**: `scratch_surface()` returns an offscreen
//!   [`Surface`] for text metrics, or `None` when raster drawing is not
//!   available at all.
//!
//! Resize, visibility, and pointer signals are pushed into the clock and
//! viewports by the host as they happen (see
//! [`FrameClock::notify_resize`](crate::clock::FrameClock::notify_resize),
//! [`FrameClock::set_visibility`](crate::clock::FrameClock::set_visibility),
//! and [`Stage::pointer_event`](crate::stage::Stage::pointer_event)).
//!
//! [`ManualHost`] is a deterministic host for tests and headless runs.

use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Size;

use crate::surface::{RecordingSurface, Surface};
use crate::time::{Duration, HostTime};

/// Page visibility as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisibilityState {
    /// The page is on screen.
    Visible,
    /// The page is backgrounded or minimized.
    Hidden,
}

/// Window bounds after padding has been subtracted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowBounds {
    /// Top edge (the top padding).
    pub top: f64,
    /// Left edge (the left padding).
    pub left: f64,
    /// Usable width.
    pub width: f64,
    /// Usable height.
    pub height: f64,
    /// `left + width`.
    pub right: f64,
    /// `top + height`.
    pub bottom: f64,
}

/// Services the frame clock needs from its host.
pub trait FrameHost {
    /// Current host time.
    fn now(&self) -> HostTime;

    /// Requests one more animation-frame callback.
    fn request_frame(&self);

    /// Runs `callback` once after `delay` of real time.
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>);

    /// Inner size of the host window in logical pixels.
    fn window_size(&self) -> Size;

    /// An offscreen surface for measuring text, or `None` if the host has no
    /// raster drawing capability.
    fn scratch_surface(&self) -> Option<Box<dyn Surface>>;
}

// ---------------------------------------------------------------------------
// ManualHost
// ---------------------------------------------------------------------------

struct PendingTimeout {
    due: HostTime,
    callback: Box<dyn FnOnce()>,
}

/// A [`FrameHost`] driven entirely by the caller.
///
/// Time only moves when [`advance`](Self::advance) is called. Frame requests
/// are counted rather than scheduled; the caller decides when to tick.
pub struct ManualHost {
    now: Cell<HostTime>,
    frame_requests: Cell<u64>,
    timeouts: RefCell<Vec<PendingTimeout>>,
    window: Cell<Size>,
    raster: bool,
}

impl fmt::Debug for ManualHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualHost")
            .field("now", &self.now.get())
            .field("frame_requests", &self.frame_requests.get())
            .field("pending_timeouts", &self.timeouts.borrow().len())
            .field("window", &self.window.get())
            .field("raster", &self.raster)
            .finish()
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualHost {
    /// Creates a host at time 1s with a 1024x768 window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(HostTime::from_millis(1_000)),
            frame_requests: Cell::new(0),
            timeouts: RefCell::new(Vec::new()),
            window: Cell::new(Size::new(1024.0, 768.0)),
            raster: true,
        }
    }

    /// Creates a host that reports no raster capability.
    #[must_use]
    pub fn without_raster() -> Self {
        Self {
            raster: false,
            ..Self::new()
        }
    }

    /// Moves time forward and runs any wall-clock timeouts that came due.
    ///
    /// Returns the number of timeouts fired.
    pub fn advance(&self, by: Duration) -> usize {
        self.now.set(self.now.get() + by);
        let now = self.now.get();
        let due: Vec<PendingTimeout> = {
            let mut timeouts = self.timeouts.borrow_mut();
            let (due, pending): (Vec<_>, Vec<_>) =
                timeouts.drain(..).partition(|t| t.due <= now);
            *timeouts = pending;
            due
        };
        let fired = due.len();
        for t in due {
            (t.callback)();
        }
        fired
    }

    /// Number of animation frames requested so far.
    #[must_use]
    pub fn frame_requests(&self) -> u64 {
        self.frame_requests.get()
    }

    /// Number of wall-clock timeouts still waiting.
    #[must_use]
    pub fn pending_timeouts(&self) -> usize {
        self.timeouts.borrow().len()
    }

    /// Changes the reported window size.
    pub fn set_window_size(&self, size: Size) {
        self.window.set(size);
    }
}

impl FrameHost for ManualHost {
    fn now(&self) -> HostTime {
        self.now.get()
    }

    fn request_frame(&self) {
        self.frame_requests.set(self.frame_requests.get() + 1);
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
        let due = self.now.get() + delay;
        self.timeouts
            .borrow_mut()
            .push(PendingTimeout { due, callback });
    }

    fn window_size(&self) -> Size {
        self.window.get()
    }

    fn scratch_surface(&self) -> Option<Box<dyn Surface>> {
        if self.raster {
            Some(Box::new(RecordingSurface::new()))
        } else {
            None
        }
    }
}
