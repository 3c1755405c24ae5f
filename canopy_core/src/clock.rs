// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame clock: a cooperative, single-threaded tick loop.
//!
//! A [`FrameClock`] is constructed once per application and shared by
//! `Rc`. The host calls [`FrameClock::tick`] from its animation-frame
//! callback; the clock asks for the next callback through
//! [`FrameHost::request_frame`] for as long as it is not paused.
//!
//! Each tick runs three phases in a fixed order:
//!
//! 1. **Deferred**: one-shot calls queued with
//!    [`call_later`](FrameClock::call_later) (and pending timer
//!    registrations) run in FIFO order until the queue is empty. This
//!    happens even while paused.
//! 2. **Frame**: every [`FrameTarget`] on the stack runs in registration
//!    order. The first error aborts the rest of the tick.
//! 3. **Timers**: every registered timer's elapsed time grows by
//!    `frame_rate * delta` milliseconds; timers whose elapsed time reaches
//!    their delay fire and are removed.
//!
//! Phases 2 and 3 are skipped while paused, and also on any tick whose
//! `delta` reaches [`ClockConfig::stall_threshold`].
//!
//! The clock is re-entrant: targets, timers, and listeners may call back into
//! it (queue calls, start or cancel timers, add or remove targets) while a
//! tick is in progress. No internal borrow is held across a callback.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use kurbo::Insets;

use crate::error::FrameError;
use crate::host::{FrameHost, VisibilityState, WindowBounds};
use crate::surface::{Surface, TextMetrics};
use crate::time::{Duration, HostTime};
use crate::timing::FrameTick;
use crate::trace::{
    ClockStateEvent, ClockTransition, FrameSummaryBuilder, FrameTickEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RenderEvent, StallEvent, TimerFiredEvent, TraceSink, Tracer,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the [`FrameClock`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockConfig {
    /// Nominal frame duration divisor: `delta = dt_ms / frame_rate`.
    pub frame_rate: f64,
    /// Ticks with `delta` at or above this value skip targets and timers.
    pub stall_threshold: f64,
    /// Real-time delay between the page becoming visible and the clock
    /// resuming.
    pub resume_delay: Duration,
    /// Padding subtracted from the window when computing
    /// [`WindowBounds`]. `x0` is left, `y0` top, `x1` right, `y1` bottom.
    pub window_padding: Insets,
    /// Physical-to-logical backing store ratio, normalized to 1 or 2.
    pub device_backing_ratio: f64,
    /// Device pixel ratio used for image assets, normalized to 1 or 2.
    pub pixel_ratio: f64,
}

impl ClockConfig {
    /// Default nominal frame rate.
    pub const DEFAULT_FRAME_RATE: f64 = 30.0;

    /// Default stall threshold.
    pub const DEFAULT_STALL_THRESHOLD: f64 = 160.0;

    /// Standard-density display.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            frame_rate: Self::DEFAULT_FRAME_RATE,
            stall_threshold: Self::DEFAULT_STALL_THRESHOLD,
            resume_delay: Duration::from_millis(100),
            window_padding: Insets::ZERO,
            device_backing_ratio: 1.0,
            pixel_ratio: 1.0,
        }
    }

    /// High-density display with 2x backing store and 2x image assets.
    #[must_use]
    pub const fn retina() -> Self {
        Self {
            device_backing_ratio: 2.0,
            pixel_ratio: 2.0,
            ..Self::standard()
        }
    }

    /// Sets both ratios from raw host values, normalizing each to 1 or 2.
    #[must_use]
    pub fn with_device_ratios(mut self, backing_ratio: f64, pixel_ratio: f64) -> Self {
        self.device_backing_ratio = normalize_ratio(backing_ratio);
        self.pixel_ratio = normalize_ratio(pixel_ratio);
        self
    }

    /// Sets the window padding.
    #[must_use]
    pub const fn with_window_padding(mut self, padding: Insets) -> Self {
        self.window_padding = padding;
        self
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Normalizes a raw device ratio: anything at or above 2 becomes 2, anything
/// else 1.
#[must_use]
pub fn normalize_ratio(raw: f64) -> f64 {
    if raw >= 2.0 { 2.0 } else { 1.0 }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Lifecycle state of the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockState {
    /// Built but `startup` not yet called.
    Constructed,
    /// `startup` called; no tick has run yet.
    Started,
    /// Paused by `toggle(true)` or a hidden page.
    Paused,
    /// Ticking.
    Running,
}

/// Notifications delivered to [`FrameClock::subscribe`] listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockEvent {
    /// `startup` ran.
    Started,
    /// The clock paused.
    Paused,
    /// The clock resumed.
    Resumed,
    /// The host reported a visibility change.
    Visibility(VisibilityState),
    /// Window bounds changed and were sent to every resizable.
    Resized(WindowBounds),
}

/// Something the clock drives once per tick.
pub trait FrameTarget {
    /// Runs one frame.
    ///
    /// # Errors
    ///
    /// An error aborts the remaining targets and timers of this tick and is
    /// returned from [`FrameClock::tick`].
    fn frame(&mut self, tick: &FrameTick) -> Result<(), FrameError>;
}

/// Something that reacts to window bounds changes.
pub trait Resizable {
    /// Receives the current window bounds.
    fn resize(&mut self, bounds: &WindowBounds);
}

/// Handle returned by [`FrameClock::timeout`], used to cancel the timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw id (for diagnostics only).
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerHandle({})", self.0)
    }
}

type Listener = Box<dyn FnMut(&ClockEvent)>;

struct Timer {
    handle: TimerHandle,
    elapsed: f64,
    delay: f64,
    callback: Box<dyn FnOnce()>,
}

enum Deferred {
    Call(Box<dyn FnOnce()>),
    Register(Timer),
}

// ---------------------------------------------------------------------------
// FrameClock
// ---------------------------------------------------------------------------

/// The per-application tick loop.
///
/// If the host has no raster capability
/// ([`FrameHost::scratch_surface`] returns `None`) the clock is *inert*: no
/// target, timer, call, or resizable is ever registered, ticks do nothing,
/// and only the lifecycle events still fire.
pub struct FrameClock {
    host: Rc<dyn FrameHost>,
    config: ClockConfig,
    this: Weak<Self>,
    inert: bool,

    // -- Lifecycle --
    state: Cell<ClockState>,
    paused: Cell<bool>,
    visibility: Cell<VisibilityState>,

    // -- Timing --
    frame_index: Cell<u64>,
    last_tick: Cell<Option<HostTime>>,
    delta: Cell<f64>,
    fps: Cell<u32>,

    // -- Registries --
    calls: RefCell<VecDeque<Deferred>>,
    stack: RefCell<Vec<Rc<RefCell<dyn FrameTarget>>>>,
    timers: RefCell<Vec<Timer>>,
    next_timer: Cell<u64>,
    resizables: RefCell<Vec<Rc<RefCell<dyn Resizable>>>>,
    listeners: RefCell<Vec<Listener>>,

    // -- Text metrics --
    scratch: RefCell<Option<Box<dyn Surface>>>,
    scratch_font: RefCell<String>,

    sink: RefCell<Option<Box<dyn TraceSink>>>,
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("config", &self.config)
            .field("inert", &self.inert)
            .field("state", &self.state.get())
            .field("frame_index", &self.frame_index.get())
            .field("targets", &self.stack.borrow().len())
            .field("timers", &self.timers.borrow().len())
            .field("calls", &self.calls.borrow().len())
            .finish_non_exhaustive()
    }
}

impl FrameClock {
    /// Creates a clock bound to `host`.
    #[must_use]
    pub fn new(host: Rc<dyn FrameHost>, config: ClockConfig) -> Rc<Self> {
        let scratch = host.scratch_surface();
        Rc::new_cyclic(|this| Self {
            inert: scratch.is_none(),
            host,
            config,
            this: this.clone(),
            state: Cell::new(ClockState::Constructed),
            paused: Cell::new(false),
            visibility: Cell::new(VisibilityState::Visible),
            frame_index: Cell::new(0),
            last_tick: Cell::new(None),
            delta: Cell::new(0.0),
            fps: Cell::new(0),
            calls: RefCell::new(VecDeque::new()),
            stack: RefCell::new(Vec::new()),
            timers: RefCell::new(Vec::new()),
            next_timer: Cell::new(0),
            resizables: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            scratch: RefCell::new(scratch),
            scratch_font: RefCell::new(String::new()),
            sink: RefCell::new(None),
        })
    }

    // -- Accessors --

    /// The configuration the clock was built with.
    #[must_use]
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClockState {
        self.state.get()
    }

    /// Whether the clock is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// Whether the host lacked raster capability at construction.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// Frame-rate-normalized delta of the last tick.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta.get()
    }

    /// Instantaneous frames per second of the last tick.
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.fps.get()
    }

    /// Number of targets on the per-frame stack.
    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Number of registered (not merely scheduled) timers.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Installs a trace sink, replacing any previous one.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }

    /// Removes and returns the installed trace sink.
    pub fn take_trace_sink(&self) -> Option<Box<dyn TraceSink>> {
        self.sink.borrow_mut().take()
    }

    // -- Lifecycle --

    /// Moves to [`ClockState::Started`] and requests the first frame.
    pub fn startup(&self) {
        self.state.set(ClockState::Started);
        if !self.inert {
            self.host.request_frame();
        }
        self.transition(ClockTransition::Started, &ClockEvent::Started);
    }

    /// Pauses (`true`) or resumes (`false`) the clock.
    ///
    /// Resuming resets the timing baseline so the time spent paused never
    /// shows up as `delta`, and requests a frame if the clock had stopped
    /// requesting them.
    pub fn toggle(&self, pause: bool) {
        let was_paused = self.paused.replace(pause);
        if pause {
            self.state.set(ClockState::Paused);
            self.transition(ClockTransition::Paused, &ClockEvent::Paused);
            return;
        }
        self.last_tick.set(Some(self.host.now()));
        let started = self.state.get() != ClockState::Constructed;
        if was_paused && started && !self.inert {
            self.host.request_frame();
        }
        if started {
            self.state.set(ClockState::Running);
        }
        self.transition(ClockTransition::Resumed, &ClockEvent::Resumed);
    }

    /// Feeds a host visibility change.
    ///
    /// Hidden pauses immediately. Visible resumes after
    /// [`ClockConfig::resume_delay`] of real time, unless the page was hidden
    /// again in the meantime.
    pub fn set_visibility(&self, visibility: VisibilityState) {
        self.last_tick.set(Some(self.host.now()));
        self.visibility.set(visibility);
        match visibility {
            VisibilityState::Hidden => self.toggle(true),
            VisibilityState::Visible => {
                let this = self.this.clone();
                self.host.set_timeout(
                    self.config.resume_delay,
                    Box::new(move || {
                        if let Some(clock) = this.upgrade()
                            && clock.visibility.get() == VisibilityState::Visible
                        {
                            clock.toggle(false);
                        }
                    }),
                );
            }
        }
        let transition = match visibility {
            VisibilityState::Hidden => ClockTransition::Hidden,
            VisibilityState::Visible => ClockTransition::Visible,
        };
        self.transition(transition, &ClockEvent::Visibility(visibility));
    }

    /// Registers a lifecycle listener.
    pub fn subscribe(&self, listener: impl FnMut(&ClockEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    // -- Registries --

    /// Appends a target to the per-frame stack.
    pub fn add_to_stack(&self, target: Rc<RefCell<dyn FrameTarget>>) {
        if self.inert {
            return;
        }
        self.stack.borrow_mut().push(target);
    }

    /// Removes a target from the per-frame stack. Returns whether it was
    /// present.
    pub fn remove_from_stack<T: ?Sized>(&self, target: &Rc<RefCell<T>>) -> bool {
        let ptr = Rc::as_ptr(target).cast::<()>();
        let mut stack = self.stack.borrow_mut();
        match stack.iter().position(|t| Rc::as_ptr(t).cast::<()>() == ptr) {
            Some(i) => {
                stack.remove(i);
                true
            }
            None => false,
        }
    }

    /// Queues `callback` to run at the start of the next tick. Called from
    /// inside a deferred call, it runs later in the same drain.
    pub fn call_later(&self, callback: impl FnOnce() + 'static) {
        if self.inert {
            return;
        }
        self.calls
            .borrow_mut()
            .push_back(Deferred::Call(Box::new(callback)));
    }

    /// Starts a countdown timer that fires once `delay` of clock time has
    /// accumulated.
    ///
    /// The timer is registered by the next deferred drain. Created from a
    /// frame target or another timer, it first advances on the next tick;
    /// created inside a deferred call, it advances in the same tick. Clock
    /// time only accumulates while the clock is running.
    pub fn timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
        let handle = TimerHandle(self.next_timer.get());
        self.next_timer.set(handle.0 + 1);
        if !self.inert {
            self.calls.borrow_mut().push_back(Deferred::Register(Timer {
                handle,
                elapsed: 0.0,
                delay: delay.as_millis_f64(),
                callback: Box::new(callback),
            }));
        }
        handle
    }

    /// Cancels a timer that has not fired yet. Returns whether it was found.
    ///
    /// Timers still waiting for registration are cancelled too.
    pub fn cancel_timeout(&self, handle: TimerHandle) -> bool {
        {
            let mut timers = self.timers.borrow_mut();
            if let Some(i) = timers.iter().position(|t| t.handle == handle) {
                timers.remove(i);
                return true;
            }
        }
        let mut calls = self.calls.borrow_mut();
        let pending = calls
            .iter()
            .position(|c| matches!(c, Deferred::Register(t) if t.handle == handle));
        match pending {
            Some(i) => {
                calls.remove(i);
                true
            }
            None => false,
        }
    }

    /// Registers a resizable and immediately sends it the current bounds.
    pub fn add_resizable(&self, resizable: Rc<RefCell<dyn Resizable>>) {
        if self.inert {
            return;
        }
        let bounds = self.window_bounds();
        self.resizables.borrow_mut().push(Rc::clone(&resizable));
        resizable.borrow_mut().resize(&bounds);
    }

    /// Unregisters a resizable. Returns whether it was present.
    pub fn remove_resizable<T: ?Sized>(&self, resizable: &Rc<RefCell<T>>) -> bool {
        let ptr = Rc::as_ptr(resizable).cast::<()>();
        let mut resizables = self.resizables.borrow_mut();
        match resizables
            .iter()
            .position(|r| Rc::as_ptr(r).cast::<()>() == ptr)
        {
            Some(i) => {
                resizables.remove(i);
                true
            }
            None => false,
        }
    }

    /// Feeds a host window resize: sends the new bounds to every resizable,
    /// then notifies listeners.
    pub fn notify_resize(&self) {
        let bounds = self.window_bounds();
        let resizables: Vec<_> = self.resizables.borrow().clone();
        for r in resizables {
            r.borrow_mut().resize(&bounds);
        }
        self.emit(&ClockEvent::Resized(bounds));
    }

    /// Host window bounds with [`ClockConfig::window_padding`] applied.
    #[must_use]
    pub fn window_bounds(&self) -> WindowBounds {
        let size = self.host.window_size();
        let pad = self.config.window_padding;
        let width = size.width - (pad.x0 + pad.x1);
        let height = size.height - (pad.y0 + pad.y1);
        WindowBounds {
            top: pad.y0,
            left: pad.x0,
            width,
            height,
            right: pad.x0 + width,
            bottom: pad.y0 + height,
        }
    }

    /// Measures `text` on the offscreen scratch surface, switching its font
    /// first if `font` differs from the last one used.
    ///
    /// An inert clock reports zero width.
    pub fn measure_text(&self, text: &str, font: Option<&str>) -> TextMetrics {
        let mut scratch = self.scratch.borrow_mut();
        let Some(surface) = scratch.as_deref_mut() else {
            return TextMetrics::default();
        };
        if let Some(font) = font {
            let mut current = self.scratch_font.borrow_mut();
            if *current != font {
                surface.set_font(font);
                font.clone_into(&mut current);
            }
        }
        surface.measure_text(text)
    }

    /// Reports a viewport render pass to the trace sink.
    pub fn trace_render(&self, e: &RenderEvent) {
        self.trace(|t| t.render(e));
    }

    // -- Tick --

    /// Runs one tick. Called by the host from its animation-frame callback.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a [`FrameTarget`]; the remaining
    /// targets and all timers are skipped for this tick. The next frame has
    /// already been requested at that point.
    pub fn tick(&self) -> Result<FrameTick, FrameError> {
        let now = self.host.now();
        let frame_index = self.frame_index.get();
        self.frame_index.set(frame_index + 1);
        let mut tick = FrameTick::measure(
            frame_index,
            now,
            self.last_tick.get(),
            self.config.frame_rate,
            self.config.pixel_ratio,
        );
        self.last_tick.set(Some(now));
        self.delta.set(tick.delta);
        self.fps.set(tick.fps);
        if self.inert {
            return Ok(tick);
        }
        if self.state.get() == ClockState::Started {
            self.state.set(ClockState::Running);
        }

        let tick_event = FrameTickEvent::from(&tick);
        let mut summary = FrameSummaryBuilder::new(&tick_event);
        self.trace(|t| t.frame_tick(&tick_event));

        self.begin_phase(&mut summary, frame_index, PhaseKind::Deferred);
        self.drain_deferred();
        self.end_phase(&mut summary, frame_index, PhaseKind::Deferred);

        if self.paused.get() {
            self.finish_summary(summary);
            return Ok(tick);
        }
        self.host.request_frame();

        if tick.delta >= self.config.stall_threshold {
            tick.stalled = true;
            summary.set_stalled(true);
            let stall = StallEvent {
                frame_index,
                delta: tick.delta,
                threshold: self.config.stall_threshold,
            };
            self.trace(|t| t.stall(&stall));
            self.finish_summary(summary);
            return Ok(tick);
        }

        self.begin_phase(&mut summary, frame_index, PhaseKind::Frame);
        self.run_targets(&tick)?;
        self.end_phase(&mut summary, frame_index, PhaseKind::Frame);

        self.begin_phase(&mut summary, frame_index, PhaseKind::Timers);
        self.run_timers(&tick, &mut summary);
        self.end_phase(&mut summary, frame_index, PhaseKind::Timers);

        self.finish_summary(summary);
        Ok(tick)
    }

    /// Runs queued calls until the queue is empty, including calls queued
    /// while draining.
    fn drain_deferred(&self) {
        loop {
            let Some(call) = self.calls.borrow_mut().pop_front() else {
                break;
            };
            match call {
                Deferred::Call(callback) => callback(),
                Deferred::Register(timer) => self.timers.borrow_mut().push(timer),
            }
        }
    }

    fn run_targets(&self, tick: &FrameTick) -> Result<(), FrameError> {
        let targets: Vec<_> = self.stack.borrow().clone();
        for target in targets {
            // Skip targets removed by an earlier target this tick.
            if !self.stack.borrow().iter().any(|t| Rc::ptr_eq(t, &target)) {
                continue;
            }
            target.borrow_mut().frame(tick)?;
        }
        Ok(())
    }

    fn run_timers(&self, tick: &FrameTick, summary: &mut FrameSummaryBuilder) {
        let increment = tick.frame_rate * tick.delta;
        let mut i = 0;
        loop {
            let fired = {
                let mut timers = self.timers.borrow_mut();
                let Some(timer) = timers.get_mut(i) else {
                    break;
                };
                timer.elapsed += increment;
                if timer.elapsed >= timer.delay {
                    // Compact in place; the next timer now sits at `i`.
                    Some(timers.remove(i))
                } else {
                    i += 1;
                    None
                }
            };
            if let Some(timer) = fired {
                summary.timer_fired();
                let e = TimerFiredEvent {
                    frame_index: tick.frame_index,
                    timer: timer.handle.0,
                    elapsed_ms: timer.elapsed,
                };
                self.trace(|t| t.timer_fired(&e));
                (timer.callback)();
            }
        }
    }

    // -- Helpers --

    fn begin_phase(&self, summary: &mut FrameSummaryBuilder, frame_index: u64, phase: PhaseKind) {
        let timestamp = self.host.now();
        summary.phase_begin(phase, timestamp);
        self.trace(|t| {
            t.phase_begin(&PhaseBeginEvent {
                frame_index,
                phase,
                timestamp,
            });
        });
    }

    fn end_phase(&self, summary: &mut FrameSummaryBuilder, frame_index: u64, phase: PhaseKind) {
        let timestamp = self.host.now();
        summary.phase_end(phase, timestamp);
        self.trace(|t| {
            t.phase_end(&PhaseEndEvent {
                frame_index,
                phase,
                timestamp,
            });
        });
    }

    fn finish_summary(&self, summary: FrameSummaryBuilder) {
        let summary = summary.finish();
        self.trace(|t| t.frame_summary(&summary));
    }

    fn transition(&self, transition: ClockTransition, event: &ClockEvent) {
        let e = ClockStateEvent {
            timestamp: self.host.now(),
            transition,
        };
        self.trace(|t| t.clock_state(&e));
        self.emit(event);
    }

    fn trace(&self, f: impl FnOnce(&mut Tracer<'_>)) {
        let mut sink = self.sink.borrow_mut();
        let mut tracer = match sink.as_deref_mut() {
            Some(s) => Tracer::new(s),
            None => Tracer::none(),
        };
        f(&mut tracer);
    }

    fn emit(&self, event: &ClockEvent) {
        let mut listeners = core::mem::take(&mut *self.listeners.borrow_mut());
        for listener in &mut listeners {
            listener(event);
        }
        // Keep listeners subscribed during dispatch, after the existing ones.
        let mut slot = self.listeners.borrow_mut();
        listeners.append(&mut slot);
        *slot = listeners;
    }
}
