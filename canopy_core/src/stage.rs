// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The viewport: a display tree bound to one raster surface.
//!
//! A [`Stage`] owns a [`NodeStore`] whose root is attached to the stage's
//! [`ViewportId`]. Every node added under the root (directly or through a
//! subtree) carries that id as a lookup-only back-reference.
//!
//! The stage is a [`FrameTarget`]: on each clock tick it clears (or fills,
//! when opaque) its surface and renders the tree. It is also a
//! [`Resizable`]: window resizes are forwarded to every drawable in the
//! tree.
//!
//! # Pointer input
//!
//! Handlers are registered per target node and [`PointerEventKind`]. All
//! handlers for one node form an *observer*; observers are kept in
//! registration order.
//!
//! - **Move** updates every observer's hover state, firing `Over` (and
//!   `MouseMove`) on entry and `Out` on exit, then sets the surface cursor.
//! - **Discrete events** (click, press, release, touch start) walk the
//!   observers from last-registered to first and fire only the first whose
//!   target contains the pointer. Registration order, not paint order,
//!   decides which overlapping target wins.
//! - **Touch** is folded into the mouse vocabulary: touch start fires
//!   `MouseDown` then `TouchStart`; touch end fires `MouseUp` then `Click`.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Point, Rect, Size, Vec2};

use crate::clock::{FrameClock, FrameTarget, Resizable};
use crate::error::{FrameError, SceneError};
use crate::host::WindowBounds;
use crate::node::{FrameInfo, Node, NodeId, NodeStore, RenderStats, ViewportId};
use crate::surface::Surface;
use crate::timing::FrameTick;
use crate::trace::RenderEvent;

/// Cursor shown over a hovered target that has no cursor of its own.
pub const POINTER_CURSOR: &str = "pointer";

/// Cursor restored when the stage is disabled.
pub const AUTO_CURSOR: &str = "auto";

/// Construction parameters for a [`Stage`].
#[derive(Clone, Debug, PartialEq)]
pub struct StageConfig {
    /// Logical width.
    pub width: f64,
    /// Logical height.
    pub height: f64,
    /// Fill the background each frame instead of clearing to transparent.
    pub opaque: bool,
    /// CSS background color used when `opaque`.
    pub background: String,
    /// Cursor shown when nothing is hovered.
    pub cursor: String,
}

impl StageConfig {
    /// A transparent stage of the given logical size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            opaque: false,
            background: String::from("#FFF"),
            cursor: String::from("default"),
        }
    }

    /// Makes the stage opaque with the given background color.
    #[must_use]
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.opaque = true;
        self.background = color.into();
        self
    }

    /// Sets the idle cursor.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }
}

/// Pointer event kinds a handler can be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// The pointer entered the target.
    Over,
    /// The pointer left the target.
    Out,
    /// Click (or touch end).
    Click,
    /// Button press (or touch start).
    MouseDown,
    /// Button release (or touch end).
    MouseUp,
    /// The pointer entered the target while moving.
    MouseMove,
    /// Touch start.
    TouchStart,
}

impl PointerEventKind {
    const COUNT: usize = 7;

    const fn index(self) -> usize {
        match self {
            Self::Over => 0,
            Self::Out => 1,
            Self::Click => 2,
            Self::MouseDown => 3,
            Self::MouseUp => 4,
            Self::MouseMove => 5,
            Self::TouchStart => 6,
        }
    }
}

/// Raw pointer input from the host.
///
/// Mouse and touch positions are both page coordinates and have the stage
/// offset subtracted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    /// Mouse moved.
    MouseMove(Point),
    /// Mouse button pressed.
    MouseDown(Point),
    /// Mouse button released.
    MouseUp(Point),
    /// Mouse click.
    Click(Point),
    /// First touch began.
    TouchStart(Point),
    /// First touch moved.
    TouchMove(Point),
    /// Touch ended at the last known position.
    TouchEnd,
}

/// What a pointer handler receives.
#[derive(Debug)]
pub struct PointerContext<'a> {
    /// Node the handler was registered for.
    pub target: NodeId,
    /// Event being delivered.
    pub kind: PointerEventKind,
    /// Pointer position in stage coordinates.
    pub pointer: Point,
    /// The stage's nodes, for mutating the target or its relatives.
    pub nodes: &'a mut NodeStore,
}

/// A registered pointer handler.
pub type PointerHandler = Box<dyn FnMut(&mut PointerContext<'_>)>;

struct Observer {
    target: NodeId,
    handlers: [Option<PointerHandler>; PointerEventKind::COUNT],
    is_over: bool,
}

impl Observer {
    fn is_empty(&self) -> bool {
        self.handlers.iter().all(Option::is_none)
    }
}

/// A display tree bound to a raster surface and a pointer stream.
pub struct Stage<S: Surface> {
    id: ViewportId,
    clock: Rc<FrameClock>,
    surface: S,
    config: StageConfig,
    nodes: NodeStore,
    root: NodeId,
    pointer: Point,
    offset: Vec2,
    enabled: bool,
    observers: Vec<Observer>,
    last_stats: RenderStats,
}

impl<S: Surface> fmt::Debug for Stage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("surface", &self.surface)
            .field("nodes", &self.nodes.len())
            .field("pointer", &self.pointer)
            .field("offset", &self.offset)
            .field("enabled", &self.enabled)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

macro_rules! pointer_helpers {
    ($($kind:ident: $add:ident, $remove:ident;)*) => {
        $(
            #[doc = concat!("Registers a `", stringify!($kind), "` handler for `target`.")]
            pub fn $add(
                &mut self,
                target: NodeId,
                handler: impl FnMut(&mut PointerContext<'_>) + 'static,
            ) {
                self.on(PointerEventKind::$kind, target, handler);
            }

            #[doc = concat!("Removes the `", stringify!($kind), "` handler for `target`.")]
            pub fn $remove(&mut self, target: NodeId) -> bool {
                self.off(PointerEventKind::$kind, target)
            }
        )*
    };
}

impl<S: Surface> Stage<S> {
    /// Creates a stage and sizes its backing store for the clock's device
    /// ratio.
    pub fn new(clock: Rc<FrameClock>, surface: S, config: StageConfig) -> Self {
        let id = ViewportId::next();
        let mut nodes = NodeStore::new();
        let root = nodes.create(Node::display());
        nodes.attach_viewport(root.idx, id);
        let mut stage = Self {
            id,
            clock,
            surface,
            config,
            nodes,
            root,
            pointer: Point::ORIGIN,
            offset: Vec2::ZERO,
            enabled: true,
            observers: Vec::new(),
            last_stats: RenderStats::default(),
        };
        stage.pixel_ready();
        stage
    }

    /// Creates a shared stage and registers it as a resizable with its
    /// clock.
    ///
    /// Add it to the clock's per-frame stack with
    /// [`FrameClock::add_to_stack`] to have it drawn every tick.
    pub fn shared(clock: Rc<FrameClock>, surface: S, config: StageConfig) -> Rc<RefCell<Self>>
    where
        S: 'static,
    {
        let stage = Rc::new(RefCell::new(Self::new(Rc::clone(&clock), surface, config)));
        clock.add_resizable(stage.clone());
        stage
    }

    // -- Accessors --

    /// This stage's viewport id.
    #[must_use]
    pub fn id(&self) -> ViewportId {
        self.id
    }

    /// The root node; children added through the stage live under it.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Logical size.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.config.width, self.config.height)
    }

    /// The stage configuration.
    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// The node store.
    #[must_use]
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// The node store, for creating and editing nodes.
    pub fn nodes_mut(&mut self) -> &mut NodeStore {
        &mut self.nodes
    }

    /// The raster surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The raster surface, mutably.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The frame clock driving this stage.
    #[must_use]
    pub fn clock(&self) -> &Rc<FrameClock> {
        &self.clock
    }

    /// Last pointer position in stage coordinates.
    #[must_use]
    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Sets the stage's offset within the page, subtracted from incoming
    /// pointer positions.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Statistics from the most recent render pass.
    #[must_use]
    pub fn last_stats(&self) -> RenderStats {
        self.last_stats
    }

    // -- Tree --

    /// Appends a node to the root.
    ///
    /// # Errors
    ///
    /// See [`NodeStore::add_child`].
    pub fn add_child(&mut self, child: NodeId) -> Result<(), SceneError> {
        self.nodes.add_child(self.root, child)
    }

    /// Inserts a node under the root at `index`.
    ///
    /// # Errors
    ///
    /// See [`NodeStore::add_child_at`].
    pub fn add_child_at(&mut self, child: NodeId, index: usize) -> Result<(), SceneError> {
        self.nodes.add_child_at(self.root, child, index)
    }

    /// Detaches a node from the root. Returns whether it was a child.
    pub fn remove_child(&mut self, child: NodeId) -> bool {
        self.nodes.remove_child(self.root, child)
    }

    /// Moves a root child to `index` in paint order.
    ///
    /// Returns the new index, or `None` if `child` is not a direct child of
    /// the root.
    pub fn set_child_index(&mut self, child: NodeId, index: usize) -> Option<usize> {
        if self.nodes.parent(child) != Some(self.root) {
            return None;
        }
        self.nodes.set_child_index(child, index)
    }

    /// Whether a node's last computed bounds overlap this stage.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.nodes.is_visible(id, self.size())
    }

    // -- Drawing --

    /// Sizes the backing store for the device ratio and installs the
    /// matching scale on the surface.
    ///
    /// When the ratio exceeds 1 the backing width is one physical pixel
    /// narrower than `width * ratio`.
    pub fn pixel_ready(&mut self) {
        let ratio = self.clock.config().device_backing_ratio;
        let height = self.config.height * ratio;
        let width = if ratio > 1.0 {
            self.config.width * ratio - 1.0
        } else {
            self.config.width * ratio
        };
        self.surface.set_backing_size(Size::new(width, height));
        self.surface.scale(ratio, ratio);
    }

    /// Clears or fills the surface, then renders the tree.
    ///
    /// # Errors
    ///
    /// Propagates the first drawable error.
    pub fn draw_frame(&mut self, frame: &FrameInfo) -> Result<RenderStats, SceneError> {
        let full = Rect::from_origin_size(Point::ORIGIN, self.size());
        if self.config.opaque {
            self.surface.set_fill_style(&self.config.background);
            self.surface.fill_rect(full);
        } else {
            self.surface.clear_rect(full);
        }
        let stats = self.nodes.render(self.root, &mut self.surface, frame)?;
        self.last_stats = stats;
        Ok(stats)
    }

    // -- Pointer --

    /// Registers `handler` for `kind` events on `target`, replacing any
    /// previous handler for that pair.
    ///
    /// If the pointer already hovers the target the cursor switches to
    /// [`POINTER_CURSOR`].
    pub fn on(
        &mut self,
        kind: PointerEventKind,
        target: NodeId,
        handler: impl FnMut(&mut PointerContext<'_>) + 'static,
    ) {
        let i = match self.observers.iter().position(|o| o.target == target) {
            Some(i) => i,
            None => {
                self.observers.push(Observer {
                    target,
                    handlers: [const { None }; PointerEventKind::COUNT],
                    is_over: false,
                });
                self.observers.len() - 1
            }
        };
        self.observers[i].handlers[kind.index()] = Some(Box::new(handler));
        if self.nodes.hit_test(target, self.pointer) {
            self.surface.set_cursor(POINTER_CURSOR);
        }
    }

    /// Removes the `kind` handler for `target`. The observer is dropped once
    /// it has no handlers left. Returns whether a handler was removed.
    pub fn off(&mut self, kind: PointerEventKind, target: NodeId) -> bool {
        let Some(i) = self.observers.iter().position(|o| o.target == target) else {
            return false;
        };
        let removed = self.observers[i].handlers[kind.index()].take().is_some();
        if self.observers[i].is_empty() {
            self.observers.remove(i);
        }
        removed
    }

    /// Number of nodes with at least one pointer handler.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Removes every handler for `target`. Returns whether it had any.
    pub fn remove_evented(&mut self, target: NodeId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.target != target);
        self.observers.len() != before
    }

    pointer_helpers! {
        Click: click, remove_click;
        Over: over, remove_over;
        Out: out, remove_out;
        MouseDown: mousedown, remove_mousedown;
        MouseUp: mouseup, remove_mouseup;
        MouseMove: mousemove, remove_mousemove;
        TouchStart: touchstart, remove_touchstart;
    }

    /// Resumes pointer processing.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stops pointer processing and resets the cursor to [`AUTO_CURSOR`].
    pub fn disable(&mut self) {
        self.enabled = false;
        self.surface.set_cursor(AUTO_CURSOR);
    }

    /// Whether pointer input is processed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Feeds one pointer input from the host.
    pub fn pointer_event(&mut self, input: PointerInput) {
        if !self.enabled {
            return;
        }
        self.prune_observers();
        match input {
            PointerInput::MouseMove(p) => {
                self.set_pointer(p);
                self.update_hover();
            }
            PointerInput::MouseDown(p) => {
                self.set_pointer(p);
                self.dispatch(PointerEventKind::MouseDown);
            }
            PointerInput::MouseUp(p) => {
                self.set_pointer(p);
                self.dispatch(PointerEventKind::MouseUp);
            }
            PointerInput::Click(p) => {
                self.set_pointer(p);
                self.dispatch(PointerEventKind::Click);
            }
            PointerInput::TouchStart(p) => {
                self.set_pointer(p);
                self.dispatch(PointerEventKind::MouseDown);
                self.dispatch(PointerEventKind::TouchStart);
            }
            PointerInput::TouchMove(p) => self.set_pointer(p),
            PointerInput::TouchEnd => {
                self.dispatch(PointerEventKind::MouseUp);
                self.dispatch(PointerEventKind::Click);
            }
        }
    }

    /// Drops observers whose target has been destroyed.
    fn prune_observers(&mut self) {
        let nodes = &self.nodes;
        self.observers.retain(|o| nodes.is_alive(o.target));
    }

    fn set_pointer(&mut self, page: Point) {
        self.pointer = page - self.offset;
    }

    fn update_hover(&mut self) {
        let mut cursor: Option<String> = None;
        for i in 0..self.observers.len() {
            let target = self.observers[i].target;
            if !self.nodes.is_alive(target) {
                continue;
            }
            if self.nodes.hit_test(target, self.pointer) {
                if cursor.is_none() {
                    let own = self.nodes.node(target).cursor.as_deref();
                    cursor = Some(own.unwrap_or(POINTER_CURSOR).to_owned());
                }
                if !self.observers[i].is_over {
                    self.fire(i, PointerEventKind::Over);
                    self.fire(i, PointerEventKind::MouseMove);
                }
                self.observers[i].is_over = true;
            } else {
                if self.observers[i].is_over {
                    self.fire(i, PointerEventKind::Out);
                }
                self.observers[i].is_over = false;
            }
        }
        let cursor = cursor.unwrap_or_else(|| self.config.cursor.clone());
        self.surface.set_cursor(&cursor);
    }

    /// Fires `kind` on the topmost-registered observer under the pointer.
    fn dispatch(&mut self, kind: PointerEventKind) -> bool {
        for i in (0..self.observers.len()).rev() {
            let observer = &self.observers[i];
            if observer.handlers[kind.index()].is_some()
                && self.nodes.is_alive(observer.target)
                && self.nodes.hit_test(observer.target, self.pointer)
            {
                self.fire(i, kind);
                return true;
            }
        }
        false
    }

    fn fire(&mut self, i: usize, kind: PointerEventKind) {
        let Self {
            observers,
            nodes,
            pointer,
            ..
        } = self;
        let observer = &mut observers[i];
        if let Some(handler) = observer.handlers[kind.index()].as_mut() {
            handler(&mut PointerContext {
                target: observer.target,
                kind,
                pointer: *pointer,
                nodes,
            });
        }
    }
}

impl<S: Surface> FrameTarget for Stage<S> {
    fn frame(&mut self, tick: &FrameTick) -> Result<(), FrameError> {
        let info = FrameInfo::from_tick(tick, self.size());
        let stats = self.draw_frame(&info)?;
        self.clock.trace_render(&RenderEvent {
            frame_index: tick.frame_index,
            viewport: self.id,
            drawn: stats.drawn,
            culled: stats.culled,
        });
        Ok(())
    }
}

impl<S: Surface> Resizable for Stage<S> {
    fn resize(&mut self, bounds: &WindowBounds) {
        self.nodes.resize(self.root, bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockConfig;
    use crate::host::ManualHost;
    use crate::node::Drawable;
    use crate::surface::{DrawOp, RecordingSurface};

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug)]
    struct Block;

    impl Drawable for Block {
        fn draw(
            &mut self,
            surface: &mut dyn Surface,
            node: &mut Node,
            _frame: &FrameInfo,
        ) -> Result<(), SceneError> {
            surface.fill_rect(Rect::from_origin_size(Point::ORIGIN, node.size));
            Ok(())
        }
    }

    fn clock(config: ClockConfig) -> Rc<FrameClock> {
        FrameClock::new(Rc::new(ManualHost::new()), config)
    }

    fn stage() -> Stage<RecordingSurface> {
        Stage::new(
            clock(ClockConfig::standard()),
            RecordingSurface::new(),
            StageConfig::new(100.0, 100.0),
        )
    }

    fn render(stage: &mut Stage<RecordingSurface>) {
        let info = FrameInfo::still(stage.size());
        stage.draw_frame(&info).unwrap();
    }

    fn logger(log: &Log, tag: &'static str) -> impl FnMut(&mut PointerContext<'_>) + 'static {
        let log = Rc::clone(log);
        move |_| log.borrow_mut().push(tag.to_owned())
    }

    /// Adds a 20x20 node at `(x, y)` and renders so its globals are current.
    fn square(stage: &mut Stage<RecordingSurface>, x: f64, y: f64) -> NodeId {
        let id = stage
            .nodes_mut()
            .create_with(Node::sprite().at(x, y).with_size(20.0, 20.0), Block);
        stage.add_child(id).unwrap();
        render(stage);
        id
    }

    #[test]
    fn transparent_frame_clears_then_renders() {
        let mut stage = stage();
        square(&mut stage, 10.0, 10.0);
        stage.surface_mut().clear();
        render(&mut stage);
        let ops = stage.surface().ops();
        assert_eq!(ops[0], DrawOp::ClearRect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(ops.contains(&DrawOp::FillRect(Rect::new(0.0, 0.0, 20.0, 20.0))));
    }

    #[test]
    fn opaque_frame_fills_background() {
        let mut stage = Stage::new(
            clock(ClockConfig::standard()),
            RecordingSurface::new(),
            StageConfig::new(50.0, 40.0).with_background("#000"),
        );
        stage.surface_mut().clear();
        render(&mut stage);
        assert_eq!(
            &stage.surface().ops()[..2],
            &[
                DrawOp::FillStyle("#000".into()),
                DrawOp::FillRect(Rect::new(0.0, 0.0, 50.0, 40.0)),
            ]
        );
    }

    #[test]
    fn pixel_ready_on_retina() {
        let stage = Stage::new(
            clock(ClockConfig::retina()),
            RecordingSurface::new(),
            StageConfig::new(100.0, 50.0),
        );
        assert_eq!(
            stage.surface().ops(),
            &[
                DrawOp::BackingSize(Size::new(199.0, 100.0)),
                DrawOp::Scale(2.0, 2.0),
            ]
        );
    }

    #[test]
    fn pixel_ready_on_standard() {
        let stage = stage();
        assert_eq!(
            stage.surface().ops()[0],
            DrawOp::BackingSize(Size::new(100.0, 100.0))
        );
    }

    #[test]
    fn children_inherit_viewport() {
        let mut stage = stage();
        let a = stage.nodes_mut().create(Node::display());
        let b = stage.nodes_mut().create(Node::display());
        stage.nodes_mut().add_child(a, b).unwrap();
        stage.add_child(a).unwrap();
        assert_eq!(stage.nodes().viewport(b), Some(stage.id()));
        assert!(stage.remove_child(a));
        assert_eq!(stage.nodes().viewport(a), None);
        assert!(!stage.remove_child(a), "already detached");
    }

    #[test]
    fn culling_scenario() {
        let mut stage = stage();
        let c = square(&mut stage, 50.0, 50.0);
        assert!(stage.is_visible(c));
        assert_eq!(stage.last_stats().drawn, 1);

        stage.nodes_mut().node_mut(c).transform.x = 200.0;
        render(&mut stage);
        assert!(!stage.is_visible(c));
        assert_eq!(stage.last_stats().drawn, 0);
        assert_eq!(stage.last_stats().culled, 1);
        assert_eq!(stage.nodes().child_count(stage.root()), 1);
    }

    #[test]
    fn set_child_index_on_root() {
        let mut stage = stage();
        let a = square(&mut stage, 0.0, 0.0);
        let b = square(&mut stage, 0.0, 0.0);
        let c = square(&mut stage, 0.0, 0.0);
        assert_eq!(stage.set_child_index(c, 0), Some(0));
        let order: Vec<_> = stage.nodes().children(stage.root()).collect();
        assert_eq!(order, vec![c, a, b]);

        let stray = stage.nodes_mut().create(Node::display());
        assert_eq!(stage.set_child_index(stray, 0), None);
    }

    #[test]
    fn click_goes_to_last_registered_only() {
        let mut stage = stage();
        let below = square(&mut stage, 10.0, 10.0);
        let above = square(&mut stage, 15.0, 15.0);
        let log: Log = Rc::default();
        stage.click(below, logger(&log, "below"));
        stage.click(above, logger(&log, "above"));

        stage.pointer_event(PointerInput::Click(Point::new(20.0, 20.0)));
        assert_eq!(*log.borrow(), ["above"]);

        stage.pointer_event(PointerInput::Click(Point::new(12.0, 12.0)));
        assert_eq!(*log.borrow(), ["above", "below"]);

        stage.pointer_event(PointerInput::Click(Point::new(90.0, 90.0)));
        assert_eq!(log.borrow().len(), 2, "misses fire nothing");
    }

    #[test]
    fn registration_order_beats_paint_order() {
        let mut stage = stage();
        let a = square(&mut stage, 10.0, 10.0);
        let b = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.click(b, logger(&log, "b"));
        stage.click(a, logger(&log, "a"));
        stage.set_child_index(a, 0);
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        assert_eq!(*log.borrow(), ["a"]);
    }

    #[test]
    fn hover_fires_over_move_and_out() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.over(target, logger(&log, "over"));
        stage.mousemove(target, logger(&log, "move"));
        stage.out(target, logger(&log, "out"));

        stage.pointer_event(PointerInput::MouseMove(Point::new(15.0, 15.0)));
        assert_eq!(stage.surface().cursor(), POINTER_CURSOR);
        stage.pointer_event(PointerInput::MouseMove(Point::new(16.0, 16.0)));
        stage.pointer_event(PointerInput::MouseMove(Point::new(80.0, 80.0)));
        assert_eq!(stage.surface().cursor(), "default");
        assert_eq!(*log.borrow(), ["over", "move", "out"]);
    }

    #[test]
    fn hover_uses_target_cursor() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        stage.nodes_mut().node_mut(target).cursor = Some("grab".into());
        stage.click(target, |_| {});
        stage.pointer_event(PointerInput::MouseMove(Point::new(15.0, 15.0)));
        assert_eq!(stage.surface().cursor(), "grab");
    }

    #[test]
    fn registering_under_pointer_sets_cursor() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        stage.pointer_event(PointerInput::MouseMove(Point::new(15.0, 15.0)));
        assert_eq!(stage.surface().cursor(), "default");
        stage.click(target, |_| {});
        assert_eq!(stage.surface().cursor(), POINTER_CURSOR);
    }

    #[test]
    fn touch_maps_to_mouse_events() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.mousedown(target, logger(&log, "down"));
        stage.touchstart(target, logger(&log, "touchstart"));
        stage.mouseup(target, logger(&log, "up"));
        stage.click(target, logger(&log, "click"));

        stage.pointer_event(PointerInput::TouchStart(Point::new(12.0, 12.0)));
        stage.pointer_event(PointerInput::TouchMove(Point::new(14.0, 14.0)));
        assert_eq!(stage.pointer(), Point::new(14.0, 14.0));
        stage.pointer_event(PointerInput::TouchEnd);
        assert_eq!(*log.borrow(), ["down", "touchstart", "up", "click"]);
    }

    #[test]
    fn offset_is_subtracted() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.click(target, logger(&log, "click"));
        stage.set_offset(Vec2::new(100.0, 200.0));
        stage.pointer_event(PointerInput::Click(Point::new(115.0, 215.0)));
        assert_eq!(stage.pointer(), Point::new(15.0, 15.0));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn touch_uses_the_same_offset_as_mouse() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.touchstart(target, logger(&log, "touchstart"));
        stage.set_offset(Vec2::new(100.0, 200.0));
        stage.pointer_event(PointerInput::TouchStart(Point::new(15.0, 15.0)));
        assert!(log.borrow().is_empty(), "raw client position misses");
        stage.pointer_event(PointerInput::TouchStart(Point::new(115.0, 215.0)));
        assert_eq!(stage.pointer(), Point::new(15.0, 15.0));
        assert_eq!(*log.borrow(), ["touchstart"]);
    }

    #[test]
    fn handler_can_edit_nodes() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        stage.click(target, |cx| {
            let t = cx.target;
            cx.nodes.node_mut(t).visible = false;
        });
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        assert!(!stage.nodes().node(target).visible);
    }

    #[test]
    fn hidden_targets_are_not_hit() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.click(target, logger(&log, "click"));
        stage.nodes_mut().node_mut(target).visible = false;
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn removing_handlers() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.click(target, logger(&log, "click"));
        stage.over(target, logger(&log, "over"));

        assert!(stage.remove_click(target));
        assert!(!stage.remove_click(target), "already removed");
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        assert!(log.borrow().is_empty());

        assert!(stage.remove_evented(target));
        assert!(!stage.remove_evented(target));
        stage.pointer_event(PointerInput::MouseMove(Point::new(15.0, 15.0)));
        assert!(log.borrow().is_empty(), "observer dropped entirely");
    }

    #[test]
    fn disable_ignores_input() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.click(target, logger(&log, "click"));
        stage.disable();
        assert_eq!(stage.surface().cursor(), AUTO_CURSOR);
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        assert!(log.borrow().is_empty());
        stage.enable();
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn destroyed_targets_are_skipped() {
        let mut stage = stage();
        let target = square(&mut stage, 10.0, 10.0);
        let log: Log = Rc::default();
        stage.click(target, logger(&log, "click"));
        stage.nodes_mut().destroy(target);
        stage.pointer_event(PointerInput::Click(Point::new(15.0, 15.0)));
        stage.pointer_event(PointerInput::MouseMove(Point::new(15.0, 15.0)));
        assert!(log.borrow().is_empty());
        assert_eq!(stage.observer_count(), 0, "dead observers are pruned");
    }

    #[test]
    fn pruning_keeps_live_observers() {
        let mut stage = stage();
        let gone = square(&mut stage, 10.0, 10.0);
        let kept = square(&mut stage, 50.0, 50.0);
        let log: Log = Rc::default();
        stage.over(gone, logger(&log, "gone"));
        stage.over(kept, logger(&log, "kept"));
        assert_eq!(stage.observer_count(), 2);
        stage.nodes_mut().destroy(gone);
        stage.pointer_event(PointerInput::MouseMove(Point::new(55.0, 55.0)));
        assert_eq!(stage.observer_count(), 1);
        assert_eq!(*log.borrow(), ["kept"]);
    }

    #[test]
    fn stage_renders_on_clock_tick() {
        let host = Rc::new(ManualHost::new());
        let clock = FrameClock::new(host, ClockConfig::standard());
        let stage = Stage::shared(
            Rc::clone(&clock),
            RecordingSurface::new(),
            StageConfig::new(100.0, 100.0),
        );
        {
            let mut s = stage.borrow_mut();
            let id = s
                .nodes_mut()
                .create_with(Node::sprite().at(1.0, 1.0).with_size(5.0, 5.0), Block);
            s.add_child(id).unwrap();
        }
        clock.add_to_stack(stage.clone());
        clock.startup();
        clock.tick().unwrap();
        assert_eq!(stage.borrow().last_stats().drawn, 1);
        assert!(clock.remove_from_stack(&stage));
    }

    #[test]
    fn resize_reaches_drawables() {
        #[derive(Debug, Default)]
        struct Liquid;
        impl Drawable for Liquid {
            fn draw(
                &mut self,
                _surface: &mut dyn Surface,
                _node: &mut Node,
                _frame: &FrameInfo,
            ) -> Result<(), SceneError> {
                Ok(())
            }
            fn resize(&mut self, bounds: &WindowBounds, node: &mut Node) {
                node.size = Size::new(bounds.width, bounds.height);
            }
        }

        let host = Rc::new(ManualHost::new());
        let clock = FrameClock::new(host.clone(), ClockConfig::standard());
        let stage = Stage::shared(
            Rc::clone(&clock),
            RecordingSurface::new(),
            StageConfig::new(100.0, 100.0),
        );
        let id = {
            let mut s = stage.borrow_mut();
            let id = s.nodes_mut().create_with(Node::display(), Liquid);
            s.add_child(id).unwrap();
            id
        };
        host.set_window_size(Size::new(640.0, 480.0));
        clock.notify_resize();
        assert_eq!(stage.borrow().nodes().node(id).size, Size::new(640.0, 480.0));
    }
}
