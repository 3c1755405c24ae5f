// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene layers with a parallax camera.
//!
//! A [`Layer`] is invisible content for a grouping node. Each render pass it
//! shifts the node's global position by `camera * range`, so layers with a
//! smaller range scroll slower. It also tracks which way the node itself moved
//! since the previous pass.
//!
//! A *liquid* layer takes the window's width and height on every resize.
//! Resizer callbacks registered with [`Layer::add_resizer`] receive the same
//! bounds.

use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

use kurbo::{Point, Size};

use crate::clock::FrameClock;
use crate::error::SceneError;
use crate::host::WindowBounds;
use crate::node::{Drawable, FrameInfo, Node, ViewportId};
use crate::surface::Surface;
use crate::transform::GlobalTransform;

/// Shared camera position read by every layer that follows it.
pub type Camera = Rc<Cell<Point>>;

/// Handle returned by [`Layer::add_resizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResizerId(u32);

type Resizer = Box<dyn FnMut(&WindowBounds)>;

/// Builds a [`Layer`].
#[derive(Debug)]
pub struct LayerBuilder {
    clock: Rc<FrameClock>,
    camera: Option<Camera>,
    range: f64,
    liquid: bool,
}

impl LayerBuilder {
    /// Starts a liquid layer with range 1 and no camera.
    #[must_use]
    pub fn new(clock: Rc<FrameClock>) -> Self {
        Self {
            clock,
            camera: None,
            range: 1.0,
            liquid: true,
        }
    }

    /// Sets the camera the layer follows.
    #[must_use]
    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Sets the parallax factor applied to the camera position.
    #[must_use]
    pub fn range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    /// Keeps the node's own size instead of following the window.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.liquid = false;
        self
    }

    /// Finishes the layer.
    ///
    /// # Errors
    ///
    /// [`SceneError::MissingCamera`] if no camera was set.
    pub fn build(self) -> Result<Layer, SceneError> {
        let camera = self.camera.ok_or(SceneError::MissingCamera)?;
        Ok(Layer {
            clock: self.clock,
            camera,
            range: self.range,
            liquid: self.liquid,
            direction: (0, 0),
            previous: None,
            on_stage: false,
            resizers: Vec::new(),
            next_resizer: 0,
        })
    }
}

/// Parallax scene layer. See the [module docs](self).
pub struct Layer {
    clock: Rc<FrameClock>,
    camera: Camera,
    range: f64,
    liquid: bool,
    direction: (i8, i8),
    previous: Option<Point>,
    on_stage: bool,
    resizers: Vec<(ResizerId, Resizer)>,
    next_resizer: u32,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("camera", &self.camera.get())
            .field("range", &self.range)
            .field("liquid", &self.liquid)
            .field("direction", &self.direction)
            .field("on_stage", &self.on_stage)
            .field("resizers", &self.resizers.len())
            .finish_non_exhaustive()
    }
}

impl Layer {
    /// Starts a [`LayerBuilder`].
    #[must_use]
    pub fn builder(clock: Rc<FrameClock>) -> LayerBuilder {
        LayerBuilder::new(clock)
    }

    /// Registers a callback for window resizes. It runs immediately if the
    /// layer is already on a stage.
    pub fn add_resizer(&mut self, resizer: impl FnMut(&WindowBounds) + 'static) -> ResizerId {
        let id = ResizerId(self.next_resizer);
        self.next_resizer += 1;
        let mut resizer: Resizer = Box::new(resizer);
        if self.on_stage {
            resizer(&self.clock.window_bounds());
        }
        self.resizers.push((id, resizer));
        id
    }

    /// Unregisters a resizer. Returns whether it was present.
    pub fn remove_resizer(&mut self, id: ResizerId) -> bool {
        let before = self.resizers.len();
        self.resizers.retain(|(r, _)| *r != id);
        self.resizers.len() != before
    }

    /// Sign of the node's local movement on each axis during the last pass:
    /// -1, 0 or 1.
    #[must_use]
    pub fn direction(&self) -> (i8, i8) {
        self.direction
    }

    /// Parallax factor.
    #[must_use]
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Whether the layer follows the window size.
    #[must_use]
    pub fn is_liquid(&self) -> bool {
        self.liquid
    }

    /// The camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

impl Drawable for Layer {
    fn draw(
        &mut self,
        _surface: &mut dyn Surface,
        _node: &mut Node,
        _frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        Ok(())
    }

    fn calc(&mut self, node: &Node, global: &mut GlobalTransform, _frame: &FrameInfo) {
        let camera = self.camera.get();
        global.x += camera.x * self.range;
        global.y += camera.y * self.range;

        let here = Point::new(node.transform.x, node.transform.y);
        let moved = here - self.previous.unwrap_or(here);
        self.direction = (sign(moved.x), sign(moved.y));
        self.previous = Some(here);
    }

    fn resize(&mut self, bounds: &WindowBounds, node: &mut Node) {
        if self.liquid {
            node.size = Size::new(bounds.width, bounds.height);
        }
        for (_, resizer) in &mut self.resizers {
            resizer(bounds);
        }
    }

    fn added_to_stage(&mut self, node: &mut Node, _viewport: ViewportId) {
        self.on_stage = true;
        let bounds = self.clock.window_bounds();
        self.resize(&bounds, node);
    }

    fn removed(&mut self, _node: &mut Node) {
        self.on_stage = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockConfig;
    use crate::host::ManualHost;
    use crate::node::NodeStore;
    use crate::surface::RecordingSurface;
    use std::cell::RefCell;

    fn clock() -> (Rc<ManualHost>, Rc<FrameClock>) {
        let host = Rc::new(ManualHost::new());
        let clock = FrameClock::new(host.clone(), ClockConfig::standard());
        (host, clock)
    }

    #[test]
    fn camera_is_required() {
        let (_, clock) = clock();
        assert_eq!(
            Layer::builder(clock).build().unwrap_err(),
            SceneError::MissingCamera
        );
    }

    #[test]
    fn camera_offset_scales_by_range() {
        let (_, clock) = clock();
        let camera: Camera = Rc::new(Cell::new(Point::new(-100.0, 20.0)));
        let layer = Layer::builder(clock)
            .camera(Rc::clone(&camera))
            .range(0.5)
            .build()
            .unwrap();

        let mut nodes = NodeStore::new();
        let root = nodes.create(Node::display());
        let scene = nodes.create_with(Node::display().at(10.0, 0.0), layer);
        let child = nodes.create(Node::display().at(1.0, 1.0));
        nodes.add_child(root, scene).unwrap();
        nodes.add_child(scene, child).unwrap();

        let mut s = RecordingSurface::new();
        let frame = FrameInfo::still(Size::new(100.0, 100.0));
        nodes.render(root, &mut s, &frame).unwrap();
        assert_eq!(nodes.global(scene).position(), Point::new(-40.0, 10.0));
        assert_eq!(nodes.global(child).position(), Point::new(-39.0, 11.0));
    }

    #[test]
    fn direction_tracks_local_movement() {
        let (_, clock) = clock();
        let camera: Camera = Rc::default();
        let layer = Layer::builder(clock).camera(camera).build().unwrap();
        let mut nodes = NodeStore::new();
        let scene = nodes.create_with(Node::display(), layer);
        let mut s = RecordingSurface::new();
        let frame = FrameInfo::still(Size::new(100.0, 100.0));

        nodes.render(scene, &mut s, &frame).unwrap();
        assert_eq!(nodes.content::<Layer>(scene).unwrap().direction(), (0, 0));

        nodes.node_mut(scene).transform.x = 5.0;
        nodes.node_mut(scene).transform.y = -1.0;
        nodes.render(scene, &mut s, &frame).unwrap();
        assert_eq!(nodes.content::<Layer>(scene).unwrap().direction(), (1, -1));

        nodes.render(scene, &mut s, &frame).unwrap();
        assert_eq!(nodes.content::<Layer>(scene).unwrap().direction(), (0, 0));
    }

    #[test]
    fn liquid_layer_follows_window() {
        let (host, clock) = clock();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut layer = Layer::builder(Rc::clone(&clock))
            .camera(Rc::default())
            .build()
            .unwrap();
        let log = Rc::clone(&seen);
        layer.add_resizer(move |b| log.borrow_mut().push(b.width));
        assert!(seen.borrow().is_empty(), "not on a stage yet");

        let mut node = Node::display();
        layer.added_to_stage(&mut node, ViewportId::next());
        assert_eq!(node.size, Size::new(1024.0, 768.0));
        assert_eq!(*seen.borrow(), [1024.0]);

        host.set_window_size(Size::new(800.0, 600.0));
        layer.resize(&clock.window_bounds(), &mut node);
        assert_eq!(node.size, Size::new(800.0, 600.0));
        assert_eq!(*seen.borrow(), [1024.0, 800.0]);
    }

    #[test]
    fn fixed_layer_keeps_size_and_late_resizers_run_at_once() {
        let (_, clock) = clock();
        let mut layer = Layer::builder(Rc::clone(&clock))
            .camera(Rc::default())
            .fixed()
            .build()
            .unwrap();
        let mut node = Node::display().with_size(10.0, 10.0);
        layer.added_to_stage(&mut node, ViewportId::next());
        assert_eq!(node.size, Size::new(10.0, 10.0));

        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = layer.add_resizer(move |_| counter.set(counter.get() + 1));
        assert_eq!(hits.get(), 1, "runs immediately on stage");
        assert!(layer.remove_resizer(id));
        assert!(!layer.remove_resizer(id));
        layer.resize(&clock.window_bounds(), &mut node);
        assert_eq!(hits.get(), 1);
    }
}
