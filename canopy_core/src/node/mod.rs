// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display tree: nodes, ownership, and the render traversal.
//!
//! Nodes live in a [`NodeStore`] and are addressed by generational
//! [`NodeId`] handles. Parents own an ordered child list; children hold only
//! a parent index and a [`ViewportId`] back-reference, never ownership.
//!
//! Each node carries plain properties ([`Node`]) and optional content
//! implementing [`Drawable`]. A node with no content is a pure grouping
//! node. A node whose [`Culling`] is [`Culling::Viewport`] is skipped,
//! together with its subtree, whenever its bounds fall outside the viewport.

mod drawable;
mod id;
mod store;
mod traverse;

pub use drawable::{Drawable, FrameInfo};
pub use id::{INVALID, NodeId, ViewportId};
pub use store::{NodeStore, RenderStats};
pub use traverse::Children;

use kurbo::{Point, Rect, Size, Vec2};

use crate::transform::Transform;

/// Whether a node takes part in viewport culling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Culling {
    /// Always drawn when visible.
    #[default]
    Off,
    /// Skipped when its bounding box lies entirely outside the viewport.
    Viewport,
}

/// Hit-test overrides. Each `None` field falls back to the node's own value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HitArea {
    /// Anchor position in viewport coordinates, instead of the global one.
    pub position: Option<Point>,
    /// Anchor offset, instead of the node's center.
    pub center: Option<Vec2>,
    /// Hit box size, instead of the node's size.
    pub size: Option<Size>,
}

/// The caller-owned properties of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Transform relative to the parent.
    pub transform: Transform,
    /// Width and height in local units.
    pub size: Size,
    /// When false, neither this node nor any descendant is drawn.
    pub visible: bool,
    /// Viewport culling mode.
    pub culling: Culling,
    /// Explicit culling bounds relative to the node's top-left corner.
    ///
    /// Ignores rotation when set.
    pub bounds_override: Option<Rect>,
    /// Pointer hit-test overrides.
    pub hit_area: HitArea,
    /// Cursor shown while the pointer hovers this node, if it has handlers.
    pub cursor: Option<String>,
}

impl Default for Node {
    fn default() -> Self {
        Self::display()
    }
}

impl Node {
    /// A plain display node that never culls.
    #[must_use]
    pub fn display() -> Self {
        Self {
            transform: Transform::IDENTITY,
            size: Size::ZERO,
            visible: true,
            culling: Culling::Off,
            bounds_override: None,
            hit_area: HitArea::default(),
            cursor: None,
        }
    }

    /// A viewport-bounded node that is culled when off screen.
    #[must_use]
    pub fn sprite() -> Self {
        Self {
            culling: Culling::Viewport,
            ..Self::display()
        }
    }

    /// Sets the local position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.transform.x = x;
        self.transform.y = y;
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Size::new(width, height);
        self
    }

    /// Sets the anchor point.
    #[must_use]
    pub fn with_center(mut self, center_x: f64, center_y: f64) -> Self {
        self.transform = self.transform.with_center(center_x, center_y);
        self
    }

    /// Sets the rotation in radians.
    #[must_use]
    pub fn with_rotation(mut self, radians: f64) -> Self {
        self.transform.rotation = radians;
        self
    }

    /// Sets the opacity.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.transform.alpha = alpha;
        self
    }

    /// Opts out of viewport culling.
    #[must_use]
    pub fn always_visible(mut self) -> Self {
        self.culling = Culling::Off;
        self
    }

    /// Sets explicit culling bounds relative to the top-left corner.
    #[must_use]
    pub fn define_bounds(mut self, bounds: Rect) -> Self {
        self.bounds_override = Some(bounds);
        self
    }

    /// Sets the hover cursor.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}
