// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local and composed node transforms.
//!
//! Composition is component-wise, not matrix-based: a child's global
//! position is its parent's global position plus its own offset, rotations
//! add, and alpha and scale multiply. A parent's rotation does not swing its
//! children's positions around it.

use kurbo::{Point, Vec2};

/// Substitute for an exact-zero scale factor when drawing.
pub const MIN_DRAW_SCALE: f64 = 0.01;

/// A node's transform relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Horizontal offset from the parent.
    pub x: f64,
    /// Vertical offset from the parent.
    pub y: f64,
    /// Additional horizontal nudge, typically animated on top of `x`.
    pub delta_x: f64,
    /// Additional vertical nudge, typically animated on top of `y`.
    pub delta_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Opacity in `0.0..=1.0`.
    pub alpha: f64,
    /// Horizontal anchor, measured from the node's left edge.
    pub center_x: f64,
    /// Vertical anchor, measured from the node's top edge.
    pub center_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No offset, no rotation, unit scale, fully opaque.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        delta_x: 0.0,
        delta_y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        alpha: 1.0,
        center_x: 0.0,
        center_y: 0.0,
    };

    /// Identity transform placed at `(x, y)`.
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::IDENTITY
        }
    }

    /// Sets both scale factors.
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale_x = scale;
        self.scale_y = scale;
        self
    }

    /// Sets the anchor point.
    #[must_use]
    pub const fn with_center(mut self, center_x: f64, center_y: f64) -> Self {
        self.center_x = center_x;
        self.center_y = center_y;
        self
    }

    /// Anchor as a vector from the node's top-left corner.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        Vec2::new(self.center_x, self.center_y)
    }
}

/// A node's transform composed through all of its ancestors.
///
/// This is a derived cache: it is recomputed from local values immediately
/// before every render pass and never treated as authoritative state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalTransform {
    /// Global x of the anchor.
    pub x: f64,
    /// Global y of the anchor.
    pub y: f64,
    /// Sum of rotations along the ancestor chain.
    pub rotation: f64,
    /// Product of alphas along the ancestor chain.
    pub alpha: f64,
    /// Product of horizontal scales along the ancestor chain.
    pub scale_x: f64,
    /// Product of vertical scales along the ancestor chain.
    pub scale_y: f64,
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl GlobalTransform {
    /// The transform of a parentless root.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        alpha: 1.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    /// Composes `local` onto `parent`'s last computed global transform.
    #[must_use]
    pub fn compose(parent: &Self, local: &Transform) -> Self {
        Self {
            x: parent.x + local.x + local.delta_x,
            y: parent.y + local.y + local.delta_y,
            rotation: parent.rotation + local.rotation,
            alpha: parent.alpha * local.alpha,
            scale_x: parent.scale_x * local.scale_x,
            scale_y: parent.scale_y * local.scale_y,
        }
    }

    /// Global anchor position.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Scale factors with exact zeros replaced by [`MIN_DRAW_SCALE`].
    #[must_use]
    pub fn draw_scale(&self) -> (f64, f64) {
        let guard = |s: f64| if s == 0.0 { MIN_DRAW_SCALE } else { s };
        (guard(self.scale_x), guard(self.scale_y))
    }
}
