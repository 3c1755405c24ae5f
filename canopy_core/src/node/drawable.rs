// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The capability a node's content implements to paint itself.

use core::any::Any;
use core::fmt::Debug;

use kurbo::{Rect, Size};

use crate::error::SceneError;
use crate::host::WindowBounds;
use crate::surface::Surface;
use crate::timing::FrameTick;
use crate::transform::GlobalTransform;

use super::{Node, ViewportId};

/// Per-render-pass values handed to drawables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInfo {
    /// Frame-rate-normalized delta for this tick.
    pub delta: f64,
    /// Nominal frame rate of the clock.
    pub frame_rate: f64,
    /// Normalized device pixel ratio (1 or 2).
    pub pixel_ratio: f64,
    /// Logical size of the viewport being rendered.
    pub viewport: Size,
}

impl FrameInfo {
    /// Derives render info from a clock tick.
    #[must_use]
    pub fn from_tick(tick: &FrameTick, viewport: Size) -> Self {
        Self {
            delta: tick.delta,
            frame_rate: tick.frame_rate,
            pixel_ratio: tick.pixel_ratio,
            viewport,
        }
    }

    /// Info for a render pass that does not advance time.
    #[must_use]
    pub fn still(viewport: Size) -> Self {
        Self {
            delta: 0.0,
            frame_rate: crate::clock::ClockConfig::DEFAULT_FRAME_RATE,
            pixel_ratio: 1.0,
            viewport,
        }
    }
}

/// Concrete content attached to a node: a shape, an image, a sprite sheet.
///
/// The render pass has already translated, rotated, scaled, and set the
/// alpha for the node's anchor before [`draw`](Self::draw) is called, so
/// content draws in local units with the anchor at the origin.
///
/// Every hook other than `draw` defaults to doing nothing.
pub trait Drawable: Any + Debug {
    /// Paints the content. `node` is mutable so animated content can update
    /// its own size.
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        frame: &FrameInfo,
    ) -> Result<(), SceneError>;

    /// Adjusts the freshly composed global transform before culling and
    /// drawing.
    fn calc(&mut self, node: &Node, global: &mut GlobalTransform, frame: &FrameInfo) {
        _ = (node, global, frame);
    }

    /// Culling bounds relative to the node's top-left corner, if the content
    /// knows better than the node's size.
    fn local_bounds(&self, node: &Node) -> Option<Rect> {
        _ = node;
        None
    }

    /// Called with new window bounds when the host window resizes.
    fn resize(&mut self, bounds: &WindowBounds, node: &mut Node) {
        _ = (bounds, node);
    }

    /// Called after the node was inserted under a parent.
    fn added(&mut self, node: &mut Node) {
        _ = node;
    }

    /// Called after the node was detached from its parent.
    fn removed(&mut self, node: &mut Node) {
        _ = node;
    }

    /// Called when the node becomes attached, directly or through an
    /// ancestor, to a viewport.
    fn added_to_stage(&mut self, node: &mut Node, viewport: ViewportId) {
        _ = (node, viewport);
    }
}
