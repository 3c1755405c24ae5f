// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster drawing surface contract.
//!
//! [`Surface`] is the immediate-mode 2D context that viewports draw into. The
//! vocabulary is deliberately small: a transform stack, rectangle fill and
//! clear, image blits from a cropped source region, text, and a handful of
//! style properties. Host integrations wrap their platform context (a
//! browser canvas, a software rasterizer) in this trait.
//!
//! [`RecordingSurface`] records every call as a [`DrawOp`] and is used as the
//! scratch surface for text metrics in headless hosts and as the target in
//! tests.

use core::fmt::Debug;

use kurbo::{Point, Rect, Size, Vec2};

use crate::image::ImageId;

/// Result of measuring a run of text.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    /// Advance width in logical pixels.
    pub width: f64,
}

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    /// Left edge at the anchor.
    #[default]
    Left,
    /// Centered on the anchor.
    Center,
    /// Right edge at the anchor.
    Right,
}

/// Vertical text baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextBaseline {
    /// Alphabetic baseline.
    #[default]
    Alphabetic,
    /// Top of the em box.
    Top,
    /// Middle of the em box.
    Middle,
    /// Bottom of the em box.
    Bottom,
}

/// Drop shadow applied to subsequent fills.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shadow {
    /// CSS color string.
    pub color: String,
    /// Offset in logical pixels.
    pub offset: Vec2,
    /// Blur radius.
    pub blur: f64,
}

/// An immediate-mode 2D drawing context.
///
/// Every method mirrors one primitive of a canvas-style API. Transforms are
/// cumulative until the matching [`restore`](Self::restore).
pub trait Surface: Debug {
    /// Pushes the current transform and style state.
    fn save(&mut self);
    /// Pops the most recently saved state.
    fn restore(&mut self);
    /// Translates the current transform.
    fn translate(&mut self, offset: Vec2);
    /// Rotates the current transform by `radians`.
    fn rotate(&mut self, radians: f64);
    /// Scales the current transform.
    fn scale(&mut self, sx: f64, sy: f64);
    /// Sets the global alpha used by subsequent draws.
    fn set_global_alpha(&mut self, alpha: f64);
    /// Clears `rect` to transparent.
    fn clear_rect(&mut self, rect: Rect);
    /// Sets the fill style to a CSS color string.
    fn set_fill_style(&mut self, color: &str);
    /// Fills `rect` with the current fill style.
    fn fill_rect(&mut self, rect: Rect);
    /// Fills a circle with the current fill style.
    fn fill_circle(&mut self, center: Point, radius: f64);
    /// Strokes a circle outline.
    fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64);
    /// Draws the `src` region of an image into `dst`.
    fn draw_image(&mut self, image: ImageId, src: Rect, dst: Rect);
    /// Sets the font shorthand, e.g. `"800 40px Helvetica"`.
    fn set_font(&mut self, font: &str);
    /// Sets text alignment and baseline.
    fn set_text_layout(&mut self, align: TextAlign, baseline: TextBaseline);
    /// Sets the drop shadow for subsequent fills.
    fn set_shadow(&mut self, shadow: &Shadow);
    /// Fills `text` with its anchor at `origin`.
    fn fill_text(&mut self, text: &str, origin: Point);
    /// Measures `text` with the current font.
    fn measure_text(&mut self, text: &str) -> TextMetrics;

    /// Resizes the backing store to `size` physical pixels.
    fn set_backing_size(&mut self, size: Size) {
        _ = size;
    }

    /// Updates the pointer cursor shown over the surface.
    fn set_cursor(&mut self, cursor: &str) {
        _ = cursor;
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

/// A single recorded surface call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// [`Surface::save`].
    Save,
    /// [`Surface::restore`].
    Restore,
    /// [`Surface::translate`].
    Translate(Vec2),
    /// [`Surface::rotate`].
    Rotate(f64),
    /// [`Surface::scale`].
    Scale(f64, f64),
    /// [`Surface::set_global_alpha`].
    GlobalAlpha(f64),
    /// [`Surface::clear_rect`].
    ClearRect(Rect),
    /// [`Surface::set_fill_style`].
    FillStyle(String),
    /// [`Surface::fill_rect`].
    FillRect(Rect),
    /// [`Surface::fill_circle`].
    FillCircle(Point, f64),
    /// [`Surface::stroke_circle`].
    StrokeCircle(Point, f64),
    /// [`Surface::draw_image`].
    DrawImage {
        /// Source image.
        image: ImageId,
        /// Crop region in image pixels.
        src: Rect,
        /// Destination rectangle in local units.
        dst: Rect,
    },
    /// [`Surface::set_font`].
    Font(String),
    /// [`Surface::fill_text`].
    FillText(String, Point),
    /// [`Surface::set_backing_size`].
    BackingSize(Size),
    /// [`Surface::set_cursor`].
    Cursor(String),
}

/// A [`Surface`] that records every call.
///
/// Text is measured as `glyph_width` per character.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    glyph_width: f64,
    cursor: String,
    font: String,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    /// Default advance per character for [`measure_text`](Surface::measure_text).
    pub const DEFAULT_GLYPH_WIDTH: f64 = 8.0;

    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            glyph_width: Self::DEFAULT_GLYPH_WIDTH,
            cursor: String::from("auto"),
            font: String::new(),
        }
    }

    /// Creates a recording with a custom per-character advance.
    #[must_use]
    pub fn with_glyph_width(glyph_width: f64) -> Self {
        Self {
            glyph_width,
            ..Self::new()
        }
    }

    /// Recorded operations in call order.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drops all recorded operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Last cursor set on this surface.
    #[must_use]
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Current font shorthand.
    #[must_use]
    pub fn font(&self) -> &str {
        &self.font
    }

    /// Number of image blits recorded.
    #[must_use]
    pub fn image_draws(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::DrawImage { .. }))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn translate(&mut self, offset: Vec2) {
        self.ops.push(DrawOp::Translate(offset));
    }

    fn rotate(&mut self, radians: f64) {
        self.ops.push(DrawOp::Rotate(radians));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.ops.push(DrawOp::Scale(sx, sy));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(DrawOp::GlobalAlpha(alpha));
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::ClearRect(rect));
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ops.push(DrawOp::FillStyle(color.to_owned()));
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::FillRect(rect));
    }

    fn fill_circle(&mut self, center: Point, radius: f64) {
        self.ops.push(DrawOp::FillCircle(center, radius));
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, _color: &str, _width: f64) {
        self.ops.push(DrawOp::StrokeCircle(center, radius));
    }

    fn draw_image(&mut self, image: ImageId, src: Rect, dst: Rect) {
        self.ops.push(DrawOp::DrawImage { image, src, dst });
    }

    fn set_font(&mut self, font: &str) {
        font.clone_into(&mut self.font);
        self.ops.push(DrawOp::Font(font.to_owned()));
    }

    fn set_text_layout(&mut self, _align: TextAlign, _baseline: TextBaseline) {}

    fn set_shadow(&mut self, _shadow: &Shadow) {}

    fn fill_text(&mut self, text: &str, origin: Point) {
        self.ops.push(DrawOp::FillText(text.to_owned(), origin));
    }

    fn measure_text(&mut self, text: &str) -> TextMetrics {
        TextMetrics {
            width: text.chars().count() as f64 * self.glyph_width,
        }
    }

    fn set_backing_size(&mut self, size: Size) {
        self.ops.push(DrawOp::BackingSize(size));
    }

    fn set_cursor(&mut self, cursor: &str) {
        cursor.clone_into(&mut self.cursor);
        self.ops.push(DrawOp::Cursor(cursor.to_owned()));
    }
}
