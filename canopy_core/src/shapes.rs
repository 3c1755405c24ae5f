// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing primitives.
//!
//! Each type here is a [`Drawable`] attached to a node with
//! [`NodeStore::create_with`](crate::node::NodeStore::create_with). Shapes
//! draw with their top-left corner at `-center`, so a node's
//! [`center`](crate::transform::Transform::center) is its pivot for
//! rotation and scale.
//!
//! Image-backed primitives ([`Picture`], [`Sheet`]) only accept a loaded
//! [`ImageSource`].
//!
//! [`MultilineText`] and [`FluidText`] follow the window: wrapped text can
//! track the window width, and fluid text shrinks its font as the window
//! narrows below a reference width.

use std::fmt;
use std::rc::Rc;

use kurbo::{Insets, Point, Rect, Size, Vec2};

use crate::clock::FrameClock;
use crate::error::SceneError;
use crate::host::WindowBounds;
use crate::image::{ImageId, ImageSource};
use crate::node::{Drawable, FrameInfo, Node, ViewportId};
use crate::surface::{Shadow, Surface, TextAlign, TextBaseline};

/// Default fill color for shapes and text.
pub const DEFAULT_COLOR: &str = "#FFF";

/// Blits the logical `crop` region of `image` at the node's top-left plus
/// `offset`, sized to the node. The crop is scaled to image pixels by
/// `pixel_ratio`.
pub(crate) fn blit(
    surface: &mut dyn Surface,
    image: ImageId,
    crop: Rect,
    offset: Vec2,
    node: &Node,
    pixel_ratio: f64,
) {
    let origin = (offset - node.transform.center()).to_point();
    surface.draw_image(
        image,
        crop.scale_from_origin(pixel_ratio),
        Rect::from_origin_size(origin, node.size),
    );
}

fn top_left(node: &Node) -> Point {
    (-node.transform.center()).to_point()
}

fn require_loaded(source: &ImageSource) -> Result<Size, SceneError> {
    source
        .size()
        .ok_or_else(|| SceneError::ImageNotLoaded(source.url().to_owned()))
}

// ---------------------------------------------------------------------------
// Rectangle
// ---------------------------------------------------------------------------

/// A filled rectangle covering the node's size.
#[derive(Clone, Debug, PartialEq)]
pub struct Rectangle {
    /// CSS fill color.
    pub color: String,
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR)
    }
}

impl Rectangle {
    /// Default node size.
    pub const DEFAULT_SIZE: Size = Size::new(100.0, 100.0);

    /// A rectangle filled with `color`.
    #[must_use]
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
        }
    }

    /// A sprite node of [`DEFAULT_SIZE`](Self::DEFAULT_SIZE).
    #[must_use]
    pub fn node() -> Node {
        Node::sprite().with_size(Self::DEFAULT_SIZE.width, Self::DEFAULT_SIZE.height)
    }
}

impl Drawable for Rectangle {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        _frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        surface.set_fill_style(&self.color);
        surface.fill_rect(Rect::from_origin_size(top_left(node), node.size));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Circle
// ---------------------------------------------------------------------------

/// Outline drawn around a [`Circle`].
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    /// CSS stroke color.
    pub color: String,
    /// Line width.
    pub width: f64,
}

/// A filled circle centered on the node's top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Circle {
    /// CSS fill color.
    pub color: String,
    /// Radius.
    pub radius: f64,
    /// Optional outline.
    pub stroke: Option<Stroke>,
}

impl Default for Circle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RADIUS)
    }
}

impl Circle {
    /// Default radius.
    pub const DEFAULT_RADIUS: f64 = 100.0;

    /// A white circle of `radius`.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            color: DEFAULT_COLOR.to_owned(),
            radius,
            stroke: None,
        }
    }

    /// Sets the fill color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Adds an outline.
    #[must_use]
    pub fn with_stroke(mut self, color: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(Stroke {
            color: color.into(),
            width,
        });
        self
    }

    /// A sprite node sized to the circle's diameter.
    #[must_use]
    pub fn node(&self) -> Node {
        let d = self.radius * 2.0;
        Node::sprite().with_size(d, d)
    }
}

impl Drawable for Circle {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        _frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        let center = top_left(node);
        surface.set_fill_style(&self.color);
        surface.fill_circle(center, self.radius);
        if let Some(stroke) = &self.stroke {
            surface.stroke_circle(center, self.radius, &stroke.color, stroke.width);
        }
        Ok(())
    }

    fn local_bounds(&self, _node: &Node) -> Option<Rect> {
        let r = self.radius;
        Some(Rect::new(-r, -r, r, r))
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Font and paint settings for [`Text`].
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// CSS fill color.
    pub color: String,
    /// Font family.
    pub font: String,
    /// Font size in logical pixels; also the node height.
    pub size: f64,
    /// Font weight.
    pub weight: u16,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Vertical baseline.
    pub baseline: TextBaseline,
    /// Drop shadow.
    pub shadow: Shadow,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_owned(),
            font: String::from("Helvetica"),
            size: 40.0,
            weight: 800,
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
            shadow: Shadow {
                color: String::from("rgba(0,0,0,.20)"),
                offset: Vec2::new(0.0, 2.0),
                blur: 0.0,
            },
        }
    }
}

impl TextStyle {
    /// The CSS font shorthand, e.g. `"800 40px Helvetica"`.
    #[must_use]
    pub fn shorthand(&self) -> String {
        format!("{} {}px {}", self.weight, self.size, self.font)
    }
}

/// A single line of text, measured on the clock's scratch surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    text: String,
    style: TextStyle,
    shorthand: String,
    size: Size,
}

impl Text {
    /// Creates and measures a text run.
    #[must_use]
    pub fn new(clock: &FrameClock, text: impl Into<String>, style: TextStyle) -> Self {
        let mut this = Self {
            text: text.into(),
            shorthand: style.shorthand(),
            style,
            size: Size::ZERO,
        };
        this.measure(clock);
        this
    }

    /// Replaces the text and re-measures.
    pub fn set_text(&mut self, clock: &FrameClock, text: impl Into<String>) {
        self.text = text.into();
        self.measure(clock);
    }

    /// Replaces the style and re-measures.
    pub fn set_style(&mut self, clock: &FrameClock, style: TextStyle) {
        self.shorthand = style.shorthand();
        self.style = style;
        self.measure(clock);
    }

    /// The text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The style.
    #[must_use]
    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Measured width by font size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// A sprite node of the measured size.
    #[must_use]
    pub fn node(&self) -> Node {
        Node::sprite().with_size(self.size.width, self.size.height)
    }

    fn measure(&mut self, clock: &FrameClock) {
        let metrics = clock.measure_text(&self.text, Some(&self.shorthand));
        self.size = Size::new(metrics.width, self.style.size);
    }
}

impl Drawable for Text {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        _frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        node.size = self.size;
        surface.translate(-node.transform.center());
        surface.set_fill_style(&self.style.color);
        surface.set_font(&self.shorthand);
        surface.set_text_layout(self.style.align, self.style.baseline);
        surface.set_shadow(&self.style.shadow);
        surface.fill_text(&self.text, Point::ORIGIN);
        Ok(())
    }
}

/// Splits `text` into lines no wider than `max_width`.
///
/// `\n` always breaks. A line that overflows is broken at its last
/// whitespace and the partial word moves to the next line; a line without
/// whitespace is broken after the overflowing character. `max_width <= 0`
/// disables wrapping.
pub fn wrap_lines(
    text: &str,
    max_width: f64,
    mut measure: impl FnMut(&str) -> f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for ch in text.chars() {
        if ch == '\n' {
            lines.push(core::mem::take(&mut line));
            continue;
        }
        line.push(ch);
        if max_width <= 0.0 || measure(&line) <= max_width {
            continue;
        }
        let last_space = line.char_indices().rev().find(|(_, c)| c.is_whitespace());
        match last_space {
            Some((at, space)) if at + space.len_utf8() < line.len() => {
                let word = line[at + space.len_utf8()..].to_owned();
                line.truncate(at);
                lines.push(core::mem::replace(&mut line, word));
            }
            _ => lines.push(core::mem::take(&mut line)),
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Word-wrapped text in a box of fixed or window-tracking width.
///
/// The node is `width` wide and `lines * line_height` tall. Lines wrap
/// inside the horizontal padding; the first line sits `padding.y0` below
/// the top.
pub struct MultilineText {
    clock: Rc<FrameClock>,
    text: String,
    style: TextStyle,
    shorthand: String,
    line_height: f64,
    padding: Insets,
    width: f64,
    fluid: bool,
    lines: Vec<String>,
}

impl fmt::Debug for MultilineText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultilineText")
            .field("text", &self.text)
            .field("style", &self.style)
            .field("line_height", &self.line_height)
            .field("padding", &self.padding)
            .field("width", &self.width)
            .field("fluid", &self.fluid)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl MultilineText {
    /// Creates text wrapped to `width`. The line height defaults to the font
    /// size.
    #[must_use]
    pub fn new(
        clock: Rc<FrameClock>,
        text: impl Into<String>,
        style: TextStyle,
        width: f64,
    ) -> Self {
        let mut this = Self {
            clock,
            text: text.into(),
            shorthand: style.shorthand(),
            line_height: style.size,
            style,
            padding: Insets::ZERO,
            width,
            fluid: false,
            lines: Vec::new(),
        };
        this.wrap();
        this
    }

    /// Sets the distance between baselines.
    #[must_use]
    pub fn with_line_height(mut self, line_height: f64) -> Self {
        self.line_height = line_height;
        self
    }

    /// Sets the padding and re-wraps.
    #[must_use]
    pub fn with_padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self.wrap();
        self
    }

    /// Makes the width follow the window width on stage and on resize.
    #[must_use]
    pub fn fluid(mut self) -> Self {
        self.fluid = true;
        self
    }

    /// Replaces the text and re-wraps.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.wrap();
    }

    /// Replaces the style and re-wraps. The line height is kept.
    pub fn set_style(&mut self, style: TextStyle) {
        self.shorthand = style.shorthand();
        self.style = style;
        self.wrap();
    }

    /// Sets the box width and re-wraps.
    pub fn set_width(&mut self, width: f64) {
        self.width = width;
        self.wrap();
    }

    /// The wrapped lines.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distance between baselines.
    #[must_use]
    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    /// Box width by wrapped height.
    #[must_use]
    pub fn size(&self) -> Size {
        let height = self.lines.len() as f64 * self.line_height;
        Size::new(self.width, height)
    }

    /// A sprite node of the wrapped size.
    #[must_use]
    pub fn node(&self) -> Node {
        let size = self.size();
        Node::sprite().with_size(size.width, size.height)
    }

    fn wrap(&mut self) {
        let max_width = self.width - (self.padding.x0 + self.padding.x1);
        let clock = &self.clock;
        let font = &self.shorthand;
        self.lines = wrap_lines(&self.text, max_width, |line| {
            clock.measure_text(line, Some(font.as_str())).width
        });
    }
}

impl Drawable for MultilineText {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        _frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        node.size = self.size();
        surface.translate(-node.transform.center());
        surface.set_fill_style(&self.style.color);
        surface.set_font(&self.shorthand);
        surface.set_text_layout(self.style.align, self.style.baseline);
        surface.set_shadow(&self.style.shadow);
        let mut y = self.padding.y0;
        for line in &self.lines {
            surface.fill_text(line, Point::new(self.padding.x0, y));
            y += self.line_height;
        }
        Ok(())
    }

    fn resize(&mut self, bounds: &WindowBounds, node: &mut Node) {
        if self.fluid {
            self.set_width(bounds.width);
            node.size = self.size();
        }
    }

    fn added_to_stage(&mut self, node: &mut Node, _viewport: ViewportId) {
        let bounds = self.clock.window_bounds();
        self.resize(&bounds, node);
    }
}

/// Padding [`FluidText`] keeps between its text and the window edge.
pub const FLUID_PADDING: f64 = 10.0;

/// Single-line text whose font shrinks with the window.
///
/// While the window is at least `reference_width + padding` wide the font
/// keeps its base size. Below that it scales linearly with the window
/// width, reaching 0 at `padding`.
pub struct FluidText {
    clock: Rc<FrameClock>,
    text: Text,
    base_size: f64,
    reference_width: f64,
    padding: f64,
    centered: bool,
}

impl fmt::Debug for FluidText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluidText")
            .field("text", &self.text)
            .field("base_size", &self.base_size)
            .field("reference_width", &self.reference_width)
            .field("padding", &self.padding)
            .field("centered", &self.centered)
            .finish_non_exhaustive()
    }
}

impl FluidText {
    /// Creates fluid text that keeps `style.size` down to a window of
    /// `reference_width` plus [`FLUID_PADDING`].
    #[must_use]
    pub fn new(
        clock: Rc<FrameClock>,
        text: impl Into<String>,
        style: TextStyle,
        reference_width: f64,
    ) -> Self {
        let base_size = style.size;
        let text = Text::new(&clock, text, style);
        Self {
            clock,
            text,
            base_size,
            reference_width,
            padding: FLUID_PADDING,
            centered: false,
        }
    }

    /// Sets the padding kept from the window edge.
    #[must_use]
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Keeps the node's horizontal anchor at the middle of the text.
    #[must_use]
    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    /// The current font size.
    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.text.style().size
    }

    /// The underlying text run.
    #[must_use]
    pub fn text(&self) -> &Text {
        &self.text
    }

    /// A sprite node of the measured size.
    #[must_use]
    pub fn node(&self) -> Node {
        self.text.node()
    }

    fn size_for(&self, window_width: f64) -> f64 {
        if self.reference_width <= 0.0 || window_width >= self.reference_width + self.padding {
            return self.base_size;
        }
        let scale = (window_width - self.padding) / self.reference_width;
        (self.base_size * scale).max(0.0)
    }
}

impl Drawable for FluidText {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        self.text.draw(surface, node, frame)
    }

    fn resize(&mut self, bounds: &WindowBounds, node: &mut Node) {
        let size = self.size_for(bounds.width);
        if size != self.font_size() {
            let style = TextStyle {
                size,
                ..self.text.style().clone()
            };
            self.text.set_style(&self.clock, style);
        }
        node.size = self.text.size();
        if self.centered {
            node.transform.center_x = node.size.width / 2.0;
        }
    }

    fn added_to_stage(&mut self, node: &mut Node, _viewport: ViewportId) {
        let bounds = self.clock.window_bounds();
        self.resize(&bounds, node);
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A whole image drawn at its logical size.
#[derive(Clone, Debug, PartialEq)]
pub struct Picture {
    image: ImageId,
    native: Size,
    size: Size,
}

impl Picture {
    /// Wraps a loaded image.
    ///
    /// # Errors
    ///
    /// [`SceneError::ImageNotLoaded`] if `source` has not loaded.
    pub fn new(source: &ImageSource) -> Result<Self, SceneError> {
        let size = require_loaded(source)?;
        Ok(Self {
            image: source.id(),
            native: source.native_size().unwrap_or(size),
            size,
        })
    }

    /// Logical size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// A sprite node of the image's logical size.
    #[must_use]
    pub fn node(&self) -> Node {
        Node::sprite().with_size(self.size.width, self.size.height)
    }
}

impl Drawable for Picture {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        _frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        surface.draw_image(
            self.image,
            Rect::from_origin_size(Point::ORIGIN, self.native),
            Rect::from_origin_size(top_left(node), self.size),
        );
        Ok(())
    }
}

/// A node-sized region cropped out of a loaded image.
#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    image: ImageId,
    crop: Point,
}

impl Sheet {
    /// Crops `source` starting at `crop`, in logical pixels. The crop size is
    /// the node size.
    ///
    /// # Errors
    ///
    /// [`SceneError::ImageNotLoaded`] if `source` has not loaded.
    pub fn new(source: &ImageSource, crop: Point) -> Result<Self, SceneError> {
        require_loaded(source)?;
        Ok(Self {
            image: source.id(),
            crop,
        })
    }

    /// Moves the crop origin.
    pub fn shift(&mut self, crop: Point) {
        self.crop = crop;
    }

    /// Current crop origin in logical pixels.
    #[must_use]
    pub fn crop(&self) -> Point {
        self.crop
    }
}

impl Drawable for Sheet {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        let crop = Rect::from_origin_size(self.crop, node.size);
        blit(surface, self.image, crop, Vec2::ZERO, node, frame.pixel_ratio);
        Ok(())
    }
}
