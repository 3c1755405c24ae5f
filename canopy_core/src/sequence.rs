// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite-sheet animation.
//!
//! [`FrameSequencer`] is the pure playback state machine: a list of
//! [`SheetFrame`]s, a play range, a direction, and a loop budget. It is
//! advanced by the frame-rate-normalized delta of each draw and reports
//! what happened as a [`Step`].
//!
//! [`Sequence`] is the drawable that pairs a sequencer with a loaded image
//! and blits the current frame.
//!
//! # Transition rule
//!
//! While playing, every call to [`FrameSequencer::advance`] adds `delta` to
//! an accumulator. Once it reaches `round(frame_rate / fps)` the accumulator
//! resets and the sequencer steps:
//!
//! - Not at the end of the range: move one frame in the current direction.
//! - At the end, yoyo: reverse direction, step once, swap start and end.
//!   Bouncing off the start boundary consumes one loop.
//! - At the end, not yoyo: restart at the start frame, consuming one loop.
//! - Loop budget exhausted: stop and report [`Step::Completed`].
//!
//! [`Loops::Infinite`] never exhausts, so an infinite yoyo never completes.

use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};

use crate::error::SceneError;
use crate::image::{ImageId, ImageSource};
use crate::node::{Drawable, FrameInfo, Node};
use crate::shapes::blit;
use crate::surface::Surface;

/// Default playback rate in sequence frames per second.
pub const DEFAULT_FPS: f64 = 15.0;

/// One cell of a sprite sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SheetFrame {
    /// Source region in logical image pixels.
    pub rect: Rect,
    /// Draw offset applied to this frame only.
    pub offset: Vec2,
}

impl SheetFrame {
    /// A frame with no draw offset.
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            offset: Vec2::ZERO,
        }
    }

    /// Sets the draw offset.
    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }
}

/// Tiles a `sheet` of logical size into `cell`-sized frames in row-major
/// order.
///
/// # Errors
///
/// [`SceneError::InvalidCellSize`] for a non-positive cell, and
/// [`SceneError::EmptyFrames`] if no whole cell fits.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "cell counts are rounded non-negative values"
)]
pub fn grid_frames(sheet: Size, cell: Size) -> Result<Vec<SheetFrame>, SceneError> {
    if !(cell.width > 0.0 && cell.height > 0.0) {
        return Err(SceneError::InvalidCellSize {
            width: cell.width,
            height: cell.height,
        });
    }
    let rows = (sheet.height / cell.height).round().max(0.0) as usize;
    let cols = (sheet.width / cell.width).round().max(0.0) as usize;
    if rows == 0 || cols == 0 {
        return Err(SceneError::EmptyFrames);
    }
    let frames = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            let origin = Point::new(cell.width * col as f64, cell.height * row as f64);
            SheetFrame::new(Rect::from_origin_size(origin, cell))
        })
        .collect();
    Ok(frames)
}

/// How many times playback restarts before completing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Loops {
    /// Loop forever.
    #[default]
    Infinite,
    /// Restart this many times, then complete.
    Count(u32),
}

/// Playback direction through the frame list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Increasing frame indices.
    #[default]
    Forward,
    /// Decreasing frame indices.
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Outcome of one [`FrameSequencer::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// Not playing.
    Idle,
    /// Playing, but the accumulator has not reached the threshold.
    Held,
    /// The current frame changed (or restarted).
    Advanced,
    /// The loop budget ran out; playback stopped.
    Completed,
}

/// Sprite-sheet playback state machine.
#[derive(Clone, Debug)]
pub struct FrameSequencer {
    frames: Vec<SheetFrame>,
    frame_rate: f64,

    // -- Playback --
    frame_index: usize,
    start: usize,
    end: usize,
    direction: Direction,
    fps: f64,
    loops: Loops,
    loop_count: u32,
    yoyo: bool,
    playing: bool,

    // -- Accumulator --
    count: f64,
    threshold: f64,
}

impl FrameSequencer {
    /// Creates a stopped sequencer at frame 0 spanning every frame.
    ///
    /// `frame_rate` is the clock's nominal frame rate.
    ///
    /// # Errors
    ///
    /// [`SceneError::EmptyFrames`] if `frames` is empty, and
    /// [`SceneError::InvalidFrameRate`] for a non-positive `frame_rate`.
    pub fn new(frames: Vec<SheetFrame>, frame_rate: f64) -> Result<Self, SceneError> {
        if frames.is_empty() {
            return Err(SceneError::EmptyFrames);
        }
        check_rate(frame_rate)?;
        let end = frames.len() - 1;
        Ok(Self {
            frames,
            frame_rate,
            frame_index: 0,
            start: 0,
            end,
            direction: Direction::Forward,
            fps: DEFAULT_FPS,
            loops: Loops::Infinite,
            loop_count: 0,
            yoyo: false,
            playing: false,
            count: 0.0,
            threshold: threshold(frame_rate, DEFAULT_FPS),
        })
    }

    // -- Configuration --

    /// Sets the default play range used by [`play_range`](Self::play_range).
    ///
    /// # Errors
    ///
    /// [`SceneError::FrameOutOfRange`] if either end is past the last frame.
    pub fn set_range(&mut self, start: usize, end: usize) -> Result<(), SceneError> {
        self.check_frame(start)?;
        self.check_frame(end)?;
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Sets the playback rate.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidFrameRate`] for a non-positive rate.
    pub fn set_fps(&mut self, fps: f64) -> Result<(), SceneError> {
        check_rate(fps)?;
        self.fps = fps;
        self.threshold = threshold(self.frame_rate, fps);
        Ok(())
    }

    /// Sets the loop budget.
    pub fn set_loops(&mut self, loops: Loops) {
        self.loops = loops;
    }

    /// Enables back-and-forth playback.
    pub fn set_yoyo(&mut self, yoyo: bool) {
        self.yoyo = yoyo;
    }

    // -- Control --

    /// Starts playing from `start` towards `end`.
    ///
    /// Direction is backward when `start > end`. Loop counters and the
    /// accumulator reset and the current frame jumps to `start`. `fps` and
    /// `loops`, when given, replace the stored settings.
    ///
    /// # Errors
    ///
    /// [`SceneError::FrameOutOfRange`] for an out-of-range end, and
    /// [`SceneError::InvalidFrameRate`] for a non-positive `fps`. Nothing
    /// changes on error.
    pub fn play(
        &mut self,
        start: usize,
        end: usize,
        fps: Option<f64>,
        loops: Option<Loops>,
    ) -> Result<(), SceneError> {
        self.check_frame(start)?;
        self.check_frame(end)?;
        if let Some(fps) = fps {
            self.set_fps(fps)?;
        }
        if let Some(loops) = loops {
            self.loops = loops;
        }
        self.direction = if start > end {
            Direction::Backward
        } else {
            Direction::Forward
        };
        self.loop_count = 0;
        self.count = 0.0;
        self.start = start;
        self.end = end;
        self.playing = true;
        self.frame_index = start;
        Ok(())
    }

    /// Plays the stored range with the stored settings.
    pub fn play_range(&mut self) {
        let (start, end) = (self.start, self.end);
        // Both ends were validated when stored.
        _ = self.play(start, end, None, None);
    }

    /// Stops playback, keeping the current frame.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Jumps to `frame` without changing the play state.
    ///
    /// # Errors
    ///
    /// [`SceneError::FrameOutOfRange`] if `frame` is past the last frame.
    pub fn goto_frame(&mut self, frame: usize) -> Result<(), SceneError> {
        self.check_frame(frame)?;
        self.frame_index = frame;
        Ok(())
    }

    /// Feeds one draw's worth of frame-rate-normalized `delta`.
    pub fn advance(&mut self, delta: f64) -> Step {
        if !self.playing {
            return Step::Idle;
        }
        self.count += delta;
        if self.count < self.threshold {
            return Step::Held;
        }
        self.count = 0.0;

        if !self.at_end() {
            self.step_once();
            return Step::Advanced;
        }

        let next = if self.yoyo {
            self.direction.reversed()
        } else {
            self.direction
        };
        if self.yoyo && next == Direction::Backward {
            self.bounce();
            return Step::Advanced;
        }
        let budget_left = match self.loops {
            Loops::Infinite => true,
            Loops::Count(n) => self.loop_count < n,
        };
        if !budget_left {
            self.playing = false;
            return Step::Completed;
        }
        if let Loops::Count(_) = self.loops {
            self.loop_count += 1;
        }
        if self.yoyo {
            self.bounce();
        } else {
            self.frame_index = self.start;
        }
        Step::Advanced
    }

    // -- Accessors --

    /// The current frame index.
    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// The current frame.
    #[must_use]
    pub fn frame(&self) -> &SheetFrame {
        &self.frames[self.frame_index]
    }

    /// All frames.
    #[must_use]
    pub fn frames(&self) -> &[SheetFrame] {
        &self.frames
    }

    /// Whether playback is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current `(start, end)`; swapped after each yoyo bounce.
    #[must_use]
    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Loops consumed since the last `play`.
    #[must_use]
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Playback rate in sequence frames per second.
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Accumulated delta required per frame step.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    // -- Internals --

    fn at_end(&self) -> bool {
        match self.direction {
            Direction::Forward => self.frame_index >= self.end,
            Direction::Backward => self.frame_index <= self.end,
        }
    }

    fn step_once(&mut self) {
        let (lo, hi) = (self.start.min(self.end), self.start.max(self.end));
        self.frame_index = match self.direction {
            Direction::Forward => self.frame_index.saturating_add(1),
            Direction::Backward => self.frame_index.saturating_sub(1),
        }
        .clamp(lo, hi);
    }

    fn bounce(&mut self) {
        self.direction = self.direction.reversed();
        self.step_once();
        core::mem::swap(&mut self.start, &mut self.end);
    }

    fn check_frame(&self, frame: usize) -> Result<(), SceneError> {
        if frame < self.frames.len() {
            Ok(())
        } else {
            Err(SceneError::FrameOutOfRange {
                frame,
                len: self.frames.len(),
            })
        }
    }
}

fn check_rate(rate: f64) -> Result<(), SceneError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidFrameRate(rate))
    }
}

fn threshold(frame_rate: f64, fps: f64) -> f64 {
    (frame_rate / fps).round()
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

type CompleteListener = Box<dyn FnMut()>;

/// An animated sprite sheet.
///
/// Playback advances once per draw, so a culled sequence holds its frame
/// until it is back on screen.
pub struct Sequence {
    image: ImageId,
    sequencer: FrameSequencer,
    listeners: Vec<CompleteListener>,
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("image", &self.image)
            .field("sequencer", &self.sequencer)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Sequence {
    /// Tiles a loaded `source` into `cell`-sized frames.
    ///
    /// # Errors
    ///
    /// [`SceneError::ImageNotLoaded`] if the source has not loaded, plus the
    /// errors of [`grid_frames`] and [`FrameSequencer::new`].
    pub fn from_grid(source: &ImageSource, cell: Size, frame_rate: f64) -> Result<Self, SceneError> {
        let sheet = loaded_size(source)?;
        Self::from_frames(source, grid_frames(sheet, cell)?, frame_rate)
    }

    /// Uses explicit frames cut from a loaded `source`.
    ///
    /// # Errors
    ///
    /// [`SceneError::ImageNotLoaded`] if the source has not loaded, plus the
    /// errors of [`FrameSequencer::new`].
    pub fn from_frames(
        source: &ImageSource,
        frames: Vec<SheetFrame>,
        frame_rate: f64,
    ) -> Result<Self, SceneError> {
        loaded_size(source)?;
        Ok(Self {
            image: source.id(),
            sequencer: FrameSequencer::new(frames, frame_rate)?,
            listeners: Vec::new(),
        })
    }

    /// Enables back-and-forth playback.
    #[must_use]
    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.sequencer.set_yoyo(yoyo);
        self
    }

    /// Sets the loop budget.
    #[must_use]
    pub fn with_loops(mut self, loops: Loops) -> Self {
        self.sequencer.set_loops(loops);
        self
    }

    /// Sets the playback rate.
    ///
    /// # Errors
    ///
    /// See [`FrameSequencer::set_fps`].
    pub fn with_fps(mut self, fps: f64) -> Result<Self, SceneError> {
        self.sequencer.set_fps(fps)?;
        Ok(self)
    }

    /// Sets the default play range and jumps to its start.
    ///
    /// # Errors
    ///
    /// See [`FrameSequencer::set_range`].
    pub fn with_range(mut self, start: usize, end: usize) -> Result<Self, SceneError> {
        self.sequencer.set_range(start, end)?;
        self.sequencer.goto_frame(start)?;
        Ok(self)
    }

    /// Starts playing the default range immediately.
    #[must_use]
    pub fn autoplay(mut self) -> Self {
        self.sequencer.play_range();
        self
    }

    /// See [`FrameSequencer::play`].
    ///
    /// # Errors
    ///
    /// See [`FrameSequencer::play`].
    pub fn play(
        &mut self,
        start: usize,
        end: usize,
        fps: Option<f64>,
        loops: Option<Loops>,
    ) -> Result<(), SceneError> {
        self.sequencer.play(start, end, fps, loops)
    }

    /// Stops playback.
    pub fn stop(&mut self) {
        self.sequencer.stop();
    }

    /// Jumps to `frame`.
    ///
    /// # Errors
    ///
    /// See [`FrameSequencer::goto_frame`].
    pub fn goto_frame(&mut self, frame: usize) -> Result<(), SceneError> {
        self.sequencer.goto_frame(frame)
    }

    /// Registers a callback run each time playback completes.
    pub fn on_complete(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// The playback state machine.
    #[must_use]
    pub fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }
}

impl Drawable for Sequence {
    fn draw(
        &mut self,
        surface: &mut dyn Surface,
        node: &mut Node,
        frame: &FrameInfo,
    ) -> Result<(), SceneError> {
        if self.sequencer.advance(frame.delta) == Step::Completed {
            for listener in &mut self.listeners {
                listener();
            }
        }
        let current = *self.sequencer.frame();
        node.size = current.rect.size();
        blit(surface, self.image, current.rect, current.offset, node, frame.pixel_ratio);
        Ok(())
    }

    fn local_bounds(&self, _node: &Node) -> Option<Rect> {
        let current = self.sequencer.frame();
        Some(Rect::from_origin_size(
            current.offset.to_point(),
            current.rect.size(),
        ))
    }
}

fn loaded_size(source: &ImageSource) -> Result<Size, SceneError> {
    source
        .size()
        .ok_or_else(|| SceneError::ImageNotLoaded(source.url().to_owned()))
}
