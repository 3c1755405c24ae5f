// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use thiserror::Error;

/// Errors raised while building or mutating a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// An image-backed node was built from a source that has not loaded yet.
    #[error("image source `{0}` has not loaded")]
    ImageNotLoaded(String),

    /// A sprite sheet resolved to zero frames.
    #[error("sprite sheet has no frames")]
    EmptyFrames,

    /// A sheet cell size was zero or negative.
    #[error("invalid cell size {width}x{height}")]
    InvalidCellSize {
        /// Cell width.
        width: f64,
        /// Cell height.
        height: f64,
    },

    /// A frame index was outside the sheet.
    #[error("frame {frame} out of range (len {len})")]
    FrameOutOfRange {
        /// Requested frame.
        frame: usize,
        /// Number of frames in the sheet.
        len: usize,
    },

    /// A scene layer was built without a camera.
    #[error("scene layer requires a camera")]
    MissingCamera,

    /// A node was asked to adopt one of its own ancestors.
    #[error("adding this child would create a cycle")]
    WouldCycle,

    /// A non-positive playback or clock frame rate.
    #[error("invalid frame rate {0}")]
    InvalidFrameRate(f64),
}

/// Errors returned by per-frame callbacks.
///
/// A failing callback aborts the rest of that tick's per-frame iteration.
#[derive(Error, Debug)]
pub enum FrameError {
    /// A scene operation failed while rendering.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// An application callback failed.
    #[error("frame callback failed: {0}")]
    Callback(Box<dyn std::error::Error + 'static>),
}

impl FrameError {
    /// Wraps an arbitrary application error.
    pub fn callback(err: impl std::error::Error + 'static) -> Self {
        Self::Callback(Box::new(err))
    }
}
