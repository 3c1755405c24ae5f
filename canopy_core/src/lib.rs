// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame clock, display tree, and viewports for 2D raster scenes.
//!
//! `canopy_core` drives immediate-mode 2D scenes from a host's
//! animation-frame callback. Nodes live in struct-of-arrays storage behind
//! generational handles; each frame the tree is composed, culled against its
//! viewport, and painted through a small canvas-style [`Surface`](surface::Surface)
//! contract.
//!
//! # Architecture
//!
//! ```text
//!   Host (rAF, visibility, resize, pointer)
//!       │
//!       ▼
//!   FrameClock::tick() ──► deferred calls ──► FrameTarget::frame() ──► timers
//!                                                   │
//!                 ┌─────────────────────────────────┘
//!                 ▼
//!   Stage::frame() ──► clear / fill ──► NodeStore::render() ──► Surface
//! ```
//!
//! **[`clock`]**: The [`FrameClock`](clock::FrameClock): per-frame target
//! stack, deferred-call queue, frame-counted timers, pause/resume on
//! visibility, resizables, and text measurement on a scratch surface.
//!
//! **[`node`]**: Struct-of-arrays display tree with generational handles.
//! Global transforms are recomputed every pass; nodes marked for culling skip
//! their whole subtree when off-screen.
//!
//! **[`stage`]**: The [`Stage`](stage::Stage) viewport. It binds a tree to
//! one surface and dispatches pointer input to registered handlers.
//!
//! **[`sequence`]**: Sprite-sheet playback state machine and its drawable.
//!
//! **[`shapes`]** and **[`layer`]**: Drawing primitives and parallax
//! scene layers.
//!
//! **[`host`]**, **[`surface`]**, **[`image`]**: Contracts the embedding
//! implements, plus the deterministic [`ManualHost`](host::ManualHost) and
//! [`RecordingSurface`](surface::RecordingSurface).
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod clock;
pub mod error;
pub mod host;
pub mod image;
pub mod layer;
pub mod node;
pub mod sequence;
pub mod shapes;
pub mod stage;
pub mod surface;
pub mod time;
pub mod timing;
pub mod trace;
pub mod transform;
