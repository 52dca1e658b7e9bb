// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Visual annotation engine.
//!
//! Bounding boxes, polygons, landmarks and freeform strokes over an image,
//! per-label segmentation masks with RLE persistence, bounded undo/redo, and
//! keyframed object tracking across video frames with linear, cubic or
//! constant interpolation.
//!
//! Every engine draws through [`render::DrawingPort`], so the same code runs
//! behind the egui front end in `main.rs` and under the recording port in tests.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod models;
pub mod render;
pub mod tracking;
pub mod util;

pub use config::{HostConfig, LabelSpec, Tool};
pub use engine::AnnotationSurface;
pub use error::{AnnotError, Result};
pub use tracking::TrackingCoordinator;
