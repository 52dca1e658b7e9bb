// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rendering abstraction shared by the engines.

pub mod port;
pub mod recording;

pub use port::{DrawingPort, RasterRef, StrokeStyle};
pub use recording::{DrawCommand, RecordingPort};
