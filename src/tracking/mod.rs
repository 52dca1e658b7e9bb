// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keyframed object tracking over video frames.

pub mod coordinator;
pub mod interpolate;

pub use coordinator::TrackingCoordinator;
pub use interpolate::{interpolate, keyframe_frames, track_range};
