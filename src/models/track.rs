// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Object tracks: keyframed bounding boxes over video frames.

use super::color::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounding box normalized to the image's intrinsic size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// How boxes between keyframes are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Cubic,
    Constant,
}

/// An authored box at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: u32,
    /// Playback time in seconds.
    pub time: f64,
    pub bbox: BBox,
}

/// Inclusive frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: u32,
    pub end: u32,
}

impl FrameRange {
    pub fn contains(&self, frame: u32) -> bool {
        frame >= self.start && frame <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: u32,
    pub label: String,
    pub color: Rgb,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub keyframes: BTreeMap<u32, Keyframe>,
    pub start_frame: Option<u32>,
    pub end_frame: Option<u32>,
    /// When set, `start_frame`/`end_frame` are user-chosen and not derived from keyframes.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub range_overridden: bool,
}

impl Track {
    pub fn new(id: u32, label: impl Into<String>, color: Rgb, interpolation: Interpolation) -> Self {
        Self {
            id,
            label: label.into(),
            color,
            interpolation,
            keyframes: BTreeMap::new(),
            start_frame: None,
            end_frame: None,
            range_overridden: false,
        }
    }

    /// Insert or replace the keyframe at `keyframe.frame`.
    pub fn insert_keyframe(&mut self, keyframe: Keyframe) {
        self.keyframes.insert(keyframe.frame, keyframe);
        self.recompute_range();
    }

    pub fn remove_keyframe(&mut self, frame: u32) -> Option<Keyframe> {
        let removed = self.keyframes.remove(&frame);
        if removed.is_some() {
            self.recompute_range();
        }
        removed
    }

    /// Pin the active range regardless of keyframes.
    pub fn override_range(&mut self, start: u32, end: u32) {
        self.start_frame = Some(start.min(end));
        self.end_frame = Some(start.max(end));
        self.range_overridden = true;
    }

    pub fn clear_range_override(&mut self) {
        self.range_overridden = false;
        self.recompute_range();
    }

    /// Re-derive `start_frame`/`end_frame` from the keyframe keys.
    pub fn recompute_range(&mut self) {
        if self.range_overridden {
            return;
        }
        self.start_frame = self.keyframes.keys().next().copied();
        self.end_frame = self.keyframes.keys().next_back().copied();
    }

    /// Re-key keyframes by their own `frame` field. Returns how many keys
    /// disagreed with the stored frame.
    pub fn rekey_keyframes(&mut self) -> usize {
        let mismatched = self.keyframes.iter().filter(|(key, kf)| **key != kf.frame).count();
        if mismatched > 0 {
            let keyframes = std::mem::take(&mut self.keyframes);
            self.keyframes = keyframes.into_values().map(|kf| (kf.frame, kf)).collect();
            self.recompute_range();
        }
        mismatched
    }

    pub fn is_keyframe(&self, frame: u32) -> bool {
        self.keyframes.contains_key(&frame)
    }
}
