// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! A project bundles the media reference with everything annotated on it:
//! shapes, per-label masks and object tracks.

use super::annotation::Annotation;
use super::mask::MaskRecord;
use super::track::Track;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete project data for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub media_file: String,
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub masks: BTreeMap<String, MaskRecord>,
    #[serde(default)]
    pub tracks: BTreeMap<u32, Track>,
}

impl ProjectData {
    /// Create a new project with the given media file and dimensions.
    pub fn new(media_file: String, frame_width: u32, frame_height: u32) -> Self {
        Self {
            media_file,
            frame_width,
            frame_height,
            annotations: Vec::new(),
            masks: BTreeMap::new(),
            tracks: BTreeMap::new(),
        }
    }
}
