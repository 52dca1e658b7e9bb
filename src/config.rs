// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Host-provided configuration.
//!
//! Recognized keys follow the host page's camelCase names (`brushSize`,
//! `maskOpacity`, ...). Every field has a default, so partial configs are fine.

use crate::models::color::Rgb;
use crate::models::track::Interpolation;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Current drawing tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Select,
    Bbox,
    Polygon,
    Landmark,
    Freeform,
    Brush,
    Eraser,
    Fill,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Select,
        Tool::Bbox,
        Tool::Polygon,
        Tool::Landmark,
        Tool::Freeform,
        Tool::Brush,
        Tool::Eraser,
        Tool::Fill,
    ];

    pub fn is_mask_tool(&self) -> bool {
        matches!(self, Tool::Brush | Tool::Eraser | Tool::Fill)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Bbox => "Box",
            Tool::Polygon => "Polygon",
            Tool::Landmark => "Landmark",
            Tool::Freeform => "Freeform",
            Tool::Brush => "Brush",
            Tool::Eraser => "Eraser",
            Tool::Fill => "Fill",
        }
    }
}

/// A label the user can annotate with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    pub color: Rgb,
    /// Keyboard shortcut, accepted as a string or a number.
    #[serde(default, deserialize_with = "lenient_key")]
    pub key_value: Option<String>,
}

fn lenient_key<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    pub tools: Vec<Tool>,
    pub labels: Vec<LabelSpec>,
    /// Brush diameter in image pixels.
    pub brush_size: f64,
    /// Eraser diameter in image pixels.
    pub eraser_size: f64,
    pub mask_opacity: f32,
    /// Stroke width for freeform shapes, in surface pixels.
    pub freeform_brush_size: f64,
    pub auto_advance_frames: u32,
    pub interpolation: Interpolation,
    pub video_fps: f64,
    /// Shapes smaller than this (surface pixels) are discarded on commit.
    pub min_shape_size: f64,
    pub history_depth: usize,
    /// Alpha at or below which a pixel counts as unfilled for flood fill.
    pub fill_threshold: u8,
    pub fill_pixel_cap: usize,
    /// Total frames in the video, bounds auto-advance when known.
    pub frame_count: Option<u32>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tools: Tool::ALL.to_vec(),
            labels: vec![LabelSpec {
                name: "object".to_string(),
                color: Rgb::new(255, 0, 0),
                key_value: Some("1".to_string()),
            }],
            brush_size: 10.0,
            eraser_size: 20.0,
            mask_opacity: 0.5,
            freeform_brush_size: 3.0,
            auto_advance_frames: 0,
            interpolation: Interpolation::Linear,
            video_fps: 30.0,
            min_shape_size: 5.0,
            history_depth: crate::engine::history::DEFAULT_MAX_DEPTH,
            fill_threshold: crate::codec::rle::ALPHA_THRESHOLD,
            fill_pixel_cap: 1_000_000,
            frame_count: None,
        }
    }
}

impl HostConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid config JSON")?;
        Ok(config.sanitized())
    }

    /// Load a JSON or YAML config, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text).context("invalid config YAML")?,
            _ => serde_json::from_str(&text).context("invalid config JSON")?,
        };
        Ok(config.sanitized())
    }

    /// Load a config, falling back to defaults when it cannot be read.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config {}: {:#}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Replace out-of-range values with defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.tools.is_empty() {
            self.tools = defaults.tools.clone();
        }
        if self.labels.is_empty() {
            self.labels = defaults.labels.clone();
        }
        if !(self.video_fps.is_finite() && self.video_fps > 0.0) {
            self.video_fps = defaults.video_fps;
        }
        if !(self.brush_size.is_finite() && self.brush_size > 0.0) {
            self.brush_size = defaults.brush_size;
        }
        if !(self.eraser_size.is_finite() && self.eraser_size > 0.0) {
            self.eraser_size = defaults.eraser_size;
        }
        self.mask_opacity = if self.mask_opacity.is_finite() {
            self.mask_opacity.clamp(0.0, 1.0)
        } else {
            defaults.mask_opacity
        };
        if self.history_depth == 0 {
            self.history_depth = defaults.history_depth;
        }
        self.frame_count = self.frame_count.filter(|&n| n > 0);
        self
    }

    pub fn is_tool_enabled(&self, tool: Tool) -> bool {
        self.tools.contains(&tool)
    }

    pub fn label(&self, name: &str) -> Option<&LabelSpec> {
        self.labels.iter().find(|l| l.name == name)
    }

    /// Find the label bound to a keyboard shortcut.
    pub fn label_for_key(&self, key: &str) -> Option<&LabelSpec> {
        self.labels.iter().find(|l| l.key_value.as_deref() == Some(key))
    }
}
