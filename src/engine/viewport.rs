// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pan/zoom camera over the image.

use crate::util::geometry::{ImageFrame, ScreenPoint};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 20.0;

/// Derives the image's on-surface [`ImageFrame`] from the host layout plus
/// the user's pan and zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Placement at zoom 1 with no pan, as laid out by the host.
    base: ImageFrame,
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            base: ImageFrame::default(),
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn set_base(&mut self, base: ImageFrame) {
        self.base = base;
    }

    pub fn base(&self) -> ImageFrame {
        self.base
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current image placement.
    pub fn frame(&self) -> ImageFrame {
        ImageFrame::new(
            self.base.left + self.pan_x,
            self.base.top + self.pan_y,
            self.base.width * self.zoom,
            self.base.height * self.zoom,
        )
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiply the zoom by `factor`, keeping the image point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: ScreenPoint, factor: f64) {
        let frame = self.frame();
        if !frame.is_valid() || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ux = (anchor.x - frame.left) / frame.width;
        let uy = (anchor.y - frame.top) / frame.height;
        let new_width = self.base.width * new_zoom;
        let new_height = self.base.height * new_zoom;
        self.pan_x = anchor.x - ux * new_width - self.base.left;
        self.pan_y = anchor.y - uy * new_height - self.base.top;
        self.zoom = new_zoom;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }
}
