// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate normalization.
//!
//! Three coordinate spaces exist and each has its own point type:
//! - [`ScreenPoint`]: drawing-surface pixels, after pan and zoom.
//! - [`UnitPoint`]: normalized `[0, 1]` coordinates relative to the image's
//!   intrinsic width and height. This is the only space that is stored.
//! - [`PixelPoint`]: intrinsic image pixels, used by mask rasters.
//!
//! Conversions between them only happen through the functions in this module.

use crate::error::{AnnotError, Result};
use serde::{Deserialize, Serialize};

/// A point on the drawing surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A point with normalized coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
}

impl UnitPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in intrinsic image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    /// Build a rectangle from two arbitrary corners.
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Smallest rectangle enclosing all points, `None` for an empty slice.
    pub fn bounding(points: &[ScreenPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::from_corners(
            ScreenPoint::new(min_x, min_y),
            ScreenPoint::new(max_x, max_y),
        ))
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn min(&self) -> ScreenPoint {
        ScreenPoint::new(self.left, self.top)
    }

    pub fn max(&self) -> ScreenPoint {
        ScreenPoint::new(self.right(), self.bottom())
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// Overlap of two rectangles, `None` when they do not touch.
    pub fn intersect(&self, other: &ScreenRect) -> Option<Self> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Self {
            left,
            top,
            width: right - left,
            height: bottom - top,
        })
    }

    /// Nearest point inside the rectangle.
    pub fn clamp(&self, p: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(p.x.clamp(self.left, self.right()), p.y.clamp(self.top, self.bottom()))
    }

    pub fn expand(&self, margin: f64) -> Self {
        Self {
            left: self.left - margin,
            top: self.top - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }
}

/// The image's current placement on the drawing surface (post pan/zoom).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageFrame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageFrame {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Fit an image of the given intrinsic size inside a container,
    /// preserving aspect ratio and centering it.
    pub fn fit(container: ScreenRect, image_width: u32, image_height: u32) -> Self {
        if image_width == 0 || image_height == 0 || container.height <= 0.0 {
            return Self::new(container.left, container.top, 0.0, 0.0);
        }
        let img_aspect = image_width as f64 / image_height as f64;
        let available_aspect = container.width / container.height;

        let (width, height) = if img_aspect > available_aspect {
            // Image is wider - fit to width
            (container.width, container.width / img_aspect)
        } else {
            // Image is taller - fit to height
            (container.height * img_aspect, container.height)
        };

        Self::new(
            container.left + (container.width - width) / 2.0,
            container.top + (container.height - height) / 2.0,
            width,
            height,
        )
    }

    /// A frame with zero (or non-finite) width or height cannot map points.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn rect(&self) -> ScreenRect {
        ScreenRect {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }

    fn check(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(AnnotError::DegenerateFrame {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Convert a surface point to normalized image coordinates.
pub fn normalize(point: ScreenPoint, frame: &ImageFrame) -> Result<UnitPoint> {
    frame.check()?;
    Ok(UnitPoint {
        x: (point.x - frame.left) / frame.width,
        y: (point.y - frame.top) / frame.height,
    })
}

/// Convert normalized image coordinates to a surface point.
pub fn denormalize(point: UnitPoint, frame: &ImageFrame) -> Result<ScreenPoint> {
    frame.check()?;
    Ok(ScreenPoint {
        x: frame.left + point.x * frame.width,
        y: frame.top + point.y * frame.height,
    })
}

/// Normalize a surface rectangle into `(origin, width, height)` unit values.
pub fn normalize_rect(rect: ScreenRect, frame: &ImageFrame) -> Result<(UnitPoint, f64, f64)> {
    let min = normalize(rect.min(), frame)?;
    let max = normalize(rect.max(), frame)?;
    Ok((min, max.x - min.x, max.y - min.y))
}

/// Inverse of [`normalize_rect`].
pub fn denormalize_rect(origin: UnitPoint, width: f64, height: f64, frame: &ImageFrame) -> Result<ScreenRect> {
    let min = denormalize(origin, frame)?;
    let max = denormalize(UnitPoint::new(origin.x + width, origin.y + height), frame)?;
    Ok(ScreenRect::from_corners(min, max))
}

/// Convert normalized coordinates to intrinsic image pixels.
pub fn unit_to_pixel(point: UnitPoint, image_width: u32, image_height: u32) -> PixelPoint {
    PixelPoint {
        x: point.x * image_width as f64,
        y: point.y * image_height as f64,
    }
}

/// Map a surface point straight into image pixel space.
pub fn screen_to_pixel(
    point: ScreenPoint,
    frame: &ImageFrame,
    image_width: u32,
    image_height: u32,
) -> Result<PixelPoint> {
    normalize(point, frame).map(|unit| unit_to_pixel(unit, image_width, image_height))
}
