// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Minimal drawing surface used by the shape, mask and tracking engines.
//!
//! Engines only ever talk to a [`DrawingPort`]; the host supplies the
//! concrete adapter (egui painter, recorder in tests, ...).

use crate::models::color::Rgb;
use crate::util::geometry::{ImageFrame, ScreenPoint, ScreenRect};
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgb,
    pub width: f64,
    pub dashed: bool,
}

impl StrokeStyle {
    pub fn solid(color: Rgb, width: f64) -> Self {
        Self {
            color,
            width,
            dashed: false,
        }
    }

    pub fn dashed(color: Rgb, width: f64) -> Self {
        Self {
            color,
            width,
            dashed: true,
        }
    }
}

/// An image-resolution raster to be scaled onto the surface.
///
/// `key` and `revision` identify the content so adapters can cache uploads.
pub struct RasterRef<'a> {
    pub key: &'a str,
    pub revision: u64,
    pub image: &'a RgbaImage,
}

pub trait DrawingPort {
    fn stroke_rect(&mut self, rect: ScreenRect, style: StrokeStyle);

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgb, alpha: f32);

    /// Polyline through `points`, joined back to the start when `closed`.
    fn stroke_polyline(&mut self, points: &[ScreenPoint], closed: bool, style: StrokeStyle);

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgb);

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, style: StrokeStyle);

    /// Draw text with its top-left corner at `at`.
    fn draw_text(&mut self, at: ScreenPoint, text: &str, color: Rgb);

    /// Width and height of `text` as [`DrawingPort::draw_text`] would render it.
    fn measure_text(&self, text: &str) -> (f64, f64);

    /// Composite a raster scaled to `dest` with a global opacity.
    fn draw_raster(&mut self, raster: RasterRef<'_>, dest: ImageFrame, opacity: f32);
}
