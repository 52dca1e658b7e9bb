// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! A [`DrawingPort`] that records commands instead of drawing them.

use super::port::{DrawingPort, RasterRef, StrokeStyle};
use crate::models::color::Rgb;
use crate::util::geometry::{ImageFrame, ScreenPoint, ScreenRect};

/// Fixed glyph advance used by [`RecordingPort::measure_text`].
const GLYPH_WIDTH: f64 = 7.0;
const LINE_HEIGHT: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    StrokeRect(ScreenRect, StrokeStyle),
    FillRect(ScreenRect, Rgb),
    Polyline {
        points: Vec<ScreenPoint>,
        closed: bool,
        style: StrokeStyle,
    },
    FillCircle(ScreenPoint, f64, Rgb),
    StrokeCircle(ScreenPoint, f64, StrokeStyle),
    Text(ScreenPoint, String),
    Raster {
        key: String,
        revision: u64,
        dest: ImageFrame,
        opacity: f32,
    },
}

#[derive(Debug, Default)]
pub struct RecordingPort {
    pub commands: Vec<DrawCommand>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn rects(&self) -> impl Iterator<Item = (&ScreenRect, &StrokeStyle)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::StrokeRect(r, s) => Some((r, s)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(_, t) => Some(t.as_str()),
            _ => None,
        })
    }
}

impl DrawingPort for RecordingPort {
    fn stroke_rect(&mut self, rect: ScreenRect, style: StrokeStyle) {
        self.commands.push(DrawCommand::StrokeRect(rect, style));
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgb, _alpha: f32) {
        self.commands.push(DrawCommand::FillRect(rect, color));
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], closed: bool, style: StrokeStyle) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            closed,
            style,
        });
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgb) {
        self.commands.push(DrawCommand::FillCircle(center, radius, color));
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, style: StrokeStyle) {
        self.commands.push(DrawCommand::StrokeCircle(center, radius, style));
    }

    fn draw_text(&mut self, at: ScreenPoint, text: &str, _color: Rgb) {
        self.commands.push(DrawCommand::Text(at, text.to_string()));
    }

    fn measure_text(&self, text: &str) -> (f64, f64) {
        (text.chars().count() as f64 * GLYPH_WIDTH, LINE_HEIGHT)
    }

    fn draw_raster(&mut self, raster: RasterRef<'_>, dest: ImageFrame, opacity: f32) {
        self.commands.push(DrawCommand::Raster {
            key: raster.key.to_string(),
            revision: raster.revision,
            dest,
            opacity,
        });
    }
}
