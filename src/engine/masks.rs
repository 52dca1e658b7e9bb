// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Segmentation mask engine.
//!
//! Brush, eraser and flood fill edit per-label rasters in image pixel space.
//! Surface points are converted through the normalizer before any pixel is
//! touched, so strokes land on the same pixels at every zoom level.

use crate::config::{HostConfig, LabelSpec, Tool};
use crate::models::color::Rgb;
use crate::models::mask::{FillReport, Mask, MaskRecord};
use crate::render::{DrawingPort, RasterRef};
use crate::util::geometry::{self, ImageFrame, PixelPoint, ScreenPoint};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskOutcome {
    Ignored,
    Updated,
    /// Mask pixels changed; commit to history.
    Committed,
}

#[derive(Debug, Clone)]
struct Stroke {
    erase: bool,
    label: String,
    color: Rgb,
    last: PixelPoint,
    changed: bool,
}

#[derive(Debug, Clone)]
pub struct MaskEngine {
    masks: BTreeMap<String, Mask>,
    image_width: u32,
    image_height: u32,
    brush_radius: f64,
    eraser_radius: f64,
    opacity: f32,
    fill_threshold: u8,
    fill_cap: usize,
    stroke: Option<Stroke>,
    last_fill: Option<FillReport>,
}

impl MaskEngine {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            masks: BTreeMap::new(),
            image_width: 0,
            image_height: 0,
            brush_radius: config.brush_size / 2.0,
            eraser_radius: config.eraser_size / 2.0,
            opacity: config.mask_opacity,
            fill_threshold: config.fill_threshold,
            fill_cap: config.fill_pixel_cap,
            stroke: None,
            last_fill: None,
        }
    }

    /// Set the intrinsic image size. Masks of a different size are dropped.
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        if (width, height) != (self.image_width, self.image_height) {
            if !self.masks.is_empty() {
                log::warn!(
                    "Image size changed {}x{} -> {}x{}, clearing {} masks",
                    self.image_width,
                    self.image_height,
                    width,
                    height,
                    self.masks.len()
                );
            }
            self.masks.clear();
            self.stroke = None;
        }
        self.image_width = width;
        self.image_height = height;
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn masks(&self) -> &BTreeMap<String, Mask> {
        &self.masks
    }

    pub fn mask(&self, label: &str) -> Option<&Mask> {
        self.masks.get(label)
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.brush_radius = (size / 2.0).max(0.5);
    }

    pub fn set_eraser_size(&mut self, size: f64) {
        self.eraser_radius = (size / 2.0).max(0.5);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Report of the most recent flood fill.
    pub fn last_fill(&self) -> Option<FillReport> {
        self.last_fill
    }

    pub fn is_busy(&self) -> bool {
        self.stroke.is_some()
    }

    fn to_pixel(&self, pos: ScreenPoint, frame: &ImageFrame) -> Option<PixelPoint> {
        if self.image_width == 0 || self.image_height == 0 {
            return None;
        }
        geometry::screen_to_pixel(pos, frame, self.image_width, self.image_height).ok()
    }

    /// Apply `edit` to the label's mask. A missing mask is created only if
    /// the edit changed a pixel.
    fn edit_mask(&mut self, label: &str, color: Rgb, edit: impl FnOnce(&mut Mask) -> bool) -> bool {
        if let Some(mask) = self.masks.get_mut(label) {
            return edit(mask);
        }
        let mut mask = Mask::new(color, self.image_width, self.image_height);
        let changed = edit(&mut mask);
        if changed {
            log::debug!("Created mask for label {}", label);
            self.masks.insert(label.to_string(), mask);
        }
        changed
    }

    pub fn pointer_down(&mut self, pos: ScreenPoint, tool: Tool, label: &LabelSpec, frame: &ImageFrame) -> MaskOutcome {
        let Some(pixel) = self.to_pixel(pos, frame) else {
            return MaskOutcome::Ignored;
        };
        match tool {
            Tool::Brush => {
                let radius = self.brush_radius;
                let changed = self.edit_mask(&label.name, label.color, |m| m.stamp_disk(pixel, radius));
                self.stroke = Some(Stroke {
                    erase: false,
                    label: label.name.clone(),
                    color: label.color,
                    last: pixel,
                    changed,
                });
                MaskOutcome::Updated
            }
            Tool::Eraser => {
                let changed = self.erase_all(pixel);
                self.stroke = Some(Stroke {
                    erase: true,
                    label: label.name.clone(),
                    color: label.color,
                    last: pixel,
                    changed,
                });
                MaskOutcome::Updated
            }
            Tool::Fill => self.fill(pixel, label),
            _ => MaskOutcome::Ignored,
        }
    }

    pub fn pointer_move(&mut self, pos: ScreenPoint, frame: &ImageFrame) -> MaskOutcome {
        if self.stroke.is_none() {
            return MaskOutcome::Ignored;
        }
        let Some(pixel) = self.to_pixel(pos, frame) else {
            return MaskOutcome::Ignored;
        };
        let Some(mut stroke) = self.stroke.take() else {
            return MaskOutcome::Ignored;
        };
        let radius = if stroke.erase { self.eraser_radius } else { self.brush_radius };
        // Stamp along the segment so fast moves leave no gaps.
        let (dx, dy) = (pixel.x - stroke.last.x, pixel.y - stroke.last.y);
        let spacing = (radius / 2.0).max(0.5);
        let steps = ((dx * dx + dy * dy).sqrt() / spacing).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            let p = PixelPoint::new(stroke.last.x + dx * t, stroke.last.y + dy * t);
            let changed = if stroke.erase {
                self.erase_all(p)
            } else {
                self.edit_mask(&stroke.label, stroke.color, |m| m.stamp_disk(p, radius))
            };
            stroke.changed |= changed;
        }
        stroke.last = pixel;
        self.stroke = Some(stroke);
        MaskOutcome::Updated
    }

    pub fn pointer_up(&mut self, pos: ScreenPoint, frame: &ImageFrame) -> MaskOutcome {
        if self.stroke.is_none() {
            return MaskOutcome::Ignored;
        }
        self.pointer_move(pos, frame);
        self.end_stroke()
    }

    /// End the stroke in progress. Pixels already painted are kept.
    pub fn end_stroke(&mut self) -> MaskOutcome {
        match self.stroke.take() {
            Some(stroke) if stroke.changed => {
                log::info!(
                    "{} stroke committed on {}",
                    if stroke.erase { "Eraser" } else { "Brush" },
                    stroke.label
                );
                MaskOutcome::Committed
            }
            Some(_) => MaskOutcome::Updated,
            None => MaskOutcome::Ignored,
        }
    }

    fn erase_all(&mut self, center: PixelPoint) -> bool {
        let radius = self.eraser_radius;
        let mut changed = false;
        for mask in self.masks.values_mut() {
            changed |= mask.erase_disk(center, radius);
        }
        changed
    }

    fn fill(&mut self, seed: PixelPoint, label: &LabelSpec) -> MaskOutcome {
        if seed.x < 0.0 || seed.y < 0.0 || seed.x >= self.image_width as f64 || seed.y >= self.image_height as f64 {
            return MaskOutcome::Ignored;
        }
        let (threshold, cap) = (self.fill_threshold, self.fill_cap);
        let mut report = FillReport::default();
        self.edit_mask(&label.name, label.color, |m| {
            report = m.flood_fill(seed.x as u32, seed.y as u32, threshold, cap);
            report.filled > 0
        });
        self.last_fill = Some(report);
        if report.truncated {
            log::debug!("Flood fill stopped at the {} pixel cap", cap);
        }
        if report.filled > 0 {
            log::info!("Flood filled {} pixels on {}", report.filled, label.name);
            MaskOutcome::Committed
        } else {
            MaskOutcome::Ignored
        }
    }

    /// Remove every mask.
    pub fn clear(&mut self) {
        self.masks.clear();
        self.stroke = None;
    }

    pub fn records(&self) -> BTreeMap<String, MaskRecord> {
        self.masks.iter().map(|(label, mask)| (label.clone(), mask.to_record())).collect()
    }

    /// Replace all masks from persisted records. Records that fail to decode
    /// or do not match the image size are skipped.
    pub fn load_records(&mut self, records: &BTreeMap<String, MaskRecord>) {
        self.masks.clear();
        self.stroke = None;
        for (label, record) in records {
            if (record.width, record.height) != (self.image_width, self.image_height) {
                log::warn!(
                    "Skipping mask {}: {}x{} does not match image {}x{}",
                    label,
                    record.width,
                    record.height,
                    self.image_width,
                    self.image_height
                );
                continue;
            }
            match Mask::from_record(record) {
                Ok(mask) => {
                    self.masks.insert(label.clone(), mask);
                }
                Err(e) => log::warn!("Skipping mask {}: {}", label, e),
            }
        }
    }

    /// Composite every mask onto the surface at the current placement.
    pub fn render(&self, port: &mut dyn DrawingPort, frame: &ImageFrame) {
        if !frame.is_valid() {
            return;
        }
        for (label, mask) in &self.masks {
            port.draw_raster(
                RasterRef {
                    key: label,
                    revision: mask.revision(),
                    image: mask.raster(),
                },
                *frame,
                self.opacity,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, RecordingPort};

    fn label(name: &str) -> LabelSpec {
        LabelSpec {
            name: name.to_string(),
            color: Rgb::new(0, 128, 255),
            key_value: None,
        }
    }

    fn engine(w: u32, h: u32) -> MaskEngine {
        let mut engine = MaskEngine::new(&HostConfig::default());
        engine.set_image_size(w, h);
        engine
    }

    #[test]
    fn brush_creates_mask_lazily_in_image_space() {
        let mut engine = engine(100, 100);
        // Surface shows the image at 2x.
        let frame = ImageFrame::new(0.0, 0.0, 200.0, 200.0);
        assert!(engine.mask("road").is_none());
        engine.pointer_down(ScreenPoint::new(100.0, 100.0), Tool::Brush, &label("road"), &frame);
        assert_eq!(engine.pointer_up(ScreenPoint::new(100.0, 100.0), &frame), MaskOutcome::Committed);
        let mask = engine.mask("road").unwrap();
        assert_eq!((mask.width(), mask.height()), (100, 100));
        assert_eq!(mask.alpha_at(50, 50), 255);
        assert_eq!(mask.alpha_at(90, 90), 0);
    }

    #[test]
    fn stroke_interpolates_between_events() {
        let mut engine = engine(100, 20);
        let frame = ImageFrame::new(0.0, 0.0, 100.0, 20.0);
        engine.pointer_down(ScreenPoint::new(5.0, 10.0), Tool::Brush, &label("a"), &frame);
        engine.pointer_move(ScreenPoint::new(95.0, 10.0), &frame);
        engine.pointer_up(ScreenPoint::new(95.0, 10.0), &frame);
        let mask = engine.mask("a").unwrap();
        for x in 5..95 {
            assert_eq!(mask.alpha_at(x, 10), 255, "gap at x = {}", x);
        }
    }

    #[test]
    fn eraser_clears_every_label() {
        let mut engine = engine(50, 50);
        let frame = ImageFrame::new(0.0, 0.0, 50.0, 50.0);
        for name in ["a", "b"] {
            engine.pointer_down(ScreenPoint::new(25.0, 25.0), Tool::Brush, &label(name), &frame);
            engine.pointer_up(ScreenPoint::new(25.0, 25.0), &frame);
        }
        engine.pointer_down(ScreenPoint::new(25.0, 25.0), Tool::Eraser, &label("a"), &frame);
        assert_eq!(engine.pointer_up(ScreenPoint::new(25.0, 25.0), &frame), MaskOutcome::Committed);
        assert_eq!(engine.mask("a").unwrap().alpha_at(25, 25), 0);
        assert_eq!(engine.mask("b").unwrap().alpha_at(25, 25), 0);
    }

    #[test]
    fn brush_outside_image_leaves_no_mask() {
        let mut engine = engine(50, 50);
        let frame = ImageFrame::new(0.0, 0.0, 50.0, 50.0);
        engine.pointer_down(ScreenPoint::new(-400.0, -400.0), Tool::Brush, &label("a"), &frame);
        assert_eq!(engine.pointer_up(ScreenPoint::new(-390.0, -400.0), &frame), MaskOutcome::Updated);
        assert!(engine.masks().is_empty());
        assert!(engine.records().is_empty());

        // A stroke that enters the image creates the mask on the first painted pixel.
        engine.pointer_down(ScreenPoint::new(-40.0, 25.0), Tool::Brush, &label("a"), &frame);
        assert!(engine.masks().is_empty());
        assert_eq!(engine.pointer_up(ScreenPoint::new(25.0, 25.0), &frame), MaskOutcome::Committed);
        assert_eq!(engine.mask("a").unwrap().alpha_at(10, 25), 255);
    }

    #[test]
    fn eraser_does_not_create_masks() {
        let mut engine = engine(50, 50);
        let frame = ImageFrame::new(0.0, 0.0, 50.0, 50.0);
        engine.pointer_down(ScreenPoint::new(25.0, 25.0), Tool::Eraser, &label("a"), &frame);
        assert_eq!(engine.pointer_up(ScreenPoint::new(25.0, 25.0), &frame), MaskOutcome::Updated);
        assert!(engine.masks().is_empty());
    }

    #[test]
    fn fill_large_mask_terminates_under_cap() {
        let mut engine = engine(2000, 2000);
        let frame = ImageFrame::new(0.0, 0.0, 2000.0, 2000.0);
        let outcome = engine.pointer_down(ScreenPoint::new(1000.0, 1000.0), Tool::Fill, &label("sky"), &frame);
        assert_eq!(outcome, MaskOutcome::Committed);
        let report = engine.last_fill().unwrap();
        assert!(report.visited <= 1_000_000);
        assert!(report.truncated);
        assert!(engine.mask("sky").is_some());
        assert!(!engine.is_busy());
    }

    #[test]
    fn fill_outside_image_is_ignored() {
        let mut engine = engine(10, 10);
        let frame = ImageFrame::new(0.0, 0.0, 10.0, 10.0);
        let outcome = engine.pointer_down(ScreenPoint::new(-3.0, 4.0), Tool::Fill, &label("a"), &frame);
        assert_eq!(outcome, MaskOutcome::Ignored);
    }

    #[test]
    fn records_roundtrip_and_size_mismatch_is_skipped() {
        let mut engine = engine(30, 20);
        let frame = ImageFrame::new(0.0, 0.0, 30.0, 20.0);
        engine.pointer_down(ScreenPoint::new(10.0, 10.0), Tool::Brush, &label("a"), &frame);
        engine.pointer_up(ScreenPoint::new(10.0, 10.0), &frame);
        let mut records = engine.records();

        let mut other = self::engine(30, 20);
        other.load_records(&records);
        assert_eq!(other.mask("a").unwrap().raster(), engine.mask("a").unwrap().raster());

        records.get_mut("a").unwrap().width = 31;
        other.load_records(&records);
        assert!(other.masks().is_empty());
    }

    #[test]
    fn render_composites_each_mask_at_frame() {
        let mut engine = engine(10, 10);
        let frame = ImageFrame::new(5.0, 5.0, 40.0, 40.0);
        engine.pointer_down(ScreenPoint::new(20.0, 20.0), Tool::Brush, &label("a"), &frame);
        engine.pointer_up(ScreenPoint::new(20.0, 20.0), &frame);
        let mut port = RecordingPort::new();
        engine.render(&mut port, &frame);
        assert!(matches!(
            &port.commands[0],
            DrawCommand::Raster { key, dest, opacity, .. } if key == "a" && *dest == frame && *opacity == 0.5
        ));
    }
}
