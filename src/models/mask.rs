// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Segmentation mask rasters.
//!
//! A mask is an RGBA buffer with the image's intrinsic dimensions. All edits
//! happen in image pixel space, so pan and zoom never touch stored data.

use super::color::Rgb;
use crate::codec::rle;
use crate::error::Result;
use crate::util::geometry::PixelPoint;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

static REVISIONS: AtomicU64 = AtomicU64::new(1);

/// Revisions are unique across all masks, so a restored mask never reuses
/// the revision of content it replaced.
fn next_revision() -> u64 {
    REVISIONS.fetch_add(1, Ordering::Relaxed)
}

/// Persisted mask: `{color, rle, width, height}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRecord {
    pub color: Rgb,
    pub rle: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

/// Outcome of a flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillReport {
    pub filled: usize,
    pub visited: usize,
    pub truncated: bool,
}

/// One label's raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub color: Rgb,
    raster: RgbaImage,
    revision: u64,
}

impl Mask {
    /// Create an empty (fully transparent) mask.
    pub fn new(color: Rgb, width: u32, height: u32) -> Self {
        Self {
            color,
            raster: RgbaImage::new(width, height),
            revision: next_revision(),
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Bumped on every change; lets renderers cache uploaded textures.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.raster.get_pixel(x, y).0[3]
    }

    pub fn filled_area(&self) -> usize {
        self.raster.pixels().filter(|p| rle::is_filled(p.0[3])).count()
    }

    /// Paint a disk of the mask color at full alpha. Returns whether any pixel changed.
    pub fn stamp_disk(&mut self, center: PixelPoint, radius: f64) -> bool {
        let paint = Rgba([self.color.r, self.color.g, self.color.b, 255]);
        self.apply_disk(center, radius, paint)
    }

    /// Clear alpha inside a disk.
    pub fn erase_disk(&mut self, center: PixelPoint, radius: f64) -> bool {
        self.apply_disk(center, radius, Rgba([0, 0, 0, 0]))
    }

    fn apply_disk(&mut self, center: PixelPoint, radius: f64, value: Rgba<u8>) -> bool {
        let (w, h) = (self.width() as i64, self.height() as i64);
        if w == 0 || h == 0 {
            return false;
        }
        let r = radius.max(0.0);
        let min_x = ((center.x - r).floor() as i64).clamp(0, w - 1);
        let max_x = ((center.x + r).floor() as i64).clamp(0, w - 1);
        let min_y = ((center.y - r).floor() as i64).clamp(0, h - 1);
        let max_y = ((center.y + r).floor() as i64).clamp(0, h - 1);
        let (cx, cy) = (center.x.floor() as i64, center.y.floor() as i64);

        let mut changed = false;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f64 + 0.5 - center.x;
                let dy = y as f64 + 0.5 - center.y;
                // The pixel under the center is always hit, even for tiny radii.
                let inside = dx * dx + dy * dy <= r * r || (x == cx && y == cy);
                if inside {
                    let px = self.raster.get_pixel_mut(x as u32, y as u32);
                    if *px != value {
                        *px = value;
                        changed = true;
                    }
                }
            }
        }
        if changed {
            self.revision = next_revision();
        }
        changed
    }

    /// 4-connected breadth-first flood fill from `(seed_x, seed_y)`.
    ///
    /// Only pixels with alpha at or below `threshold` are filled. The fill is a
    /// no-op when the seed is already filled, and stops silently after
    /// `pixel_cap` pixels have been visited.
    pub fn flood_fill(&mut self, seed_x: u32, seed_y: u32, threshold: u8, pixel_cap: usize) -> FillReport {
        let mut report = FillReport::default();
        let (w, h) = (self.width(), self.height());
        if seed_x >= w || seed_y >= h || pixel_cap == 0 {
            return report;
        }
        if self.alpha_at(seed_x, seed_y) > threshold {
            return report;
        }

        let paint = Rgba([self.color.r, self.color.g, self.color.b, 255]);
        let wu = w as usize;
        let mut visited = vec![false; wu * h as usize];
        let mut queue: VecDeque<(u32, u32)> = VecDeque::new();

        visited[seed_y as usize * wu + seed_x as usize] = true;
        report.visited = 1;
        queue.push_back((seed_x, seed_y));

        while let Some((x, y)) = queue.pop_front() {
            self.raster.put_pixel(x, y, paint);
            report.filled += 1;

            let neighbors = [
                (x.checked_sub(1), Some(y)),
                (x.checked_add(1).filter(|&nx| nx < w), Some(y)),
                (Some(x), y.checked_sub(1)),
                (Some(x), y.checked_add(1).filter(|&ny| ny < h)),
            ];
            for (nx, ny) in neighbors {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                let idx = ny as usize * wu + nx as usize;
                if visited[idx] || self.raster.get_pixel(nx, ny).0[3] > threshold {
                    continue;
                }
                if report.visited >= pixel_cap {
                    report.truncated = true;
                    continue;
                }
                visited[idx] = true;
                report.visited += 1;
                queue.push_back((nx, ny));
            }
        }

        if report.filled > 0 {
            self.revision = next_revision();
        }
        report
    }

    /// Clear every pixel.
    pub fn clear(&mut self) {
        for px in self.raster.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.revision = next_revision();
    }

    pub fn to_record(&self) -> MaskRecord {
        MaskRecord {
            color: self.color,
            rle: rle::encode(&self.raster),
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn from_record(record: &MaskRecord) -> Result<Self> {
        Ok(Self {
            color: record.color,
            raster: rle::decode(&record.rle, record.width, record.height, record.color)?,
            revision: next_revision(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_paints_disk_in_image_space() {
        let mut mask = Mask::new(Rgb::new(0, 255, 0), 20, 20);
        let created = mask.revision();
        assert!(mask.stamp_disk(PixelPoint::new(10.0, 10.0), 3.0));
        assert_eq!(mask.alpha_at(10, 10), 255);
        assert_eq!(mask.alpha_at(12, 10), 255);
        assert_eq!(mask.alpha_at(15, 10), 0);
        assert_eq!(mask.alpha_at(0, 0), 0);
        let stamped = mask.revision();
        assert_ne!(stamped, created);
        // Same stamp again changes nothing.
        assert!(!mask.stamp_disk(PixelPoint::new(10.0, 10.0), 3.0));
        assert_eq!(mask.revision(), stamped);
    }

    #[test]
    fn stamp_near_edge_is_clipped() {
        let mut mask = Mask::new(Rgb::WHITE, 5, 5);
        assert!(mask.stamp_disk(PixelPoint::new(-1.0, 0.5), 2.0));
        assert_eq!(mask.alpha_at(0, 0), 255);
        // Far outside the raster: nothing to paint.
        assert!(!mask.stamp_disk(PixelPoint::new(-50.0, -50.0), 2.0));
    }

    #[test]
    fn erase_clears_alpha() {
        let mut mask = Mask::new(Rgb::WHITE, 10, 10);
        mask.stamp_disk(PixelPoint::new(5.0, 5.0), 4.0);
        mask.erase_disk(PixelPoint::new(5.0, 5.0), 1.0);
        assert_eq!(mask.alpha_at(5, 5), 0);
        assert_eq!(mask.alpha_at(2, 5), 255);
    }

    #[test]
    fn fill_stops_at_filled_boundary() {
        let mut mask = Mask::new(Rgb::new(255, 0, 0), 10, 10);
        // Vertical wall at x = 5
        for y in 0..10 {
            mask.stamp_disk(PixelPoint::new(5.5, y as f64 + 0.5), 0.4);
        }
        let report = mask.flood_fill(1, 1, 127, 1_000_000);
        assert_eq!(report.filled, 50);
        assert!(!report.truncated);
        assert_eq!(mask.alpha_at(0, 9), 255);
        assert_eq!(mask.alpha_at(7, 7), 0);
    }

    #[test]
    fn fill_on_filled_seed_is_noop() {
        let mut mask = Mask::new(Rgb::WHITE, 4, 4);
        mask.stamp_disk(PixelPoint::new(1.5, 1.5), 0.4);
        let before = mask.clone();
        let report = mask.flood_fill(1, 1, 127, 100);
        assert_eq!(report, FillReport::default());
        assert_eq!(mask, before);
    }

    #[test]
    fn fill_respects_pixel_cap() {
        let mut mask = Mask::new(Rgb::WHITE, 2000, 2000);
        let cap = 1_000_000;
        let report = mask.flood_fill(1000, 1000, 127, cap);
        assert!(report.truncated);
        assert!(report.visited <= cap);
        assert_eq!(report.filled, report.visited);
        assert_eq!(mask.filled_area(), report.filled);
    }

    #[test]
    fn record_roundtrip() {
        let mut mask = Mask::new(Rgb::new(1, 2, 3), 8, 6);
        mask.stamp_disk(PixelPoint::new(4.0, 3.0), 2.0);
        let record = mask.to_record();
        let back = Mask::from_record(&record).unwrap();
        assert_eq!(back.raster(), mask.raster());
    }
}
