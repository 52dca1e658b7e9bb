// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Track collection and per-frame overlay rendering.
//!
//! The coordinator owns every track plus the active-track selection, keeps
//! the current frame number in sync with playback time, records keyframes
//! from overlay drags and paints each track's box for the current frame.

use super::interpolate::{interpolate, track_range};
use crate::config::HostConfig;
use crate::error::{AnnotError, Result};
use crate::models::color::Rgb;
use crate::models::track::{BBox, FrameRange, Interpolation, Keyframe, Track};
use crate::render::{DrawingPort, StrokeStyle};
use crate::util::geometry::{self, ImageFrame, ScreenPoint, ScreenRect, UnitPoint};
use std::collections::BTreeMap;

const KEYFRAME_MARKER_RADIUS: f64 = 4.0;
const LABEL_PADDING: f64 = 2.0;

/// A box to draw for one track at one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackBox {
    pub track_id: u32,
    pub bbox: BBox,
    /// The box is an authored keyframe, not interpolated.
    pub is_keyframe: bool,
}

#[derive(Debug, Clone)]
pub struct TrackingCoordinator {
    tracks: BTreeMap<u32, Track>,
    /// Id handed to the next new track
    next_id: u32,
    /// Track that receives new keyframes
    active: Option<u32>,
    fps: f64,
    current_frame: u32,
    /// Upper bound for frame navigation when known
    frame_count: Option<u32>,
    /// Frames to step forward after each keyframe
    auto_advance: u32,
    default_interpolation: Interpolation,
    /// Smallest drag (surface px) kept as a keyframe
    min_size: f64,
    /// Start and current corner of the drag in progress
    preview: Option<(ScreenPoint, ScreenPoint)>,
    revision: u64,
}

impl TrackingCoordinator {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
            active: None,
            fps: config.video_fps,
            current_frame: 0,
            frame_count: config.frame_count,
            auto_advance: config.auto_advance_frames,
            default_interpolation: config.interpolation,
            min_size: config.min_shape_size,
            preview: None,
            revision: 0,
        }
    }

    pub fn tracks(&self) -> &BTreeMap<u32, Track> {
        &self.tracks
    }

    pub fn track(&self, id: u32) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn active_id(&self) -> Option<u32> {
        self.active
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.active.and_then(|id| self.tracks.get(&id))
    }

    /// Bumped whenever tracks change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> Option<u32> {
        self.frame_count
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    fn clamp_frame(&self, frame: u32) -> u32 {
        match self.frame_count {
            Some(count) => frame.min(count.saturating_sub(1)),
            None => frame,
        }
    }

    /// Frame-change notification.
    pub fn set_frame(&mut self, frame: u32) {
        self.current_frame = self.clamp_frame(frame);
    }

    /// Map playback time (seconds) to the current frame.
    pub fn set_time(&mut self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            self.set_frame(0);
            return;
        }
        // Small epsilon so exact frame boundaries don't round down.
        self.set_frame((seconds * self.fps + 1e-6).floor() as u32);
    }

    pub fn time_of(&self, frame: u32) -> f64 {
        frame as f64 / self.fps
    }

    /// Create a track and make it active.
    pub fn create_track(&mut self, label: impl Into<String>, color: Rgb) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let track = Track::new(id, label, color, self.default_interpolation);
        log::info!("Created track {} ({})", id, track.label);
        self.tracks.insert(id, track);
        self.active = Some(id);
        self.revision += 1;
        id
    }

    pub fn set_active(&mut self, id: Option<u32>) -> Result<()> {
        if let Some(id) = id {
            if !self.tracks.contains_key(&id) {
                return Err(AnnotError::UnknownTrack(id));
            }
        }
        self.active = id;
        Ok(())
    }

    pub fn set_interpolation(&mut self, id: u32, mode: Interpolation) -> Result<()> {
        let track = self.tracks.get_mut(&id).ok_or(AnnotError::UnknownTrack(id))?;
        track.interpolation = mode;
        self.revision += 1;
        Ok(())
    }

    /// Record `bbox` at the current frame on the active track.
    ///
    /// Returns the frame the keyframe was written to. Advances the current
    /// frame afterwards when auto-advance is configured.
    pub fn add_keyframe(&mut self, bbox: BBox) -> Result<u32> {
        let id = self.active.ok_or(AnnotError::NoActiveTrack)?;
        let frame = self.current_frame;
        let time = self.time_of(frame);
        let track = self.tracks.get_mut(&id).ok_or(AnnotError::UnknownTrack(id))?;
        track.insert_keyframe(Keyframe { frame, time, bbox });
        log::info!("Keyframe at frame {} on track {} ({} total)", frame, id, track.keyframes.len());
        self.revision += 1;
        if self.auto_advance > 0 {
            self.set_frame(frame.saturating_add(self.auto_advance));
        }
        Ok(frame)
    }

    /// Remove the active track's keyframe at `frame`.
    pub fn delete_keyframe(&mut self, frame: u32) -> Result<bool> {
        let id = self.active.ok_or(AnnotError::NoActiveTrack)?;
        self.delete_keyframe_in(id, frame)
    }

    pub fn delete_keyframe_in(&mut self, id: u32, frame: u32) -> Result<bool> {
        let track = self.tracks.get_mut(&id).ok_or(AnnotError::UnknownTrack(id))?;
        let removed = track.remove_keyframe(frame).is_some();
        if removed {
            self.revision += 1;
        }
        Ok(removed)
    }

    /// Delete a track and all of its keyframes.
    pub fn delete_track(&mut self, id: u32) -> Result<Track> {
        let track = self.tracks.remove(&id).ok_or(AnnotError::UnknownTrack(id))?;
        if self.active == Some(id) {
            self.active = None;
        }
        self.revision += 1;
        log::info!("Deleted track {} with {} keyframes", id, track.keyframes.len());
        Ok(track)
    }

    pub fn range(&self, id: u32) -> Option<FrameRange> {
        self.tracks.get(&id).and_then(track_range)
    }

    /// Every track's box at `frame`.
    pub fn boxes_at(&self, frame: u32) -> Vec<TrackBox> {
        self.tracks
            .values()
            .filter_map(|track| {
                interpolate(track, frame).map(|bbox| TrackBox {
                    track_id: track.id,
                    bbox,
                    is_keyframe: track.is_keyframe(frame),
                })
            })
            .collect()
    }

    pub fn begin_drag(&mut self, pos: ScreenPoint) {
        self.preview = Some((pos, pos));
    }

    pub fn update_drag(&mut self, pos: ScreenPoint) {
        if let Some((start, _)) = self.preview {
            self.preview = Some((start, pos));
        }
    }

    pub fn cancel_drag(&mut self) {
        self.preview = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.preview.is_some()
    }

    /// Turn the provisional drag into a keyframe.
    ///
    /// `Ok(None)` when there was no drag or it was too small to keep.
    pub fn end_drag(&mut self, pos: ScreenPoint, frame: &ImageFrame) -> Result<Option<u32>> {
        let Some((start, _)) = self.preview.take() else {
            return Ok(None);
        };
        // Only the part of the drag over the image is kept.
        let rect = ScreenRect::from_corners(start, pos).intersect(&frame.rect());
        let Some(rect) = rect.filter(|r| r.width >= self.min_size && r.height >= self.min_size) else {
            log::debug!("Discarded track drag below minimum size");
            return Ok(None);
        };
        let (origin, width, height) = geometry::normalize_rect(rect, frame)?;
        let (x, y) = (origin.x.clamp(0.0, 1.0), origin.y.clamp(0.0, 1.0));
        let bbox = BBox::new(x, y, width.clamp(0.0, 1.0 - x), height.clamp(0.0, 1.0 - y));
        self.add_keyframe(bbox).map(Some)
    }

    pub fn render(&self, port: &mut dyn DrawingPort, frame: &ImageFrame) {
        if !frame.is_valid() {
            return;
        }
        for tb in self.boxes_at(self.current_frame) {
            let Some(track) = self.tracks.get(&tb.track_id) else {
                continue;
            };
            let Ok(rect) = geometry::denormalize_rect(
                UnitPoint::new(tb.bbox.x, tb.bbox.y),
                tb.bbox.width,
                tb.bbox.height,
                frame,
            ) else {
                continue;
            };
            let style = if self.active == Some(track.id) {
                StrokeStyle::solid(track.color, 2.0)
            } else {
                StrokeStyle::dashed(track.color, 1.5)
            };
            port.stroke_rect(rect, style);

            if tb.is_keyframe {
                port.fill_circle(rect.min(), KEYFRAME_MARKER_RADIUS, track.color);
                port.stroke_circle(rect.min(), KEYFRAME_MARKER_RADIUS, StrokeStyle::solid(Rgb::WHITE, 1.0));
            }

            let text = format!("{} #{}", track.label, track.id);
            let (w, h) = port.measure_text(&text);
            let background = ScreenRect {
                left: rect.left,
                top: rect.top - h - 2.0 * LABEL_PADDING,
                width: w + 2.0 * LABEL_PADDING,
                height: h + 2.0 * LABEL_PADDING,
            };
            port.fill_rect(background, track.color, 0.7);
            port.draw_text(
                ScreenPoint::new(background.left + LABEL_PADDING, background.top + LABEL_PADDING),
                &text,
                Rgb::WHITE,
            );
        }

        if let Some((start, end)) = self.preview {
            port.stroke_rect(ScreenRect::from_corners(start, end), StrokeStyle::dashed(Rgb::WHITE, 1.5));
        }
    }

    /// Replace every track, e.g. after loading a project.
    pub fn load_tracks(&mut self, tracks: BTreeMap<u32, Track>) {
        self.next_id = tracks.keys().next_back().map_or(1, |max| max + 1);
        self.tracks = tracks;
        for (id, track) in self.tracks.iter_mut() {
            if track.id != *id {
                log::warn!("Track keyed {} claims id {}; using the key", id, track.id);
                track.id = *id;
            }
            let mismatched = track.rekey_keyframes();
            if mismatched > 0 {
                log::warn!("Track {}: re-keyed {} keyframes by their frame", id, mismatched);
            }
            track.recompute_range();
        }
        self.active = None;
        self.preview = None;
        self.revision += 1;
        log::info!("Loaded {} tracks", self.tracks.len());
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.tracks)?)
    }
}
