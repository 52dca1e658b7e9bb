// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Shape annotation engine.
//!
//! Drives the `idle -> drawing -> idle` state machine for boxes, polygons,
//! landmarks and freeform strokes, plus selection, move and resize of
//! existing shapes. Stored annotations are always normalized; during a
//! gesture the engine renders from live surface geometry and only runs the
//! normalizer when the gesture ends.

use crate::config::{LabelSpec, Tool};
use crate::error::Result;
use crate::models::annotation::{Annotation, BoxCoords, Coordinates, FreeformCoords};
use crate::models::color::Rgb;
use crate::render::{DrawingPort, StrokeStyle};
use crate::util::geometry::{self, ImageFrame, ScreenPoint, ScreenRect};

/// Pointer distance (surface px) that counts as hitting a shape or handle.
pub const HIT_TOLERANCE: f64 = 6.0;
/// Half-size of a drawn resize handle.
const HANDLE_SIZE: f64 = 4.0;
const LANDMARK_RADIUS: f64 = 4.0;
/// Clicking this close to a polygon's first vertex closes it.
const CLOSE_RADIUS: f64 = 8.0;
/// Consecutive polygon clicks closer than this are merged.
const DUPLICATE_RADIUS: f64 = 2.0;

/// Annotation geometry in surface pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenGeometry {
    Bbox(ScreenRect),
    Polygon(Vec<ScreenPoint>),
    Landmark(ScreenPoint),
    Freeform(Vec<ScreenPoint>),
}

impl ScreenGeometry {
    /// Project stored coordinates onto the surface.
    pub fn from_coordinates(coordinates: &Coordinates, frame: &ImageFrame) -> Result<Self> {
        let points = |pts: &[geometry::UnitPoint]| -> Result<Vec<ScreenPoint>> {
            pts.iter().map(|p| geometry::denormalize(*p, frame)).collect()
        };
        Ok(match coordinates {
            Coordinates::Bbox(b) => ScreenGeometry::Bbox(geometry::denormalize_rect(
                geometry::UnitPoint::new(b.x, b.y),
                b.width,
                b.height,
                frame,
            )?),
            Coordinates::Polygon(pts) => ScreenGeometry::Polygon(points(pts)?),
            Coordinates::Landmark(p) => ScreenGeometry::Landmark(geometry::denormalize(*p, frame)?),
            Coordinates::Freeform(f) => ScreenGeometry::Freeform(points(&f.absolute_points())?),
        })
    }

    /// Normalize live geometry for storage.
    pub fn to_coordinates(&self, frame: &ImageFrame) -> Result<Coordinates> {
        let points = |pts: &[ScreenPoint]| -> Result<Vec<geometry::UnitPoint>> {
            pts.iter().map(|p| geometry::normalize(*p, frame)).collect()
        };
        Ok(match self {
            ScreenGeometry::Bbox(rect) => {
                let (origin, width, height) = geometry::normalize_rect(*rect, frame)?;
                Coordinates::Bbox(BoxCoords {
                    x: origin.x,
                    y: origin.y,
                    width,
                    height,
                })
            }
            ScreenGeometry::Polygon(pts) => Coordinates::Polygon(points(pts)?),
            ScreenGeometry::Landmark(p) => Coordinates::Landmark(geometry::normalize(*p, frame)?),
            ScreenGeometry::Freeform(pts) => Coordinates::Freeform(FreeformCoords::from_absolute(&points(pts)?)),
        })
    }

    pub fn bounds(&self) -> ScreenRect {
        match self {
            ScreenGeometry::Bbox(rect) => *rect,
            ScreenGeometry::Landmark(p) => ScreenRect::from_corners(*p, *p),
            ScreenGeometry::Polygon(pts) | ScreenGeometry::Freeform(pts) => {
                ScreenRect::bounding(pts).unwrap_or_default()
            }
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            ScreenGeometry::Bbox(rect) => {
                rect.left += dx;
                rect.top += dy;
            }
            ScreenGeometry::Landmark(p) => *p = p.offset(dx, dy),
            ScreenGeometry::Polygon(pts) | ScreenGeometry::Freeform(pts) => {
                for p in pts.iter_mut() {
                    *p = p.offset(dx, dy);
                }
            }
        }
    }

    /// Map the geometry affinely from `from` onto `to`.
    pub fn remap(&self, from: ScreenRect, to: ScreenRect) -> Self {
        let map = |p: ScreenPoint| {
            let x = if from.width > 0.0 {
                to.left + (p.x - from.left) * to.width / from.width
            } else {
                to.left
            };
            let y = if from.height > 0.0 {
                to.top + (p.y - from.top) * to.height / from.height
            } else {
                to.top
            };
            ScreenPoint::new(x, y)
        };
        match self {
            ScreenGeometry::Bbox(rect) => ScreenGeometry::Bbox(ScreenRect::from_corners(map(rect.min()), map(rect.max()))),
            ScreenGeometry::Landmark(p) => ScreenGeometry::Landmark(map(*p)),
            ScreenGeometry::Polygon(pts) => ScreenGeometry::Polygon(pts.iter().map(|p| map(*p)).collect()),
            ScreenGeometry::Freeform(pts) => ScreenGeometry::Freeform(pts.iter().map(|p| map(*p)).collect()),
        }
    }

    pub fn hit(&self, p: ScreenPoint, tolerance: f64) -> bool {
        match self {
            ScreenGeometry::Bbox(rect) => rect.expand(tolerance).contains(p),
            ScreenGeometry::Landmark(c) => c.distance_to(p) <= LANDMARK_RADIUS + tolerance,
            ScreenGeometry::Polygon(pts) => point_in_polygon(pts, p) || near_polyline(pts, p, tolerance, true),
            ScreenGeometry::Freeform(pts) => near_polyline(pts, p, tolerance, false),
        }
    }

    /// Clip to `bounds`: boxes are intersected, points are clamped.
    /// `None` when a box lies entirely outside.
    pub fn clip_to(&self, bounds: ScreenRect) -> Option<Self> {
        let clamp_all = |pts: &[ScreenPoint]| -> Vec<ScreenPoint> {
            pts.iter().map(|p| bounds.clamp(*p)).collect()
        };
        Some(match self {
            ScreenGeometry::Bbox(rect) => ScreenGeometry::Bbox(rect.intersect(&bounds)?),
            ScreenGeometry::Landmark(p) => ScreenGeometry::Landmark(bounds.clamp(*p)),
            ScreenGeometry::Polygon(pts) => ScreenGeometry::Polygon(clamp_all(pts)),
            ScreenGeometry::Freeform(pts) => ScreenGeometry::Freeform(clamp_all(pts)),
        })
    }

    /// Whether the shape is too small to keep.
    fn below_min_size(&self, min_size: f64) -> bool {
        let b = self.bounds();
        match self {
            ScreenGeometry::Bbox(_) => b.width < min_size || b.height < min_size,
            ScreenGeometry::Polygon(pts) => pts.len() < 3 || b.width.max(b.height) < min_size,
            ScreenGeometry::Freeform(pts) => pts.len() < 2 || b.width.max(b.height) < min_size,
            ScreenGeometry::Landmark(_) => false,
        }
    }

    fn is_resizable(&self) -> bool {
        !matches!(self, ScreenGeometry::Landmark(_))
    }
}

fn point_in_polygon(vertices: &[ScreenPoint], p: ScreenPoint) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (vi, vj) = (vertices[i], vertices[j]);
        if ((vi.y > p.y) != (vj.y > p.y)) && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn segment_distance(p: ScreenPoint, a: ScreenPoint, b: ScreenPoint) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance_to(ScreenPoint::new(a.x + t * dx, a.y + t * dy))
}

fn near_polyline(points: &[ScreenPoint], p: ScreenPoint, tolerance: f64, closed: bool) -> bool {
    match points {
        [] => false,
        [single] => single.distance_to(p) <= tolerance,
        _ => {
            let open = points.windows(2).any(|w| segment_distance(p, w[0], w[1]) <= tolerance);
            let closing = closed && segment_distance(p, points[points.len() - 1], points[0]) <= tolerance;
            open || closing
        }
    }
}

/// Corner and edge resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    pub fn position(&self, rect: ScreenRect) -> ScreenPoint {
        let cx = rect.left + rect.width / 2.0;
        let cy = rect.top + rect.height / 2.0;
        match self {
            Handle::TopLeft => ScreenPoint::new(rect.left, rect.top),
            Handle::Top => ScreenPoint::new(cx, rect.top),
            Handle::TopRight => ScreenPoint::new(rect.right(), rect.top),
            Handle::Right => ScreenPoint::new(rect.right(), cy),
            Handle::BottomRight => ScreenPoint::new(rect.right(), rect.bottom()),
            Handle::Bottom => ScreenPoint::new(cx, rect.bottom()),
            Handle::BottomLeft => ScreenPoint::new(rect.left, rect.bottom()),
            Handle::Left => ScreenPoint::new(rect.left, cy),
        }
    }

    /// Rectangle after dragging this handle to `to`. May flip.
    pub fn drag(&self, rect: ScreenRect, to: ScreenPoint) -> ScreenRect {
        let (mut l, mut t, mut r, mut b) = (rect.left, rect.top, rect.right(), rect.bottom());
        match self {
            Handle::TopLeft => (l, t) = (to.x, to.y),
            Handle::Top => t = to.y,
            Handle::TopRight => (r, t) = (to.x, to.y),
            Handle::Right => r = to.x,
            Handle::BottomRight => (r, b) = (to.x, to.y),
            Handle::Bottom => b = to.y,
            Handle::BottomLeft => (l, b) = (to.x, to.y),
            Handle::Left => l = to.x,
        }
        ScreenRect::from_corners(ScreenPoint::new(l, t), ScreenPoint::new(r, b))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Draft {
    Bbox { start: ScreenPoint, current: ScreenPoint },
    Polygon { points: Vec<ScreenPoint>, hover: Option<ScreenPoint> },
    Landmark(ScreenPoint),
    Freeform(Vec<ScreenPoint>),
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Drawing { draft: Draft, label: String, color: Rgb },
    Moving { index: usize, start: ScreenPoint, live: ScreenGeometry, moved: bool },
    Resizing { index: usize, handle: Handle, original: ScreenGeometry, live: ScreenGeometry },
}

/// What an input did to the engine's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOutcome {
    /// Nothing changed.
    Ignored,
    /// Live state changed (draft, selection); nothing to persist.
    Updated,
    /// The annotation list changed and should be committed to history.
    Committed,
    /// A finished gesture was rejected (e.g. below the minimum size).
    Discarded,
}

#[derive(Debug, Clone)]
pub struct ShapeEngine {
    annotations: Vec<Annotation>,
    gesture: Gesture,
    selected: Option<usize>,
    min_size: f64,
    freeform_width: f64,
}

impl ShapeEngine {
    pub fn new(min_size: f64, freeform_width: f64) -> Self {
        Self {
            annotations: Vec::new(),
            gesture: Gesture::Idle,
            selected: None,
            min_size,
            freeform_width,
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Replace the whole list (history restore, load). Drops selection and any gesture.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
        self.selected = None;
        self.gesture = Gesture::Idle;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|&i| i < self.annotations.len());
    }

    /// A gesture is in progress.
    pub fn is_busy(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn pointer_down(&mut self, pos: ScreenPoint, tool: Tool, label: &LabelSpec, frame: &ImageFrame) -> ShapeOutcome {
        if let Gesture::Drawing {
            draft: Draft::Polygon { points, .. },
            ..
        } = &mut self.gesture
        {
            // Close when clicking the first vertex.
            if points.len() >= 3 && points[0].distance_to(pos) <= CLOSE_RADIUS {
                return self.finish_polygon(frame);
            }
            if points.last().map_or(true, |last| last.distance_to(pos) > DUPLICATE_RADIUS) {
                points.push(pos);
            }
            return ShapeOutcome::Updated;
        }

        let draft = match tool {
            Tool::Select => return self.begin_select(pos, frame),
            Tool::Bbox => Draft::Bbox { start: pos, current: pos },
            Tool::Polygon => Draft::Polygon {
                points: vec![pos],
                hover: None,
            },
            Tool::Landmark => Draft::Landmark(pos),
            Tool::Freeform => Draft::Freeform(vec![pos]),
            Tool::Brush | Tool::Eraser | Tool::Fill => return ShapeOutcome::Ignored,
        };
        log::debug!("Start drawing {:?} with label {}", tool, label.name);
        self.selected = None;
        self.gesture = Gesture::Drawing {
            draft,
            label: label.name.clone(),
            color: label.color,
        };
        ShapeOutcome::Updated
    }

    fn begin_select(&mut self, pos: ScreenPoint, frame: &ImageFrame) -> ShapeOutcome {
        if let Some(index) = self.selected {
            if let Some(geometry) = self.screen_geometry(index, frame) {
                if geometry.is_resizable() {
                    let bounds = geometry.bounds();
                    if let Some(handle) = Handle::ALL
                        .iter()
                        .find(|h| h.position(bounds).distance_to(pos) <= HIT_TOLERANCE)
                    {
                        log::debug!("Start resizing annotation {} via {:?}", index, handle);
                        self.gesture = Gesture::Resizing {
                            index,
                            handle: *handle,
                            original: geometry.clone(),
                            live: geometry,
                        };
                        return ShapeOutcome::Updated;
                    }
                }
            }
        }

        match self.hit_test(pos, frame) {
            Some(index) => {
                self.selected = Some(index);
                if let Some(live) = self.screen_geometry(index, frame) {
                    self.gesture = Gesture::Moving {
                        index,
                        start: pos,
                        live,
                        moved: false,
                    };
                }
                ShapeOutcome::Updated
            }
            None if self.selected.is_some() => {
                self.selected = None;
                ShapeOutcome::Updated
            }
            None => ShapeOutcome::Ignored,
        }
    }

    pub fn pointer_move(&mut self, pos: ScreenPoint) -> ShapeOutcome {
        match &mut self.gesture {
            Gesture::Idle => return ShapeOutcome::Ignored,
            Gesture::Drawing { draft, .. } => match draft {
                Draft::Bbox { current, .. } => *current = pos,
                Draft::Polygon { hover, .. } => *hover = Some(pos),
                Draft::Landmark(p) => *p = pos,
                Draft::Freeform(points) => points.push(pos),
            },
            Gesture::Moving { start, live, moved, .. } => {
                let (dx, dy) = (pos.x - start.x, pos.y - start.y);
                if dx != 0.0 || dy != 0.0 {
                    live.translate(dx, dy);
                    *start = pos;
                    *moved = true;
                }
            }
            Gesture::Resizing {
                handle, original, live, ..
            } => {
                let from = original.bounds();
                *live = original.remap(from, handle.drag(from, pos));
            }
        }
        ShapeOutcome::Updated
    }

    pub fn pointer_up(&mut self, pos: ScreenPoint, frame: &ImageFrame) -> ShapeOutcome {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => ShapeOutcome::Ignored,
            Gesture::Drawing { draft, label, color } => match draft {
                // Polygons stay open across clicks.
                Draft::Polygon { .. } => {
                    self.gesture = Gesture::Drawing { draft, label, color };
                    ShapeOutcome::Ignored
                }
                Draft::Bbox { start, .. } => {
                    self.commit_new(ScreenGeometry::Bbox(ScreenRect::from_corners(start, pos)), label, color, frame)
                }
                Draft::Landmark(_) => self.commit_new(ScreenGeometry::Landmark(pos), label, color, frame),
                Draft::Freeform(mut points) => {
                    if points.last() != Some(&pos) {
                        points.push(pos);
                    }
                    self.commit_new(ScreenGeometry::Freeform(points), label, color, frame)
                }
            },
            Gesture::Moving { index, live, moved, .. } => {
                if moved {
                    self.commit_existing(index, live, frame)
                } else {
                    ShapeOutcome::Updated
                }
            }
            Gesture::Resizing { index, live, .. } => self.commit_existing(index, live, frame),
        }
    }

    /// Close the polygon being drawn, if it has enough points.
    pub fn finish_polygon(&mut self, frame: &ImageFrame) -> ShapeOutcome {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Drawing {
                draft: Draft::Polygon { points, .. },
                label,
                color,
            } => self.commit_new(ScreenGeometry::Polygon(points), label, color, frame),
            other => {
                self.gesture = other;
                ShapeOutcome::Ignored
            }
        }
    }

    /// Abandon the current gesture without touching stored annotations.
    pub fn cancel(&mut self) -> ShapeOutcome {
        if self.is_busy() {
            log::debug!("Cancelled shape gesture");
            self.gesture = Gesture::Idle;
            ShapeOutcome::Updated
        } else if self.selected.take().is_some() {
            ShapeOutcome::Updated
        } else {
            ShapeOutcome::Ignored
        }
    }

    pub fn delete_selected(&mut self) -> Option<Annotation> {
        if self.is_busy() {
            return None;
        }
        let index = self.selected.take()?;
        let removed = self.annotations.remove(index);
        log::info!("Deleted annotation, total: {}", self.annotations.len());
        Some(removed)
    }

    /// Clip live geometry to the image and normalize it for storage.
    fn stored_coordinates(&self, live: &ScreenGeometry, frame: &ImageFrame) -> Result<Option<Coordinates>> {
        let Some(clipped) = live.clip_to(frame.rect()) else {
            return Ok(None);
        };
        if clipped.below_min_size(self.min_size) {
            return Ok(None);
        }
        let mut coordinates = clipped.to_coordinates(frame)?;
        coordinates.clamp_to_unit();
        Ok(Some(coordinates))
    }

    fn commit_new(&mut self, live: ScreenGeometry, label: String, color: Rgb, frame: &ImageFrame) -> ShapeOutcome {
        match self.stored_coordinates(&live, frame) {
            Ok(None) => {
                log::debug!("Discarded shape below minimum size {} inside the image", self.min_size);
                ShapeOutcome::Discarded
            }
            Ok(Some(coordinates)) => {
                self.annotations.push(Annotation::new(label, color, coordinates));
                log::info!("Added annotation, total: {}", self.annotations.len());
                ShapeOutcome::Committed
            }
            Err(e) => {
                log::warn!("Discarded shape: {}", e);
                ShapeOutcome::Discarded
            }
        }
    }

    fn commit_existing(&mut self, index: usize, live: ScreenGeometry, frame: &ImageFrame) -> ShapeOutcome {
        let stored = self.stored_coordinates(&live, frame);
        let Some(annotation) = self.annotations.get_mut(index) else {
            return ShapeOutcome::Discarded;
        };
        match stored {
            Ok(None) => ShapeOutcome::Discarded,
            Ok(Some(coordinates)) => {
                annotation.coordinates = coordinates;
                log::info!("Updated annotation {}", index);
                ShapeOutcome::Committed
            }
            Err(e) => {
                log::warn!("Discarded edit of annotation {}: {}", index, e);
                ShapeOutcome::Discarded
            }
        }
    }

    fn screen_geometry(&self, index: usize, frame: &ImageFrame) -> Option<ScreenGeometry> {
        let annotation = self.annotations.get(index)?;
        ScreenGeometry::from_coordinates(&annotation.coordinates, frame).ok()
    }

    /// Topmost annotation under `pos`.
    pub fn hit_test(&self, pos: ScreenPoint, frame: &ImageFrame) -> Option<usize> {
        (0..self.annotations.len())
            .rev()
            .find(|&i| self.screen_geometry(i, frame).is_some_and(|g| g.hit(pos, HIT_TOLERANCE)))
    }

    pub fn render(&self, port: &mut dyn DrawingPort, frame: &ImageFrame) {
        let live_override = match &self.gesture {
            Gesture::Moving { index, live, .. } | Gesture::Resizing { index, live, .. } => Some((*index, live)),
            _ => None,
        };

        for (i, annotation) in self.annotations.iter().enumerate() {
            let geometry = match live_override {
                Some((index, live)) if index == i => live.clone(),
                _ => match ScreenGeometry::from_coordinates(&annotation.coordinates, frame) {
                    Ok(g) => g,
                    Err(_) => continue,
                },
            };
            self.draw_geometry(port, &geometry, annotation.color, false);
            let bounds = geometry.bounds();
            let (_, text_h) = port.measure_text(&annotation.label);
            port.draw_text(
                ScreenPoint::new(bounds.left, bounds.top - text_h - 2.0),
                &annotation.label,
                annotation.color,
            );
            if self.selected == Some(i) && geometry.is_resizable() {
                for handle in Handle::ALL {
                    let c = handle.position(bounds);
                    let rect = ScreenRect {
                        left: c.x - HANDLE_SIZE,
                        top: c.y - HANDLE_SIZE,
                        width: 2.0 * HANDLE_SIZE,
                        height: 2.0 * HANDLE_SIZE,
                    };
                    port.fill_rect(rect, Rgb::WHITE, 1.0);
                    port.stroke_rect(rect, StrokeStyle::solid(Rgb::BLACK, 1.0));
                }
            }
        }

        if let Gesture::Drawing { draft, color, .. } = &self.gesture {
            match draft {
                Draft::Bbox { start, current } => {
                    port.stroke_rect(ScreenRect::from_corners(*start, *current), StrokeStyle::dashed(*color, 2.0));
                }
                Draft::Polygon { points, hover } => {
                    let mut preview = points.clone();
                    preview.extend(hover.iter().copied());
                    port.stroke_polyline(&preview, false, StrokeStyle::dashed(*color, 2.0));
                    for p in points {
                        port.fill_circle(*p, LANDMARK_RADIUS, Rgb::WHITE);
                        port.stroke_circle(*p, LANDMARK_RADIUS, StrokeStyle::solid(Rgb::BLACK, 1.0));
                    }
                }
                Draft::Landmark(p) => self.draw_geometry(port, &ScreenGeometry::Landmark(*p), *color, true),
                Draft::Freeform(points) => {
                    self.draw_geometry(port, &ScreenGeometry::Freeform(points.clone()), *color, true)
                }
            }
        }
    }

    fn draw_geometry(&self, port: &mut dyn DrawingPort, geometry: &ScreenGeometry, color: Rgb, in_progress: bool) {
        let style = StrokeStyle {
            color,
            width: 2.0,
            dashed: in_progress,
        };
        match geometry {
            ScreenGeometry::Bbox(rect) => port.stroke_rect(*rect, style),
            ScreenGeometry::Polygon(points) => port.stroke_polyline(points, true, style),
            ScreenGeometry::Landmark(p) => {
                port.fill_circle(*p, LANDMARK_RADIUS, color);
                port.stroke_circle(*p, LANDMARK_RADIUS, StrokeStyle::solid(Rgb::BLACK, 1.0));
            }
            ScreenGeometry::Freeform(points) => port.stroke_polyline(
                points,
                false,
                StrokeStyle {
                    width: self.freeform_width,
                    ..style
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, RecordingPort};

    fn label() -> LabelSpec {
        LabelSpec {
            name: "car".to_string(),
            color: Rgb::new(255, 0, 0),
            key_value: None,
        }
    }

    fn frame() -> ImageFrame {
        ImageFrame::new(0.0, 0.0, 500.0, 400.0)
    }

    fn draw_box(engine: &mut ShapeEngine, a: (f64, f64), b: (f64, f64)) -> ShapeOutcome {
        let f = frame();
        engine.pointer_down(ScreenPoint::new(a.0, a.1), Tool::Bbox, &label(), &f);
        engine.pointer_move(ScreenPoint::new(b.0, b.1));
        engine.pointer_up(ScreenPoint::new(b.0, b.1), &f)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn bbox_is_stored_normalized() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        assert_eq!(draw_box(&mut engine, (10.0, 10.0), (100.0, 80.0)), ShapeOutcome::Committed);
        let ann = &engine.annotations()[0];
        assert_eq!(ann.label, "car");
        match ann.coordinates {
            Coordinates::Bbox(b) => {
                assert_close(b.x, 0.02);
                assert_close(b.y, 0.025);
                assert_close(b.width, 0.18);
                assert_close(b.height, 0.175);
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn tiny_box_is_discarded() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        assert_eq!(draw_box(&mut engine, (10.0, 10.0), (12.0, 60.0)), ShapeOutcome::Discarded);
        assert!(engine.annotations().is_empty());
        assert!(!engine.is_busy());
    }

    #[test]
    fn box_dragged_past_the_image_is_clipped() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        assert_eq!(draw_box(&mut engine, (-100.0, -40.0), (600.0, 80.0)), ShapeOutcome::Committed);
        assert_eq!(draw_box(&mut engine, (450.0, 350.0), (700.0, 900.0)), ShapeOutcome::Committed);
        match (&engine.annotations()[0].coordinates, &engine.annotations()[1].coordinates) {
            (Coordinates::Bbox(a), Coordinates::Bbox(b)) => {
                assert_eq!((a.x, a.y, a.width), (0.0, 0.0, 1.0));
                assert_close(a.height, 0.2);
                assert_close(b.x, 0.9);
                assert_close(b.y, 0.875);
                assert_close(b.width, 0.1);
                assert_close(b.height, 0.125);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Entirely outside, or too thin once clipped.
        assert_eq!(draw_box(&mut engine, (-100.0, -100.0), (-20.0, -20.0)), ShapeOutcome::Discarded);
        assert_eq!(draw_box(&mut engine, (-100.0, 10.0), (3.0, 100.0)), ShapeOutcome::Discarded);
        assert_eq!(engine.annotations().len(), 2);
    }

    #[test]
    fn points_outside_the_image_are_clamped() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        engine.pointer_down(ScreenPoint::new(-20.0, 500.0), Tool::Landmark, &label(), &f);
        engine.pointer_up(ScreenPoint::new(-20.0, 500.0), &f);

        for (x, y) in [(-50.0, -50.0), (250.0, -50.0), (250.0, 600.0)] {
            engine.pointer_down(ScreenPoint::new(x, y), Tool::Polygon, &label(), &f);
            engine.pointer_up(ScreenPoint::new(x, y), &f);
        }
        assert_eq!(engine.finish_polygon(&f), ShapeOutcome::Committed);

        engine.pointer_down(ScreenPoint::new(400.0, 300.0), Tool::Freeform, &label(), &f);
        engine.pointer_move(ScreenPoint::new(550.0, 350.0));
        assert_eq!(engine.pointer_up(ScreenPoint::new(600.0, 450.0), &f), ShapeOutcome::Committed);

        let annotations = engine.annotations();
        assert_eq!(annotations[0].coordinates, Coordinates::Landmark(geometry::UnitPoint::new(0.0, 1.0)));
        match &annotations[1].coordinates {
            Coordinates::Polygon(points) => {
                assert_eq!(points[0], geometry::UnitPoint::new(0.0, 0.0));
                assert_eq!(points[2], geometry::UnitPoint::new(0.5, 1.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &annotations[2].coordinates {
            Coordinates::Freeform(ff) => {
                assert_close(ff.left, 0.8);
                for p in ff.absolute_points() {
                    assert!(p.x >= 0.0 && p.x <= 1.0 + 1e-12, "{:?}", p);
                    assert!(p.y >= 0.0 && p.y <= 1.0 + 1e-12, "{:?}", p);
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn move_past_the_edge_keeps_the_visible_part() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        draw_box(&mut engine, (100.0, 100.0), (200.0, 200.0));
        engine.pointer_down(ScreenPoint::new(150.0, 150.0), Tool::Select, &label(), &f);
        engine.pointer_move(ScreenPoint::new(500.0, 150.0));
        assert_eq!(engine.pointer_up(ScreenPoint::new(500.0, 150.0), &f), ShapeOutcome::Committed);
        match engine.annotations()[0].coordinates {
            Coordinates::Bbox(b) => {
                assert_close(b.x, 0.9);
                assert_close(b.width, 0.1);
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn polygon_needs_three_points_and_closes_on_first_vertex() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        for (x, y) in [(10.0, 10.0), (100.0, 10.0)] {
            engine.pointer_down(ScreenPoint::new(x, y), Tool::Polygon, &label(), &f);
            engine.pointer_up(ScreenPoint::new(x, y), &f);
        }
        assert_eq!(engine.finish_polygon(&f), ShapeOutcome::Discarded);
        assert!(engine.annotations().is_empty());

        for (x, y) in [(10.0, 10.0), (100.0, 10.0), (100.0, 100.0)] {
            engine.pointer_down(ScreenPoint::new(x, y), Tool::Polygon, &label(), &f);
            engine.pointer_up(ScreenPoint::new(x, y), &f);
        }
        assert!(engine.is_busy());
        let outcome = engine.pointer_down(ScreenPoint::new(12.0, 11.0), Tool::Polygon, &label(), &f);
        assert_eq!(outcome, ShapeOutcome::Committed);
        match &engine.annotations()[0].coordinates {
            Coordinates::Polygon(points) => assert_eq!(points.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn landmark_commits_on_click() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        engine.pointer_down(ScreenPoint::new(250.0, 100.0), Tool::Landmark, &label(), &f);
        assert_eq!(engine.pointer_up(ScreenPoint::new(250.0, 100.0), &f), ShapeOutcome::Committed);
        assert_eq!(
            engine.annotations()[0].coordinates,
            Coordinates::Landmark(geometry::UnitPoint::new(0.5, 0.25))
        );
    }

    #[test]
    fn freeform_stroke_commits_on_release() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        engine.pointer_down(ScreenPoint::new(50.0, 50.0), Tool::Freeform, &label(), &f);
        engine.pointer_move(ScreenPoint::new(60.0, 55.0));
        engine.pointer_move(ScreenPoint::new(80.0, 70.0));
        assert_eq!(engine.pointer_up(ScreenPoint::new(100.0, 90.0), &f), ShapeOutcome::Committed);
        match &engine.annotations()[0].coordinates {
            Coordinates::Freeform(ff) => {
                assert_eq!(ff.path.len(), 4);
                assert_close(ff.left, 0.1);
                assert_close(ff.top, 0.125);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn label_is_captured_at_creation() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        let mut first = label();
        engine.pointer_down(ScreenPoint::new(10.0, 10.0), Tool::Bbox, &first, &f);
        first.name = "truck".to_string();
        engine.pointer_up(ScreenPoint::new(100.0, 100.0), &f);
        assert_eq!(engine.annotations()[0].label, "car");
    }

    #[test]
    fn move_updates_storage_only_on_release() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        draw_box(&mut engine, (100.0, 100.0), (200.0, 200.0));
        let before = engine.annotations().to_vec();

        engine.pointer_down(ScreenPoint::new(150.0, 150.0), Tool::Select, &label(), &f);
        assert_eq!(engine.selected(), Some(0));
        engine.pointer_move(ScreenPoint::new(200.0, 150.0));
        assert_eq!(engine.annotations(), before.as_slice());

        assert_eq!(engine.pointer_up(ScreenPoint::new(200.0, 150.0), &f), ShapeOutcome::Committed);
        match engine.annotations()[0].coordinates {
            Coordinates::Bbox(b) => assert_close(b.x, 0.3),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn resize_via_corner_handle() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        draw_box(&mut engine, (100.0, 100.0), (200.0, 200.0));
        engine.select(Some(0));
        engine.pointer_down(ScreenPoint::new(200.0, 200.0), Tool::Select, &label(), &f);
        engine.pointer_move(ScreenPoint::new(300.0, 250.0));
        assert_eq!(engine.pointer_up(ScreenPoint::new(300.0, 250.0), &f), ShapeOutcome::Committed);
        match engine.annotations()[0].coordinates {
            Coordinates::Bbox(b) => {
                assert_close(b.x, 0.2);
                assert_close(b.width, 0.4);
                assert_close(b.height, 0.375);
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn clicking_empty_space_deselects() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        draw_box(&mut engine, (100.0, 100.0), (200.0, 200.0));
        engine.select(Some(0));
        engine.pointer_down(ScreenPoint::new(400.0, 350.0), Tool::Select, &label(), &f);
        assert_eq!(engine.selected(), None);
    }

    #[test]
    fn delete_selected_removes_shape() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        draw_box(&mut engine, (100.0, 100.0), (200.0, 200.0));
        assert!(engine.delete_selected().is_none());
        engine.select(Some(0));
        assert!(engine.delete_selected().is_some());
        assert!(engine.annotations().is_empty());
    }

    #[test]
    fn render_uses_live_geometry_while_dragging() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        draw_box(&mut engine, (100.0, 100.0), (200.0, 200.0));
        engine.pointer_down(ScreenPoint::new(150.0, 150.0), Tool::Select, &label(), &f);
        engine.pointer_move(ScreenPoint::new(160.0, 150.0));

        let mut port = RecordingPort::new();
        engine.render(&mut port, &f);
        let first_rect = port.rects().next().map(|(r, _)| *r).unwrap();
        assert_close(first_rect.left, 110.0);
        assert!(port.texts().any(|t| t == "car"));
        // Selected shape shows its eight handles.
        let handles = port
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillRect(..)))
            .count();
        assert_eq!(handles, 8);
    }

    #[test]
    fn cancel_drops_draft() {
        let mut engine = ShapeEngine::new(5.0, 3.0);
        let f = frame();
        engine.pointer_down(ScreenPoint::new(10.0, 10.0), Tool::Bbox, &label(), &f);
        assert!(engine.is_busy());
        engine.cancel();
        assert!(!engine.is_busy());
        assert_eq!(engine.pointer_up(ScreenPoint::new(100.0, 100.0), &f), ShapeOutcome::Ignored);
        assert!(engine.annotations().is_empty());
    }
}
