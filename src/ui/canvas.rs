// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and annotation.
//!
//! Bridges egui to the engines: pointer input becomes [`PointerEvent`]s and
//! engine output is painted through [`EguiPort`], a [`DrawingPort`] backed by
//! an `egui::Painter`.

use std::collections::HashMap;
use vannot::engine::{Modifiers, PointerEvent, PointerKind};
use vannot::models::color::Rgb;
use vannot::render::{DrawingPort, RasterRef, StrokeStyle};
use vannot::util::geometry::{ImageFrame, ScreenPoint, ScreenRect};
use vannot::{AnnotationSurface, TrackingCoordinator};

const TEXT_SIZE: f32 = 12.0;
const DASH_LENGTH: f32 = 6.0;
const DASH_GAP: f32 = 4.0;
const ZOOM_SPEED: f64 = 0.002;

/// What the canvas routes pointer input to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Image,
    Tracking,
}

/// Pointer state carried between frames.
#[derive(Default)]
pub struct CanvasState {
    /// The primary button went down on the canvas and has not been released.
    captured: bool,
    last_pos: Option<egui::Pos2>,
}

/// Mask textures keyed by label, re-uploaded when the mask revision changes.
#[derive(Default)]
pub struct TextureCache {
    entries: HashMap<String, (u64, egui::TextureHandle)>,
}

impl TextureCache {
    fn texture(&mut self, ctx: &egui::Context, raster: &RasterRef<'_>) -> egui::TextureId {
        let (w, h) = raster.image.dimensions();
        let build = || egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], raster.image.as_raw());
        match self.entries.get_mut(raster.key) {
            Some((revision, handle)) => {
                if *revision != raster.revision {
                    handle.set(build(), egui::TextureOptions::NEAREST);
                    *revision = raster.revision;
                }
                handle.id()
            }
            None => {
                let handle = ctx.load_texture(format!("mask-{}", raster.key), build(), egui::TextureOptions::NEAREST);
                let id = handle.id();
                self.entries.insert(raster.key.to_string(), (raster.revision, handle));
                id
            }
        }
    }

    /// Drop textures for labels that no longer have a mask.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }
}

/// A [`DrawingPort`] that paints with egui.
pub struct EguiPort<'a> {
    painter: &'a egui::Painter,
    textures: &'a mut TextureCache,
}

impl<'a> EguiPort<'a> {
    pub fn new(painter: &'a egui::Painter, textures: &'a mut TextureCache) -> Self {
        Self { painter, textures }
    }

    fn font() -> egui::FontId {
        egui::FontId::proportional(TEXT_SIZE)
    }
}

fn pos(p: ScreenPoint) -> egui::Pos2 {
    egui::pos2(p.x as f32, p.y as f32)
}

fn rect(r: ScreenRect) -> egui::Rect {
    egui::Rect::from_min_size(egui::pos2(r.left as f32, r.top as f32), egui::vec2(r.width as f32, r.height as f32))
}

fn color(c: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(c.r, c.g, c.b)
}

fn stroke(style: StrokeStyle) -> egui::Stroke {
    egui::Stroke::new(style.width as f32, color(style.color))
}

impl DrawingPort for EguiPort<'_> {
    fn stroke_rect(&mut self, r: ScreenRect, style: StrokeStyle) {
        if style.dashed {
            let corners = [
                r.min(),
                ScreenPoint::new(r.right(), r.top),
                r.max(),
                ScreenPoint::new(r.left, r.bottom()),
            ];
            self.stroke_polyline(&corners, true, style);
        } else {
            self.painter.rect_stroke(rect(r), 0.0, stroke(style));
        }
    }

    fn fill_rect(&mut self, r: ScreenRect, c: Rgb, alpha: f32) {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.painter
            .rect_filled(rect(r), 0.0, egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, a));
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], closed: bool, style: StrokeStyle) {
        if points.len() < 2 {
            return;
        }
        let mut path: Vec<egui::Pos2> = points.iter().copied().map(pos).collect();
        if style.dashed {
            if closed {
                path.push(path[0]);
            }
            self.painter
                .extend(egui::Shape::dashed_line(&path, stroke(style), DASH_LENGTH, DASH_GAP));
        } else if closed {
            self.painter.add(egui::Shape::closed_line(path, stroke(style)));
        } else {
            self.painter.add(egui::Shape::line(path, stroke(style)));
        }
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, c: Rgb) {
        self.painter.circle_filled(pos(center), radius as f32, color(c));
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, style: StrokeStyle) {
        self.painter.circle_stroke(pos(center), radius as f32, stroke(style));
    }

    fn draw_text(&mut self, at: ScreenPoint, text: &str, c: Rgb) {
        self.painter
            .text(pos(at), egui::Align2::LEFT_TOP, text, Self::font(), color(c));
    }

    fn measure_text(&self, text: &str) -> (f64, f64) {
        let galley = self
            .painter
            .layout_no_wrap(text.to_string(), Self::font(), egui::Color32::WHITE);
        let size = galley.size();
        (size.x as f64, size.y as f64)
    }

    fn draw_raster(&mut self, raster: RasterRef<'_>, dest: ImageFrame, opacity: f32) {
        let id = self.textures.texture(self.painter.ctx(), &raster);
        let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.painter.image(
            id,
            rect(dest.rect()),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::from_white_alpha(a),
        );
    }
}

/// Translate this frame's pointer activity on `response` into engine events.
fn pointer_events(ui: &egui::Ui, response: &egui::Response, state: &mut CanvasState) -> Vec<PointerEvent> {
    let (pressed, released, pointer, modifiers) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
            Modifiers {
                pan: i.modifiers.alt || i.key_down(egui::Key::Space),
                shift: i.modifiers.shift,
            },
        )
    });
    let Some(p) = pointer else {
        return Vec::new();
    };
    let at = |kind| PointerEvent::new(kind, ScreenPoint::new(p.x as f64, p.y as f64)).with_modifiers(modifiers);

    let mut events = Vec::new();
    if pressed && response.hovered() {
        state.captured = true;
        events.push(at(PointerKind::Down));
    } else if state.last_pos != Some(p) && (state.captured || response.hovered()) {
        events.push(at(PointerKind::Move));
    }
    if released && state.captured {
        state.captured = false;
        events.push(at(PointerKind::Up));
    }
    if response.double_clicked() {
        events.push(at(PointerKind::DoubleClick));
    }
    state.last_pos = Some(p);
    events
}

/// Change the routing target, ending gestures owned by the mode being left.
pub fn switch_mode(
    mode: &mut Mode,
    to: Mode,
    surface: &mut AnnotationSurface,
    tracking: &mut TrackingCoordinator,
) -> bool {
    if *mode == to {
        return false;
    }
    match to {
        Mode::Tracking => surface.finish_gestures(),
        Mode::Image => tracking.cancel_drag(),
    }
    log::debug!("Switched to {:?} mode", to);
    *mode = to;
    true
}

/// Route one event in tracking mode. Pan drags still go to the surface.
fn track_pointer(surface: &mut AnnotationSurface, tracking: &mut TrackingCoordinator, event: PointerEvent) -> Option<String> {
    if (event.modifiers.pan && event.kind == PointerKind::Down) || surface.is_busy() {
        surface.handle_pointer(event);
        return None;
    }
    match event.kind {
        PointerKind::Down => tracking.begin_drag(event.pos),
        PointerKind::Move => tracking.update_drag(event.pos),
        PointerKind::Up => match tracking.end_drag(event.pos, &surface.frame()) {
            Ok(Some(frame)) => return Some(format!("Keyframe recorded at frame {}", frame)),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Could not record keyframe: {}", e);
                return Some(e.to_string());
            }
        },
        PointerKind::DoubleClick => {}
    }
    None
}

/// Display the canvas, feed input to the active engine and paint its output.
///
/// Returns a status message when the interaction produced one.
pub fn show(
    ui: &mut egui::Ui,
    state: &mut CanvasState,
    textures: &mut TextureCache,
    mode: Mode,
    surface: &mut AnnotationSurface,
    tracking: &mut TrackingCoordinator,
    image_texture: Option<&egui::TextureHandle>,
) -> Option<String> {
    let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
    painter.rect_filled(response.rect, 0.0, egui::Color32::from_gray(40));

    let Some(texture) = image_texture else {
        painter.text(
            response.rect.center(),
            egui::Align2::CENTER_CENTER,
            "File → Open Image... to begin annotating",
            egui::FontId::proportional(16.0),
            egui::Color32::from_gray(180),
        );
        return None;
    };

    let (img_w, img_h) = surface.masks().image_size();
    let container = ScreenRect {
        left: response.rect.min.x as f64,
        top: response.rect.min.y as f64,
        width: response.rect.width() as f64,
        height: response.rect.height() as f64,
    };
    surface.set_layout(ImageFrame::fit(container, img_w, img_h));

    if response.hovered() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y) as f64;
        if scroll != 0.0 {
            if let Some(p) = response.hover_pos() {
                surface.zoom_at(ScreenPoint::new(p.x as f64, p.y as f64), (scroll * ZOOM_SPEED).exp());
            }
        }
    }

    let mut status = None;
    for event in pointer_events(ui, &response, state) {
        match mode {
            Mode::Image => {
                surface.handle_pointer(event);
            }
            Mode::Tracking => {
                if let Some(message) = track_pointer(surface, tracking, event) {
                    status = Some(message);
                }
            }
        }
    }

    let frame = surface.frame();
    let painter = painter.with_clip_rect(response.rect);
    painter.image(
        texture.id(),
        rect(frame.rect()),
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    textures.retain(|key| surface.masks().mask(key).is_some());
    let mut port = EguiPort::new(&painter, textures);
    match mode {
        Mode::Image => surface.render(&mut port),
        Mode::Tracking => tracking.render(&mut port, &frame),
    }

    if surface.is_busy() || tracking.is_dragging() {
        ui.ctx().request_repaint();
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use vannot::{HostConfig, Tool};

    fn surface() -> AnnotationSurface {
        let mut surface = AnnotationSurface::new(HostConfig::default());
        surface.set_image_size(100, 100);
        surface.set_layout(ImageFrame::new(0.0, 0.0, 100.0, 100.0));
        surface
    }

    #[test]
    fn open_polygon_does_not_swallow_tracking_drags() {
        let mut surface = surface();
        let mut tracking = TrackingCoordinator::new(&HostConfig::default());
        let id = tracking.create_track("car", Rgb::default());
        let mut mode = Mode::Image;

        surface.set_tool(Tool::Polygon);
        for (x, y) in [(10.0, 10.0), (60.0, 10.0)] {
            surface.handle_pointer(PointerEvent::down(x, y));
            surface.handle_pointer(PointerEvent::up(x, y));
        }
        assert!(surface.is_busy());

        assert!(switch_mode(&mut mode, Mode::Tracking, &mut surface, &mut tracking));
        assert!(!surface.is_busy());
        assert!(surface.annotations().is_empty());

        assert!(track_pointer(&mut surface, &mut tracking, PointerEvent::down(10.0, 10.0)).is_none());
        track_pointer(&mut surface, &mut tracking, PointerEvent::moved(40.0, 40.0));
        let status = track_pointer(&mut surface, &mut tracking, PointerEvent::up(60.0, 60.0));
        assert!(status.is_some());
        assert!(tracking.track(id).unwrap().is_keyframe(0));
    }

    #[test]
    fn leaving_tracking_drops_the_drag_preview() {
        let mut surface = surface();
        let mut tracking = TrackingCoordinator::new(&HostConfig::default());
        let mut mode = Mode::Tracking;
        tracking.begin_drag(ScreenPoint::new(5.0, 5.0));
        assert!(switch_mode(&mut mode, Mode::Image, &mut surface, &mut tracking));
        assert!(!tracking.is_dragging());
        assert!(!switch_mode(&mut mode, Mode::Image, &mut surface, &mut tracking));
    }
}
