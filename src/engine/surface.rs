// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! One annotation surface.
//!
//! Owns the shape engine, the mask engine, the shared viewport and the
//! undo/redo history for a single image. Routes pointer and key input to the
//! engine matching the current tool and commits a history snapshot after
//! every finished edit.

use super::history::History;
use super::input::{Key, PointerEvent, PointerKind};
use super::masks::{MaskEngine, MaskOutcome};
use super::shapes::{ShapeEngine, ShapeOutcome};
use super::viewport::Viewport;
use crate::config::{HostConfig, LabelSpec, Tool};
use crate::models::annotation::Annotation;
use crate::models::mask::MaskRecord;
use crate::models::project::ProjectData;
use crate::render::DrawingPort;
use crate::util::geometry::{ImageFrame, ScreenPoint};
use std::collections::{BTreeMap, VecDeque};

/// Pointer events kept while the image has no valid placement yet.
const MAX_PENDING_EVENTS: usize = 256;

/// Committed state: the annotation list plus RLE-encoded masks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub annotations: Vec<Annotation>,
    pub masks: BTreeMap<String, MaskRecord>,
}

/// One image's annotation state and the input routing over it.
pub struct AnnotationSurface {
    config: HostConfig,
    /// Pan and zoom shared by every tool
    viewport: Viewport,
    shapes: ShapeEngine,
    masks: MaskEngine,
    /// Undo/redo over committed snapshots
    history: History<Snapshot>,
    tool: Tool,
    /// Index into `config.labels`
    active_label: usize,
    /// Last pointer position of a pan drag
    panning: Option<ScreenPoint>,
    /// Events received while the frame was degenerate
    pending: VecDeque<PointerEvent>,
    /// Bumped on every local change to committed state.
    revision: u64,
}

impl AnnotationSurface {
    pub fn new(mut config: HostConfig) -> Self {
        if config.labels.is_empty() {
            config.labels = HostConfig::default().labels;
        }
        let tool = config
            .tools
            .iter()
            .copied()
            .find(|t| *t != Tool::Select)
            .unwrap_or(Tool::Select);
        Self {
            viewport: Viewport::default(),
            shapes: ShapeEngine::new(config.min_shape_size, config.freeform_brush_size),
            masks: MaskEngine::new(&config),
            history: History::new(Snapshot::default(), config.history_depth),
            tool,
            active_label: 0,
            panning: None,
            pending: VecDeque::new(),
            revision: 0,
            config,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. Any gesture in progress is finished or dropped first.
    pub fn set_tool(&mut self, tool: Tool) {
        if !self.config.is_tool_enabled(tool) || tool == self.tool {
            return;
        }
        self.finish_gestures();
        log::debug!("Tool changed {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
    }

    pub fn labels(&self) -> &[LabelSpec] {
        &self.config.labels
    }

    pub fn active_label(&self) -> &LabelSpec {
        // `labels` is never empty, see `new`.
        &self.config.labels[self.active_label.min(self.config.labels.len() - 1)]
    }

    /// Make `name` the label attached to new shapes and paint. Existing shapes keep theirs.
    pub fn set_active_label(&mut self, name: &str) -> bool {
        match self.config.labels.iter().position(|l| l.name == name) {
            Some(index) => {
                self.active_label = index;
                true
            }
            None => false,
        }
    }

    pub fn select_label_by_key(&mut self, key: &str) -> bool {
        match self.config.label_for_key(key).map(|l| l.name.clone()) {
            Some(name) => self.set_active_label(&name),
            None => false,
        }
    }

    /// Intrinsic image size; resets masks and history when it changes.
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        if self.masks.image_size() != (width, height) {
            self.masks.set_image_size(width, height);
            self.history.reset(self.snapshot());
        }
    }

    /// Host layout of the image at zoom 1. Replays buffered input once valid.
    pub fn set_layout(&mut self, base: ImageFrame) {
        self.viewport.set_base(base);
        if self.frame().is_valid() && !self.pending.is_empty() {
            log::debug!("Replaying {} buffered pointer events", self.pending.len());
            while let Some(event) = self.pending.pop_front() {
                self.dispatch(event);
            }
        }
    }

    pub fn frame(&self) -> ImageFrame {
        self.viewport.frame()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom_at(&mut self, anchor: ScreenPoint, factor: f64) {
        self.viewport.zoom_at(anchor, factor);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.shapes.annotations()
    }

    pub fn shapes(&self) -> &ShapeEngine {
        &self.shapes
    }

    pub fn masks(&self) -> &MaskEngine {
        &self.masks
    }

    pub fn masks_mut(&mut self) -> &mut MaskEngine {
        &mut self.masks
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.shapes.select(index);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// A draw, drag or paint gesture is in progress.
    pub fn is_busy(&self) -> bool {
        self.shapes.is_busy() || self.masks.is_busy() || self.panning.is_some()
    }

    /// Feed one pointer event. Returns whether anything visible changed.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        if !self.frame().is_valid() {
            if self.pending.len() >= MAX_PENDING_EVENTS {
                self.pending.pop_front();
            }
            self.pending.push_back(event);
            return false;
        }
        self.dispatch(event)
    }

    fn dispatch(&mut self, event: PointerEvent) -> bool {
        let frame = self.frame();

        if let Some(last) = self.panning {
            match event.kind {
                PointerKind::Move => {
                    self.viewport.pan_by(event.pos.x - last.x, event.pos.y - last.y);
                    self.panning = Some(event.pos);
                }
                PointerKind::Up => self.panning = None,
                PointerKind::Down | PointerKind::DoubleClick => {}
            }
            return true;
        }
        if event.kind == PointerKind::Down && event.modifiers.pan && !self.shapes.is_busy() && !self.masks.is_busy() {
            self.panning = Some(event.pos);
            return true;
        }

        if self.tool.is_mask_tool() {
            let label = self.active_label().clone();
            let outcome = match event.kind {
                PointerKind::Down => self.masks.pointer_down(event.pos, self.tool, &label, &frame),
                PointerKind::Move => self.masks.pointer_move(event.pos, &frame),
                PointerKind::Up => self.masks.pointer_up(event.pos, &frame),
                PointerKind::DoubleClick => MaskOutcome::Ignored,
            };
            if outcome == MaskOutcome::Committed {
                self.commit();
            }
            outcome != MaskOutcome::Ignored
        } else {
            let label = self.active_label().clone();
            let outcome = match event.kind {
                PointerKind::Down => self.shapes.pointer_down(event.pos, self.tool, &label, &frame),
                PointerKind::Move => self.shapes.pointer_move(event.pos),
                PointerKind::Up => self.shapes.pointer_up(event.pos, &frame),
                PointerKind::DoubleClick => self.shapes.finish_polygon(&frame),
            };
            if outcome == ShapeOutcome::Committed {
                self.commit();
            }
            outcome != ShapeOutcome::Ignored
        }
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Escape => {
                let shape = self.shapes.cancel() != ShapeOutcome::Ignored;
                let mask = self.masks.end_stroke();
                if mask == MaskOutcome::Committed {
                    self.commit();
                }
                shape || mask != MaskOutcome::Ignored
            }
            Key::Enter => {
                let outcome = self.shapes.finish_polygon(&self.frame());
                if outcome == ShapeOutcome::Committed {
                    self.commit();
                }
                outcome != ShapeOutcome::Ignored
            }
            Key::Delete => self.delete_selected(),
        }
    }

    pub fn delete_selected(&mut self) -> bool {
        if self.shapes.delete_selected().is_some() {
            self.commit();
            true
        } else {
            false
        }
    }

    /// Finish or drop whatever gesture is in progress.
    pub fn finish_gestures(&mut self) {
        self.panning = None;
        self.shapes.cancel();
        if self.masks.end_stroke() == MaskOutcome::Committed {
            self.commit();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            annotations: self.shapes.annotations().to_vec(),
            masks: self.masks.records(),
        }
    }

    /// Record the current state in history.
    pub fn commit(&mut self) {
        self.history.commit(self.snapshot());
        self.revision += 1;
        log::info!(
            "Committed revision {} ({} annotations, {} masks)",
            self.revision,
            self.shapes.annotations().len(),
            self.masks.masks().len()
        );
    }

    pub fn can_undo(&self) -> bool {
        !self.is_busy() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.is_busy() && self.history.can_redo()
    }

    /// Undo the last commit. Suppressed while a gesture is in progress.
    pub fn undo(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        match self.history.undo().cloned() {
            Some(snapshot) => {
                self.restore(&snapshot);
                log::info!("Undo");
                true
            }
            None => false,
        }
    }

    /// Redo the last undone commit. Suppressed while a gesture is in progress.
    pub fn redo(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        match self.history.redo().cloned() {
            Some(snapshot) => {
                self.restore(&snapshot);
                log::info!("Redo");
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.shapes.set_annotations(snapshot.annotations.clone());
        self.masks.load_records(&snapshot.masks);
        self.revision += 1;
    }

    /// Replace everything with loaded state and restart history from it.
    pub fn load(&mut self, annotations: Vec<Annotation>, masks: &BTreeMap<String, MaskRecord>) {
        self.shapes.set_annotations(annotations);
        self.masks.load_records(masks);
        self.pending.clear();
        self.panning = None;
        self.history.reset(self.snapshot());
        log::info!(
            "Loaded {} annotations and {} masks",
            self.shapes.annotations().len(),
            self.masks.masks().len()
        );
    }

    pub fn load_project(&mut self, project: &ProjectData) {
        self.set_image_size(project.frame_width, project.frame_height);
        self.load(project.annotations.clone(), &project.masks);
    }

    /// Clear shapes, masks and history.
    pub fn clear(&mut self) {
        self.load(Vec::new(), &BTreeMap::new());
        self.revision += 1;
    }

    pub fn render(&self, port: &mut dyn DrawingPort) {
        let frame = self.frame();
        if !frame.is_valid() {
            return;
        }
        self.masks.render(port, &frame);
        self.shapes.render(port, &frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::Modifiers;
    use crate::models::annotation::Coordinates;

    fn surface() -> AnnotationSurface {
        let mut surface = AnnotationSurface::new(HostConfig::default());
        surface.set_image_size(500, 400);
        surface.set_layout(ImageFrame::new(0.0, 0.0, 500.0, 400.0));
        surface
    }

    fn drag(surface: &mut AnnotationSurface, a: (f64, f64), b: (f64, f64)) {
        surface.handle_pointer(PointerEvent::down(a.0, a.1));
        surface.handle_pointer(PointerEvent::moved(b.0, b.1));
        surface.handle_pointer(PointerEvent::up(b.0, b.1));
    }

    #[test]
    fn commit_then_undo_redo_restores_exact_list() {
        let mut s = surface();
        s.set_tool(Tool::Bbox);
        drag(&mut s, (10.0, 10.0), (100.0, 80.0));
        drag(&mut s, (200.0, 200.0), (300.0, 300.0));
        let before = s.annotations().to_vec();

        assert!(s.undo());
        assert_eq!(s.annotations().len(), 1);
        assert!(s.redo());
        assert_eq!(s.annotations(), before.as_slice());
    }

    #[test]
    fn undo_is_suppressed_during_gesture() {
        let mut s = surface();
        s.set_tool(Tool::Bbox);
        drag(&mut s, (10.0, 10.0), (100.0, 80.0));
        s.handle_pointer(PointerEvent::down(200.0, 200.0));
        assert!(s.is_busy());
        assert!(!s.can_undo());
        assert!(!s.undo());
        s.handle_pointer(PointerEvent::up(300.0, 300.0));
        assert!(s.undo());
        assert_eq!(s.annotations().len(), 1);
    }

    #[test]
    fn mask_edits_share_history() {
        let mut s = surface();
        s.set_tool(Tool::Brush);
        drag(&mut s, (50.0, 50.0), (60.0, 50.0));
        assert_eq!(s.masks().masks().len(), 1);
        s.set_tool(Tool::Bbox);
        drag(&mut s, (10.0, 10.0), (100.0, 80.0));

        assert!(s.undo());
        assert!(s.annotations().is_empty());
        assert_eq!(s.masks().mask("object").unwrap().alpha_at(50, 50), 255);
        assert!(s.undo());
        assert!(s.masks().masks().is_empty());
        assert!(s.redo());
        assert_eq!(s.masks().mask("object").unwrap().alpha_at(50, 50), 255);
    }

    #[test]
    fn events_are_buffered_until_frame_is_valid() {
        let mut s = AnnotationSurface::new(HostConfig::default());
        s.set_image_size(500, 400);
        s.set_tool(Tool::Bbox);
        drag(&mut s, (10.0, 10.0), (100.0, 80.0));
        assert!(s.annotations().is_empty());

        s.set_layout(ImageFrame::new(0.0, 0.0, 500.0, 400.0));
        assert_eq!(s.annotations().len(), 1);
        match s.annotations()[0].coordinates {
            Coordinates::Bbox(b) => assert!((b.x - 0.02).abs() < 1e-9),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn panning_moves_camera_without_committing() {
        let mut s = surface();
        s.set_tool(Tool::Bbox);
        let pan = Modifiers { pan: true, shift: false };
        s.handle_pointer(PointerEvent::down(10.0, 10.0).with_modifiers(pan));
        s.handle_pointer(PointerEvent::moved(60.0, 30.0).with_modifiers(pan));
        s.handle_pointer(PointerEvent::up(60.0, 30.0).with_modifiers(pan));
        assert!(s.annotations().is_empty());
        assert_eq!(s.revision(), 0);
        assert_eq!(s.frame(), ImageFrame::new(50.0, 20.0, 500.0, 400.0));

        // A box drawn after panning is still normalized against the image.
        drag(&mut s, (60.0, 30.0), (150.0, 100.0));
        match s.annotations()[0].coordinates {
            Coordinates::Bbox(b) => {
                assert!((b.x - 0.02).abs() < 1e-9);
                assert!((b.y - 0.025).abs() < 1e-9);
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn delete_commits_and_is_undoable() {
        let mut s = surface();
        s.set_tool(Tool::Bbox);
        drag(&mut s, (10.0, 10.0), (100.0, 80.0));
        s.select(Some(0));
        assert!(s.handle_key(Key::Delete));
        assert!(s.annotations().is_empty());
        assert!(s.undo());
        assert_eq!(s.annotations().len(), 1);
    }

    #[test]
    fn polygon_finishes_on_double_click() {
        let mut s = surface();
        s.set_tool(Tool::Polygon);
        for (x, y) in [(10.0, 10.0), (100.0, 10.0), (100.0, 100.0)] {
            s.handle_pointer(PointerEvent::down(x, y));
            s.handle_pointer(PointerEvent::up(x, y));
        }
        s.handle_pointer(PointerEvent::new(PointerKind::DoubleClick, ScreenPoint::new(100.0, 100.0)));
        assert_eq!(s.annotations().len(), 1);
    }

    #[test]
    fn active_label_applies_to_new_shapes_only() {
        let mut config = HostConfig::default();
        config.labels.push(LabelSpec {
            name: "person".to_string(),
            color: crate::models::color::Rgb::new(0, 0, 255),
            key_value: Some("2".to_string()),
        });
        let mut s = AnnotationSurface::new(config);
        s.set_image_size(500, 400);
        s.set_layout(ImageFrame::new(0.0, 0.0, 500.0, 400.0));
        s.set_tool(Tool::Bbox);
        drag(&mut s, (10.0, 10.0), (100.0, 80.0));
        assert!(s.select_label_by_key("2"));
        drag(&mut s, (200.0, 200.0), (300.0, 300.0));
        assert_eq!(s.annotations()[0].label, "object");
        assert_eq!(s.annotations()[1].label, "person");
    }

    #[test]
    fn disabled_tool_is_not_selected() {
        let config = HostConfig {
            tools: vec![Tool::Bbox],
            ..HostConfig::default()
        };
        let mut s = AnnotationSurface::new(config);
        assert_eq!(s.tool(), Tool::Bbox);
        s.set_tool(Tool::Brush);
        assert_eq!(s.tool(), Tool::Bbox);
    }
}
