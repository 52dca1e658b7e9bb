// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! Owns one annotation surface and one tracking coordinator, loads media and
//! projects on background threads, and pushes every committed change to the
//! configured save sink.

use crate::ui::canvas::{self, CanvasState, Mode, TextureCache};
use crate::ui::toolbar::BrushSettings;
use crate::ui::{properties, timeline, toolbar};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use vannot::engine::Key;
use vannot::io::media::LoadedImage;
use vannot::io::sync::{self, FileSink, LoadPoll, PendingLoad, SaveSink, SaveTracker};
use vannot::models::project::ProjectData;
use vannot::{AnnotationSurface, HostConfig, TrackingCoordinator};

/// Main application state.
pub struct VannotApp {
    /// Shapes, masks and history for the current image
    surface: AnnotationSurface,
    /// Object tracks over video frames
    tracking: TrackingCoordinator,
    /// Which engine receives canvas input
    mode: Mode,
    /// Brush and eraser sizes shown in the toolbar
    brush: BrushSettings,

    /// Path of the image being annotated
    media_file: Option<String>,
    /// Texture handle for the displayed image
    image_texture: Option<egui::TextureHandle>,
    /// Uploaded mask rasters, one per label
    mask_textures: TextureCache,
    /// Pointer capture between frames
    canvas: CanvasState,

    /// Receiver for background image loading
    image_loader: Option<Receiver<Result<(PathBuf, LoadedImage), String>>>,
    /// Project import running in the background
    project_loader: Option<PendingLoad<ProjectData>>,
    /// Message shown while loading
    loading_message: Option<String>,
    /// Last status bar message
    status: Option<String>,

    /// Where changes are saved, if anywhere
    sink: Option<Box<dyn SaveSink>>,
    /// Last revision handed to the sink
    save_tracker: SaveTracker,
}

impl VannotApp {
    pub fn new(config: HostConfig, image: Option<PathBuf>, annotations: Option<PathBuf>, save_to: Option<PathBuf>) -> Self {
        let brush = BrushSettings {
            brush_size: config.brush_size,
            eraser_size: config.eraser_size,
        };
        let mut app = Self {
            tracking: TrackingCoordinator::new(&config),
            surface: AnnotationSurface::new(config),
            mode: Mode::Image,
            brush,
            media_file: None,
            image_texture: None,
            mask_textures: TextureCache::default(),
            canvas: CanvasState::default(),
            image_loader: None,
            project_loader: None,
            loading_message: None,
            status: None,
            sink: save_to.map(|path| Box::new(FileSink::new(path)) as Box<dyn SaveSink>),
            save_tracker: SaveTracker::default(),
        };
        if let Some(path) = annotations {
            app.load_project_file(path);
        }
        if let Some(path) = image {
            app.load_image_file(path);
        }
        app
    }

    /// Combined revision of shapes, masks and tracks.
    fn local_revision(&self) -> u64 {
        self.surface.revision() + self.tracking.revision()
    }

    fn project_data(&self) -> ProjectData {
        let (width, height) = self.surface.masks().image_size();
        let mut project = ProjectData::new(self.media_file.clone().unwrap_or_default(), width, height);
        project.annotations = self.surface.annotations().to_vec();
        project.masks = self.surface.masks().records();
        project.tracks = self.tracking.tracks().clone();
        project
    }

    /// Load an image file in the background.
    fn load_image_file(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some(format!("Loading {}...", path.display()));

        std::thread::spawn(move || {
            let result = vannot::io::media::load_image(&path)
                .map(|img| (path, img))
                .map_err(|e| format!("{:#}", e));
            let _ = sender.send(result);
        });
    }

    /// Load a saved project in the background.
    fn load_project_file(&mut self, path: PathBuf) {
        self.loading_message = Some(format!("Loading {}...", path.display()));
        self.project_loader = Some(sync::spawn_project_load(path, self.local_revision()));
    }

    fn export_project(&self, path: PathBuf) {
        match vannot::io::serialization::export_project(&self.project_data(), &path) {
            Ok(_) => log::info!("Exported project to {}", path.display()),
            Err(e) => log::error!("Failed to export project: {:#}", e),
        }
    }

    fn poll_loaders(&mut self, ctx: &egui::Context) {
        if let Some(ref receiver) = self.image_loader {
            if let Ok(result) = receiver.try_recv() {
                self.image_loader = None;
                match result {
                    Ok((path, img)) => {
                        let size = [img.width as usize, img.height as usize];
                        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &img.pixels);
                        self.image_texture = Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
                        self.surface.set_image_size(img.width, img.height);
                        self.surface.reset_view();
                        self.media_file = Some(path.to_string_lossy().to_string());
                        log::info!("Loaded image: {} ({}x{})", path.display(), img.width, img.height);
                    }
                    Err(e) => {
                        log::error!("Failed to load image: {}", e);
                        self.status = Some(format!("Failed to load image: {}", e));
                    }
                }
            }
        }

        if let Some(ref loader) = self.project_loader {
            match loader.poll(self.local_revision()) {
                LoadPoll::Pending => {}
                LoadPoll::Ready(project) => {
                    self.project_loader = None;
                    self.apply_project(project);
                }
                LoadPoll::Stale => {
                    self.project_loader = None;
                    self.status = Some("Discarded project load: local edits happened first".to_string());
                }
                LoadPoll::Failed(e) => {
                    self.project_loader = None;
                    log::error!("Failed to load project: {}", e);
                    self.status = Some(format!("Failed to load project: {}", e));
                }
            }
        }

        if self.image_loader.is_none() && self.project_loader.is_none() {
            self.loading_message = None;
        }
    }

    fn apply_project(&mut self, project: ProjectData) {
        self.surface.load_project(&project);
        self.tracking.load_tracks(project.tracks);
        // Already persisted; don't echo it straight back to the sink.
        self.save_tracker.mark_saved(self.local_revision());
        if self.image_texture.is_none() && !project.media_file.is_empty() {
            self.load_image_file(PathBuf::from(&project.media_file));
        }
        self.media_file = Some(project.media_file).filter(|f| !f.is_empty());
    }

    fn save_if_changed(&mut self) {
        let Some(sink) = self.sink.as_deref() else {
            return;
        };
        let revision = self.local_revision();
        if revision == 0 || self.surface.is_busy() || !self.save_tracker.needs_save(revision) {
            return;
        }
        match serde_json::to_string(&self.project_data()) {
            Ok(body) => {
                self.save_tracker.save(sink, revision, body);
            }
            Err(e) => log::error!("Failed to serialize project: {}", e),
        }
    }

    fn undo(&mut self) {
        if !self.surface.undo() {
            log::debug!("Nothing to undo");
        }
    }

    fn redo(&mut self) {
        if !self.surface.redo() {
            log::debug!("Nothing to redo");
        }
    }

    fn delete_selected(&mut self) {
        match self.mode {
            Mode::Image => {
                self.surface.handle_key(Key::Delete);
            }
            Mode::Tracking => {
                let frame = self.tracking.current_frame();
                match self.tracking.delete_keyframe(frame) {
                    Ok(true) => self.status = Some(format!("Deleted keyframe at frame {}", frame)),
                    Ok(false) => {}
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.surface.handle_key(Key::Escape);
            self.tracking.cancel_drag();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.surface.handle_key(Key::Enter);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.delete_selected();
        }

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.undo();
        }
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.redo();
        }

        if self.mode == Mode::Tracking {
            let frame = self.tracking.current_frame();
            if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
                self.tracking.set_frame(frame.saturating_add(1));
            }
            if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
                self.tracking.set_frame(frame.saturating_sub(1));
            }
        }

        // Label shortcuts arrive as typed text.
        let typed: Vec<String> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Text(t) => Some(t.clone()),
                    _ => None,
                })
                .collect()
        });
        for key in typed {
            if self.surface.select_label_by_key(&key) {
                log::debug!("Active label: {}", self.surface.active_label().name);
            }
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Image...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "tiff", "tif"])
                        .pick_file()
                    {
                        self.load_image_file(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Load Project...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Projects", &["json", "yaml", "yml"])
                        .pick_file()
                    {
                        self.load_project_file(path);
                    }
                    ui.close_menu();
                }
                ui.separator();
                ui.menu_button("Export Project", |ui| {
                    if ui.button("Export as JSON...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("project.json")
                            .save_file()
                        {
                            self.export_project(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Export as YAML...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("YAML", &["yaml", "yml"])
                            .set_file_name("project.yaml")
                            .save_file()
                        {
                            self.export_project(path);
                        }
                        ui.close_menu();
                    }
                });
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui
                    .add_enabled(self.surface.can_undo(), egui::Button::new("Undo (Ctrl+Z)"))
                    .clicked()
                {
                    self.undo();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(self.surface.can_redo(), egui::Button::new("Redo (Ctrl+Shift+Z)"))
                    .clicked()
                {
                    self.redo();
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Delete Selected").clicked() {
                    self.delete_selected();
                    ui.close_menu();
                }
                if ui.button("Clear Shapes and Masks").clicked() {
                    self.surface.clear();
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                let center = self.surface.frame().rect();
                let anchor = vannot::util::geometry::ScreenPoint::new(
                    center.left + center.width / 2.0,
                    center.top + center.height / 2.0,
                );
                if ui.button("Zoom In").clicked() {
                    self.surface.zoom_at(anchor, 1.25);
                    ui.close_menu();
                }
                if ui.button("Zoom Out").clicked() {
                    self.surface.zoom_at(anchor, 0.8);
                    ui.close_menu();
                }
                if ui.button("Reset Zoom").clicked() {
                    self.surface.reset_view();
                    ui.close_menu();
                }
            });
        });
    }
}

impl eframe::App for VannotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loaders(ctx);
        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| self.menu_bar(ctx, ui));

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let requested = toolbar::show(ui, self.mode, &mut self.surface, &mut self.brush);
            canvas::switch_mode(&mut self.mode, requested, &mut self.surface, &mut self.tracking);
        });

        if self.mode == Mode::Tracking {
            egui::TopBottomPanel::bottom("timeline").show(ctx, |ui| {
                if let Some(message) = timeline::show(ui, &mut self.tracking, &self.surface) {
                    self.status = Some(message);
                }
            });
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.media_file {
                    Some(file) => ui.label(file),
                    None => ui.label("No file loaded"),
                };
                ui.separator();
                ui.label(format!("Zoom {:.0}%", self.surface.viewport().zoom() * 100.0));
                if let Some(ref status) = self.status {
                    ui.separator();
                    ui.label(status);
                }
            });
        });

        let action = egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| properties::show(ui, self.mode, &self.surface, &self.tracking))
            .inner;
        match action {
            properties::PropertiesAction::SelectAnnotation(idx) => self.surface.select(Some(idx)),
            properties::PropertiesAction::DeleteAnnotation(idx) => {
                self.surface.select(Some(idx));
                self.surface.delete_selected();
            }
            properties::PropertiesAction::SelectTrack(id) => {
                if let Err(e) = self.tracking.set_active(Some(id)) {
                    log::warn!("{}", e);
                }
            }
            properties::PropertiesAction::DeleteTrack(id) => {
                if let Err(e) = self.tracking.delete_track(id) {
                    log::warn!("{}", e);
                }
            }
            properties::PropertiesAction::None => {}
        }

        self.handle_keyboard(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(ref message) = self.loading_message {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.spinner();
                        ui.add_space(10.0);
                        ui.label(
                            egui::RichText::new(message)
                                .size(16.0)
                                .color(egui::Color32::from_gray(200)),
                        );
                    });
                });
                return;
            }
            let message = canvas::show(
                ui,
                &mut self.canvas,
                &mut self.mask_textures,
                self.mode,
                &mut self.surface,
                &mut self.tracking,
                self.image_texture.as_ref(),
            );
            if message.is_some() {
                self.status = message;
            }
        });

        self.save_if_changed();
    }
}
