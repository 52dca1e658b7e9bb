// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation properties panel.
//!
//! Lists shapes and masks in image mode, tracks in tracking mode.

use super::canvas::Mode;
use vannot::{AnnotationSurface, TrackingCoordinator};

/// Result of properties panel interaction.
pub enum PropertiesAction {
    None,
    SelectAnnotation(usize),
    DeleteAnnotation(usize),
    SelectTrack(u32),
    DeleteTrack(u32),
}

fn swatch(ui: &mut egui::Ui, color: vannot::models::color::Rgb) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
    ui.painter()
        .rect_filled(rect, 2.0, egui::Color32::from_rgb(color.r, color.g, color.b));
}

/// Display the properties panel.
pub fn show(ui: &mut egui::Ui, mode: Mode, surface: &AnnotationSurface, tracking: &TrackingCoordinator) -> PropertiesAction {
    let mut action = PropertiesAction::None;
    match mode {
        Mode::Image => {
            ui.heading("Annotations");
            ui.separator();
            let selected = surface.shapes().selected();
            egui::ScrollArea::vertical().id_source("annotations").show(ui, |ui| {
                if surface.annotations().is_empty() {
                    ui.label(egui::RichText::new("No annotations yet").weak());
                }
                for (idx, annotation) in surface.annotations().iter().enumerate() {
                    ui.horizontal(|ui| {
                        swatch(ui, annotation.color);
                        let text = format!("{} ({})", annotation.label, annotation.kind().as_str());
                        if ui.selectable_label(selected == Some(idx), text).clicked() {
                            action = PropertiesAction::SelectAnnotation(idx);
                        }
                        if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                            action = PropertiesAction::DeleteAnnotation(idx);
                        }
                    });
                }
            });

            ui.add_space(12.0);
            ui.heading("Masks");
            ui.separator();
            let masks = surface.masks().masks();
            if masks.is_empty() {
                ui.label(egui::RichText::new("No masks painted").weak());
            }
            for (label, mask) in masks {
                ui.horizontal(|ui| {
                    swatch(ui, mask.color);
                    ui.label(format!("{}: {} px", label, mask.filled_area()));
                });
            }
            if let Some(report) = surface.masks().last_fill() {
                let mut text = format!("Last fill: {} px", report.filled);
                if report.truncated {
                    text.push_str(" (stopped at pixel cap)");
                }
                ui.label(egui::RichText::new(text).weak());
            }
        }
        Mode::Tracking => {
            ui.heading("Tracks");
            ui.separator();
            let active = tracking.active_id();
            egui::ScrollArea::vertical().id_source("tracks").show(ui, |ui| {
                if tracking.tracks().is_empty() {
                    ui.label(egui::RichText::new("No tracks yet").weak());
                }
                for (id, track) in tracking.tracks() {
                    ui.horizontal(|ui| {
                        swatch(ui, track.color);
                        let span = match tracking.range(*id) {
                            Some(range) => format!("{}-{}", range.start, range.end),
                            None => "empty".to_string(),
                        };
                        let text = format!("{} #{} [{}]", track.label, id, span);
                        if ui.selectable_label(active == Some(*id), text).clicked() {
                            action = PropertiesAction::SelectTrack(*id);
                        }
                        if ui.small_button("🗑").on_hover_text("Delete track").clicked() {
                            action = PropertiesAction::DeleteTrack(*id);
                        }
                    });
                }
            });
        }
    }
    action
}
