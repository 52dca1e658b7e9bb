// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video timeline scrubber control.
//!
//! Frame navigation plus track and keyframe management for the active track.

use vannot::models::track::Interpolation;
use vannot::{AnnotationSurface, TrackingCoordinator};

/// Frames shown past the last keyframe when the video length is unknown.
const OPEN_ENDED_SPAN: u32 = 300;

fn last_frame(tracking: &TrackingCoordinator) -> u32 {
    match tracking.frame_count() {
        Some(count) => count.saturating_sub(1),
        None => {
            let last_key = tracking
                .tracks()
                .values()
                .filter_map(|t| t.keyframes.keys().next_back().copied())
                .max()
                .unwrap_or(0);
            last_key.max(tracking.current_frame()) + OPEN_ENDED_SPAN
        }
    }
}

/// Display the timeline. Returns a status message when an action produced one.
pub fn show(ui: &mut egui::Ui, tracking: &mut TrackingCoordinator, surface: &AnnotationSurface) -> Option<String> {
    let mut status = None;

    ui.horizontal(|ui| {
        let current = tracking.current_frame();
        if ui.button("⏮").on_hover_text("Previous frame").clicked() {
            tracking.set_frame(current.saturating_sub(1));
        }
        let mut frame = current;
        ui.add(egui::Slider::new(&mut frame, 0..=last_frame(tracking)).text("Frame"));
        if frame != current {
            tracking.set_frame(frame);
        }
        if ui.button("⏭").on_hover_text("Next frame").clicked() {
            tracking.set_frame(current.saturating_add(1));
        }
        ui.label(format!("{:.2}s", tracking.time_of(tracking.current_frame())));
    });

    ui.horizontal(|ui| {
        if ui.button("New track").clicked() {
            let label = surface.active_label();
            let id = tracking.create_track(label.name.clone(), label.color);
            status = Some(format!("Created track #{}", id));
        }

        let Some(active) = tracking.active_track() else {
            ui.label(egui::RichText::new("No active track").weak());
            return;
        };
        let id = active.id;
        let mut mode = active.interpolation;
        let on_keyframe = active.is_keyframe(tracking.current_frame());

        egui::ComboBox::from_label("Interpolation")
            .selected_text(format!("{:?}", mode))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut mode, Interpolation::Linear, "Linear");
                ui.selectable_value(&mut mode, Interpolation::Cubic, "Cubic");
                ui.selectable_value(&mut mode, Interpolation::Constant, "Constant");
            });
        if mode != active.interpolation {
            if let Err(e) = tracking.set_interpolation(id, mode) {
                log::warn!("{}", e);
            }
        }

        if ui
            .add_enabled(on_keyframe, egui::Button::new("Delete keyframe"))
            .clicked()
        {
            match tracking.delete_keyframe(tracking.current_frame()) {
                Ok(true) => status = Some(format!("Deleted keyframe at frame {}", tracking.current_frame())),
                Ok(false) => {}
                Err(e) => status = Some(e.to_string()),
            }
        }

        if let Some(range) = tracking.range(id) {
            ui.label(format!("Track #{} spans frames {}-{}", id, range.start, range.end));
        }
    });

    status
}
