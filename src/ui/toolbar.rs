// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and tool selection UI.
//!
//! Mode switch, the enabled drawing tools, the active label and the mask
//! brush settings.

use super::canvas::Mode;
use vannot::{AnnotationSurface, Tool};

/// Brush settings edited from the toolbar, in image pixels.
pub struct BrushSettings {
    pub brush_size: f64,
    pub eraser_size: f64,
}

fn tool_hint(tool: Tool) -> &'static str {
    match tool {
        Tool::Select => "Click to select, drag to move, drag a handle to resize",
        Tool::Bbox => "Drag to draw a box",
        Tool::Polygon => "Click to add vertices, click the first vertex or double-click to close",
        Tool::Landmark => "Click to place a point",
        Tool::Freeform => "Drag to draw a stroke",
        Tool::Brush => "Drag to paint the active label's mask",
        Tool::Eraser => "Drag to erase masks",
        Tool::Fill => "Click inside an outline to fill it",
    }
}

/// Display the toolbar. Returns the mode the user selected.
pub fn show(ui: &mut egui::Ui, mode: Mode, surface: &mut AnnotationSurface, brush: &mut BrushSettings) -> Mode {
    let mut selected = mode;
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.selectable_value(&mut selected, Mode::Image, "Image");
        ui.selectable_value(&mut selected, Mode::Tracking, "Tracking");
        ui.separator();

        if mode == Mode::Image {
            ui.label("Tools:");
            let enabled: Vec<Tool> = surface.config().tools.clone();
            for tool in enabled {
                if ui.selectable_label(surface.tool() == tool, tool.label()).clicked() {
                    surface.set_tool(tool);
                }
            }
            ui.separator();
        }

        let mut label = surface.active_label().name.clone();
        egui::ComboBox::from_label("Label")
            .selected_text(label.as_str())
            .show_ui(ui, |ui| {
                for spec in surface.labels() {
                    let text = match &spec.key_value {
                        Some(key) => format!("{} [{}]", spec.name, key),
                        None => spec.name.clone(),
                    };
                    ui.selectable_value(&mut label, spec.name.clone(), text);
                }
            });
        if label != surface.active_label().name {
            surface.set_active_label(&label);
        }

        if mode == Mode::Image && surface.tool().is_mask_tool() {
            ui.separator();
            if ui
                .add(egui::Slider::new(&mut brush.brush_size, 1.0..=200.0).text("Brush"))
                .changed()
            {
                surface.masks_mut().set_brush_size(brush.brush_size);
            }
            if ui
                .add(egui::Slider::new(&mut brush.eraser_size, 1.0..=200.0).text("Eraser"))
                .changed()
            {
                surface.masks_mut().set_eraser_size(brush.eraser_size);
            }
            let mut opacity = surface.masks().opacity();
            if ui
                .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Opacity"))
                .changed()
            {
                surface.masks_mut().set_opacity(opacity);
            }
        }

        ui.separator();
        let hint = match mode {
            Mode::Image => tool_hint(surface.tool()),
            Mode::Tracking => "Drag on the frame to record a keyframe for the active track",
        };
        ui.label(egui::RichText::new(hint).italics().weak());
    });
    selected
}
