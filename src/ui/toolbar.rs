// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image navigation toolbar.
//!
//! This module provides the bar above the canvas for uploading, deleting
//! and stepping through images.

/// Result of toolbar interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Upload,
    Previous,
    Next,
    DeleteImage,
}

/// Display the toolbar.
pub fn show(
    ui: &mut egui::Ui,
    title: Option<&str>,
    file_name: Option<&str>,
    can_go_previous: bool,
    can_go_next: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.button("⬆ Upload").clicked() {
            action = ToolbarAction::Upload;
        }
        if ui
            .add_enabled(title.is_some(), egui::Button::new("🗑 Delete image"))
            .clicked()
        {
            action = ToolbarAction::DeleteImage;
        }

        ui.separator();

        if ui
            .add_enabled(can_go_previous, egui::Button::new("◀ Previous"))
            .clicked()
        {
            action = ToolbarAction::Previous;
        }
        if ui.add_enabled(can_go_next, egui::Button::new("Next ▶")).clicked() {
            action = ToolbarAction::Next;
        }

        ui.separator();

        ui.label(egui::RichText::new(title.unwrap_or("No image uploaded")).strong());
        ui.label(
            egui::RichText::new(file_name.unwrap_or("Upload an image to begin"))
                .italics()
                .weak(),
        );
    });

    action
}
