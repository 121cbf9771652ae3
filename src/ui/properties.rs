// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation list panel.
//!
//! This module lists the boxes of the current image with editable labels,
//! a delete button per box, and a button to delete them all.

/// Result of list panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    None,
    Rename(usize, String),
    Delete(usize),
    DeleteAll,
}

/// Display the annotation list.
///
/// `labels` holds the edit buffers for the current image's boxes, in order.
pub fn show(ui: &mut egui::Ui, labels: &mut [String], has_image: bool) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading(format!("Annotations ({})", labels.len()));
    ui.separator();

    if !has_image {
        ui.label(egui::RichText::new("No image uploaded").weak());
        return action;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, true])
        .max_height(ui.available_height() - 40.0)
        .show(ui, |ui| {
            for (index, label) in labels.iter_mut().enumerate() {
                ui.horizontal(|ui| {
                    let edit = ui.add(egui::TextEdit::singleline(label).desired_width(150.0));
                    if edit.changed() {
                        action = PropertiesAction::Rename(index, label.clone());
                    }
                    if ui.button("Delete").clicked() {
                        action = PropertiesAction::Delete(index);
                    }
                });
            }
            if labels.is_empty() {
                ui.label(egui::RichText::new("Drag on the image to add a box").italics().weak());
            }
        });

    ui.separator();
    if ui
        .add_enabled(!labels.is_empty(), egui::Button::new("Delete all"))
        .clicked()
    {
        action = PropertiesAction::DeleteAll;
    }

    action
}
