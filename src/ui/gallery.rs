// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image gallery panel.

use crate::models::project::ItemKey;

const THUMBNAIL_SIZE: f32 = 48.0;

/// One uploaded image as shown in the gallery.
pub struct GalleryEntry<'a> {
    pub key: ItemKey,
    pub file_name: &'a str,
    /// Decoded texture, if the image has been decoded yet
    pub thumbnail: Option<&'a egui::TextureHandle>,
}

/// Result of gallery interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryAction {
    None,
    Select(ItemKey),
    Upload,
}

/// Display every uploaded image with its thumbnail.
pub fn show(ui: &mut egui::Ui, entries: &[GalleryEntry<'_>], current: Option<ItemKey>) -> GalleryAction {
    let mut action = GalleryAction::None;

    ui.heading("Gallery");
    ui.separator();

    if entries.is_empty() {
        let empty = ui.add(
            egui::Label::new(egui::RichText::new("No images yet.\nClick to upload one.").weak())
                .sense(egui::Sense::click()),
        );
        if empty.on_hover_cursor(egui::CursorIcon::PointingHand).clicked() {
            action = GalleryAction::Upload;
        }
        return action;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for entry in entries {
            ui.horizontal(|ui| {
                let thumbnail = match entry.thumbnail {
                    Some(texture) => ui.add(
                        egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                            .max_size(egui::vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE))
                            .sense(egui::Sense::click()),
                    ),
                    None => {
                        let (rect, response) = ui.allocate_exact_size(
                            egui::vec2(THUMBNAIL_SIZE, THUMBNAIL_SIZE),
                            egui::Sense::click(),
                        );
                        ui.painter().rect_filled(rect, 2.0, egui::Color32::from_gray(60));
                        response
                    }
                };

                let text = format!("({}) {}", entry.key, entry.file_name);
                let label = ui.selectable_label(current == Some(entry.key), text);
                if thumbnail.clicked() || label.clicked() {
                    action = GalleryAction::Select(entry.key);
                }
            });
        }
    });

    action
}
