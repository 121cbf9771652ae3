// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It forwards canvas, list and toolbar actions to the
//! annotation [`Session`] and turns decoded images into textures.

use crate::engine::hit_test::CursorHint;
use crate::engine::render::TextMetrics;
use crate::engine::session::Session;
use crate::engine::Confirm;
use crate::error::EngineResult;
use crate::io::media::{self, DecodeOutcome};
use crate::ui::{canvas, gallery, properties, toolbar};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Confirmation through a native Yes/No dialog.
struct DialogConfirm;

impl Confirm for DialogConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("Please confirm")
            .set_description(message)
            .set_buttons(rfd::MessageButtons::YesNo)
            .show()
            == rfd::MessageDialogResult::Yes
    }
}

/// Main application state.
pub struct BoxtagApp {
    session: Session,

    /// Textures of decoded images, by storage key
    textures: HashMap<String, egui::TextureHandle>,

    /// Channel for background image decoding
    decode_sender: Sender<DecodeOutcome>,
    decode_receiver: Receiver<DecodeOutcome>,
    decodes_in_flight: usize,

    canvas_state: canvas::CanvasState,

    /// Cursor for the last pointer position over the canvas
    cursor: CursorHint,

    /// Edit buffers for the annotation list
    label_buffers: Vec<String>,

    /// List revision the edit buffers were built from
    seen_revision: Option<u64>,

    /// Whether egui font metrics are installed in the session
    fonts_ready: bool,

    /// Last error shown in the status bar
    status: Option<String>,
}

impl BoxtagApp {
    /// Create a new application around an opened session.
    pub fn new(session: Session) -> Self {
        let (decode_sender, decode_receiver) = channel();
        Self {
            session,
            textures: HashMap::new(),
            decode_sender,
            decode_receiver,
            decodes_in_flight: 0,
            canvas_state: canvas::CanvasState::default(),
            cursor: CursorHint::Draw,
            label_buffers: Vec::new(),
            seen_revision: None,
            fonts_ready: false,
            status: None,
        }
    }

    /// Log a failed engine operation and show it in the status bar.
    fn report<T>(&mut self, result: EngineResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.status = None;
                Some(value)
            }
            Err(e) => {
                log::warn!("{}", e);
                self.status = Some(e.to_string());
                None
            }
        }
    }

    /// Measure label text with egui's fonts from now on.
    fn install_text_measure(&mut self, ctx: &egui::Context) {
        let ctx = ctx.clone();
        self.session.set_text_measure(Rc::new(move |text: &str, size: f32| {
            let font_id = egui::FontId::proportional(size);
            let galley = ctx.fonts(|fonts| {
                fonts.layout_no_wrap(text.to_owned(), font_id, egui::Color32::WHITE)
            });
            TextMetrics {
                width: galley.size().x as f64,
                ascent: (galley.size().y * 0.75) as f64,
            }
        }));
        self.fonts_ready = true;
    }

    /// Start decoding queued images and collect finished ones.
    fn pump_decodes(&mut self, ctx: &egui::Context) {
        for key in self.session.take_released_images() {
            if self.textures.remove(&key).is_some() {
                log::debug!("Dropped texture {}", key);
            }
        }

        while let Ok((key, result)) = self.decode_receiver.try_recv() {
            self.decodes_in_flight = self.decodes_in_flight.saturating_sub(1);
            if self.session.project().image_key_refs(&key) == 0 {
                log::debug!("Discarding decode of deleted image {}", key);
                continue;
            }
            match result {
                Ok(decoded) => {
                    let size = [decoded.width as usize, decoded.height as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &decoded.pixels);
                    let texture = ctx.load_texture(key.clone(), color_image, egui::TextureOptions::LINEAR);
                    self.textures.insert(key.clone(), texture);
                    self.session.image_decoded(&key, decoded.width, decoded.height);
                    log::info!("Decoded {} ({}x{})", decoded.key, decoded.width, decoded.height);
                }
                Err(e) => {
                    self.session.image_failed(&key, &e);
                    self.status = Some(e);
                }
            }
        }

        for request in self.session.take_pending_decodes() {
            self.decodes_in_flight += 1;
            media::spawn_decode(request.key, request.bytes, self.decode_sender.clone());
        }

        if self.decodes_in_flight > 0 {
            ctx.request_repaint();
        }
    }

    /// Rebuild the label edit buffers after the list changed.
    fn sync_label_buffers(&mut self) {
        let revision = self.session.list_revision();
        if self.seen_revision == Some(revision) {
            return;
        }
        self.label_buffers = self
            .session
            .project()
            .annotations()
            .map(|annotations| annotations.iter().map(|a| a.label.clone()).collect())
            .unwrap_or_default();
        self.seen_revision = Some(revision);
    }

    /// Pick an image file and add it to the session.
    fn upload_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "tif"])
            .pick_file()
        else {
            return;
        };

        match read_upload(&path) {
            Ok((file_name, bytes)) => {
                let result = self.session.add_image(&file_name, &bytes);
                self.report(result);
            }
            Err(e) => {
                log::error!("Failed to upload image: {:#}", e);
                self.status = Some(format!("{:#}", e));
            }
        }
    }

    /// Export annotations of every image to a file.
    fn export_annotations(&mut self, path: PathBuf) {
        let data = self.session.export_data();
        let extension = path.extension().and_then(|s| s.to_str());
        let result = match extension {
            Some("yaml") | Some("yml") => crate::io::serialization::export_yaml(&data, &path),
            Some("json") => crate::io::serialization::export_json(&data, &path),
            _ => {
                log::error!("Unsupported file extension: {:?}", extension);
                return;
            }
        };

        match result {
            Ok(_) => log::info!("Exported annotations to {}", path.display()),
            Err(e) => {
                log::error!("Failed to export annotations: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn handle_canvas_action(&mut self, action: canvas::CanvasAction) {
        match action {
            canvas::CanvasAction::Resized(width) => self.session.resize(width as f64),
            canvas::CanvasAction::PointerDown(pos) => {
                let result = self.session.pointer_down(pos.x as f64, pos.y as f64);
                self.report(result);
            }
            canvas::CanvasAction::PointerMove(pos) => {
                self.cursor = self.session.pointer_move(pos.x as f64, pos.y as f64);
            }
            canvas::CanvasAction::PointerUp => {
                let result = self.session.pointer_up();
                self.report(result);
            }
            canvas::CanvasAction::PointerLeave => {
                let result = self.session.pointer_leave();
                self.report(result);
                self.cursor = CursorHint::Draw;
            }
            canvas::CanvasAction::Upload => self.upload_image(),
        }
    }
}

/// Read an uploaded file, returning its file name and bytes.
fn read_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let file_name = path
        .file_name()
        .context("path has no file name")?
        .to_string_lossy()
        .to_string();
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok((file_name, bytes))
}

impl eframe::App for BoxtagApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.fonts_ready {
            self.install_text_measure(ctx);
            self.session.request_all_decodes();
        }
        self.pump_decodes(ctx);
        self.sync_label_buffers();

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Upload Image...").clicked() {
                        ui.close_menu();
                        self.upload_image();
                    }
                    let can_delete = self.session.can_delete_image();
                    if ui.add_enabled(can_delete, egui::Button::new("Delete Image")).clicked() {
                        ui.close_menu();
                        let result = self.session.delete_image(&mut DialogConfirm);
                        self.report(result);
                    }
                    ui.separator();
                    ui.menu_button("Export Annotations", |ui| {
                        if ui.button("Export as YAML...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("YAML", &["yaml", "yml"])
                                .set_file_name("annotations.yaml")
                                .save_file()
                            {
                                self.export_annotations(path);
                            }
                            ui.close_menu();
                        }
                        if ui.button("Export as JSON...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("JSON", &["json"])
                                .set_file_name("annotations.json")
                                .save_file()
                            {
                                self.export_annotations(path);
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
                    let can_delete_all = self.session.can_delete_all_boxes();
                    if ui
                        .add_enabled(can_delete_all, egui::Button::new("Delete All Annotations"))
                        .clicked()
                    {
                        ui.close_menu();
                        let result = self.session.delete_all_boxes(&mut DialogConfirm);
                        self.report(result);
                    }
                });
            });
        });

        // Toolbar
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                let title = self.session.image_title();
                toolbar::show(
                    ui,
                    title.as_deref(),
                    self.session.current_file_name(),
                    self.session.project().can_go_previous(),
                    self.session.project().can_go_next(),
                )
            })
            .inner;

        match toolbar_action {
            toolbar::ToolbarAction::Upload => self.upload_image(),
            toolbar::ToolbarAction::DeleteImage => {
                let result = self.session.delete_image(&mut DialogConfirm);
                self.report(result);
            }
            toolbar::ToolbarAction::Previous => {
                let result = self.session.previous_item();
                self.report(result);
            }
            toolbar::ToolbarAction::Next => {
                let result = self.session.next_item();
                self.report(result);
            }
            toolbar::ToolbarAction::None => {}
        }

        // Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| match &self.status {
                Some(message) => {
                    ui.colored_label(egui::Color32::from_rgb(0xf7, 0x17, 0x35), message);
                }
                None => {
                    ui.label(format!("Mode: {:?}", self.session.mode()));
                    ui.separator();
                    ui.label("Ready");
                }
            });
        });

        // Gallery (left side)
        let gallery_action = egui::SidePanel::left("gallery")
            .default_width(200.0)
            .show(ctx, |ui| {
                let project = self.session.project();
                let entries: Vec<gallery::GalleryEntry<'_>> = self
                    .session
                    .gallery()
                    .into_iter()
                    .map(|(key, file_name)| gallery::GalleryEntry {
                        key,
                        file_name,
                        thumbnail: project
                            .items
                            .get(&key)
                            .and_then(|item| self.textures.get(&item.image_key)),
                    })
                    .collect();
                gallery::show(ui, &entries, project.current_key())
            })
            .inner;

        match gallery_action {
            gallery::GalleryAction::Select(key) => {
                let result = self.session.select_item(key);
                self.report(result);
            }
            gallery::GalleryAction::Upload => self.upload_image(),
            gallery::GalleryAction::None => {}
        }

        // Annotation list (right side)
        self.sync_label_buffers();
        let has_image = self.session.can_delete_image();
        let properties_action = egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| properties::show(ui, &mut self.label_buffers, has_image))
            .inner;

        match properties_action {
            properties::PropertiesAction::Rename(index, label) => {
                let result = self.session.rename_box(index, &label);
                if self.report(result).is_none() {
                    // put the stored label back into the edit buffer
                    self.seen_revision = None;
                }
            }
            properties::PropertiesAction::Delete(index) => {
                let result = self.session.delete_box(index, &mut DialogConfirm);
                self.report(result);
            }
            properties::PropertiesAction::DeleteAll => {
                let result = self.session.delete_all_boxes(&mut DialogConfirm);
                self.report(result);
            }
            properties::PropertiesAction::None => {}
        }

        // Main canvas (center)
        let canvas_actions = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(
                    ui,
                    &mut self.canvas_state,
                    self.session.layers(),
                    self.session.logical_size(),
                    &self.textures,
                    self.cursor,
                    has_image,
                )
            })
            .inner;

        for action in canvas_actions {
            self.handle_canvas_action(action);
        }
    }
}
