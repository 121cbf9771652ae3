// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for image display and box annotation.
//!
//! This module replays the session's render layers at the current canvas
//! size and turns egui pointer input into discrete canvas events.

use crate::engine::hit_test::CursorHint;
use crate::engine::render::{DisplayList, DrawCommand, RenderLayers};
use crate::models::annotation::Rect;
use std::collections::HashMap;

/// Result of canvas interaction. Positions are device pixels relative to
/// the canvas' top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasAction {
    Resized(f32),
    PointerDown(egui::Vec2),
    PointerMove(egui::Vec2),
    PointerUp,
    PointerLeave,
    /// The empty canvas was clicked.
    Upload,
}

/// Input state carried between frames.
#[derive(Debug, Default)]
pub struct CanvasState {
    width: f32,
    last_pos: Option<egui::Pos2>,
}

/// Display the canvas and collect pointer events.
pub fn show(
    ui: &mut egui::Ui,
    state: &mut CanvasState,
    layers: &RenderLayers,
    logical_size: (f64, f64),
    textures: &HashMap<String, egui::TextureHandle>,
    cursor: CursorHint,
    has_image: bool,
) -> Vec<CanvasAction> {
    let mut actions = Vec::new();

    // Fit the logical canvas into the available space
    let available = ui.available_size();
    let (logical_width, logical_height) = (logical_size.0 as f32, logical_size.1 as f32);
    let scale = (available.x / logical_width)
        .min(available.y / logical_height)
        .max(0.01);
    let size = egui::vec2(logical_width * scale, logical_height * scale);
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());

    if (state.width - size.x).abs() > 0.5 {
        state.width = size.x;
        actions.push(CanvasAction::Resized(size.x));
    }

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(40));

    if !has_image {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Click to upload an image",
            egui::FontId::proportional(18.0),
            egui::Color32::from_gray(180),
        );
        if response.clicked() {
            actions.push(CanvasAction::Upload);
        }
    }

    for layer in [&layers.image, &layers.annotations, &layers.ephemeral] {
        paint_layer(&painter, layer, rect.min, scale, textures);
    }

    // Pointer events
    let (hover_pos, pressed, released) = ui.input(|i| {
        (
            i.pointer.hover_pos(),
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
        )
    });
    let inside = hover_pos.filter(|_| response.contains_pointer());

    if let Some(pos) = inside {
        let device = pos - rect.min;
        if pressed {
            actions.push(CanvasAction::PointerDown(device));
        }
        if state.last_pos != Some(pos) {
            actions.push(CanvasAction::PointerMove(device));
        }
        if released {
            actions.push(CanvasAction::PointerUp);
        }
        ui.ctx().set_cursor_icon(match cursor {
            _ if !has_image => egui::CursorIcon::PointingHand,
            CursorHint::Move => egui::CursorIcon::Move,
            CursorHint::Draw => egui::CursorIcon::Crosshair,
        });
    } else if state.last_pos.is_some() {
        actions.push(CanvasAction::PointerLeave);
    }
    state.last_pos = inside;

    actions
}

/// Replay one layer, scaling logical units to screen points.
fn paint_layer(
    painter: &egui::Painter,
    layer: &DisplayList,
    origin: egui::Pos2,
    scale: f32,
    textures: &HashMap<String, egui::TextureHandle>,
) {
    let to_screen = |x: f64, y: f64| origin + egui::vec2(x as f32 * scale, y as f32 * scale);
    let to_rect = |r: &Rect| {
        egui::Rect::from_min_size(
            to_screen(r.x, r.y),
            egui::vec2(r.width as f32 * scale, r.height as f32 * scale),
        )
    };

    for command in layer.commands() {
        match command {
            DrawCommand::StrokeRect { rect, color } => {
                painter.rect_stroke(to_rect(rect), 0.0, egui::Stroke::new(1.0, *color));
            }
            DrawCommand::FillRect { rect, color } => {
                painter.rect_filled(to_rect(rect), 0.0, *color);
            }
            DrawCommand::Text {
                text,
                baseline,
                color,
                font_size,
            } => {
                painter.text(
                    to_screen(baseline.x, baseline.y),
                    egui::Align2::LEFT_BOTTOM,
                    text,
                    egui::FontId::proportional(font_size * scale),
                    *color,
                );
            }
            DrawCommand::Image { key, rect } => {
                if let Some(texture) = textures.get(key) {
                    painter.image(
                        texture.id(),
                        to_rect(rect),
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
            }
        }
    }
}
