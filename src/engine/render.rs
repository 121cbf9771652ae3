// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Canvas render layers.
//!
//! The canvas is composed of three independent surfaces drawn bottom to top:
//! the background image, the committed boxes, and the ephemeral box that is
//! currently being drawn or moved. Every redraw of a layer starts by clearing
//! that layer only.
//!
//! Layers are recorded into [`DisplayList`]s in logical units. The canvas
//! widget replays them each frame at the current scale.

use crate::models::annotation::{Annotation, Point, Rect};
use crate::util::geometry::fit_image;
use egui::Color32;
use std::fmt;
use std::rc::Rc;

pub const FONT_SIZE: f32 = 14.0;
pub const TEXT_X_OFFSET: f64 = 2.0;
pub const TEXT_Y_OFFSET: f64 = -6.0;
pub const BORDER_WIDTH: f64 = 1.0;
pub const COLOR_BOX_DEFAULT: Color32 = Color32::BLACK;
pub const COLOR_TEXT_DEFAULT: Color32 = Color32::WHITE;
pub const COLOR_BOX_CURRENT: Color32 = Color32::from_rgb(0xf7, 0x17, 0x35);

/// Size of a rendered run of text, in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub ascent: f64,
}

/// Measures `text` at the given font size.
pub type TextMeasure = Rc<dyn Fn(&str, f32) -> TextMetrics>;

/// Rough metrics for a proportional font, used until the UI installs a real
/// measurer.
pub fn estimate_text(text: &str, font_size: f32) -> TextMetrics {
    let size = font_size as f64;
    TextMetrics {
        width: text.chars().count() as f64 * size * 0.55,
        ascent: size * 0.75,
    }
}

/// A 2D drawing target in logical units.
pub trait Surface {
    fn size(&self) -> (f64, f64);
    fn clear(&mut self);
    fn stroke_rect(&mut self, rect: Rect, color: Color32);
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    /// Draw text with its baseline starting at `baseline`.
    fn fill_text(&mut self, text: &str, baseline: Point, color: Color32, font_size: f32);
    fn draw_image(&mut self, image_key: &str, rect: Rect);
    fn measure_text(&self, text: &str, font_size: f32) -> TextMetrics;
}

/// A recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    StrokeRect {
        rect: Rect,
        color: Color32,
    },
    FillRect {
        rect: Rect,
        color: Color32,
    },
    Text {
        text: String,
        baseline: Point,
        color: Color32,
        font_size: f32,
    },
    Image {
        key: String,
        rect: Rect,
    },
}

/// Retained surface: records commands until the next clear.
pub struct DisplayList {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
    measure: TextMeasure,
}

impl fmt::Debug for DisplayList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayList")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
            measure: Rc::new(estimate_text),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn set_text_measure(&mut self, measure: TextMeasure) {
        self.measure = measure;
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color32) {
        self.commands.push(DrawCommand::StrokeRect { rect, color });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, baseline: Point, color: Color32, font_size: f32) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            baseline,
            color,
            font_size,
        });
    }

    fn draw_image(&mut self, image_key: &str, rect: Rect) {
        self.commands.push(DrawCommand::Image {
            key: image_key.to_string(),
            rect,
        });
    }

    fn measure_text(&self, text: &str, font_size: f32) -> TextMetrics {
        (self.measure)(text, font_size)
    }
}

/// Outline a box.
pub fn draw_box(surface: &mut impl Surface, rect: Rect, color: Color32) {
    surface.stroke_rect(rect.normalized(), color);
}

/// Draw a label chip sitting above the top-left corner `at`.
pub fn draw_label_chip(
    surface: &mut impl Surface,
    at: Point,
    text: &str,
    text_color: Color32,
    chip_color: Color32,
) {
    let metrics = surface.measure_text(text, FONT_SIZE);
    surface.fill_rect(
        Rect::new(
            at.x - BORDER_WIDTH,
            at.y + TEXT_Y_OFFSET - metrics.ascent,
            metrics.width + TEXT_X_OFFSET.abs() * 4.0,
            metrics.ascent + TEXT_Y_OFFSET.abs(),
        ),
        chip_color,
    );
    surface.fill_text(
        text,
        Point::new(at.x + TEXT_X_OFFSET, at.y + TEXT_Y_OFFSET),
        text_color,
        FONT_SIZE,
    );
}

/// Redraw every visible committed box with its label.
pub fn render_annotations(surface: &mut impl Surface, annotations: &[Annotation]) {
    surface.clear();
    for annotation in annotations.iter().filter(|a| a.is_render) {
        draw_box(surface, annotation.rect(), COLOR_BOX_DEFAULT);
        draw_label_chip(
            surface,
            annotation.rect().top_left(),
            &annotation.label,
            COLOR_TEXT_DEFAULT,
            COLOR_BOX_DEFAULT,
        );
    }
}

/// Redraw the box being drawn. `rect` may have negative size.
pub fn render_drawing(surface: &mut impl Surface, rect: Rect) {
    surface.clear();
    draw_box(surface, rect, COLOR_BOX_CURRENT);
}

/// Redraw the box being moved with a highlighted label.
pub fn render_moving(surface: &mut impl Surface, rect: Rect, label: &str) {
    surface.clear();
    draw_box(surface, rect, COLOR_BOX_CURRENT);
    draw_label_chip(surface, rect.top_left(), label, COLOR_TEXT_DEFAULT, COLOR_BOX_CURRENT);
}

/// Redraw the background image fitted and centered.
pub fn render_image(surface: &mut impl Surface, image_key: &str, image_width: u32, image_height: u32) {
    surface.clear();
    let (width, height) = surface.size();
    let rect = fit_image(width, height, image_width as f64, image_height as f64);
    surface.draw_image(image_key, rect);
}

/// The three canvas layers, bottom to top.
#[derive(Debug)]
pub struct RenderLayers {
    pub image: DisplayList,
    pub annotations: DisplayList,
    pub ephemeral: DisplayList,
}

impl RenderLayers {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            image: DisplayList::new(width, height),
            annotations: DisplayList::new(width, height),
            ephemeral: DisplayList::new(width, height),
        }
    }

    pub fn set_text_measure(&mut self, measure: TextMeasure) {
        self.image.set_text_measure(measure.clone());
        self.annotations.set_text_measure(measure.clone());
        self.ephemeral.set_text_measure(measure);
    }
}
