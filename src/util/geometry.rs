// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the transform between device pixels (where the
//! pointer is reported) and logical canvas units (where boxes are stored),
//! plus the fit-to-canvas placement used for background images.

use crate::models::annotation::{Point, Rect};

/// Responsive scale between the rendered canvas and its logical size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasScale {
    logical_width: f64,
    scale: f64,
}

impl CanvasScale {
    pub fn new(logical_width: f64) -> Self {
        Self {
            logical_width,
            scale: 1.0,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn logical_width(&self) -> f64 {
        self.logical_width
    }

    /// Recompute the scale after the canvas was resized on screen.
    /// Non-positive widths are ignored.
    pub fn update(&mut self, rendered_width: f64) {
        if rendered_width <= 0.0 || !rendered_width.is_finite() {
            log::warn!("Ignoring canvas resize to width {}", rendered_width);
            return;
        }
        self.scale = rendered_width / self.logical_width;
    }

    pub fn to_logical(&self, device: f64) -> f64 {
        device / self.scale
    }

    pub fn to_device(&self, logical: f64) -> f64 {
        logical * self.scale
    }

    /// Convert a pointer position relative to the canvas origin.
    pub fn point_to_logical(&self, device_x: f64, device_y: f64) -> Point {
        Point::new(self.to_logical(device_x), self.to_logical(device_y))
    }
}

/// Place an image inside a surface, preserving its aspect ratio and
/// centering it.
pub fn fit_image(surface_width: f64, surface_height: f64, image_width: f64, image_height: f64) -> Rect {
    if image_width <= 0.0 || image_height <= 0.0 {
        return Rect::new(surface_width / 2.0, surface_height / 2.0, 0.0, 0.0);
    }
    let scale = (surface_width / image_width).min(surface_height / image_height);
    let width = image_width * scale;
    let height = image_height * scale;
    Rect::new(
        surface_width / 2.0 - width / 2.0,
        surface_height / 2.0 - height / 2.0,
        width,
        height,
    )
}
