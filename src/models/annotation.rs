// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the labelled boxes drawn over an image. All geometry
//! is expressed in logical canvas units, independent of how large the canvas
//! is rendered on screen.

use serde::{Deserialize, Serialize};

/// A 2D point in logical canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle. Width and height may be negative while a box
/// is being dragged up or left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Same rectangle with non-negative size and `x`/`y` at the top-left.
    pub fn normalized(&self) -> Self {
        Self {
            x: self.x.min(self.x + self.width),
            y: self.y.min(self.y + self.height),
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }

    /// Edges count as inside.
    pub fn contains(&self, point: Point) -> bool {
        let r = self.normalized();
        point.x >= r.x && point.x <= r.x + r.width && point.y >= r.y && point.y <= r.y + r.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A labelled box on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    /// False only while the box is being moved.
    #[serde(default = "default_render")]
    pub is_render: bool,
}

fn default_render() -> bool {
    true
}

impl Annotation {
    /// Create a visible box with the given geometry and label.
    pub fn new(rect: Rect, label: String) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            label,
            is_render: true,
        }
    }

    /// Default label for the box at 1-based position `n`.
    pub fn default_label(n: usize) -> String {
        format!("Label {}", n)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Replace the geometry, keeping label and visibility.
    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}
