// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer gesture state machine.
//!
//! A gesture is either drawing a new box or moving an existing one:
//!
//! ```text
//! Idle --down on empty space--> Drawing --up/leave--> Idle
//! Idle --down on a box-------> Moving  --up/leave--> Idle
//! ```
//!
//! This type only tracks gesture geometry. [`super::session::Session`]
//! applies the resulting store mutations and redraws.

use crate::config::LeavePolicy;
use crate::error::{EngineError, EngineResult};
use crate::models::annotation::{Point, Rect};
use crate::util::geometry::CanvasScale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Drawing,
    Moving,
}

/// The gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        start: Point,
        /// Signed: negative when dragged left.
        width: f64,
        /// Signed: negative when dragged up.
        height: f64,
    },
    Moving {
        /// Position of the box in the current sequence when the drag began.
        index: usize,
        origin: Rect,
        current: Rect,
        label: String,
        /// Pointer position relative to the box's top-left corner.
        offset: Point,
    },
}

/// How a finished gesture must be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEnd {
    /// No gesture was in progress.
    Nothing,
    /// Append a new box with this normalized geometry.
    CommitDraw(Rect),
    /// The drawn box is dropped.
    DiscardDraw,
    /// Write the moved geometry back to the box at `index`.
    CommitMove { index: usize, rect: Rect },
    /// Put the box at `index` back unchanged.
    RestoreMove { index: usize },
}

/// Gesture state plus the device-to-logical transform.
#[derive(Debug, Clone)]
pub struct Interaction {
    gesture: Gesture,
    scale: CanvasScale,
    leave_policy: LeavePolicy,
    min_box_size: f64,
}

impl Interaction {
    pub fn new(scale: CanvasScale, leave_policy: LeavePolicy, min_box_size: f64) -> Self {
        Self {
            gesture: Gesture::Idle,
            scale,
            leave_policy,
            min_box_size,
        }
    }

    pub fn mode(&self) -> Mode {
        match self.gesture {
            Gesture::Idle => Mode::Idle,
            Gesture::Drawing { .. } => Mode::Drawing,
            Gesture::Moving { .. } => Mode::Moving,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.mode() == Mode::Idle
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn scale(&self) -> &CanvasScale {
        &self.scale
    }

    /// The canvas was resized to `rendered_width` device pixels.
    pub fn resize(&mut self, rendered_width: f64) {
        self.scale.update(rendered_width);
    }

    pub fn to_logical(&self, device_x: f64, device_y: f64) -> Point {
        self.scale.point_to_logical(device_x, device_y)
    }

    pub fn begin_draw(&mut self, at: Point) -> EngineResult<()> {
        if !self.is_idle() {
            return Err(EngineError::GestureInProgress);
        }
        self.gesture = Gesture::Drawing {
            start: at,
            width: 0.0,
            height: 0.0,
        };
        Ok(())
    }

    pub fn begin_move(&mut self, index: usize, rect: Rect, label: String, at: Point) -> EngineResult<()> {
        if !self.is_idle() {
            return Err(EngineError::GestureInProgress);
        }
        self.gesture = Gesture::Moving {
            index,
            origin: rect,
            current: rect,
            label,
            offset: Point::new(at.x - rect.x, at.y - rect.y),
        };
        Ok(())
    }

    /// Follow the pointer. Returns false when idle.
    pub fn update(&mut self, at: Point) -> bool {
        match &mut self.gesture {
            Gesture::Idle => false,
            Gesture::Drawing { start, width, height } => {
                *width = at.x - start.x;
                *height = at.y - start.y;
                true
            }
            Gesture::Moving { current, offset, .. } => {
                current.x = at.x - offset.x;
                current.y = at.y - offset.y;
                true
            }
        }
    }

    /// Geometry of the ephemeral box, if any. Drawing boxes may have
    /// negative size.
    pub fn ephemeral_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::Idle => None,
            Gesture::Drawing { start, width, height } => Some(Rect::new(start.x, start.y, *width, *height)),
            Gesture::Moving { current, .. } => Some(*current),
        }
    }

    /// Pointer released: commit and return to idle.
    pub fn finish(&mut self) -> GestureEnd {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => GestureEnd::Nothing,
            Gesture::Drawing { start, width, height } => {
                let rect = Rect::new(start.x, start.y, width, height).normalized();
                if rect.width < self.min_box_size || rect.height < self.min_box_size {
                    GestureEnd::DiscardDraw
                } else {
                    GestureEnd::CommitDraw(rect)
                }
            }
            Gesture::Moving { index, current, .. } => GestureEnd::CommitMove { index, rect: current },
        }
    }

    /// Abandon the gesture and return to idle.
    pub fn cancel(&mut self) -> GestureEnd {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => GestureEnd::Nothing,
            Gesture::Drawing { .. } => GestureEnd::DiscardDraw,
            Gesture::Moving { index, .. } => GestureEnd::RestoreMove { index },
        }
    }

    /// Pointer left the canvas: commit or cancel per the leave policy.
    pub fn leave(&mut self) -> GestureEnd {
        match self.leave_policy {
            LeavePolicy::Commit => self.finish(),
            LeavePolicy::Cancel => self.cancel(),
        }
    }
}
