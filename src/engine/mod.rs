// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive annotation canvas engine.
//!
//! Pointer input flows through the scale transform into the gesture state
//! machine; committed gestures mutate the project store, after which the
//! render layers and hit index are rebuilt and the snapshot is flushed.

pub mod interaction;
pub mod render;
pub mod session;

/// Asks the user to approve a destructive operation.
pub trait Confirm {
    /// Returns true when the user accepts.
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}
