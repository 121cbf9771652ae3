// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation engine.
//!
//! Engine and store operations report failures through [`EngineError`] and
//! leave all state untouched when they fail. File and dialog plumbing at the
//! application boundary uses `anyhow` instead.

use crate::models::project::ItemKey;
use thiserror::Error;

/// Failures reported by the annotation store and the canvas engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An item key that does not exist in the store was requested.
    #[error("no image with key {key}")]
    InvalidSelection { key: ItemKey },

    /// A box operation was requested while no image is selected.
    #[error("no image is currently selected")]
    NoCurrentItem,

    /// A box index is stale or was never valid.
    #[error("annotation index {index} is out of range (annotations: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The stored bytes for an image are gone.
    #[error("image data not found in storage for key {key}")]
    MissingResource { key: String },

    /// A draw or move gesture has not finished yet.
    #[error("a draw or move gesture is already in progress")]
    GestureInProgress,

    /// The blob store rejected a write.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
