// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! User settings.
//!
//! Settings are read from `settings.yaml` in the platform configuration
//! directory. Missing fields fall back to their defaults, and a missing or
//! broken file yields the default settings.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Namespace prefix shared by every storage key.
pub const DEFAULT_KEY_PREFIX: &str = "chairs-chairs-chairs";

/// What happens to a gesture when the pointer leaves the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeavePolicy {
    /// Commit the gesture with its last known geometry.
    #[default]
    Commit,
    /// Discard a drawn box, or put a moved box back where it started.
    Cancel,
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Width of the canvas in logical units.
    pub logical_width: f64,
    /// Height of the canvas in logical units.
    pub logical_height: f64,
    pub pointer_leave: LeavePolicy,
    /// Ask before deleting boxes or images.
    pub confirm_destructive: bool,
    /// Drawn boxes narrower or shorter than this are dropped.
    pub min_box_size: f64,
    /// Overrides the platform data directory used for storage.
    pub data_dir: Option<PathBuf>,
    pub key_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logical_width: 1000.0,
            logical_height: 750.0,
            pointer_leave: LeavePolicy::Commit,
            confirm_destructive: true,
            min_box_size: 0.0,
            data_dir: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl Settings {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "boxtag", "boxtag")
    }

    /// Load settings from the platform config directory, or defaults.
    pub fn load() -> Self {
        let Some(dirs) = Self::project_dirs() else {
            log::warn!("Cannot resolve config directory, using default settings");
            return Self::default();
        };
        let path = dirs.config_dir().join("settings.yaml");
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load settings from a YAML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let settings: Self = serde_yaml::from_str(&yaml)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Check that the canvas size and minimum box size are usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("logical_width", self.logical_width), ("logical_height", self.logical_height)] {
            anyhow::ensure!(
                value.is_finite() && value > 0.0,
                "{} must be a positive number, got {}",
                name,
                value
            );
        }
        anyhow::ensure!(
            self.min_box_size.is_finite() && self.min_box_size >= 0.0,
            "min_box_size must not be negative, got {}",
            self.min_box_size
        );
        Ok(())
    }

    /// Directory holding stored images and the session snapshot.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dirs = Self::project_dirs().context("cannot resolve data directory")?;
        Ok(dirs.data_dir().to_path_buf())
    }
}
