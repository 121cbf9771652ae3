// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project data serialization and deserialization.
//!
//! The session snapshot is stored as JSON in the blob store under
//! `{prefix}-store`; image bytes live beside it under `{prefix}-{filename}`.
//! Annotations can also be exported to YAML or JSON files.

use super::storage::BlobStore;
use crate::models::project::ProjectData;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage key of the session snapshot.
pub fn snapshot_key(prefix: &str) -> String {
    format!("{}-store", prefix)
}

/// Storage key of an uploaded image.
pub fn image_key(prefix: &str, file_name: &str) -> String {
    format!("{}-{}", prefix, file_name)
}

/// File name shown for a stored image key.
pub fn image_key_to_file_name<'a>(prefix: &str, key: &'a str) -> &'a str {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(key)
}

/// Persist the items and current selection.
pub fn save_snapshot(store: &mut dyn BlobStore, prefix: &str, data: &ProjectData) -> Result<()> {
    let json = serde_json::to_vec(data)?;
    store
        .put(&snapshot_key(prefix), &json)
        .context("cannot save session snapshot")
}

/// Read back the snapshot, or `None` when nothing was saved yet.
pub fn load_snapshot(store: &dyn BlobStore, prefix: &str) -> Result<Option<ProjectData>> {
    let Some(bytes) = store.get(&snapshot_key(prefix))? else {
        return Ok(None);
    };
    let data = serde_json::from_slice(&bytes).context("cannot parse session snapshot")?;
    Ok(Some(data))
}

/// One exported box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedBox {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One exported image and its boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedImage {
    pub file_name: String,
    pub annotations: Vec<ExportedBox>,
}

/// Export document covering every uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    /// Logical canvas size the box coordinates refer to.
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub images: Vec<ExportedImage>,
}

impl ExportData {
    pub fn from_project(data: &ProjectData, prefix: &str, canvas_width: f64, canvas_height: f64) -> Self {
        let images = data
            .items
            .values()
            .map(|item| ExportedImage {
                file_name: image_key_to_file_name(prefix, &item.image_key).to_string(),
                annotations: item
                    .annotations
                    .iter()
                    .map(|a| ExportedBox {
                        label: a.label.clone(),
                        x: a.x,
                        y: a.y,
                        width: a.width,
                        height: a.height,
                    })
                    .collect(),
            })
            .collect();
        Self {
            canvas_width,
            canvas_height,
            images,
        }
    }
}

/// Export annotations to YAML format.
pub fn export_yaml(data: &ExportData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export annotations to JSON format.
pub fn export_json(data: &ExportData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStore;
    use crate::models::annotation::Rect;

    const PREFIX: &str = "chairs-chairs-chairs";

    fn sample_project() -> ProjectData {
        let mut data = ProjectData::new();
        data.add_item(image_key(PREFIX, "cat.png"));
        data.add_box(Rect::new(10.0, 20.0, 30.0, 40.0)).unwrap();
        data.add_item(image_key(PREFIX, "dog.jpg"));
        data
    }

    #[test]
    fn test_keys() {
        assert_eq!(snapshot_key(PREFIX), "chairs-chairs-chairs-store");
        let key = image_key(PREFIX, "cat.png");
        assert_eq!(key, "chairs-chairs-chairs-cat.png");
        assert_eq!(image_key_to_file_name(PREFIX, &key), "cat.png");
        assert_eq!(image_key_to_file_name(PREFIX, "other"), "other");
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(load_snapshot(&store, PREFIX).unwrap(), None);

        let data = sample_project();
        save_snapshot(&mut store, PREFIX, &data).unwrap();
        let loaded = load_snapshot(&store, PREFIX).unwrap().unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let mut store = MemoryStore::new();
        store.put(&snapshot_key(PREFIX), b"{not json").unwrap();
        assert!(load_snapshot(&store, PREFIX).is_err());
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let export = ExportData::from_project(&sample_project(), PREFIX, 1000.0, 750.0);
        assert_eq!(export.images[0].file_name, "cat.png");
        assert_eq!(export.images[0].annotations[0].label, "Label 1");
        assert!(export.images[1].annotations.is_empty());

        let yaml_path = dir.path().join("annotations.yaml");
        export_yaml(&export, &yaml_path).unwrap();
        let yaml: ExportData =
            serde_yaml::from_str(&std::fs::read_to_string(&yaml_path).unwrap()).unwrap();
        assert_eq!(yaml, export);

        let json_path = dir.path().join("annotations.json");
        export_json(&export, &json_path).unwrap();
        let json: ExportData =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json, export);
    }
}
