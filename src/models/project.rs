// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! [`ProjectData`] maps 1-based item keys to uploaded images and their
//! annotation boxes, and tracks which item is current. It is also the
//! snapshot that gets persisted after every committing change.
//!
//! Boxes are addressed by their position in the current item's sequence.
//! An index is only valid until the next mutation that changes the length
//! of that sequence.

use super::annotation::{Annotation, Rect};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 1-based, densely numbered item identifier.
pub type ItemKey = u32;

/// One uploaded image and its boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    /// Storage key of the image bytes.
    pub image_key: String,
    pub annotations: Vec<Annotation>,
}

impl ImageItem {
    pub fn new(image_key: String) -> Self {
        Self {
            image_key,
            annotations: Vec::new(),
        }
    }
}

/// All items plus the current selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub items: BTreeMap<ItemKey, ImageItem>,
    pub current_item: Option<ItemKey>,
}

impl ProjectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn current_key(&self) -> Option<ItemKey> {
        self.current_item
    }

    pub fn current_item(&self) -> Option<&ImageItem> {
        self.current_item.and_then(|key| self.items.get(&key))
    }

    /// Boxes of the current item.
    pub fn annotations(&self) -> EngineResult<&[Annotation]> {
        self.current_item()
            .map(|item| item.annotations.as_slice())
            .ok_or(EngineError::NoCurrentItem)
    }

    fn annotations_mut(&mut self) -> EngineResult<&mut Vec<Annotation>> {
        let key = self.current_item.ok_or(EngineError::NoCurrentItem)?;
        self.items
            .get_mut(&key)
            .map(|item| &mut item.annotations)
            .ok_or(EngineError::InvalidSelection { key })
    }

    fn box_mut(&mut self, index: usize) -> EngineResult<&mut Annotation> {
        let annotations = self.annotations_mut()?;
        let len = annotations.len();
        annotations
            .get_mut(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })
    }

    pub fn box_at(&self, index: usize) -> EngineResult<&Annotation> {
        let annotations = self.annotations()?;
        annotations.get(index).ok_or(EngineError::IndexOutOfRange {
            index,
            len: annotations.len(),
        })
    }

    /// Append a box to the current item and return its index.
    ///
    /// The label is `Label {n}` where `n` is the sequence length before the
    /// append plus one.
    pub fn add_box(&mut self, rect: Rect) -> EngineResult<usize> {
        let annotations = self.annotations_mut()?;
        let label = Annotation::default_label(annotations.len() + 1);
        annotations.push(Annotation::new(rect, label));
        Ok(annotations.len() - 1)
    }

    pub fn update_box_geometry(&mut self, index: usize, rect: Rect) -> EngineResult<()> {
        self.box_mut(index)?.set_rect(rect);
        Ok(())
    }

    /// Replace the label. Empty labels are allowed.
    pub fn update_box_label(&mut self, index: usize, label: &str) -> EngineResult<()> {
        self.box_mut(index)?.label = label.to_string();
        Ok(())
    }

    /// Remove a box. Every later box shifts down by one index.
    pub fn remove_box(&mut self, index: usize) -> EngineResult<Annotation> {
        let annotations = self.annotations_mut()?;
        if index >= annotations.len() {
            return Err(EngineError::IndexOutOfRange {
                index,
                len: annotations.len(),
            });
        }
        Ok(annotations.remove(index))
    }

    pub fn remove_all_boxes(&mut self) -> EngineResult<()> {
        self.annotations_mut()?.clear();
        Ok(())
    }

    pub fn set_box_render(&mut self, index: usize, is_render: bool) -> EngineResult<()> {
        self.box_mut(index)?.is_render = is_render;
        Ok(())
    }

    /// Append a new item and make it current.
    pub fn add_item(&mut self, image_key: String) -> ItemKey {
        let key = self.items.len() as ItemKey + 1;
        self.items.insert(key, ImageItem::new(image_key));
        self.current_item = Some(key);
        key
    }

    /// Remove an item and renumber the rest densely from 1.
    ///
    /// The current pointer follows its item when a lower key is removed.
    /// When the current item itself is removed, the item that slides into
    /// its position becomes current, or the new last item if it was last.
    pub fn remove_item(&mut self, key: ItemKey) -> EngineResult<ImageItem> {
        let removed = self
            .items
            .remove(&key)
            .ok_or(EngineError::InvalidSelection { key })?;

        let items = std::mem::take(&mut self.items);
        self.items = items
            .into_values()
            .enumerate()
            .map(|(i, item)| (i as ItemKey + 1, item))
            .collect();

        let count = self.items.len() as ItemKey;
        self.current_item = match self.current_item {
            _ if count == 0 => None,
            Some(current) if current > key => Some(current - 1),
            Some(current) if current == key => Some(current.min(count)),
            other => other,
        };
        Ok(removed)
    }

    /// Make `key` current. Unknown keys leave the selection unchanged.
    pub fn select_item(&mut self, key: ItemKey) -> EngineResult<()> {
        if !self.items.contains_key(&key) {
            return Err(EngineError::InvalidSelection { key });
        }
        self.current_item = Some(key);
        Ok(())
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_item.is_some_and(|key| key > 1)
    }

    pub fn can_go_next(&self) -> bool {
        self.current_item
            .is_some_and(|key| (key as usize) < self.items.len())
    }

    /// Step back one item. Returns false at the first item.
    pub fn previous_item(&mut self) -> bool {
        match self.current_item {
            Some(key) if self.can_go_previous() => {
                self.current_item = Some(key - 1);
                true
            }
            _ => false,
        }
    }

    /// Step forward one item. Returns false at the last item.
    pub fn next_item(&mut self) -> bool {
        match self.current_item {
            Some(key) if self.can_go_next() => {
                self.current_item = Some(key + 1);
                true
            }
            _ => false,
        }
    }

    /// Number of items still pointing at the given image bytes.
    pub fn image_key_refs(&self, image_key: &str) -> usize {
        self.items
            .values()
            .filter(|item| item.image_key == image_key)
            .count()
    }

    /// Restore invariants on a snapshot read back from storage: dense keys,
    /// a valid current pointer, and every box visible.
    pub fn repair(&mut self) {
        let items = std::mem::take(&mut self.items);
        let old_keys: Vec<ItemKey> = items.keys().copied().collect();
        self.items = items
            .into_values()
            .enumerate()
            .map(|(i, mut item)| {
                for annotation in &mut item.annotations {
                    annotation.is_render = true;
                }
                (i as ItemKey + 1, item)
            })
            .collect();

        self.current_item = match self.current_item {
            _ if self.items.is_empty() => None,
            Some(current) => old_keys
                .iter()
                .position(|&key| key == current)
                .map(|pos| pos as ItemKey + 1)
                .or(Some(1)),
            None => Some(1),
        };
    }
}
