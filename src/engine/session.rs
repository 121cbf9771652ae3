// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The annotation session.
//!
//! [`Session`] owns the project store, the gesture state machine, the hit
//! index and the render layers, and keeps them consistent. After every
//! committing change it redraws the committed layer, rebuilds the hit index,
//! bumps the list revision and flushes the snapshot to the blob store.

use super::hit_test::{CursorHint, HitIndex};
use super::interaction::{Gesture, GestureEnd, Interaction, Mode};
use super::render::{self, RenderLayers, Surface, TextMeasure};
use super::Confirm;
use crate::config::Settings;
use crate::error::{EngineError, EngineResult};
use crate::io::serialization::{self, ExportData};
use crate::io::storage::BlobStore;
use crate::models::project::{ItemKey, ProjectData};
use crate::util::geometry::CanvasScale;
use std::collections::{HashMap, HashSet};

/// Image bytes waiting to be decoded by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRequest {
    pub key: String,
    pub bytes: Vec<u8>,
}

/// One annotation session over a blob store.
pub struct Session {
    project: ProjectData,
    interaction: Interaction,
    hit_index: HitIndex,
    layers: RenderLayers,
    blobs: Box<dyn BlobStore>,
    key_prefix: String,
    confirm_destructive: bool,
    logical_size: (f64, f64),
    /// Decoded size of every image seen so far, by storage key.
    image_sizes: HashMap<String, (u32, u32)>,
    pending_decodes: Vec<DecodeRequest>,
    decoding: HashSet<String>,
    /// Image keys whose bytes were removed, for the UI to drop textures.
    released_images: Vec<String>,
    list_revision: u64,
}

impl Session {
    /// Open a session, restoring the last snapshot from `blobs` if there is
    /// one.
    pub fn new(settings: &Settings, blobs: Box<dyn BlobStore>) -> Self {
        let project = match serialization::load_snapshot(blobs.as_ref(), &settings.key_prefix) {
            Ok(Some(mut project)) => {
                project.repair();
                log::info!(
                    "Restored session with {} images, current {:?}",
                    project.item_count(),
                    project.current_key()
                );
                project
            }
            Ok(None) => ProjectData::new(),
            Err(e) => {
                log::warn!("Starting with an empty session: {:#}", e);
                ProjectData::new()
            }
        };

        let mut session = Self {
            project,
            interaction: Interaction::new(
                CanvasScale::new(settings.logical_width),
                settings.pointer_leave,
                settings.min_box_size,
            ),
            hit_index: HitIndex::default(),
            layers: RenderLayers::new(settings.logical_width, settings.logical_height),
            blobs,
            key_prefix: settings.key_prefix.clone(),
            confirm_destructive: settings.confirm_destructive,
            logical_size: (settings.logical_width, settings.logical_height),
            image_sizes: HashMap::new(),
            pending_decodes: Vec::new(),
            decoding: HashSet::new(),
            released_images: Vec::new(),
            list_revision: 0,
        };
        if let Err(e) = session.load_image_layer() {
            log::error!("Cannot show image: {}", e);
        }
        session.refresh_annotations();
        session
    }

    pub fn project(&self) -> &ProjectData {
        &self.project
    }

    pub fn layers(&self) -> &RenderLayers {
        &self.layers
    }

    pub fn hit_index(&self) -> &HitIndex {
        &self.hit_index
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn logical_size(&self) -> (f64, f64) {
        self.logical_size
    }

    /// Increases whenever the annotation list or gallery contents change.
    pub fn list_revision(&self) -> u64 {
        self.list_revision
    }

    pub fn current_file_name(&self) -> Option<&str> {
        self.project
            .current_item()
            .map(|item| serialization::image_key_to_file_name(&self.key_prefix, &item.image_key))
    }

    /// File names of all items in key order.
    pub fn gallery(&self) -> Vec<(ItemKey, &str)> {
        self.project
            .items
            .iter()
            .map(|(key, item)| {
                (
                    *key,
                    serialization::image_key_to_file_name(&self.key_prefix, &item.image_key),
                )
            })
            .collect()
    }

    /// "Image n of N", or `None` when there are no images.
    pub fn image_title(&self) -> Option<String> {
        self.project
            .current_key()
            .map(|key| format!("Image {} of {}", key, self.project.item_count()))
    }

    pub fn can_delete_image(&self) -> bool {
        self.project.current_item().is_some()
    }

    pub fn can_delete_all_boxes(&self) -> bool {
        self.project.annotations().is_ok_and(|a| !a.is_empty())
    }

    /// Install real font metrics and redraw the layers that show labels.
    pub fn set_text_measure(&mut self, measure: TextMeasure) {
        self.layers.set_text_measure(measure);
        self.render_annotation_layer();
        if let Gesture::Moving { current, label, .. } = self.interaction.gesture() {
            render::render_moving(&mut self.layers.ephemeral, *current, label);
        }
    }

    /// The canvas is now `rendered_width` device pixels wide.
    pub fn resize(&mut self, rendered_width: f64) {
        self.interaction.resize(rendered_width);
        log::debug!("Canvas scale is now {}", self.interaction.scale().scale());
    }

    fn ensure_idle(&self) -> EngineResult<()> {
        if self.interaction.is_idle() {
            Ok(())
        } else {
            Err(EngineError::GestureInProgress)
        }
    }

    /// Pointer pressed at device coordinates relative to the canvas origin.
    ///
    /// Starts moving the first box under the pointer, or drawing a new box
    /// when there is none. Does nothing when no image is selected.
    pub fn pointer_down(&mut self, device_x: f64, device_y: f64) -> EngineResult<()> {
        if self.project.current_item().is_none() {
            log::debug!("Ignoring pointer down without a current image");
            return Ok(());
        }
        self.ensure_idle()?;

        let at = self.interaction.to_logical(device_x, device_y);
        match self.hit_index.hit_test(at) {
            Some(index) => {
                let annotation = self.project.box_at(index)?;
                let (rect, label) = (annotation.rect(), annotation.label.clone());
                self.interaction.begin_move(index, rect, label.clone(), at)?;
                self.project.set_box_render(index, false)?;
                self.render_annotation_layer();
                render::render_moving(&mut self.layers.ephemeral, rect, &label);
                log::debug!("Started moving box {} ({})", index, label);
            }
            None => {
                self.interaction.begin_draw(at)?;
                log::debug!("Started drawing at ({:.1}, {:.1})", at.x, at.y);
            }
        }
        Ok(())
    }

    /// Pointer moved. Returns the cursor to show.
    pub fn pointer_move(&mut self, device_x: f64, device_y: f64) -> CursorHint {
        if self.project.current_item().is_none() {
            return CursorHint::Draw;
        }
        let at = self.interaction.to_logical(device_x, device_y);
        if !self.interaction.update(at) {
            return self.hit_index.cursor_at(at);
        }
        match self.interaction.gesture() {
            Gesture::Moving { current, label, .. } => {
                render::render_moving(&mut self.layers.ephemeral, *current, label);
                CursorHint::Move
            }
            _ => {
                if let Some(rect) = self.interaction.ephemeral_rect() {
                    render::render_drawing(&mut self.layers.ephemeral, rect);
                }
                CursorHint::Draw
            }
        }
    }

    pub fn pointer_up(&mut self) -> EngineResult<()> {
        let end = self.interaction.finish();
        self.end_gesture(end)
    }

    /// Pointer left the canvas; handled according to the leave policy.
    pub fn pointer_leave(&mut self) -> EngineResult<()> {
        let end = self.interaction.leave();
        self.end_gesture(end)
    }

    fn end_gesture(&mut self, end: GestureEnd) -> EngineResult<()> {
        if end != GestureEnd::Nothing {
            self.layers.ephemeral.clear();
        }
        match end {
            GestureEnd::Nothing => {}
            GestureEnd::DiscardDraw => log::debug!("Discarded drawn box"),
            GestureEnd::CommitDraw(rect) => {
                let index = self.project.add_box(rect)?;
                log::info!(
                    "Added box {} at ({:.1}, {:.1}) size {:.1}x{:.1}",
                    index,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height
                );
                self.commit_annotations();
            }
            GestureEnd::CommitMove { index, rect } => {
                self.project.update_box_geometry(index, rect)?;
                self.project.set_box_render(index, true)?;
                log::info!("Moved box {} to ({:.1}, {:.1})", index, rect.x, rect.y);
                self.commit_annotations();
            }
            GestureEnd::RestoreMove { index } => {
                self.project.set_box_render(index, true)?;
                log::debug!("Cancelled move of box {}", index);
                self.refresh_annotations();
            }
        }
        Ok(())
    }

    /// Change the label of a box. Empty labels are allowed.
    ///
    /// Refused while a gesture is active, since a moved box carries its label.
    pub fn rename_box(&mut self, index: usize, label: &str) -> EngineResult<()> {
        self.ensure_idle()?;
        self.project.update_box_label(index, label)?;
        log::info!("Renamed box {} to {:?}", index, label);
        self.render_annotation_layer();
        self.flush();
        Ok(())
    }

    fn ask(&self, confirm: &mut dyn Confirm, message: &str) -> bool {
        if !self.confirm_destructive {
            return true;
        }
        let accepted = confirm.confirm(message);
        if !accepted {
            log::debug!("Declined: {}", message);
        }
        accepted
    }

    /// Delete one box after confirmation. Returns whether it was deleted.
    pub fn delete_box(&mut self, index: usize, confirm: &mut dyn Confirm) -> EngineResult<bool> {
        self.ensure_idle()?;
        let label = self.project.box_at(index)?.label.clone();
        if !self.ask(confirm, &format!("Delete annotation {}?", label)) {
            return Ok(false);
        }
        self.project.remove_box(index)?;
        log::info!("Deleted box {} ({})", index, label);
        self.commit_annotations();
        Ok(true)
    }

    /// Delete every box on the current image after confirmation.
    pub fn delete_all_boxes(&mut self, confirm: &mut dyn Confirm) -> EngineResult<bool> {
        self.ensure_idle()?;
        self.project.annotations()?;
        if !self.ask(confirm, "Delete all annotations? This cannot be undone.") {
            return Ok(false);
        }
        self.project.remove_all_boxes()?;
        log::info!("Deleted all boxes on image {:?}", self.project.current_key());
        self.commit_annotations();
        Ok(true)
    }

    /// Store uploaded image bytes and add them as the new current item.
    ///
    /// The image layer stays empty until the bytes have been decoded and
    /// [`Session::image_decoded`] is called.
    pub fn add_image(&mut self, file_name: &str, bytes: &[u8]) -> EngineResult<ItemKey> {
        self.ensure_idle()?;
        let image_key = serialization::image_key(&self.key_prefix, file_name);
        self.blobs
            .put(&image_key, bytes)
            .map_err(|e| EngineError::Storage(format!("{:#}", e)))?;
        self.image_sizes.remove(&image_key);
        let key = self.project.add_item(image_key);
        log::info!("Added image {} as item {}", file_name, key);
        self.on_item_changed()?;
        Ok(key)
    }

    /// Delete the current image after confirmation. Remaining items are
    /// renumbered from 1.
    ///
    /// The deletion stands even when the image that becomes current cannot
    /// be shown; that case is reported as `MissingResource`.
    pub fn delete_image(&mut self, confirm: &mut dyn Confirm) -> EngineResult<bool> {
        self.ensure_idle()?;
        let key = self.project.current_key().ok_or(EngineError::NoCurrentItem)?;
        let file_name = self.current_file_name().unwrap_or_default().to_string();
        if !self.ask(
            confirm,
            &format!("Delete image \"{}\"? This cannot be undone.", file_name),
        ) {
            return Ok(false);
        }

        let removed = self.project.remove_item(key)?;
        if self.project.image_key_refs(&removed.image_key) == 0 {
            if let Err(e) = self.blobs.remove(&removed.image_key) {
                log::warn!("Failed to remove image data {}: {:#}", removed.image_key, e);
            }
            self.image_sizes.remove(&removed.image_key);
            self.released_images.push(removed.image_key);
        }
        log::info!(
            "Deleted image {} (item {}), {} left",
            file_name,
            key,
            self.project.item_count()
        );
        self.on_item_changed()?;
        Ok(true)
    }

    pub fn select_item(&mut self, key: ItemKey) -> EngineResult<()> {
        self.ensure_idle()?;
        self.project.select_item(key)?;
        log::info!("Selected image {}", key);
        self.on_item_changed()
    }

    /// Returns false when already at the last image.
    pub fn next_item(&mut self) -> EngineResult<bool> {
        self.ensure_idle()?;
        let moved = self.project.next_item();
        if moved {
            self.on_item_changed()?;
        }
        Ok(moved)
    }

    /// Returns false when already at the first image.
    pub fn previous_item(&mut self) -> EngineResult<bool> {
        self.ensure_idle()?;
        let moved = self.project.previous_item();
        if moved {
            self.on_item_changed()?;
        }
        Ok(moved)
    }

    /// Stored bytes of an image.
    pub fn image_bytes(&self, key: &str) -> EngineResult<Vec<u8>> {
        match self.blobs.get(key) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(EngineError::MissingResource {
                key: key.to_string(),
            }),
            Err(e) => Err(EngineError::Storage(format!("{:#}", e))),
        }
    }

    /// Hand over the images that need decoding.
    pub fn take_pending_decodes(&mut self) -> Vec<DecodeRequest> {
        std::mem::take(&mut self.pending_decodes)
    }

    /// Image keys whose stored bytes were deleted since the last call.
    pub fn take_released_images(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released_images)
    }

    /// Queue every stored image that has not been decoded yet, so the
    /// gallery can show thumbnails.
    pub fn request_all_decodes(&mut self) {
        let keys: Vec<String> = self
            .project
            .items
            .values()
            .map(|item| item.image_key.clone())
            .collect();
        for key in keys {
            if let Err(e) = self.queue_decode(key) {
                log::warn!("No thumbnail: {}", e);
            }
        }
    }

    fn queue_decode(&mut self, key: String) -> EngineResult<()> {
        if self.image_sizes.contains_key(&key) || self.decoding.contains(&key) {
            return Ok(());
        }
        let bytes = self.image_bytes(&key)?;
        self.decoding.insert(key.clone());
        self.pending_decodes.push(DecodeRequest { key, bytes });
        Ok(())
    }

    /// A background decode finished. Draws the image if it belongs to the
    /// current item.
    pub fn image_decoded(&mut self, key: &str, width: u32, height: u32) {
        self.decoding.remove(key);
        self.image_sizes.insert(key.to_string(), (width, height));
        let is_current = self
            .project
            .current_item()
            .is_some_and(|item| item.image_key == key);
        if is_current {
            render::render_image(&mut self.layers.image, key, width, height);
        }
    }

    /// A background decode failed. The image layer stays empty.
    pub fn image_failed(&mut self, key: &str, reason: &str) {
        self.decoding.remove(key);
        log::error!("Failed to decode image {}: {}", key, reason);
    }

    pub fn export_data(&self) -> ExportData {
        let (width, height) = self.logical_size;
        ExportData::from_project(&self.project, &self.key_prefix, width, height)
    }

    /// Write the snapshot. Failures are logged and the session carries on.
    pub fn flush(&mut self) {
        if let Err(e) = serialization::save_snapshot(self.blobs.as_mut(), &self.key_prefix, &self.project) {
            log::error!("Failed to save session: {:#}", e);
        }
    }

    /// Redraw everything for the new current item. A missing image is
    /// reported only after the rest of the session has been updated.
    fn on_item_changed(&mut self) -> EngineResult<()> {
        self.layers.ephemeral.clear();
        let image = self.load_image_layer();
        self.refresh_annotations();
        self.list_revision += 1;
        self.flush();
        image.inspect_err(|e| log::error!("Cannot show image: {}", e))
    }

    /// Redraw the image layer for the current item, or queue its bytes for
    /// decoding. Missing bytes leave the layer empty.
    fn load_image_layer(&mut self) -> EngineResult<()> {
        self.layers.image.clear();
        let Some(key) = self.project.current_item().map(|item| item.image_key.clone()) else {
            return Ok(());
        };
        if let Some(&(width, height)) = self.image_sizes.get(&key) {
            render::render_image(&mut self.layers.image, &key, width, height);
            return Ok(());
        }
        self.queue_decode(key)
    }

    fn render_annotation_layer(&mut self) {
        match self.project.annotations() {
            Ok(annotations) => render::render_annotations(&mut self.layers.annotations, annotations),
            Err(_) => self.layers.annotations.clear(),
        }
    }

    fn refresh_annotations(&mut self) {
        self.render_annotation_layer();
        match self.project.annotations() {
            Ok(annotations) => self.hit_index.rebuild(annotations),
            Err(_) => self.hit_index.clear(),
        }
    }

    fn commit_annotations(&mut self) {
        self.refresh_annotations();
        self.list_revision += 1;
        self.flush();
    }

    pub fn mode(&self) -> Mode {
        self.interaction.mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeavePolicy;
    use crate::engine::render::DrawCommand;
    use crate::io::storage::MemoryStore;
    use crate::models::annotation::{Point, Rect};

    const PREFIX: &str = crate::config::DEFAULT_KEY_PREFIX;

    fn session_with(settings: Settings) -> Session {
        let mut session = Session::new(&settings, Box::new(MemoryStore::new()));
        session.add_image("cat.png", b"not really a png").unwrap();
        session
    }

    fn session() -> Session {
        session_with(Settings::default())
    }

    fn drag(session: &mut Session, from: (f64, f64), to: (f64, f64)) {
        session.pointer_down(from.0, from.1).unwrap();
        session.pointer_move((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
        session.pointer_move(to.0, to.1);
        session.pointer_up().unwrap();
    }

    fn rects(session: &Session) -> Vec<Rect> {
        session
            .project()
            .annotations()
            .unwrap()
            .iter()
            .map(|a| a.rect())
            .collect()
    }

    fn labels(session: &Session) -> Vec<String> {
        session
            .project()
            .annotations()
            .unwrap()
            .iter()
            .map(|a| a.label.clone())
            .collect()
    }

    fn saved(session: &Session) -> ProjectData {
        serialization::load_snapshot(session.blobs(), PREFIX)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_draw_gestures_append_in_order() {
        let mut session = session();
        for i in 0..4 {
            let x = i as f64 * 200.0;
            drag(&mut session, (x, 10.0), (x + 100.0, 60.0));
        }

        assert_eq!(labels(&session), vec!["Label 1", "Label 2", "Label 3", "Label 4"]);
        assert_eq!(rects(&session)[2], Rect::new(400.0, 10.0, 100.0, 50.0));
        assert_eq!(session.hit_index().len(), 4);
        assert_eq!(session.mode(), Mode::Idle);
        assert!(session.layers().ephemeral.is_empty());
        assert_eq!(&saved(&session), session.project());
    }

    #[test]
    fn test_reverse_drag_is_normalized_with_scale() {
        let mut session = session();
        session.resize(500.0);
        drag(&mut session, (75.0, 100.0), (25.0, 50.0));
        assert_eq!(rects(&session), vec![Rect::new(50.0, 100.0, 100.0, 100.0)]);
    }

    #[test]
    fn test_drawing_redraws_only_ephemeral_layer() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (10.0, 10.0));
        let committed = session.layers().annotations.commands().to_vec();

        session.pointer_down(500.0, 500.0).unwrap();
        session.pointer_move(450.0, 400.0);
        assert_eq!(session.layers().annotations.commands(), committed.as_slice());
        assert_eq!(
            session.layers().ephemeral.commands(),
            &[DrawCommand::StrokeRect {
                rect: Rect::new(450.0, 400.0, 50.0, 100.0),
                color: render::COLOR_BOX_CURRENT,
            }]
        );
    }

    #[test]
    fn test_move_roundtrip() {
        let mut session = session();
        drag(&mut session, (100.0, 100.0), (200.0, 150.0));

        session.pointer_down(120.0, 110.0).unwrap();
        assert_eq!(session.mode(), Mode::Moving);
        assert!(!session.project().box_at(0).unwrap().is_render);
        assert!(session.layers().annotations.is_empty());
        assert!(!session.layers().ephemeral.is_empty());

        session.pointer_move(150.0, 90.0);
        session.pointer_move(150.0, 140.0);
        assert_eq!(session.pointer_move(150.0, 140.0), CursorHint::Move);
        session.pointer_up().unwrap();

        let moved = session.project().box_at(0).unwrap();
        assert_eq!(moved.rect(), Rect::new(130.0, 130.0, 100.0, 50.0));
        assert!(moved.is_render);
        assert_eq!(session.hit_index().hit_test(Point::new(225.0, 175.0)), Some(0));
        assert_eq!(session.hit_index().hit_test(Point::new(105.0, 105.0)), None);
        assert_eq!(&saved(&session), session.project());
    }

    #[test]
    fn test_pointer_leave_commits_by_default() {
        let mut session = session();
        session.pointer_down(10.0, 10.0).unwrap();
        session.pointer_move(30.0, 40.0);
        session.pointer_leave().unwrap();
        assert_eq!(rects(&session), vec![Rect::new(10.0, 10.0, 20.0, 30.0)]);
    }

    #[test]
    fn test_pointer_leave_cancel_policy_restores_box() {
        let mut session = session_with(Settings {
            pointer_leave: LeavePolicy::Cancel,
            ..Settings::default()
        });
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));

        session.pointer_down(10.0, 10.0).unwrap();
        session.pointer_move(300.0, 300.0);
        session.pointer_leave().unwrap();

        let annotation = session.project().box_at(0).unwrap();
        assert_eq!(annotation.rect(), Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(annotation.is_render);
        assert!(session.layers().ephemeral.is_empty());

        session.pointer_down(400.0, 400.0).unwrap();
        session.pointer_move(450.0, 450.0);
        session.pointer_leave().unwrap();
        assert_eq!(rects(&session).len(), 1);
    }

    #[test]
    fn test_pointer_down_without_image_is_noop() {
        let mut session = Session::new(&Settings::default(), Box::new(MemoryStore::new()));
        session.pointer_down(10.0, 10.0).unwrap();
        assert_eq!(session.mode(), Mode::Idle);
        assert_eq!(session.pointer_move(20.0, 20.0), CursorHint::Draw);
        session.pointer_up().unwrap();
        assert_eq!(session.project().item_count(), 0);
    }

    #[test]
    fn test_second_pointer_down_is_rejected() {
        let mut session = session();
        session.pointer_down(10.0, 10.0).unwrap();
        assert_eq!(
            session.pointer_down(20.0, 20.0),
            Err(EngineError::GestureInProgress)
        );
        assert_eq!(session.mode(), Mode::Drawing);
    }

    #[test]
    fn test_idle_cursor_feedback() {
        let mut session = session();
        drag(&mut session, (10.0, 10.0), (60.0, 60.0));
        assert_eq!(session.pointer_move(30.0, 30.0), CursorHint::Move);
        assert_eq!(session.pointer_move(300.0, 30.0), CursorHint::Draw);
        assert_eq!(session.mode(), Mode::Idle);
    }

    #[test]
    fn test_delete_box_by_index() {
        let mut session = session();
        for x in [0.0, 100.0, 200.0] {
            drag(&mut session, (x, 0.0), (x + 50.0, 50.0));
        }
        session.rename_box(0, "A").unwrap();
        session.rename_box(1, "B").unwrap();
        session.rename_box(2, "C").unwrap();

        let revision = session.list_revision();
        assert!(session.delete_box(1, &mut |_: &str| true).unwrap());
        assert_eq!(labels(&session), vec!["A", "C"]);
        assert!(session.list_revision() > revision);
        assert_eq!(session.hit_index().hit_test(Point::new(210.0, 10.0)), Some(1));
        assert_eq!(session.hit_index().hit_test(Point::new(110.0, 10.0)), None);
        assert_eq!(&saved(&session), session.project());
    }

    #[test]
    fn test_declined_delete_leaves_state() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let before = session.project().clone();

        let mut asked = Vec::new();
        let mut decline = |message: &str| {
            asked.push(message.to_string());
            false
        };
        assert!(!session.delete_box(0, &mut decline).unwrap());
        assert!(!session.delete_all_boxes(&mut decline).unwrap());
        assert!(!session.delete_image(&mut decline).unwrap());
        assert_eq!(session.project(), &before);
        assert_eq!(
            asked,
            vec![
                "Delete annotation Label 1?".to_string(),
                "Delete all annotations? This cannot be undone.".to_string(),
                "Delete image \"cat.png\"? This cannot be undone.".to_string(),
            ]
        );
    }

    #[test]
    fn test_confirmation_can_be_disabled() {
        let mut session = session_with(Settings {
            confirm_destructive: false,
            ..Settings::default()
        });
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        assert!(session.delete_box(0, &mut |_: &str| false).unwrap());
        assert!(session.project().annotations().unwrap().is_empty());
    }

    #[test]
    fn test_delete_stale_index_fails() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        assert_eq!(
            session.delete_box(1, &mut |_: &str| true),
            Err(EngineError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            session.rename_box(4, "x"),
            Err(EngineError::IndexOutOfRange { index: 4, len: 1 })
        );
    }

    #[test]
    fn test_delete_all_clears_hits() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        drag(&mut session, (100.0, 0.0), (150.0, 50.0));
        assert!(session.can_delete_all_boxes());

        assert!(session.delete_all_boxes(&mut |_: &str| true).unwrap());
        assert!(session.project().annotations().unwrap().is_empty());
        assert!(session.hit_index().is_empty());
        assert_eq!(session.hit_index().hit_test(Point::new(10.0, 10.0)), None);
        assert!(session.layers().annotations.is_empty());
        assert!(!session.can_delete_all_boxes());
    }

    #[test]
    fn test_list_edits_blocked_during_gesture() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.pointer_down(10.0, 10.0).unwrap();
        assert_eq!(
            session.delete_box(0, &mut |_: &str| true),
            Err(EngineError::GestureInProgress)
        );
        assert_eq!(session.next_item(), Err(EngineError::GestureInProgress));
        session.pointer_up().unwrap();
        assert!(session.delete_box(0, &mut |_: &str| true).unwrap());
    }

    #[test]
    fn test_delete_image_renumbers_items() {
        let mut session = session();
        session.add_image("dog.png", b"dog").unwrap();
        session.add_image("fox.png", b"fox").unwrap();
        session.select_item(2).unwrap();

        assert!(session.delete_image(&mut |_: &str| true).unwrap());
        assert_eq!(session.gallery(), vec![(1, "cat.png"), (2, "fox.png")]);
        assert_eq!(session.project().current_key(), Some(2));
        assert_eq!(session.image_title().as_deref(), Some("Image 2 of 2"));
        assert_eq!(
            session.image_bytes(&serialization::image_key(PREFIX, "dog.png")),
            Err(EngineError::MissingResource {
                key: serialization::image_key(PREFIX, "dog.png"),
            })
        );
    }

    #[test]
    fn test_delete_last_image_empties_session() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.image_decoded(&serialization::image_key(PREFIX, "cat.png"), 10, 10);
        assert!(!session.layers().image.is_empty());

        assert!(session.delete_image(&mut |_: &str| true).unwrap());
        assert_eq!(session.project().current_key(), None);
        assert!(session.layers().image.is_empty());
        assert!(session.layers().annotations.is_empty());
        assert!(session.hit_index().is_empty());
        assert_eq!(session.image_title(), None);
        assert!(!session.can_delete_image());
        assert_eq!(saved(&session), ProjectData::new());
    }

    #[test]
    fn test_shared_image_bytes_survive_one_delete() {
        let mut session = session();
        session.add_image("cat.png", b"not really a png").unwrap();
        assert!(session.delete_image(&mut |_: &str| true).unwrap());
        let key = serialization::image_key(PREFIX, "cat.png");
        assert!(session.image_bytes(&key).is_ok());
    }

    #[test]
    fn test_invalid_selection_leaves_state() {
        let mut session = session();
        let revision = session.list_revision();
        assert_eq!(
            session.select_item(7),
            Err(EngineError::InvalidSelection { key: 7 })
        );
        assert_eq!(session.project().current_key(), Some(1));
        assert_eq!(session.list_revision(), revision);
    }

    #[test]
    fn test_navigation_switches_annotation_layers() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.add_image("dog.png", b"dog").unwrap();
        assert!(session.hit_index().is_empty());
        assert!(session.layers().annotations.is_empty());

        assert!(!session.next_item().unwrap());
        assert!(session.previous_item().unwrap());
        assert_eq!(session.hit_index().len(), 1);
        assert!(!session.layers().annotations.is_empty());
        assert_eq!(saved(&session).current_item, Some(1));
    }

    #[test]
    fn test_decode_requests_and_image_layer() {
        let mut session = session();
        let cat = serialization::image_key(PREFIX, "cat.png");
        let requests = session.take_pending_decodes();
        assert_eq!(
            requests,
            vec![DecodeRequest {
                key: cat.clone(),
                bytes: b"not really a png".to_vec(),
            }]
        );
        assert!(session.layers().image.is_empty());

        session.add_image("dog.png", b"dog").unwrap();
        // a late result for a background item must not be drawn
        session.image_decoded(&cat, 100, 50);
        assert!(session.layers().image.is_empty());

        session.select_item(1).unwrap();
        assert_eq!(
            session.layers().image.commands(),
            &[DrawCommand::Image {
                key: cat,
                rect: Rect::new(0.0, 125.0, 1000.0, 500.0),
            }]
        );
    }

    #[test]
    fn test_missing_image_bytes_degrade_gracefully() {
        let mut store = MemoryStore::new();
        let mut project = ProjectData::new();
        project.add_item(serialization::image_key(PREFIX, "gone.png"));
        project.add_box(Rect::new(1.0, 1.0, 10.0, 10.0)).unwrap();
        serialization::save_snapshot(&mut store, PREFIX, &project).unwrap();

        let mut session = Session::new(&Settings::default(), Box::new(store));
        assert!(session.take_pending_decodes().is_empty());
        assert!(session.layers().image.is_empty());
        assert!(!session.layers().annotations.is_empty());
        assert_eq!(session.hit_index().len(), 1);

        drag(&mut session, (100.0, 100.0), (150.0, 150.0));
        assert_eq!(session.project().annotations().unwrap().len(), 2);
    }

    #[test]
    fn test_select_item_with_missing_bytes_reports_error() {
        let mut store = MemoryStore::new();
        let mut project = ProjectData::new();
        project.add_item(serialization::image_key(PREFIX, "a.png"));
        project.add_box(Rect::new(10.0, 10.0, 20.0, 20.0)).unwrap();
        project.add_item(serialization::image_key(PREFIX, "b.png"));
        store
            .put(&serialization::image_key(PREFIX, "b.png"), b"b")
            .unwrap();
        serialization::save_snapshot(&mut store, PREFIX, &project).unwrap();

        let mut session = Session::new(&Settings::default(), Box::new(store));
        let revision = session.list_revision();
        assert_eq!(
            session.select_item(1),
            Err(EngineError::MissingResource {
                key: serialization::image_key(PREFIX, "a.png"),
            })
        );
        assert_eq!(session.project().current_key(), Some(1));
        assert!(session.list_revision() > revision);
        assert!(session.layers().image.is_empty());
        assert_eq!(session.hit_index().len(), 1);
        assert_eq!(saved(&session).current_item, Some(1));

        assert_eq!(session.next_item(), Ok(true));
        assert_eq!(
            session.previous_item(),
            Err(EngineError::MissingResource {
                key: serialization::image_key(PREFIX, "a.png"),
            })
        );
    }

    #[test]
    fn test_move_uses_logical_coordinates_when_scaled() {
        let mut session = session();
        session.resize(500.0);
        drag(&mut session, (50.0, 50.0), (100.0, 100.0));
        assert_eq!(rects(&session), vec![Rect::new(100.0, 100.0, 100.0, 100.0)]);

        // inside the box in device pixels, outside it in logical units
        assert_eq!(session.pointer_move(120.0, 120.0), CursorHint::Draw);
        assert_eq!(session.pointer_move(60.0, 60.0), CursorHint::Move);

        session.pointer_down(60.0, 60.0).unwrap();
        assert_eq!(session.mode(), Mode::Moving);
        session.pointer_move(80.0, 70.0);
        session.pointer_up().unwrap();

        assert_eq!(rects(&session), vec![Rect::new(140.0, 120.0, 100.0, 100.0)]);
        assert_eq!(session.hit_index().hit_test(Point::new(235.0, 215.0)), Some(0));
    }

    #[test]
    fn test_rename_refused_during_move() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.pointer_down(10.0, 10.0).unwrap();
        assert_eq!(
            session.rename_box(0, "chair"),
            Err(EngineError::GestureInProgress)
        );
        assert_eq!(labels(&session), vec!["Label 1"]);

        session.pointer_up().unwrap();
        session.rename_box(0, "chair").unwrap();
        assert_eq!(labels(&session), vec!["chair"]);
    }

    #[test]
    fn test_released_images_follow_last_reference() {
        let mut session = session();
        session.add_image("cat.png", b"not really a png").unwrap();
        assert!(session.delete_image(&mut |_: &str| true).unwrap());
        assert!(session.take_released_images().is_empty());

        assert!(session.delete_image(&mut |_: &str| true).unwrap());
        assert_eq!(
            session.take_released_images(),
            vec![serialization::image_key(PREFIX, "cat.png")]
        );
        assert!(session.take_released_images().is_empty());
    }

    #[test]
    fn test_request_all_decodes_queues_each_image_once() {
        let mut store = MemoryStore::new();
        let mut project = ProjectData::new();
        for name in ["a.png", "b.png"] {
            let key = serialization::image_key(PREFIX, name);
            store.put(&key, name.as_bytes()).unwrap();
            project.add_item(key);
        }
        serialization::save_snapshot(&mut store, PREFIX, &project).unwrap();

        let mut session = Session::new(&Settings::default(), Box::new(store));
        let current: Vec<String> = session.take_pending_decodes().into_iter().map(|r| r.key).collect();
        assert_eq!(current, vec![serialization::image_key(PREFIX, "b.png")]);

        session.request_all_decodes();
        let rest: Vec<String> = session.take_pending_decodes().into_iter().map(|r| r.key).collect();
        assert_eq!(rest, vec![serialization::image_key(PREFIX, "a.png")]);

        session.request_all_decodes();
        assert!(session.take_pending_decodes().is_empty());
    }

    #[test]
    fn test_hydrates_from_saved_snapshot() {
        let mut first = session();
        drag(&mut first, (0.0, 0.0), (50.0, 50.0));
        first.rename_box(0, "chair").unwrap();
        let snapshot = saved(&first);

        let mut store = MemoryStore::new();
        serialization::save_snapshot(&mut store, PREFIX, &snapshot).unwrap();
        let second = Session::new(&Settings::default(), Box::new(store));
        assert_eq!(second.project(), &snapshot);
        assert_eq!(second.current_file_name(), Some("cat.png"));
        assert_eq!(second.hit_index().hit_test(Point::new(25.0, 25.0)), Some(0));
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let mut store = MemoryStore::new();
        store
            .put(&serialization::snapshot_key(PREFIX), b"{broken")
            .unwrap();
        let session = Session::new(&Settings::default(), Box::new(store));
        assert_eq!(session.project().item_count(), 0);
    }

    #[test]
    fn test_export_covers_all_images() {
        let mut session = session();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.add_image("dog.png", b"dog").unwrap();
        let export = session.export_data();
        assert_eq!(export.images.len(), 2);
        assert_eq!(export.images[0].file_name, "cat.png");
        assert_eq!(export.images[0].annotations.len(), 1);
        assert_eq!(export.canvas_width, 1000.0);
    }
}
