// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! BOXTAG - Box Annotation Tool
//!
//! A cross-platform desktop application for drawing and labelling
//! bounding boxes on a gallery of uploaded images.

mod app;
mod config;
mod engine;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::BoxtagApp;
use config::Settings;
use engine::session::Session;
use io::storage::FileStore;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let settings = Settings::load();
    let store = FileStore::open(settings.storage_dir()?)?;
    log::info!("Storing session data in {}", store.root().display());

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("BOXTAG - Box Annotation Tool"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "BOXTAG",
        options,
        Box::new(move |_cc| {
            let session = Session::new(&settings, Box::new(store));
            Ok(Box::new(BoxtagApp::new(session)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
