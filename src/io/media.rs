// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image decoding.
//!
//! Uploaded files are stored as raw bytes and decoded to RGBA pixels on a
//! background thread before they can be shown on the canvas.

use anyhow::{Context, Result};
use std::sync::mpsc::Sender;

/// A decoded image ready to be turned into a texture.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Storage key the bytes were read from.
    pub key: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major.
    pub pixels: Vec<u8>,
}

/// Decode encoded image bytes (PNG, JPEG, ...) to RGBA8.
pub fn decode_image(key: &str, bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes)
        .with_context(|| format!("cannot decode image {}", key))?
        .to_rgba8();
    Ok(DecodedImage {
        key: key.to_string(),
        width: img.width(),
        height: img.height(),
        pixels: img.into_raw(),
    })
}

/// Outcome of a background decode, tagged with the storage key.
pub type DecodeOutcome = (String, Result<DecodedImage, String>);

/// Decode on a background thread and send the result back.
pub fn spawn_decode(key: String, bytes: Vec<u8>, sender: Sender<DecodeOutcome>) {
    std::thread::spawn(move || {
        let result = decode_image(&key, &bytes).map_err(|e| format!("{:#}", e));
        let _ = sender.send((key, result));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode_image("k", &png_bytes(4, 3)).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));
        assert_eq!(decoded.pixels.len(), 4 * 3 * 4);
        assert_eq!(&decoded.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_image("k", b"definitely not an image").is_err());
    }

    #[test]
    fn test_spawn_decode_reports_back() {
        let (sender, receiver) = std::sync::mpsc::channel();
        spawn_decode("k".to_string(), png_bytes(2, 2), sender);
        let (key, result) = receiver.recv().unwrap();
        assert_eq!(key, "k");
        assert_eq!(result.unwrap().width, 2);
    }
}
