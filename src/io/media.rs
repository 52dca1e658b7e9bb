// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading.
//!
//! Decodes images into RGBA pixels ready for display. A decoded image with
//! zero width or height is rejected like any other load failure.

use crate::error::AnnotError;
use anyhow::{Context, Result};
use std::path::Path;

/// A decoded RGBA image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Load and decode an image file.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    into_loaded(img)
}

/// Decode an image from an in-memory buffer (e.g. a fetched response body).
pub fn decode_image(bytes: &[u8]) -> Result<LoadedImage> {
    let img = image::load_from_memory(bytes).context("decoding image bytes")?;
    into_loaded(img)
}

fn into_loaded(img: image::DynamicImage) -> Result<LoadedImage> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        let reason = format!("image has zero dimension ({}x{})", width, height);
        return Err(AnnotError::ImageLoad(reason).into());
    }
    Ok(LoadedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}
