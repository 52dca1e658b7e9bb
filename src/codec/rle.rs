// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Run-length encoding of binary mask rasters.
//!
//! A pixel is "filled" when its alpha is above the threshold. Runs are read
//! row-major from pixel (0, 0) and always start with an unfilled run, which
//! may be zero-length. Only the thresholded alpha survives a round trip; RGB
//! is rebuilt from the mask color on decode.

use crate::error::{AnnotError, Result};
use crate::models::color::Rgb;
use image::{Rgba, RgbaImage};

/// Alpha values strictly above this count as filled.
pub const ALPHA_THRESHOLD: u8 = 127;

pub fn is_filled(alpha: u8) -> bool {
    alpha > ALPHA_THRESHOLD
}

/// Encode a raster's thresholded alpha channel.
pub fn encode(raster: &RgbaImage) -> Vec<u32> {
    let mut runs = Vec::new();
    let mut current = false;
    let mut count: u32 = 0;

    for pixel in raster.pixels() {
        let filled = is_filled(pixel.0[3]);
        if filled != current {
            runs.push(count);
            count = 0;
            current = filled;
        }
        count += 1;
    }
    runs.push(count);
    runs
}

/// Decode runs into a `width x height` raster painted with `color`.
///
/// Fails when the runs do not cover exactly `width * height` pixels.
pub fn decode(runs: &[u32], width: u32, height: u32, color: Rgb) -> Result<RgbaImage> {
    let expected = width as u64 * height as u64;
    let actual: u64 = runs.iter().map(|&r| r as u64).sum();
    if actual != expected {
        return Err(AnnotError::RleMismatch { expected, actual });
    }

    let mut raster = RgbaImage::new(width, height);
    let filled = Rgba([color.r, color.g, color.b, 255]);
    let buf: &mut [u8] = &mut raster;
    let mut idx = 0usize;
    for (i, &run) in runs.iter().enumerate() {
        let run = run as usize;
        // Odd runs are filled.
        if i % 2 == 1 {
            for px in buf[idx * 4..(idx + run) * 4].chunks_exact_mut(4) {
                px.copy_from_slice(&filled.0);
            }
        }
        idx += run;
    }
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_from_alpha(width: u32, height: u32, alpha: &[u8]) -> RgbaImage {
        let mut raster = RgbaImage::new(width, height);
        for (px, &a) in raster.pixels_mut().zip(alpha) {
            *px = Rgba([17, 34, 51, a]);
        }
        raster
    }

    #[test]
    fn empty_mask_is_single_unfilled_run() {
        let raster = RgbaImage::new(4, 3);
        assert_eq!(encode(&raster), vec![12]);
    }

    #[test]
    fn leading_filled_pixel_gets_zero_run() {
        let raster = raster_from_alpha(3, 1, &[255, 0, 255]);
        assert_eq!(encode(&raster), vec![0, 1, 1, 1]);
    }

    #[test]
    fn decode_reproduces_thresholded_alpha() {
        let alpha = [0, 127, 128, 200, 255, 3, 90, 130, 129, 0, 0, 255];
        let raster = raster_from_alpha(4, 3, &alpha);
        let decoded = decode(&encode(&raster), 4, 3, Rgb::new(9, 8, 7)).unwrap();
        for (orig, back) in raster.pixels().zip(decoded.pixels()) {
            assert_eq!(is_filled(orig.0[3]), is_filled(back.0[3]));
            if is_filled(back.0[3]) {
                assert_eq!(back.0, [9, 8, 7, 255]);
            } else {
                assert_eq!(back.0[3], 0);
            }
        }
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(matches!(
            decode(&[3, 2], 2, 2, Rgb::WHITE),
            Err(AnnotError::RleMismatch { expected: 4, actual: 5 })
        ));
    }
}
