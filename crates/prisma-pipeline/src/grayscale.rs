//! Grayscale conversion, channel re-expansion, and linear blending.
//!
//! Every family that works on a single intensity channel (edge,
//! binary, morphology) starts with [`to_gray`] and ends with
//! [`gray_to_rgb`], so downstream steps always see a 3-channel image.

use image::{Luma, Rgb};

use crate::types::{GrayImage, RgbImage};

/// ITU-R 601-2 luma in 16-bit fixed point.
///
/// `(19595 R + 38470 G + 7471 B + 0x8000) >> 16`, i.e.
/// `0.299 R + 0.587 G + 0.114 B` with round-half-up.
#[must_use]
pub fn luminance(rgb: Rgb<u8>) -> u8 {
    let [r, g, b] = rgb.0.map(u32::from);
    let weighted = 19595 * r + 38470 * g + 7471 * b + 0x8000;
    #[allow(clippy::cast_possible_truncation)]
    let luma = (weighted >> 16) as u8;
    luma
}

/// Convert an RGB image to a single luminance channel.
#[must_use = "returns the grayscale image"]
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luminance(*image.get_pixel(x, y))])
    })
}

/// Re-expand a single channel to RGB with `R = G = B`.
#[must_use = "returns the expanded RGB image"]
pub fn gray_to_rgb(image: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// Luminance grayscale re-expanded to RGB.
#[must_use = "returns the grayscale RGB image"]
pub fn grayscale_rgb(image: &RgbImage) -> RgbImage {
    gray_to_rgb(&to_gray(image))
}

/// Linear blend `base * (1 - weight) + overlay * weight`.
///
/// `weight` is clamped to `[0, 1]`; 0 returns `base`, 1 returns
/// `overlay`. Both images must share dimensions; if they do not,
/// `overlay` is returned unchanged.
#[must_use = "returns the blended image"]
pub fn blend(base: &RgbImage, overlay: &RgbImage, weight: f64) -> RgbImage {
    if base.dimensions() != overlay.dimensions() {
        return overlay.clone();
    }
    let w = weight.clamp(0.0, 1.0);
    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(overlay.pixels()) {
        for c in 0..3 {
            let a = f64::from(dst.0[c]);
            let b = f64::from(src.0[c]);
            dst.0[c] = quantize(a.mul_add(1.0 - w, b * w));
        }
    }
    out
}

/// Round and saturate a floating-point sample into `u8`.
#[must_use]
pub(crate) fn quantize(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let v = value.round().clamp(0.0, 255.0) as u8;
    v
}
