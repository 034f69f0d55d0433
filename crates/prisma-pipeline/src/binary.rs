//! Binarization family: global, adaptive-mean, and Otsu thresholding.
//!
//! Input is converted to luminance; output is a pure black/white image
//! re-expanded to RGB. None of the methods iterate.

use std::fmt;

use image::Luma;
use serde::{Deserialize, Serialize};

use crate::grayscale::{gray_to_rgb, to_gray};
use crate::params::{effective_intensity, odd_kernel_size, saturating_u8, scaled};
use crate::types::{GrayImage, ProcessingDefaults, RgbImage};

/// Default constant subtracted from the local mean.
pub const DEFAULT_C: f64 = 2.0;

/// Smallest adaptive block size.
pub const MIN_BLOCK_SIZE: u32 = 3;

/// Largest adaptive block size.
pub const MAX_BLOCK_SIZE: u32 = 255;

/// Binarization methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BinaryMethod {
    /// Fixed global threshold.
    Simple,
    /// Threshold against the local box mean.
    Adaptive,
    /// Global threshold chosen by Otsu's method.
    Otsu,
    /// Unrecognized method name; the grayscale image passes through.
    Unknown(String),
}

impl From<&str> for BinaryMethod {
    fn from(name: &str) -> Self {
        match name {
            "simple" => Self::Simple,
            "adaptive" => Self::Adaptive,
            "otsu" => Self::Otsu,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for BinaryMethod {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<BinaryMethod> for String {
    fn from(method: BinaryMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for BinaryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Adaptive => f.write_str("adaptive"),
            Self::Otsu => f.write_str("otsu"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// Explicit overrides for a binarization step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BinaryParams {
    /// Effect strength; falls back to the global default.
    pub intensity: Option<f64>,
    /// Global threshold for `simple`.
    pub threshold: Option<i64>,
    /// Neighbourhood side for `adaptive`.
    pub block_size: Option<u32>,
    /// Constant subtracted from the local mean for `adaptive`.
    pub c: Option<f64>,
}

/// Global threshold: the override, else `round(127 * intensity)`,
/// clamped to `[0, 255]`.
#[must_use]
pub fn simple_threshold(override_threshold: Option<i64>, intensity: f64) -> u8 {
    saturating_u8(override_threshold.unwrap_or_else(|| scaled(127.0, intensity)))
}

/// Adaptive neighbourhood: the override, else
/// `max(3, round(11 * intensity))`, forced odd, at most
/// [`MAX_BLOCK_SIZE`].
#[must_use]
pub fn block_size(override_block: Option<u32>, intensity: f64) -> u32 {
    odd_kernel_size(override_block, 11.0, intensity, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE)
}

/// Binarize an image and return it as 3-channel black/white.
///
/// Unknown methods return the grayscale conversion only.
#[must_use = "returns the binarized image"]
pub fn threshold(
    image: &RgbImage,
    method: &BinaryMethod,
    params: &BinaryParams,
    defaults: ProcessingDefaults,
) -> RgbImage {
    let intensity = effective_intensity(params.intensity, defaults);
    let gray = to_gray(image);
    let mask = match method {
        BinaryMethod::Simple => {
            let t = simple_threshold(params.threshold, intensity);
            map_gray(&gray, |v| v >= t)
        }
        BinaryMethod::Adaptive => adaptive_mean(
            &gray,
            block_size(params.block_size, intensity),
            params.c.unwrap_or(DEFAULT_C),
        ),
        BinaryMethod::Otsu => {
            let level = imageproc::contrast::otsu_level(&gray);
            map_gray(&gray, |v| v > level)
        }
        BinaryMethod::Unknown(_) => gray,
    };
    gray_to_rgb(&mask)
}

/// Adaptive mean threshold: white iff `pixel > mean - ceil(c)`, where
/// `mean` is the rounded box mean over `block x block` with replicated
/// borders.
#[must_use = "returns the binary mask"]
pub fn adaptive_mean(gray: &GrayImage, block: u32, c: f64) -> GrayImage {
    let mean = box_mean(gray, block / 2);
    let offset = if c.is_finite() { c.ceil() } else { DEFAULT_C };
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = f64::from(gray.get_pixel(x, y).0[0]);
        let m = f64::from(mean.get_pixel(x, y).0[0]);
        Luma([if v > m - offset { 255 } else { 0 }])
    })
}

fn map_gray(gray: &GrayImage, white: impl Fn(u8) -> bool) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = if white(p.0[0]) { 255 } else { 0 };
    }
    out
}

/// Rounded mean over a `(2r+1)` square window, replicating edge pixels.
#[allow(clippy::cast_possible_truncation)]
fn box_mean(gray: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let (wu, hu) = (w as usize, h as usize);
    let src: Vec<u64> = gray.pixels().map(|p| u64::from(p.0[0])).collect();
    let r = radius as usize;

    let horizontal = sliding_sums(&src, wu, hu, r, true);
    let both = sliding_sums(&horizontal, wu, hu, r, false);

    let side = 2 * u64::from(radius) + 1;
    let area = side * side;
    let mut out = GrayImage::new(w, h);
    for (dst, sum) in out.pixels_mut().zip(both) {
        let rounded = (2 * sum + area) / (2 * area);
        dst.0[0] = u8::try_from(rounded).unwrap_or(u8::MAX);
    }
    out
}

/// Running window sums along rows or columns with clamped indices.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn sliding_sums(src: &[u64], w: usize, h: usize, r: usize, horizontal: bool) -> Vec<u64> {
    let (lines, len) = if horizontal { (h, w) } else { (w, h) };
    let at = |line: usize, i: usize| {
        if horizontal {
            src[line * w + i]
        } else {
            src[i * w + line]
        }
    };
    let clamp = |i: isize| i.clamp(0, len as isize - 1) as usize;
    let ri = r as isize;

    let mut out = vec![0; src.len()];
    for line in 0..lines {
        let mut sum: u64 = (-ri..=ri).map(|i| at(line, clamp(i))).sum();
        for i in 0..len {
            let idx = if horizontal {
                line * w + i
            } else {
                i * w + line
            };
            out[idx] = sum;
            let ii = i as isize;
            sum = sum + at(line, clamp(ii + ri + 1)) - at(line, clamp(ii - ri));
        }
    }
    out
}
