//! Morphology family: erosion, dilation, opening, and closing.
//!
//! The input is always pre-binarized at the luminance midpoint. The
//! structuring element is a square of ones; because it is separable,
//! each elementary operation runs as a row pass followed by a column
//! pass of a min (erosion) or max (dilation) filter. Pixels outside the
//! image do not take part in either operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grayscale::{gray_to_rgb, to_gray};
use crate::params::{effective_intensity, effective_iterations, saturating_u32, scaled};
use crate::types::{GrayImage, ProcessingDefaults, RgbImage};

/// Fixed pre-binarization threshold: white iff `gray > MIDPOINT`.
pub const MIDPOINT: u8 = 127;

/// Smallest derived structuring element side.
pub const MIN_KERNEL_SIZE: u32 = 3;

/// Morphological operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MorphologyMethod {
    /// Shrink foreground.
    Erosion,
    /// Grow foreground.
    Dilation,
    /// Erosion then dilation.
    Opening,
    /// Dilation then erosion.
    Closing,
    /// Unrecognized method name; the binary mask passes through.
    Unknown(String),
}

impl From<&str> for MorphologyMethod {
    fn from(name: &str) -> Self {
        match name {
            "erosion" => Self::Erosion,
            "dilation" => Self::Dilation,
            "opening" => Self::Opening,
            "closing" => Self::Closing,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for MorphologyMethod {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<MorphologyMethod> for String {
    fn from(method: MorphologyMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for MorphologyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erosion => f.write_str("erosion"),
            Self::Dilation => f.write_str("dilation"),
            Self::Opening => f.write_str("opening"),
            Self::Closing => f.write_str("closing"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// Explicit overrides for a morphology step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MorphologyParams {
    /// Effect strength; falls back to the global default.
    pub intensity: Option<f64>,
    /// Repeat count; falls back to the global default.
    pub iterations: Option<u32>,
    /// Structuring element side.
    pub kernel_size: Option<u32>,
}

/// Structuring element side: the override (at least 1), else
/// `max(3, round(5 * intensity))`.
#[must_use]
pub fn kernel_size(override_size: Option<u32>, intensity: f64) -> u32 {
    override_size.map_or_else(
        || saturating_u32(scaled(5.0, intensity)).max(MIN_KERNEL_SIZE),
        |n| n.max(1),
    )
}

/// Pre-binarize and apply a morphological operation `iterations` times.
///
/// Each iteration works on the previous iteration's mask; the mask is
/// not re-thresholded in between. Unknown methods return the
/// pre-binarized mask.
#[must_use = "returns the morphed image"]
pub fn apply_morphology(
    image: &RgbImage,
    method: &MorphologyMethod,
    params: &MorphologyParams,
    defaults: ProcessingDefaults,
) -> RgbImage {
    let intensity = effective_intensity(params.intensity, defaults);
    let iterations = effective_iterations(params.iterations, defaults);
    let size = kernel_size(params.kernel_size, intensity);

    let mut mask = binarize(&to_gray(image));
    for _ in 0..iterations {
        mask = match method {
            MorphologyMethod::Erosion => erode(&mask, size),
            MorphologyMethod::Dilation => dilate(&mask, size),
            MorphologyMethod::Opening => dilate(&erode(&mask, size), size),
            MorphologyMethod::Closing => erode(&dilate(&mask, size), size),
            MorphologyMethod::Unknown(_) => break,
        };
    }
    gray_to_rgb(&mask)
}

/// Hard threshold at [`MIDPOINT`].
#[must_use = "returns the binary mask"]
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > MIDPOINT { 255 } else { 0 };
    }
    out
}

/// Minimum over an `size x size` window anchored at `size / 2`.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, size: u32) -> GrayImage {
    let rows = window_pass(image, size, true, u8::min);
    window_pass(&rows, size, false, u8::min)
}

/// Maximum over an `size x size` window anchored at `size / 2`.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, size: u32) -> GrayImage {
    let rows = window_pass(image, size, true, u8::max);
    window_pass(&rows, size, false, u8::max)
}

/// Fold `combine` over a 1-D window along rows or columns, skipping
/// positions outside the image.
fn window_pass(
    image: &GrayImage,
    size: u32,
    horizontal: bool,
    combine: fn(u8, u8) -> u8,
) -> GrayImage {
    let size = size.max(1);
    let before = size / 2;
    let after = size - 1 - before;
    let (w, h) = image.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let (pos, len) = if horizontal { (x, w) } else { (y, h) };
        let lo = pos.saturating_sub(before);
        let hi = pos.saturating_add(after).min(len - 1);
        let mut acc = image.get_pixel(x, y).0[0];
        for i in lo..=hi {
            let v = if horizontal {
                image.get_pixel(i, y).0[0]
            } else {
                image.get_pixel(x, i).0[0]
            };
            acc = combine(acc, v);
        }
        image::Luma([acc])
    })
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgb};

    use super::*;

    fn count_white(img: &RgbImage) -> usize {
        img.pixels().filter(|p| p.0[0] == 255).count()
    }

    fn with_params(kernel: u32, iterations: u32) -> MorphologyParams {
        MorphologyParams {
            kernel_size: Some(kernel),
            iterations: Some(iterations),
            ..MorphologyParams::default()
        }
    }

    #[test]
    fn method_names_round_trip() {
        for name in ["erosion", "dilation", "opening", "closing", "tophat"] {
            assert_eq!(MorphologyMethod::from(name).to_string(), name);
        }
    }

    #[test]
    fn kernel_size_derivation() {
        assert_eq!(kernel_size(None, 1.0), 5);
        assert_eq!(kernel_size(None, 0.1), 3);
        assert_eq!(kernel_size(None, 2.0), 10);
        assert_eq!(kernel_size(Some(0), 2.0), 1);
        assert_eq!(kernel_size(Some(4), 2.0), 4);
    }

    #[test]
    fn binarize_uses_fixed_midpoint() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[127, 128, 0][x as usize]]));
        let out = binarize(&gray);
        assert_eq!(out.as_raw(), &vec![0, 255, 0]);
    }

    #[test]
    fn opening_removes_isolated_speck() {
        let mut img = RgbImage::new(9, 9);
        img.put_pixel(4, 4, Rgb([255, 255, 255]));
        let out = apply_morphology(
            &img,
            &MorphologyMethod::Opening,
            &with_params(3, 1),
            ProcessingDefaults::default(),
        );
        assert_eq!(count_white(&out), 0);
    }

    #[test]
    fn opening_keeps_large_blocks() {
        let img = RgbImage::from_fn(12, 12, |x, y| {
            if (3..9).contains(&x) && (3..9).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let out = apply_morphology(
            &img,
            &MorphologyMethod::Opening,
            &with_params(3, 1),
            ProcessingDefaults::default(),
        );
        assert_eq!(out, img);
    }

    #[test]
    fn closing_fills_single_hole() {
        let mut img = RgbImage::from_pixel(9, 9, Rgb([255, 255, 255]));
        img.put_pixel(4, 4, Rgb([0, 0, 0]));
        let out = apply_morphology(
            &img,
            &MorphologyMethod::Closing,
            &with_params(3, 1),
            ProcessingDefaults::default(),
        );
        assert_eq!(count_white(&out), 81);
    }

    #[test]
    fn dilation_grows_by_kernel_per_iteration() {
        let mut img = RgbImage::new(11, 11);
        img.put_pixel(5, 5, Rgb([255, 255, 255]));
        let d = ProcessingDefaults::default();
        let once = apply_morphology(&img, &MorphologyMethod::Dilation, &with_params(3, 1), d);
        let twice = apply_morphology(&img, &MorphologyMethod::Dilation, &with_params(3, 2), d);
        assert_eq!(count_white(&once), 9);
        assert_eq!(count_white(&twice), 25);
    }

    #[test]
    fn erosion_ignores_outside_pixels() {
        let img = RgbImage::from_pixel(5, 5, Rgb([255, 255, 255]));
        let out = apply_morphology(
            &img,
            &MorphologyMethod::Erosion,
            &with_params(3, 1),
            ProcessingDefaults::default(),
        );
        assert_eq!(count_white(&out), 25);
    }

    #[test]
    fn even_kernel_anchors_at_half() {
        // Side 2, anchor 1: the window covers (x-1, x].
        let mut gray = GrayImage::new(4, 1);
        gray.put_pixel(1, 0, Luma([255]));
        let out = dilate(&gray, 2);
        assert_eq!(out.as_raw(), &vec![0, 255, 255, 0]);
    }

    #[test]
    fn output_is_binary_rgb() {
        let img = RgbImage::from_fn(8, 8, |x, y| {
            let v = u8::try_from((x * 32 + y * 3) % 256).unwrap_or(0);
            Rgb([v, v, v])
        });
        let out = apply_morphology(
            &img,
            &MorphologyMethod::Closing,
            &MorphologyParams::default(),
            ProcessingDefaults::default(),
        );
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0] || p.0 == [255, 255, 255]));
    }

    #[test]
    fn unknown_method_returns_mask() {
        let img = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([200, 200, 200])
            } else {
                Rgb([40, 40, 40])
            }
        });
        let out = apply_morphology(
            &img,
            &MorphologyMethod::Unknown("tophat".into()),
            &MorphologyParams::default(),
            ProcessingDefaults::new(1.0, 4),
        );
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
