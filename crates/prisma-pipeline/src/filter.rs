//! Filter family: Gaussian blur, sharpen, emboss, and smooth.
//!
//! Every method is repeated `iterations` times, each pass feeding the
//! next. Blur wraps [`imageproc::filter::gaussian_blur_f32`] applied
//! per channel; the fixed kernels go through
//! [`imageproc::filter::filter_clamped`] with integer weights and a
//! divisor/offset applied afterwards.

use std::fmt;

use image::{GrayImage, Luma, Rgb};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;
use serde::{Deserialize, Serialize};

use crate::grayscale::{blend, quantize};
use crate::params::{effective_intensity, effective_iterations};
use crate::types::{ProcessingDefaults, RgbImage};

/// Filter methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterMethod {
    /// Gaussian blur.
    Blur,
    /// Fixed 3x3 sharpening kernel.
    Sharpen,
    /// Fixed 3x3 emboss kernel with a mid-gray offset.
    Emboss,
    /// Mild (3x3) or strong (5x5) smoothing kernel.
    Smooth,
    /// Unrecognized method name; the image passes through unchanged.
    Unknown(String),
}

impl From<&str> for FilterMethod {
    fn from(name: &str) -> Self {
        match name {
            "blur" => Self::Blur,
            "sharpen" => Self::Sharpen,
            "emboss" => Self::Emboss,
            "smooth" => Self::Smooth,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for FilterMethod {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<FilterMethod> for String {
    fn from(method: FilterMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blur => f.write_str("blur"),
            Self::Sharpen => f.write_str("sharpen"),
            Self::Emboss => f.write_str("emboss"),
            Self::Smooth => f.write_str("smooth"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// Explicit overrides for a filter step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterParams {
    /// Effect strength; falls back to the global default.
    pub intensity: Option<f64>,
    /// Repeat count; falls back to the global default.
    pub iterations: Option<u32>,
    /// Gaussian blur radius (standard deviation in pixels).
    pub radius: Option<f32>,
}

/// Largest Gaussian blur radius; larger requests are clamped to it.
pub const MAX_BLUR_RADIUS: f32 = 100.0;

/// Intensity above which `smooth` switches to the 5x5 kernel.
pub const STRONG_SMOOTH_THRESHOLD: f64 = 1.5;

/// Sharpen: center 32, ring -2, divided by 16.
const SHARPEN: [i32; 9] = [-2, -2, -2, -2, 32, -2, -2, -2, -2];

/// Emboss: center minus upper-left neighbour, offset by 128.
const EMBOSS: [i32; 9] = [-1, 0, 0, 0, 1, 0, 0, 0, 0];

/// Mild smoothing, divided by 13.
const SMOOTH: [i32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];

/// Strong smoothing, divided by 100.
#[rustfmt::skip]
const SMOOTH_MORE: [i32; 25] = [
    1, 1,  1, 1, 1,
    1, 5,  5, 5, 1,
    1, 5, 44, 5, 1,
    1, 5,  5, 5, 1,
    1, 1,  1, 1, 1,
];

/// Blur radius: the override if present, else `max(1, round(2 * intensity))`,
/// capped at [`MAX_BLUR_RADIUS`].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn blur_radius(override_radius: Option<f32>, intensity: f64) -> f32 {
    let radius = override_radius.unwrap_or_else(|| (intensity * 2.0).round().max(1.0) as f32);
    if radius > MAX_BLUR_RADIUS {
        MAX_BLUR_RADIUS
    } else {
        radius
    }
}

/// Apply a filter `iterations` times.
///
/// Unknown methods return an unchanged copy.
#[must_use = "returns the filtered image"]
pub fn apply_filter(
    image: &RgbImage,
    method: &FilterMethod,
    params: &FilterParams,
    defaults: ProcessingDefaults,
) -> RgbImage {
    let intensity = effective_intensity(params.intensity, defaults);
    let iterations = effective_iterations(params.iterations, defaults);

    let mut current = image.clone();
    for _ in 0..iterations {
        current = match method {
            FilterMethod::Blur => {
                gaussian_blur_rgb(&current, blur_radius(params.radius, intensity))
            }
            FilterMethod::Sharpen => attenuate(&current, &sharpen(&current), intensity),
            FilterMethod::Emboss => attenuate(&current, &emboss(&current), intensity),
            FilterMethod::Smooth => smooth(&current, intensity),
            FilterMethod::Unknown(_) => return current,
        };
    }
    current
}

/// Blend a kernel result back toward its input when intensity is not
/// exactly 1, weighting the filtered image by `min(intensity, 1)`.
fn attenuate(input: &RgbImage, filtered: &RgbImage, intensity: f64) -> RgbImage {
    #[allow(clippy::float_cmp)]
    let full_effect = intensity == 1.0;
    if full_effect {
        filtered.clone()
    } else {
        blend(input, filtered, intensity.min(1.0))
    }
}

/// Apply Gaussian blur to an RGB image by blurring each channel
/// independently.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`. Sigma is
/// capped at [`MAX_BLUR_RADIUS`].
#[must_use = "returns the blurred RGB image"]
pub fn gaussian_blur_rgb(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image.clone();
    }
    let sigma = sigma.min(MAX_BLUR_RADIUS);

    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 3] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbImage::from_fn(w, h, |x, y| {
        Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Fixed sharpening kernel.
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &RgbImage) -> RgbImage {
    convolve(image, &SHARPEN, 3, 16, 0)
}

/// Fixed emboss kernel, offset to mid-gray.
#[must_use = "returns the embossed image"]
pub fn emboss(image: &RgbImage) -> RgbImage {
    convolve(image, &EMBOSS, 3, 1, 128)
}

/// Two-level smoothing: 5x5 when `intensity > 1.5`, else 3x3.
#[must_use = "returns the smoothed image"]
pub fn smooth(image: &RgbImage, intensity: f64) -> RgbImage {
    if intensity > STRONG_SMOOTH_THRESHOLD {
        convolve(image, &SMOOTH_MORE, 5, 100, 0)
    } else {
        convolve(image, &SMOOTH, 3, 13, 0)
    }
}

/// Square integer-kernel convolution with clamp-to-edge borders.
///
/// Each channel sum is divided by `divisor` (rounded), shifted by
/// `offset`, and saturated to `u8`. Kernel sums must fit in `i16`,
/// which holds for every kernel in this module.
fn convolve(image: &RgbImage, weights: &[i32], size: u32, divisor: i32, offset: i32) -> RgbImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let raw: Image<Rgb<i16>> = filter_clamped(image, Kernel::new(weights, size, size));
    let divisor = f64::from(divisor.max(1));
    let offset = f64::from(offset);
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let sums = raw.get_pixel(x, y).0;
        Rgb(sums.map(|s| quantize(f64::from(s) / divisor + offset)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> RgbImage {
        RgbImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    fn uniform(v: u8) -> RgbImage {
        RgbImage::from_pixel(8, 8, Rgb([v, v, v]))
    }

    #[test]
    fn method_names_round_trip() {
        for name in ["blur", "sharpen", "emboss", "smooth", "posterize"] {
            assert_eq!(FilterMethod::from(name).to_string(), name);
        }
        assert_eq!(
            FilterMethod::from("posterize"),
            FilterMethod::Unknown("posterize".into())
        );
    }

    #[test]
    fn blur_radius_derivation() {
        assert!((blur_radius(None, 1.0) - 2.0).abs() < f32::EPSILON);
        assert!((blur_radius(None, 0.1) - 1.0).abs() < f32::EPSILON);
        assert!((blur_radius(None, 3.0) - 6.0).abs() < f32::EPSILON);
        assert!((blur_radius(Some(0.5), 3.0) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn huge_blur_radius_is_capped() {
        assert!((blur_radius(Some(1e8), 1.0) - MAX_BLUR_RADIUS).abs() < f32::EPSILON);
        assert!((blur_radius(Some(f32::INFINITY), 1.0) - MAX_BLUR_RADIUS).abs() < f32::EPSILON);
        assert!(blur_radius(Some(f32::NAN), 1.0).is_nan());

        let img = RgbImage::from_fn(4, 4, |x, y| {
            let v = u8::try_from(x * 60 + y * 5).unwrap_or(u8::MAX);
            Rgb([v, v, 255 - v])
        });
        let with_radius = |radius| {
            apply_filter(
                &img,
                &FilterMethod::Blur,
                &FilterParams {
                    radius: Some(radius),
                    ..FilterParams::default()
                },
                ProcessingDefaults::default(),
            )
        };
        assert_eq!(with_radius(1e8), with_radius(MAX_BLUR_RADIUS));
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_rgb(&img, 0.0), img);
        assert_eq!(gaussian_blur_rgb(&img, -1.0), img);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let img = sharp_edge_image();
        let blurred = apply_filter(
            &img,
            &FilterMethod::Blur,
            &FilterParams::default(),
            ProcessingDefaults::default(),
        );
        let left = blurred.get_pixel(4, 5).0[0];
        let right = blurred.get_pixel(5, 5).0[0];
        assert!(left > 0, "expected blur to raise left-of-edge, got {left}");
        assert!(right < 255, "expected blur to lower right-of-edge, got {right}");
    }

    #[test]
    fn kernels_preserve_uniform_images() {
        let img = uniform(100);
        assert_eq!(sharpen(&img), img);
        assert_eq!(smooth(&img, 1.0), img);
        assert_eq!(smooth(&img, 2.0), img);
    }

    #[test]
    fn emboss_of_uniform_is_mid_gray() {
        let out = emboss(&uniform(200));
        for p in out.pixels() {
            assert_eq!(p.0, [128, 128, 128]);
        }
    }

    #[test]
    fn sharpen_increases_contrast_at_edge() {
        let img = sharp_edge_image();
        let out = sharpen(&img);
        // Dark side next to the edge is pushed to black, bright side to white.
        assert_eq!(out.get_pixel(4, 5).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
        // Away from the edge nothing changes.
        assert_eq!(out.get_pixel(0, 5).0[0], 0);
        assert_eq!(out.get_pixel(9, 5).0[0], 255);
    }

    #[test]
    fn sharpen_attenuated_by_low_intensity() {
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([100, 100, 100])
            } else {
                Rgb([150, 150, 150])
            }
        });
        let full = apply_filter(
            &img,
            &FilterMethod::Sharpen,
            &FilterParams::default(),
            ProcessingDefaults::default(),
        );
        let half = apply_filter(
            &img,
            &FilterMethod::Sharpen,
            &FilterParams {
                intensity: Some(0.5),
                ..FilterParams::default()
            },
            ProcessingDefaults::default(),
        );
        let orig = i32::from(img.get_pixel(5, 5).0[0]);
        let full_v = i32::from(full.get_pixel(5, 5).0[0]);
        let half_v = i32::from(half.get_pixel(5, 5).0[0]);
        assert!(full_v > half_v && half_v > orig, "{orig} {half_v} {full_v}");
    }

    #[test]
    fn intensity_above_one_is_full_effect() {
        let img = sharp_edge_image();
        let params = |i| FilterParams {
            intensity: Some(i),
            ..FilterParams::default()
        };
        let d = ProcessingDefaults::default();
        assert_eq!(
            apply_filter(&img, &FilterMethod::Emboss, &params(1.0), d),
            apply_filter(&img, &FilterMethod::Emboss, &params(2.5), d),
        );
    }

    #[test]
    fn smooth_has_two_levels_only() {
        let img = sharp_edge_image();
        let d = ProcessingDefaults::default();
        let at = |i| {
            apply_filter(
                &img,
                &FilterMethod::Smooth,
                &FilterParams {
                    intensity: Some(i),
                    ..FilterParams::default()
                },
                d,
            )
        };
        assert_eq!(at(0.2), at(1.5));
        assert_eq!(at(1.6), at(3.0));
        assert_ne!(at(1.5), at(1.6));
    }

    #[test]
    fn iterations_compound() {
        let img = sharp_edge_image();
        let once = apply_filter(
            &img,
            &FilterMethod::Smooth,
            &FilterParams::default(),
            ProcessingDefaults::default(),
        );
        let twice = apply_filter(
            &img,
            &FilterMethod::Smooth,
            &FilterParams {
                iterations: Some(2),
                ..FilterParams::default()
            },
            ProcessingDefaults::default(),
        );
        assert_eq!(smooth(&once, 1.0), twice);
    }

    #[test]
    fn unknown_method_passes_through() {
        let img = sharp_edge_image();
        let out = apply_filter(
            &img,
            &FilterMethod::Unknown("posterize".into()),
            &FilterParams::default(),
            ProcessingDefaults::new(2.0, 5),
        );
        assert_eq!(out, img);
    }
}
