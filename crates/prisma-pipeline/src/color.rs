//! Color family: grayscale, HSV and L*a*b* round trips, inversion.
//!
//! Each method runs `iterations` times, every pass consuming the
//! previous pass's output. Grayscale and invert honour intensity as a
//! blend weight below 1.0; the round trips ignore it.

use std::fmt;

use image::Rgb;
use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};
use serde::{Deserialize, Serialize};

use crate::grayscale::{blend, grayscale_rgb, quantize};
use crate::params::{effective_intensity, effective_iterations};
use crate::types::{ProcessingDefaults, RgbImage};

/// Color conversion methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorMethod {
    /// Luminance grayscale, re-expanded to RGB.
    Grayscale,
    /// RGB -> 8-bit HSV -> RGB.
    Hsv,
    /// RGB -> 8-bit CIE L*a*b* (D65) -> RGB.
    Lab,
    /// Per-channel `255 - v`.
    Invert,
    /// Unrecognized method name; the image passes through unchanged.
    Unknown(String),
}

impl From<&str> for ColorMethod {
    fn from(name: &str) -> Self {
        match name {
            "grayscale" => Self::Grayscale,
            "hsv" => Self::Hsv,
            "lab" => Self::Lab,
            "invert" => Self::Invert,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for ColorMethod {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<ColorMethod> for String {
    fn from(method: ColorMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for ColorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale => f.write_str("grayscale"),
            Self::Hsv => f.write_str("hsv"),
            Self::Lab => f.write_str("lab"),
            Self::Invert => f.write_str("invert"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// Explicit overrides for a color step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorParams {
    /// Blend weight for grayscale/invert; falls back to the global default.
    pub intensity: Option<f64>,
    /// Repeat count; falls back to the global default.
    pub iterations: Option<u32>,
}

/// Apply a color conversion `iterations` times.
#[must_use = "returns the converted image"]
pub fn convert_color(
    image: &RgbImage,
    method: &ColorMethod,
    params: &ColorParams,
    defaults: ProcessingDefaults,
) -> RgbImage {
    let intensity = effective_intensity(params.intensity, defaults);
    let iterations = effective_iterations(params.iterations, defaults);

    let mut current = image.clone();
    for _ in 0..iterations {
        current = match method {
            ColorMethod::Grayscale => partial(&current, &grayscale_rgb(&current), intensity),
            ColorMethod::Hsv => map_pixels(&current, hsv_round_trip),
            ColorMethod::Lab => map_pixels(&current, lab_round_trip),
            ColorMethod::Invert => partial(&current, &invert(&current), intensity),
            ColorMethod::Unknown(_) => return current,
        };
    }
    current
}

/// Blend toward `converted` by `intensity` below 1.0; full replacement
/// at or above it.
fn partial(input: &RgbImage, converted: &RgbImage, intensity: f64) -> RgbImage {
    if intensity < 1.0 {
        blend(input, converted, intensity)
    } else {
        converted.clone()
    }
}

/// Per-channel `255 - v`.
#[must_use = "returns the inverted image"]
pub fn invert(image: &RgbImage) -> RgbImage {
    map_pixels(image, |p| Rgb(p.0.map(|v| 255 - v)))
}

fn map_pixels(image: &RgbImage, f: impl Fn(Rgb<u8>) -> Rgb<u8>) -> RgbImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        *p = f(*p);
    }
    out
}

/// RGB -> 8-bit HSV -> RGB.
///
/// Hue is stored halved in `[0, 180)` and saturation/value in
/// `[0, 255]`; the re-quantization is what makes this lossy.
#[must_use]
pub fn hsv_round_trip(rgb: Rgb<u8>) -> Rgb<u8> {
    let (h, s, v) = rgb_to_hsv8(rgb);
    hsv8_to_rgb(h, s, v)
}

/// Quantized HSV: `(hue / 2, saturation * 255, value)`.
#[must_use]
pub fn rgb_to_hsv8(rgb: Rgb<u8>) -> (u8, u8, u8) {
    let [r, g, b] = rgb.0.map(f64::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max <= 0.0 { 0.0 } else { 255.0 * delta / max };
    let h = if delta <= 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (g - b) / delta
    } else if (max - g).abs() < f64::EPSILON {
        60.0f64.mul_add((b - r) / delta, 120.0)
    } else {
        60.0f64.mul_add((r - g) / delta, 240.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let h8 = quantize(h / 2.0);
    (if h8 >= 180 { 0 } else { h8 }, quantize(s), quantize(max))
}

/// Inverse of [`rgb_to_hsv8`].
#[must_use]
pub fn hsv8_to_rgb(h: u8, s: u8, v: u8) -> Rgb<u8> {
    let hue = f64::from(h) * 2.0;
    let sat = f64::from(s) / 255.0;
    let val = f64::from(v) / 255.0;

    let c = val * sat;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = val - c;
    let (r, g, b) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb([
        quantize((r + m) * 255.0),
        quantize((g + m) * 255.0),
        quantize((b + m) * 255.0),
    ])
}

/// RGB -> 8-bit L*a*b* -> RGB through `palette`'s D65 conversion.
///
/// The 8-bit encoding is `L * 255 / 100`, `a + 128`, `b + 128`.
#[must_use]
pub fn lab_round_trip(rgb: Rgb<u8>) -> Rgb<u8> {
    let [l8, a8, b8] = rgb_to_lab8(rgb);
    lab8_to_rgb([l8, a8, b8])
}

/// Quantized L*a*b* triple.
#[must_use]
pub fn rgb_to_lab8(rgb: Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = rgb.0.map(|v| f32::from(v) / 255.0);
    let srgb: Srgb<f32> = Srgb::new(r, g, b);
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: Lab = Lab::from_color(lin);
    [
        quantize(f64::from(lab.l) * 255.0 / 100.0),
        quantize(f64::from(lab.a) + 128.0),
        quantize(f64::from(lab.b) + 128.0),
    ]
}

/// Inverse of [`rgb_to_lab8`], clamping out-of-gamut results.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn lab8_to_rgb(lab8: [u8; 3]) -> Rgb<u8> {
    let [l8, a8, b8] = lab8.map(f64::from);
    let lab = Lab::new(
        (l8 * 100.0 / 255.0) as f32,
        (a8 - 128.0) as f32,
        (b8 - 128.0) as f32,
    );
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);
    Rgb([srgb.red, srgb.green, srgb.blue].map(|c| quantize(f64::from(c.clamp(0.0, 1.0)) * 255.0)))
}
