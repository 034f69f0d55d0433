//! Edge detection family: Canny, Sobel, and Laplacian.
//!
//! All three work on the luminance channel and are single-pass; the
//! result is re-expanded to RGB. Sobel and Laplacian share a separable
//! derivative convolution with reflect-101 borders; Canny delegates to
//! [`crate::canny`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canny;
use crate::grayscale::{gray_to_rgb, to_gray};
use crate::params::{effective_intensity, odd_kernel_size, scaled};
use crate::types::{GrayImage, ProcessingDefaults, RgbImage};

/// Minimum allowed Canny threshold value.
///
/// A threshold of zero would classify every pixel with any gradient as
/// an edge.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Smallest derivative kernel size.
pub const MIN_KSIZE: u32 = 3;

/// Largest derivative kernel size.
pub const MAX_KSIZE: u32 = 31;

/// Edge detection methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeMethod {
    /// Canny with hysteresis thresholds.
    Canny,
    /// Gradient magnitude of first derivatives.
    Sobel,
    /// Absolute second-derivative response.
    Laplacian,
    /// Unrecognized method name; the grayscale image passes through.
    Unknown(String),
}

impl From<&str> for EdgeMethod {
    fn from(name: &str) -> Self {
        match name {
            "canny" => Self::Canny,
            "sobel" => Self::Sobel,
            "laplacian" => Self::Laplacian,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for EdgeMethod {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<EdgeMethod> for String {
    fn from(method: EdgeMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for EdgeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canny => f.write_str("canny"),
            Self::Sobel => f.write_str("sobel"),
            Self::Laplacian => f.write_str("laplacian"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

/// Explicit overrides for an edge step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeParams {
    /// Effect strength; falls back to the global default.
    pub intensity: Option<f64>,
    /// Canny lower hysteresis threshold.
    pub low_threshold: Option<f32>,
    /// Canny upper hysteresis threshold.
    pub high_threshold: Option<f32>,
    /// Sobel/Laplacian aperture size.
    pub ksize: Option<u32>,
}

/// Derivative aperture: the override if present, else
/// `max(3, round(3 * intensity))`, forced odd, within `[3, 31]`.
#[must_use]
pub fn kernel_size(override_ksize: Option<u32>, intensity: f64) -> u32 {
    odd_kernel_size(override_ksize, 3.0, intensity, MIN_KSIZE, MAX_KSIZE)
}

/// Canny `(low, high)` thresholds.
///
/// Defaults are `round(50 * intensity)` and `round(150 * intensity)`.
/// Both are raised to at least [`MIN_THRESHOLD`] and `low` never
/// exceeds `high`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn canny_thresholds(params: &EdgeParams, intensity: f64) -> (f32, f32) {
    let low = params
        .low_threshold
        .unwrap_or_else(|| scaled(50.0, intensity) as f32);
    let high = params
        .high_threshold
        .unwrap_or_else(|| scaled(150.0, intensity) as f32);
    let high = high.max(MIN_THRESHOLD);
    let low = low.max(MIN_THRESHOLD).min(high);
    (low, high)
}

/// Detect edges and return them as a 3-channel image.
///
/// Unknown methods return the grayscale conversion only.
#[must_use = "returns the edge image"]
pub fn detect_edges(
    image: &RgbImage,
    method: &EdgeMethod,
    params: &EdgeParams,
    defaults: ProcessingDefaults,
) -> RgbImage {
    let intensity = effective_intensity(params.intensity, defaults);
    let gray = to_gray(image);
    let edges = match method {
        EdgeMethod::Canny => {
            let (low, high) = canny_thresholds(params, intensity);
            canny::canny(&gray, low, high)
        }
        EdgeMethod::Sobel => sobel(&gray, kernel_size(params.ksize, intensity), intensity),
        EdgeMethod::Laplacian => laplacian(&gray, kernel_size(params.ksize, intensity), intensity),
        EdgeMethod::Unknown(_) => gray,
    };
    gray_to_rgb(&edges)
}

/// Euclidean gradient magnitude scaled by `intensity`.
#[must_use = "returns the gradient magnitude image"]
pub fn sobel(gray: &GrayImage, ksize: u32, intensity: f64) -> GrayImage {
    let smooth = derivative_kernel(ksize, 0);
    let first = derivative_kernel(ksize, 1);
    let gx = Response::separable(gray, &first, &smooth);
    let gy = Response::separable(gray, &smooth, &first);
    gx.combine(&gy, |h, v| h.hypot(v) * intensity)
}

/// Absolute Laplacian (`d2/dx2 + d2/dy2`) scaled by `intensity`.
#[must_use = "returns the Laplacian image"]
pub fn laplacian(gray: &GrayImage, ksize: u32, intensity: f64) -> GrayImage {
    let smooth = derivative_kernel(ksize, 0);
    let second = derivative_kernel(ksize, 2);
    let dxx = Response::separable(gray, &second, &smooth);
    let dyy = Response::separable(gray, &smooth, &second);
    dxx.combine(&dyy, |a, b| (a + b).abs() * intensity)
}

/// 1-D binomial derivative kernel of the given size and order.
///
/// Built by convolving `[1]` with `[1, 1]` `(size - 1 - order)` times
/// and with `[-1, 1]` `order` times. Size 3 gives `[1, 2, 1]`,
/// `[-1, 0, 1]` and `[1, -2, 1]` for orders 0, 1 and 2.
fn derivative_kernel(size: u32, order: u32) -> Vec<f64> {
    let smoothing = size.saturating_sub(1).saturating_sub(order);
    let mut kernel = vec![1.0];
    for _ in 0..smoothing {
        kernel = polymul(&kernel, &[1.0, 1.0]);
    }
    for _ in 0..order {
        kernel = polymul(&kernel, &[-1.0, 1.0]);
    }
    kernel
}

fn polymul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Reflect-101 border index (`gfedcb|abcdefgh|gfedcba`).
fn reflect_101(index: i64, len: i64) -> usize {
    if len <= 1 {
        return 0;
    }
    let mut i = index;
    while i < 0 || i >= len {
        i = if i < 0 { -i } else { 2 * (len - 1) - i };
    }
    usize::try_from(i).unwrap_or(0)
}

/// Floating-point filter response over a grayscale image.
struct Response {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl Response {
    /// Correlate `gray` with `kx` along rows, then `ky` along columns.
    fn separable(gray: &GrayImage, kx: &[f64], ky: &[f64]) -> Self {
        let (width, height) = gray.dimensions();
        let (w, h) = (i64::from(width), i64::from(height));
        let source: Vec<f64> = gray.pixels().map(|p| f64::from(p.0[0])).collect();
        let rows = Self::pass(&source, w, h, kx, true);
        let data = Self::pass(&rows, w, h, ky, false);
        Self {
            width,
            height,
            data,
        }
    }

    fn pass(src: &[f64], w: i64, h: i64, kernel: &[f64], horizontal: bool) -> Vec<f64> {
        let len = i64::try_from(kernel.len()).unwrap_or(0);
        let anchor = len / 2;
        let mut out = Vec::with_capacity(src.len());
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for (k, weight) in (0..len).zip(kernel) {
                    let (sx, sy) = if horizontal {
                        (reflect_101(x + k - anchor, w), reflect_101(y, h))
                    } else {
                        (reflect_101(x, w), reflect_101(y + k - anchor, h))
                    };
                    acc += weight * src[sy * usize::try_from(w).unwrap_or(0) + sx];
                }
                out.push(acc);
            }
        }
        out
    }

    /// Merge two responses pixel-wise into an 8-bit image.
    ///
    /// The combined value saturates into `[0, 255]` and truncates
    /// toward zero.
    fn combine(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> GrayImage {
        let mut out = GrayImage::new(self.width, self.height);
        for ((dst, a), b) in out.pixels_mut().zip(&self.data).zip(&other.data) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let v = f(*a, *b) as u8;
            dst.0[0] = v;
        }
        out
    }
}
