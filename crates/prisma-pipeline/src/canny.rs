//! Canny edge detection.
//!
//! Gradients come straight from the 3x3 Sobel kernels on the unblurred
//! input with replicated borders, and the magnitude is the L1 norm
//! `|gx| + |gy|`, so thresholds are on the same scale as the raw Sobel
//! response. Pixels must exceed a threshold strictly to count.
//!
//! Non-maximum suppression and hysteresis follow
//! `imageproc::edges::{non_maximum_suppression, hysteresis}` with two
//! fixes to the hysteresis pass:
//!
//! 1. **`u32` underflow in neighbor computation**: when a pixel at
//!    `x=0` or `y=0` is popped from the stack, `nx - 1` wraps to
//!    `u32::MAX` and `get_pixel` panics. Each neighbor is bounds-checked
//!    before access.
//!
//! 2. **Missing neighbors**: upstream visits 6 of the 8 neighbors,
//!    omitting north `(nx, ny-1)` and northeast `(nx+1, ny-1)`.
//!
//! Upstream references:
//! - Issue: <https://github.com/image-rs/imageproc/issues/705>
//! - Fix PR: <https://github.com/image-rs/imageproc/pull/746>
//!
//! Suppression breaks ties along horizontal and vertical gradients
//! toward the later neighbor, so a plateau two pixels wide yields a
//! one-pixel edge. It uses checked `get_pixel` instead of the upstream
//! `unsafe_get_pixel`, so the crate stays free of `unsafe`.

use image::{GrayImage, Luma};
use imageproc::definitions::{HasBlack, HasWhite, Image};
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Run Canny edge detection.
///
/// Returns a binary image: 255 for edge pixels, 0 elsewhere. Callers
/// must pass `low_threshold <= high_threshold`; [`crate::edge`] clamps
/// user input before calling.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(low_threshold);
    let low = low_threshold.min(high);
    if image.width() < 3 || image.height() < 3 {
        return GrayImage::new(image.width(), image.height());
    }

    // 1. Intensity of gradients.
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let g = Image::from_fn(image.width(), image.height(), |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.abs() + v.abs()])
    });

    // 2. Non-maximum suppression (thin the edges).
    let thinned = non_maximum_suppression(&g, &gx, &gy);

    // 3. Hysteresis.
    hysteresis(&thinned, low, high)
}

/// Keep only pixels that are local maxima along the gradient direction.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    const RADIANS_TO_DEGREES: f32 = 180.0 / std::f32::consts::PI;
    let mut out = Image::from_pixel(g.width(), g.height(), Luma([0.0]));
    for y in 1..g.height() - 1 {
        for x in 1..g.width() - 1 {
            let x_gradient = f32::from(gx.get_pixel(x, y).0[0]);
            let y_gradient = f32::from(gy.get_pixel(x, y).0[0]);
            let mut angle = y_gradient.atan2(x_gradient) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0;
            }

            let m = g.get_pixel(x, y).0[0];
            let at = |px: u32, py: u32| g.get_pixel(px, py).0[0];
            let is_peak = if !(22.5..157.5).contains(&angle) {
                m > at(x - 1, y) && m >= at(x + 1, y)
            } else if (22.5..67.5).contains(&angle) {
                m > at(x + 1, y + 1) && m > at(x - 1, y - 1)
            } else if (67.5..112.5).contains(&angle) {
                m > at(x, y - 1) && m >= at(x, y + 1)
            } else {
                m > at(x - 1, y + 1) && m > at(x + 1, y - 1)
            };

            if is_peak {
                out.put_pixel(x, y, Luma([m]));
            }
        }
    }
    out
}

/// Keep strong edges and the weak edges connected to them.
/// Non-recursive depth-first flood from each strong pixel.
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    let max_brightness = Luma::white();
    let (w, h) = (input.width(), input.height());
    let mut out = GrayImage::from_pixel(w, h, Luma::black());
    let mut stack = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let strength = input.get_pixel(x, y).0[0];
            if strength <= high_thresh || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, max_brightness);
            stack.push((x, y));
            while let Some((nx, ny)) = stack.pop() {
                let neighbors = [
                    (nx + 1, ny),
                    (nx + 1, ny + 1),
                    (nx, ny + 1),
                    (nx.wrapping_sub(1), ny.wrapping_sub(1)),
                    (nx.wrapping_sub(1), ny),
                    (nx.wrapping_sub(1), ny + 1),
                    (nx, ny.wrapping_sub(1)),
                    (nx + 1, ny.wrapping_sub(1)),
                ];
                for (px, py) in neighbors {
                    if px >= w || py >= h {
                        continue;
                    }
                    if input.get_pixel(px, py).0[0] > low_thresh
                        && out.get_pixel(px, py).0[0] == 0
                    {
                        out.put_pixel(px, py, max_brightness);
                        stack.push((px, py));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A strong edge one pixel from the left border; with low thresholds
    /// the flood reaches `x = 0`, which used to underflow.
    #[test]
    fn border_edge_does_not_panic() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([0]));
        for y in 0..10 {
            img.put_pixel(1, y, Luma([255]));
        }
        let _edges = canny(&img, 1.0, 2.0);
    }

    #[test]
    fn output_dimensions_match_input() {
        let edges = canny(&GrayImage::new(17, 31), 50.0, 150.0);
        assert_eq!(edges.dimensions(), (17, 31));
    }

    #[test]
    fn tiny_images_have_no_edges() {
        let edges = canny(&GrayImage::from_pixel(2, 5, Luma([200])), 1.0, 2.0);
        assert_eq!(edges.dimensions(), (2, 5));
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn sharp_edge_detected() {
        let img = GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 { Luma([0]) } else { Luma([255]) }
        });
        let edges = canny(&img, 50.0, 150.0);
        let edge_count: u32 = edges.pixels().map(|p| u32::from(p.0[0] > 0)).sum();
        assert!(edge_count > 0, "expected edges at sharp boundary");
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let edges = canny(&GrayImage::from_pixel(20, 20, Luma([128])), 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    fn step_image(left: u8, right: u8) -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 { Luma([left]) } else { Luma([right]) }
        })
    }

    /// A 40-level step gives a raw Sobel response of 4 * 40 = 160, which
    /// clears the default high threshold of 150.
    #[test]
    fn moderate_step_clears_default_thresholds() {
        let edges = canny(&step_image(100, 140), 50.0, 150.0);
        for y in 1..19 {
            assert_eq!(edges.get_pixel(9, y).0[0], 255, "row {y}");
            assert_eq!(edges.get_pixel(10, y).0[0], 0, "row {y}");
        }
        let edge_count: u32 = edges.pixels().map(|p| u32::from(p.0[0] > 0)).sum();
        assert_eq!(edge_count, 18);
    }

    #[test]
    fn weak_step_stays_below_high_threshold() {
        // 4 * 30 = 120 < 150: no strong pixel seeds the flood.
        let edges = canny(&step_image(100, 130), 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn response_equal_to_high_threshold_is_not_strong() {
        let edges = canny(&step_image(100, 140), 50.0, 160.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }
}
