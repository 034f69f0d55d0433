//! Display-sized previews.
//!
//! Previews are for display only; nothing in the pipeline reads them.

use image::imageops::{self, FilterType};
use prisma_pipeline::RgbImage;

/// Default preview bounding box `(width, height)`.
pub const PREVIEW_MAX_SIZE: (u32, u32) = (400, 300);

/// Shrink `image` proportionally to fit within `max_width` x
/// `max_height` using Lanczos3.
///
/// Images that already fit are returned unchanged; previews never
/// upsample. Each output side is at least 1 pixel.
#[must_use = "returns the preview image"]
pub fn create_preview(image: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || (w <= max_width && h <= max_height) {
        return image.clone();
    }
    let (new_w, new_h) = fit_within(w, h, max_width.max(1), max_height.max(1));
    imageops::resize(image, new_w, new_h, FilterType::Lanczos3)
}

/// Largest proportional size within the box, rounded, at least 1x1.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn fit_within(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = (f64::from(max_w) / f64::from(w)).min(f64::from(max_h) / f64::from(h));
    let new_w = (f64::from(w) * scale).round().max(1.0) as u32;
    let new_h = (f64::from(h) * scale).round().max(1.0) as u32;
    (new_w.min(max_w), new_h.min(max_h))
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn small_images_are_untouched() {
        let img = RgbImage::from_pixel(300, 200, Rgb([1, 2, 3]));
        let (mw, mh) = PREVIEW_MAX_SIZE;
        assert_eq!(create_preview(&img, mw, mh), img);
    }

    #[test]
    fn wide_images_fit_width() {
        let img = RgbImage::from_pixel(800, 300, Rgb([9, 9, 9]));
        let preview = create_preview(&img, 400, 300);
        assert_eq!(preview.dimensions(), (400, 150));
    }

    #[test]
    fn tall_images_fit_height() {
        let img = RgbImage::from_pixel(300, 900, Rgb([9, 9, 9]));
        let preview = create_preview(&img, 400, 300);
        assert_eq!(preview.dimensions(), (100, 300));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 2, 400, 300), (400, 1));
    }

    #[test]
    fn uniform_color_survives_resampling() {
        let img = RgbImage::from_pixel(1000, 1000, Rgb([120, 60, 30]));
        let preview = create_preview(&img, 400, 300);
        assert_eq!(preview.dimensions(), (300, 300));
        for p in preview.pixels() {
            for (got, want) in p.0.iter().zip([120u8, 60, 30]) {
                assert!(got.abs_diff(want) <= 1, "{:?}", p.0);
            }
        }
    }
}
