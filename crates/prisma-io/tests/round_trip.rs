//! Integration test: load, transform, and save images through the filesystem.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::Rgb;
use prisma_io::{IoError, create_preview, load_image, save_image};
use prisma_pipeline::{ParamMap, Pipeline, ProcessingDefaults, RgbImage, execute};

fn gradient(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        Rgb([
            u8::try_from(x * 255 / w.max(1)).unwrap(),
            u8::try_from(y * 255 / h.max(1)).unwrap(),
            128,
        ])
    })
}

#[test]
fn png_round_trip_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.png");
    let img = gradient(40, 30);

    save_image(&img, &path).unwrap();
    let loaded = load_image(&path).unwrap();
    assert_eq!(loaded, img);
}

#[test]
fn jpeg_round_trip_keeps_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.JPG");
    let img = gradient(64, 48);

    save_image(&img, &path).unwrap();
    let loaded = load_image(&path).unwrap();
    assert_eq!(loaded.dimensions(), (64, 48));
}

#[test]
fn bmp_is_a_fallback_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.bmp");
    let img = gradient(8, 8);

    save_image(&img, &path).unwrap();
    assert_eq!(load_image(&path).unwrap(), img);
}

#[test]
fn unknown_extensions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let img = gradient(4, 4);

    let err = save_image(&img, &dir.path().join("out.xyz")).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedExtension { .. }), "{err}");

    std::fs::write(dir.path().join("in.txt"), b"hello").unwrap();
    let err = load_image(&dir.path().join("in.txt")).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedExtension { .. }), "{err}");
}

#[test]
fn missing_and_corrupt_files_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_image(&dir.path().join("missing.png")).unwrap_err();
    assert!(matches!(err, IoError::Load { .. }), "{err}");

    let corrupt = dir.path().join("corrupt.png");
    std::fs::write(&corrupt, b"definitely not a png").unwrap();
    let err = load_image(&corrupt).unwrap_err();
    assert!(matches!(err, IoError::Load { .. }), "{err}");
    assert!(err.to_string().contains("corrupt.png"));
}

#[test]
fn pipeline_output_exports_as_black_and_white() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.png");
    save_image(&gradient(50, 40), &source).unwrap();

    let mut pipeline = Pipeline::new();
    pipeline.add_step("color", "grayscale", &ParamMap::new());
    pipeline.add_step("binary", "otsu", &ParamMap::new());

    let original = load_image(&source).unwrap();
    let processed = execute(&pipeline, &original, ProcessingDefaults::default());

    let out = dir.path().join("result.png");
    save_image(&processed, &out).unwrap();
    let reloaded = load_image(&out).unwrap();
    assert_eq!(reloaded, processed);
    assert!(
        reloaded
            .pixels()
            .all(|p| p.0 == [0, 0, 0] || p.0 == [255, 255, 255])
    );

    let preview = create_preview(&reloaded, 25, 25);
    assert_eq!(preview.dimensions(), (25, 20));
}
