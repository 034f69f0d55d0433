//! Supported file extensions.

use std::path::Path;

use image::ImageFormat;

/// Extensions accepted for import.
pub const IMPORT_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff"];

/// Extensions offered for export. Other extensions known to the
/// `image` crate are accepted as a fallback.
pub const EXPORT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Lower-cased extension of `path`, if any.
#[must_use]
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether `path` has an import extension (case-insensitive).
#[must_use]
pub fn is_importable(path: &Path) -> bool {
    extension(path).is_some_and(|ext| IMPORT_EXTENSIONS.contains(&ext.as_str()))
}

/// Encoder for `path`: PNG or JPEG for the explicit export
/// extensions, otherwise whatever the `image` crate maps the extension
/// to.
#[must_use]
pub fn export_format(path: &Path) -> Option<ImageFormat> {
    match extension(path)?.as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        other => ImageFormat::from_extension(other),
    }
}
