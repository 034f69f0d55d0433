//! Decode from and encode to the filesystem.

use std::path::Path;

use image::DynamicImage;
use prisma_pipeline::RgbImage;

use crate::IoError;
use crate::formats::{export_format, is_importable};

/// Load an image file as 8-bit RGB.
///
/// Alpha is dropped and other color types are converted.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedExtension`] for extensions outside
/// [`IMPORT_EXTENSIONS`](crate::formats::IMPORT_EXTENSIONS), and
/// [`IoError::Load`] if the file is missing, unreadable, or corrupt.
pub fn load_image(path: &Path) -> Result<RgbImage, IoError> {
    if !is_importable(path) {
        return Err(IoError::UnsupportedExtension {
            path: path.to_owned(),
        });
    }
    let decoded = image::open(path).map_err(|source| IoError::Load {
        path: path.to_owned(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded image"
    );
    Ok(decoded.into_rgb8())
}

/// Write `image` to `path`, choosing the encoder from the extension.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedExtension`] if no encoder matches the
/// extension, and [`IoError::Save`] if encoding or writing fails.
pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), IoError> {
    let format = export_format(path).ok_or_else(|| IoError::UnsupportedExtension {
        path: path.to_owned(),
    })?;
    DynamicImage::ImageRgb8(image.clone())
        .save_with_format(path, format)
        .map_err(|source| IoError::Save {
            path: path.to_owned(),
            source,
        })?;
    tracing::debug!(path = %path.display(), ?format, "saved image");
    Ok(())
}
