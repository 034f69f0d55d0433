//! prisma-io: filesystem collaborators for the prisma pipeline.
//!
//! The pipeline crate is sans-IO; this crate decodes images from disk
//! into [`RgbImage`] values, encodes results back out, and produces
//! display-sized previews.

mod file;
pub mod formats;
pub mod preview;

use std::path::PathBuf;

pub use file::{load_image, save_image};
pub use preview::{PREVIEW_MAX_SIZE, create_preview};
pub use prisma_pipeline::RgbImage;

/// Errors from reading or writing image files.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The file could not be opened or decoded.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The image could not be encoded or written.
    #[error("failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The extension is not one this crate reads or writes.
    #[error("unsupported file extension: {}", path.display())]
    UnsupportedExtension { path: PathBuf },
}
