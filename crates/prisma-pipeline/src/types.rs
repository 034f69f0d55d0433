//! Shared types for the prisma transformation pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can hold source and
/// derived images without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `GrayImage` for single-channel intermediates.
pub use image::GrayImage;

/// Lowest accepted effect intensity.
pub const MIN_INTENSITY: f64 = 0.1;

/// Highest accepted effect intensity.
pub const MAX_INTENSITY: f64 = 3.0;

/// Lowest accepted repeat count.
pub const MIN_ITERATIONS: u32 = 1;

/// Highest accepted repeat count.
pub const MAX_ITERATIONS: u32 = 10;

const _: () = assert!(MIN_ITERATIONS <= MAX_ITERATIONS);

/// Global intensity and iteration defaults.
///
/// Every operation receives one of these explicitly; a step's own
/// `intensity` / `iterations` overrides take precedence over it.
///
/// The fields are public for struct-update syntax, but values that
/// come from user input should go through [`ProcessingDefaults::new`]
/// so they are clamped into `[MIN_INTENSITY, MAX_INTENSITY]` and
/// `[MIN_ITERATIONS, MAX_ITERATIONS]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingDefaults {
    /// Effect strength fed to the per-family derivation formulas.
    pub intensity: f64,
    /// Repeat count for families that support repetition.
    pub iterations: u32,
}

impl ProcessingDefaults {
    /// Default intensity: the "full effect, no amplification" point.
    pub const DEFAULT_INTENSITY: f64 = 1.0;

    /// Default iteration count.
    pub const DEFAULT_ITERATIONS: u32 = 1;

    /// Build defaults, clamping both values into their valid ranges.
    ///
    /// A non-finite intensity falls back to [`Self::DEFAULT_INTENSITY`].
    #[must_use]
    pub fn new(intensity: f64, iterations: u32) -> Self {
        Self {
            intensity: clamp_intensity(intensity),
            iterations: iterations.clamp(MIN_ITERATIONS, MAX_ITERATIONS),
        }
    }
}

impl Default for ProcessingDefaults {
    fn default() -> Self {
        Self {
            intensity: Self::DEFAULT_INTENSITY,
            iterations: Self::DEFAULT_ITERATIONS,
        }
    }
}

/// Clamp an intensity into `[MIN_INTENSITY, MAX_INTENSITY]`.
///
/// `NaN` and infinities map to [`ProcessingDefaults::DEFAULT_INTENSITY`].
#[must_use]
pub fn clamp_intensity(intensity: f64) -> f64 {
    if intensity.is_finite() {
        intensity.clamp(MIN_INTENSITY, MAX_INTENSITY)
    } else {
        ProcessingDefaults::DEFAULT_INTENSITY
    }
}

/// Errors raised by the pipeline core.
///
/// Unknown categories and methods are deliberately absent: those are
/// passthrough steps, not failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// An operation needed the original image, but none is loaded.
    #[error("no image loaded")]
    NoImageLoaded,

    /// Export was requested before any processed image exists.
    #[error("no processed image to export")]
    NothingToExport,

    /// A textual step description could not be split into
    /// `category:method[:params]`.
    #[error("invalid step description: {0}")]
    InvalidStepSpec(String),
}
