//! Application and image state.
//!
//! [`Session`] ties together the imported-file list, the processing
//! defaults, the original/processed image pair, and the pipeline. It is
//! the surface a front end drives; none of it touches the filesystem.

use std::path::{Path, PathBuf};

use crate::diagnostics::{Clock, ExecutionDiagnostics};
use crate::executor;
use crate::pipeline::Pipeline;
use crate::step::PipelineStep;
use crate::types::{PipelineError, ProcessingDefaults, RgbImage, clamp_intensity};

/// Imported file list and global processing defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationState {
    imported_files: Vec<PathBuf>,
    defaults: ProcessingDefaults,
}

impl ApplicationState {
    /// Fresh state: no files, default intensity and iterations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an imported file. Returns `false` if it was already listed.
    pub fn import_file(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.imported_files.contains(&path) {
            return false;
        }
        self.imported_files.push(path);
        true
    }

    /// Imported files in import order.
    #[must_use]
    pub fn imported_files(&self) -> &[PathBuf] {
        &self.imported_files
    }

    /// Whether `path` has been imported.
    #[must_use]
    pub fn is_imported(&self, path: &Path) -> bool {
        self.imported_files.iter().any(|p| p == path)
    }

    /// Current defaults.
    #[must_use]
    pub const fn defaults(&self) -> ProcessingDefaults {
        self.defaults
    }

    /// Set the default intensity, clamped into the valid range.
    pub fn set_intensity(&mut self, intensity: f64) {
        self.defaults.intensity = clamp_intensity(intensity);
    }

    /// Set the default iteration count, clamped into the valid range.
    pub fn set_iterations(&mut self, iterations: u32) {
        self.defaults = ProcessingDefaults::new(self.defaults.intensity, iterations);
    }

    /// Restore intensity 1.0 and iterations 1.
    pub fn reset_defaults(&mut self) {
        self.defaults = ProcessingDefaults::default();
    }
}

/// Source image and the last derived image.
///
/// `original` changes only on load or commit; `processed` is always
/// recomputable from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageModel {
    original: Option<RgbImage>,
    processed: Option<RgbImage>,
}

impl ImageModel {
    /// The source image, if one is loaded.
    #[must_use]
    pub const fn original(&self) -> Option<&RgbImage> {
        self.original.as_ref()
    }

    /// The last derived image, if any.
    #[must_use]
    pub const fn processed(&self) -> Option<&RgbImage> {
        self.processed.as_ref()
    }

    /// Whether a source image is loaded.
    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.original.is_some()
    }

    /// Replace the source image and show it unprocessed.
    pub fn load(&mut self, image: RgbImage) {
        self.processed = Some(image.clone());
        self.original = Some(image);
    }

    fn require_original(&self) -> Result<&RgbImage, PipelineError> {
        self.original.as_ref().ok_or(PipelineError::NoImageLoaded)
    }
}

/// Everything a front end needs to drive the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Imported files and defaults.
    pub state: ApplicationState,
    /// Source and derived images.
    pub images: ImageModel,
    /// The editable pipeline.
    pub pipeline: Pipeline,
}

impl Session {
    /// Empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a decoded image as the new original.
    pub fn load(&mut self, image: RgbImage) {
        tracing::debug!(width = image.width(), height = image.height(), "loaded image");
        self.images.load(image);
    }

    /// Run one step against the original and keep the result as the
    /// processed image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImageLoaded`] if no image is loaded.
    pub fn apply(&mut self, step: &PipelineStep) -> Result<&RgbImage, PipelineError> {
        let original = self.images.require_original()?;
        let result = executor::apply_step(original, step, self.state.defaults());
        Ok(&*self.images.processed.insert(result))
    }

    /// Run the whole pipeline against the original and keep the result
    /// as the processed image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImageLoaded`] if no image is loaded.
    pub fn run_pipeline(&mut self) -> Result<&RgbImage, PipelineError> {
        let original = self.images.require_original()?;
        let result = executor::execute(&self.pipeline, original, self.state.defaults());
        Ok(&*self.images.processed.insert(result))
    }

    /// Like [`Self::run_pipeline`], but time each step with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImageLoaded`] if no image is loaded.
    pub fn run_pipeline_with_diagnostics<C: Clock>(
        &mut self,
        clock: &C,
    ) -> Result<(&RgbImage, ExecutionDiagnostics), PipelineError> {
        let original = self.images.require_original()?;
        let (result, diagnostics) = executor::execute_with_diagnostics(
            &self.pipeline,
            original,
            self.state.defaults(),
            clock,
        );
        Ok((&*self.images.processed.insert(result), diagnostics))
    }

    /// Promote the processed image to be the new original.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImageLoaded`] if no image is loaded.
    pub fn commit(&mut self) -> Result<(), PipelineError> {
        self.images.require_original()?;
        if let Some(processed) = &self.images.processed {
            self.images.original = Some(processed.clone());
        }
        Ok(())
    }

    /// Discard the processed image and restore the default intensity and
    /// iterations.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImageLoaded`] if no image is loaded.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        let original = self.images.require_original()?.clone();
        self.images.processed = Some(original);
        self.state.reset_defaults();
        Ok(())
    }

    /// The image to export.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NothingToExport`] if there is no
    /// processed image.
    pub fn export_image(&self) -> Result<&RgbImage, PipelineError> {
        self.images.processed().ok_or(PipelineError::NothingToExport)
    }
}
