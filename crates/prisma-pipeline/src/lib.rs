//! prisma-pipeline: Replayable image transformation pipelines (sans-IO).
//!
//! An ordered, editable list of parametrized steps is folded over an
//! immutable source image to produce a derived image. Each step belongs
//! to one of five families:
//!
//! - [`color`]: grayscale, HSV and L*a*b* round trips, inversion
//! - [`filter`]: Gaussian blur, sharpen, emboss, smooth
//! - [`edge`]: Canny, Sobel, Laplacian
//! - [`binary`]: simple, adaptive-mean and Otsu thresholding
//! - [`morphology`]: erosion, dilation, opening, closing
//!
//! Every operation is a pure function of the input image, the step's
//! explicit overrides, and a [`ProcessingDefaults`] value carrying the
//! global intensity and iteration count.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images. Decoding, encoding and previews live in `prisma-io`.

pub mod binary;
pub mod canny;
pub mod color;
pub mod diagnostics;
pub mod edge;
pub mod executor;
pub mod filter;
pub mod grayscale;
pub mod morphology;
pub mod params;
pub mod pipeline;
pub mod state;
pub mod step;
pub mod types;

pub use diagnostics::{Clock, ExecutionDiagnostics, StepDiagnostics};
pub use executor::{apply_step, execute, execute_staged, execute_with_diagnostics};
pub use params::{ParamMap, ParamValue};
pub use pipeline::Pipeline;
pub use state::{ApplicationState, ImageModel, Session};
pub use step::{Category, PipelineStep, parse_spec};
pub use types::{GrayImage, PipelineError, ProcessingDefaults, RgbImage};
