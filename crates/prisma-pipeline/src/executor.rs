//! Pure pipeline execution.
//!
//! Every entry point borrows the pipeline and the base image read-only
//! and returns freshly allocated images. Each step is dispatched on its
//! family variant; steps with an unknown category are passed over.

use tracing::debug;

use crate::binary;
use crate::color;
use crate::diagnostics::{Clock, ExecutionDiagnostics, StepDiagnostics};
use crate::edge;
use crate::filter;
use crate::morphology;
use crate::pipeline::Pipeline;
use crate::step::PipelineStep;
use crate::types::{ProcessingDefaults, RgbImage};

/// Apply a single step to `image`.
///
/// A step with an unknown category returns an unchanged copy.
#[must_use = "returns the transformed image"]
pub fn apply_step(image: &RgbImage, step: &PipelineStep, defaults: ProcessingDefaults) -> RgbImage {
    match step {
        PipelineStep::Color { method, params } => {
            color::convert_color(image, method, params, defaults)
        }
        PipelineStep::Filter { method, params } => {
            filter::apply_filter(image, method, params, defaults)
        }
        PipelineStep::Edge { method, params } => {
            edge::detect_edges(image, method, params, defaults)
        }
        PipelineStep::Binary { method, params } => {
            binary::threshold(image, method, params, defaults)
        }
        PipelineStep::Morphology { method, params } => {
            morphology::apply_morphology(image, method, params, defaults)
        }
        PipelineStep::Unknown { tag, method } => {
            debug!(category = %tag, %method, "skipping step with unknown category");
            image.clone()
        }
    }
}

/// Replay every step over a copy of `base`, left to right.
///
/// An empty pipeline returns a copy of `base`.
#[must_use = "returns the final image"]
pub fn execute(pipeline: &Pipeline, base: &RgbImage, defaults: ProcessingDefaults) -> RgbImage {
    pipeline
        .steps()
        .iter()
        .enumerate()
        .fold(base.clone(), |current, (index, step)| {
            debug!(index, step = %step, "applying step");
            apply_step(&current, step, defaults)
        })
}

/// Like [`execute`], but keep every intermediate.
///
/// Index 0 is a copy of `base`; index `i` is the image after step
/// `i - 1`. The result always has `pipeline.len() + 1` entries.
#[must_use = "returns every intermediate image"]
pub fn execute_staged(
    pipeline: &Pipeline,
    base: &RgbImage,
    defaults: ProcessingDefaults,
) -> Vec<RgbImage> {
    let mut stages = Vec::with_capacity(pipeline.len() + 1);
    stages.push(base.clone());
    for step in pipeline.steps() {
        let next = stages
            .last()
            .map_or_else(|| base.clone(), |prev| apply_step(prev, step, defaults));
        stages.push(next);
    }
    stages
}

/// Like [`execute`], but time each step with `clock`.
#[must_use = "returns the final image and its diagnostics"]
pub fn execute_with_diagnostics<C: Clock>(
    pipeline: &Pipeline,
    base: &RgbImage,
    defaults: ProcessingDefaults,
    clock: &C,
) -> (RgbImage, ExecutionDiagnostics) {
    let start = clock.now();
    let mut current = base.clone();
    let mut steps = Vec::with_capacity(pipeline.len());

    for (index, step) in pipeline.steps().iter().enumerate() {
        let label = step.label();
        let step_start = clock.now();
        current = apply_step(&current, step, defaults);
        let duration = clock.elapsed(&step_start);
        debug!(index, step = %label, ?duration, "applied step");
        steps.push(StepDiagnostics {
            index,
            label,
            duration,
            skipped: step.category().is_none(),
        });
    }

    let diagnostics = ExecutionDiagnostics {
        steps,
        total_duration: clock.elapsed(&start),
        width: current.width(),
        height: current.height(),
    };
    (current, diagnostics)
}
