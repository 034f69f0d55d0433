//! Ordered, editable step list with a single saved snapshot.
//!
//! `steps` and `snapshot` are independent `Vec`s of owned values, so
//! editing one can never be observed through the other.

use serde::{Deserialize, Serialize};

use crate::params::ParamMap;
use crate::step::PipelineStep;

/// An editable sequence of steps plus one saved copy.
///
/// Index 0 runs first. Editing operations that receive an index out
/// of range are no-ops rather than errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    snapshot: Vec<PipelineStep>,
}

impl Pipeline {
    /// Create an empty pipeline with an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            steps: Vec::new(),
            snapshot: Vec::new(),
        }
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// The saved snapshot (empty until [`Self::save_snapshot`] is called).
    #[must_use]
    pub fn snapshot(&self) -> &[PipelineStep] {
        &self.snapshot
    }

    /// Number of steps.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the pipeline has no steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a step.
    pub fn push(&mut self, step: PipelineStep) {
        self.steps.push(step);
    }

    /// Append a step built from string tags. Always succeeds; see
    /// [`PipelineStep::from_tags`] for how unknown tags are kept.
    pub fn add_step(&mut self, category: &str, method: &str, params: &ParamMap) {
        self.push(PipelineStep::from_tags(category, method, params));
    }

    /// Remove the step at `index`, if any.
    pub fn delete_step(&mut self, index: usize) {
        if index < self.steps.len() {
            self.steps.remove(index);
        }
    }

    /// Swap the step at `index` with its predecessor.
    pub fn move_up(&mut self, index: usize) {
        if index > 0 && index < self.steps.len() {
            self.steps.swap(index - 1, index);
        }
    }

    /// Swap the step at `index` with its successor.
    pub fn move_down(&mut self, index: usize) {
        if index + 1 < self.steps.len() {
            self.steps.swap(index, index + 1);
        }
    }

    /// Copy the current steps into the snapshot, replacing it.
    pub fn save_snapshot(&mut self) {
        self.snapshot.clone_from(&self.steps);
    }

    /// Replace the steps with a copy of the snapshot.
    ///
    /// Without a prior [`Self::save_snapshot`] this empties the
    /// pipeline.
    pub fn revert_to_snapshot(&mut self) {
        self.steps.clone_from(&self.snapshot);
    }

    /// Remove every step. The snapshot is left alone.
    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

impl FromIterator<PipelineStep> for Pipeline {
    fn from_iter<I: IntoIterator<Item = PipelineStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
            snapshot: Vec::new(),
        }
    }
}
