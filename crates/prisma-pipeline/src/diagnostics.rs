//! Execution diagnostics: per-step timing for a pipeline run.
//!
//! The core never reads a clock itself. Callers pass a [`Clock`]
//! implementation to
//! [`execute_with_diagnostics`](crate::executor::execute_with_diagnostics);
//! the CLI backs it with [`std::time::Instant`], tests with a fake.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDiagnostics {
    /// One entry per step, in execution order.
    pub steps: Vec<StepDiagnostics>,
    /// Wall-clock duration of the whole execution (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Output image width in pixels.
    pub width: u32,
    /// Output image height in pixels.
    pub height: u32,
}

/// Diagnostics for one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDiagnostics {
    /// Position in the pipeline.
    pub index: usize,
    /// [`PipelineStep::label`](crate::step::PipelineStep::label).
    pub label: String,
    /// Wall-clock duration of this step (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// `true` when the step was passed over (unknown category).
    pub skipped: bool,
}

impl ExecutionDiagnostics {
    /// Number of steps that actually transformed the image.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.skipped).count()
    }

    /// Render a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Execution Report\n{}", "=".repeat(60)));
        lines.push(format!("Image: {}x{}", self.width, self.height));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:>3}  {:<40} {:>10} {:>8}",
            "#", "Step", "Duration", "% Total"
        ));
        lines.push("-".repeat(66));

        let total_ms = duration_ms(self.total_duration);
        for step in &self.steps {
            let ms = duration_ms(step.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let label = if step.skipped {
                format!("{} (skipped)", step.label)
            } else {
                step.label.clone()
            };
            lines.push(format!(
                "{:>3}  {label:<40} {ms:>8.3}ms {pct:>7.1}%",
                step.index
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Steps: {}  |  Applied: {}",
            self.steps.len(),
            self.applied_count(),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to fractional milliseconds.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
