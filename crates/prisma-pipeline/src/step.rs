//! Pipeline steps: one parametrized transform invocation each.
//!
//! A [`PipelineStep`] is a closed variant per operation family, carrying
//! that family's method enum and typed overrides. Steps built from
//! loose string tags go through [`PipelineStep::from_tags`], which
//! never fails: unrecognized categories and methods become explicit
//! `Unknown` variants that the executor passes over, and parameters it
//! cannot interpret are dropped with a warning.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::binary::{BinaryMethod, BinaryParams};
use crate::color::{ColorMethod, ColorParams};
use crate::edge::{EdgeMethod, EdgeParams};
use crate::filter::{FilterMethod, FilterParams};
use crate::morphology::{MorphologyMethod, MorphologyParams};
use crate::params::{ParamMap, ParamValue};
use crate::types::PipelineError;

/// The five operation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Color,
    Filter,
    Edge,
    Binary,
    Morphology,
}

impl Category {
    /// All families, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Color,
        Self::Filter,
        Self::Edge,
        Self::Binary,
        Self::Morphology,
    ];

    /// Tag used in textual steps and labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Filter => "filter",
            Self::Edge => "edge",
            Self::Binary => "binary",
            Self::Morphology => "morphology",
        }
    }

    /// Look up a family by its tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == tag)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step in a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum PipelineStep {
    Color {
        method: ColorMethod,
        #[serde(default)]
        params: ColorParams,
    },
    Filter {
        method: FilterMethod,
        #[serde(default)]
        params: FilterParams,
    },
    Edge {
        method: EdgeMethod,
        #[serde(default)]
        params: EdgeParams,
    },
    Binary {
        method: BinaryMethod,
        #[serde(default)]
        params: BinaryParams,
    },
    Morphology {
        method: MorphologyMethod,
        #[serde(default)]
        params: MorphologyParams,
    },
    /// A step whose category tag names no family. Executes as a no-op.
    Unknown { tag: String, method: String },
}

impl PipelineStep {
    /// Build a step from string tags and an untyped parameter bag.
    ///
    /// Never fails. Unknown categories yield [`PipelineStep::Unknown`],
    /// unknown methods the family's `Unknown(name)` method, and
    /// parameters that are unknown for the family or cannot be read as
    /// the expected type are dropped with a `warn!`.
    #[must_use]
    pub fn from_tags(category: &str, method: &str, params: &ParamMap) -> Self {
        let Some(family) = Category::from_tag(category) else {
            if !params.is_empty() {
                tracing::warn!(category, "dropping parameters of unknown category");
            }
            return Self::Unknown {
                tag: category.to_owned(),
                method: method.to_owned(),
            };
        };
        let mut reader = ParamReader::new(family, params);
        let step = match family {
            Category::Color => Self::Color {
                method: method.into(),
                params: ColorParams::read(&mut reader),
            },
            Category::Filter => Self::Filter {
                method: method.into(),
                params: FilterParams::read(&mut reader),
            },
            Category::Edge => Self::Edge {
                method: method.into(),
                params: EdgeParams::read(&mut reader),
            },
            Category::Binary => Self::Binary {
                method: method.into(),
                params: BinaryParams::read(&mut reader),
            },
            Category::Morphology => Self::Morphology {
                method: method.into(),
                params: MorphologyParams::read(&mut reader),
            },
        };
        reader.finish();
        step
    }

    /// Family of this step, or `None` for [`PipelineStep::Unknown`].
    #[must_use]
    pub const fn category(&self) -> Option<Category> {
        match self {
            Self::Color { .. } => Some(Category::Color),
            Self::Filter { .. } => Some(Category::Filter),
            Self::Edge { .. } => Some(Category::Edge),
            Self::Binary { .. } => Some(Category::Binary),
            Self::Morphology { .. } => Some(Category::Morphology),
            Self::Unknown { .. } => None,
        }
    }

    /// Category tag as written, including unknown ones.
    #[must_use]
    pub fn category_tag(&self) -> &str {
        match self {
            Self::Unknown { tag, .. } => tag,
            other => other.category().map_or("", Category::as_str),
        }
    }

    /// Method name as written.
    #[must_use]
    pub fn method_name(&self) -> String {
        match self {
            Self::Color { method, .. } => method.to_string(),
            Self::Filter { method, .. } => method.to_string(),
            Self::Edge { method, .. } => method.to_string(),
            Self::Binary { method, .. } => method.to_string(),
            Self::Morphology { method, .. } => method.to_string(),
            Self::Unknown { method, .. } => method.clone(),
        }
    }

    /// Explicit overrides as `(key, value)` pairs, in declaration order.
    #[must_use]
    pub fn param_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Color { params, .. } => params.pairs(),
            Self::Filter { params, .. } => params.pairs(),
            Self::Edge { params, .. } => params.pairs(),
            Self::Binary { params, .. } => params.pairs(),
            Self::Morphology { params, .. } => params.pairs(),
            Self::Unknown { .. } => Vec::new(),
        }
    }

    /// Human-readable label: `category:method` or
    /// `category:method(k=v, ...)`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category_tag(), self.method_name())?;
        let pairs = self.param_pairs();
        if !pairs.is_empty() {
            let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "({})", joined.join(", "))?;
        }
        Ok(())
    }
}

/// Parse `category:method[:key=value[,key=value...]]`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidStepSpec`] when the category or
/// method is empty or missing. A parameter without `=` is dropped with
/// a warning, like any other parameter [`PipelineStep::from_tags`]
/// cannot use.
pub fn parse_spec(spec: &str) -> Result<PipelineStep, PipelineError> {
    let invalid = |why: &str| PipelineError::InvalidStepSpec(format!("{spec:?}: {why}"));

    let mut parts = spec.trim().splitn(3, ':');
    let category = parts.next().unwrap_or_default().trim();
    if category.is_empty() {
        return Err(invalid("missing category"));
    }
    let method = parts
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| invalid("missing method"))?;

    let mut params = ParamMap::new();
    if let Some(list) = parts.next() {
        for pair in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                tracing::warn!(step = spec, parameter = pair, "dropping parameter without a value");
                continue;
            };
            params.insert(key.trim().to_owned(), ParamValue::parse(value));
        }
    }
    Ok(PipelineStep::from_tags(category, method, &params))
}

impl FromStr for PipelineStep {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_spec(s)
    }
}

/// Typed view over a [`ParamMap`] that remembers which keys were used.
struct ParamReader<'a> {
    family: Category,
    map: &'a ParamMap,
    seen: BTreeSet<&'a str>,
}

impl<'a> ParamReader<'a> {
    fn new(family: Category, map: &'a ParamMap) -> Self {
        Self {
            family,
            map,
            seen: BTreeSet::new(),
        }
    }

    /// First present key among `keys`, converted with `convert`.
    fn read<T>(&mut self, keys: &[&str], convert: impl Fn(&ParamValue) -> Option<T>) -> Option<T> {
        let map = self.map;
        let (key, value) = keys.iter().find_map(|k| map.get_key_value(*k))?;
        self.seen.insert(key.as_str());
        let converted = convert(value);
        if converted.is_none() {
            tracing::warn!(
                category = %self.family,
                key = key.as_str(),
                %value,
                "dropping uninterpretable parameter"
            );
        }
        converted
    }

    fn float(&mut self, keys: &[&str]) -> Option<f64> {
        self.read(keys, ParamValue::as_f64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn float32(&mut self, keys: &[&str]) -> Option<f32> {
        self.read(keys, |v| v.as_f64().map(|f| f as f32))
    }

    fn int(&mut self, keys: &[&str]) -> Option<i64> {
        self.read(keys, ParamValue::as_i64)
    }

    fn unsigned(&mut self, keys: &[&str]) -> Option<u32> {
        self.read(keys, ParamValue::as_u32)
    }

    /// Warn about every key no reader asked for.
    fn finish(self) {
        for key in self.map.keys().filter(|k| !self.seen.contains(k.as_str())) {
            tracing::warn!(
                category = %self.family,
                key = key.as_str(),
                "dropping unknown parameter"
            );
        }
    }
}

/// Conversion between a family's typed overrides and loose parameters.
trait Overrides: Sized {
    fn read(reader: &mut ParamReader<'_>) -> Self;
    fn pairs(&self) -> Vec<(&'static str, String)>;
}

fn push<T: fmt::Display>(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    value: Option<T>,
) {
    if let Some(v) = value {
        pairs.push((key, v.to_string()));
    }
}

impl Overrides for ColorParams {
    fn read(reader: &mut ParamReader<'_>) -> Self {
        Self {
            intensity: reader.float(&["intensity"]),
            iterations: reader.unsigned(&["iterations"]),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "intensity", self.intensity);
        push(&mut pairs, "iterations", self.iterations);
        pairs
    }
}

impl Overrides for FilterParams {
    fn read(reader: &mut ParamReader<'_>) -> Self {
        Self {
            intensity: reader.float(&["intensity"]),
            iterations: reader.unsigned(&["iterations"]),
            radius: reader.float32(&["radius"]),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "intensity", self.intensity);
        push(&mut pairs, "iterations", self.iterations);
        push(&mut pairs, "radius", self.radius);
        pairs
    }
}

impl Overrides for EdgeParams {
    fn read(reader: &mut ParamReader<'_>) -> Self {
        Self {
            intensity: reader.float(&["intensity"]),
            low_threshold: reader.float32(&["low_threshold", "low"]),
            high_threshold: reader.float32(&["high_threshold", "high"]),
            ksize: reader.unsigned(&["ksize"]),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "intensity", self.intensity);
        push(&mut pairs, "low_threshold", self.low_threshold);
        push(&mut pairs, "high_threshold", self.high_threshold);
        push(&mut pairs, "ksize", self.ksize);
        pairs
    }
}

impl Overrides for BinaryParams {
    fn read(reader: &mut ParamReader<'_>) -> Self {
        Self {
            intensity: reader.float(&["intensity"]),
            threshold: reader.int(&["threshold", "threshold_value"]),
            block_size: reader.unsigned(&["block_size"]),
            c: reader.float(&["c", "C"]),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "intensity", self.intensity);
        push(&mut pairs, "threshold", self.threshold);
        push(&mut pairs, "block_size", self.block_size);
        push(&mut pairs, "c", self.c);
        pairs
    }
}

impl Overrides for MorphologyParams {
    fn read(reader: &mut ParamReader<'_>) -> Self {
        Self {
            intensity: reader.float(&["intensity"]),
            iterations: reader.unsigned(&["iterations"]),
            kernel_size: reader.unsigned(&["kernel_size"]),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "intensity", self.intensity);
        push(&mut pairs, "iterations", self.iterations);
        push(&mut pairs, "kernel_size", self.kernel_size);
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, ParamValue)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn category_tags_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_tag(c.as_str()), Some(c));
        }
        assert_eq!(Category::from_tag("warp"), None);
    }

    #[test]
    fn from_tags_builds_typed_step() {
        let step = PipelineStep::from_tags(
            "filter",
            "blur",
            &map(&[("radius", ParamValue::Int(2))]),
        );
        assert_eq!(
            step,
            PipelineStep::Filter {
                method: FilterMethod::Blur,
                params: FilterParams {
                    radius: Some(2.0),
                    ..FilterParams::default()
                },
            }
        );
    }

    #[test]
    fn from_tags_keeps_unknown_tags() {
        let step = PipelineStep::from_tags("warp", "swirl", &ParamMap::new());
        assert_eq!(step.category(), None);
        assert_eq!(step.label(), "warp:swirl");

        let step = PipelineStep::from_tags("color", "sepia", &ParamMap::new());
        assert_eq!(
            step,
            PipelineStep::Color {
                method: ColorMethod::Unknown("sepia".into()),
                params: ColorParams::default(),
            }
        );
    }

    #[test]
    fn from_tags_drops_bad_params() {
        let step = PipelineStep::from_tags(
            "binary",
            "adaptive",
            &map(&[
                ("block_size", ParamValue::Text("big".into())),
                ("C", ParamValue::Int(5)),
                ("colour", ParamValue::Int(1)),
            ]),
        );
        assert_eq!(
            step,
            PipelineStep::Binary {
                method: BinaryMethod::Adaptive,
                params: BinaryParams {
                    c: Some(5.0),
                    ..BinaryParams::default()
                },
            }
        );
    }

    #[test]
    fn label_lists_set_params() {
        let step = PipelineStep::from_tags(
            "edge",
            "canny",
            &map(&[
                ("high_threshold", ParamValue::Int(120)),
                ("low_threshold", ParamValue::Int(40)),
            ]),
        );
        assert_eq!(step.label(), "edge:canny(low_threshold=40, high_threshold=120)");
        assert_eq!(
            PipelineStep::from_tags("color", "grayscale", &ParamMap::new()).label(),
            "color:grayscale"
        );
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parse_spec_variants() {
        let step = parse_spec("filter:blur:radius=2").unwrap();
        assert_eq!(step.label(), "filter:blur(radius=2)");

        let step: PipelineStep = "morphology:opening:kernel_size=3, iterations=2"
            .parse()
            .unwrap();
        assert_eq!(step.label(), "morphology:opening(iterations=2, kernel_size=3)");

        let step = parse_spec(" binary:otsu ").unwrap();
        assert_eq!(step.label(), "binary:otsu");
    }

    #[test]
    fn parse_spec_rejects_malformed_text() {
        for bad in ["", "  ", "filter", "filter:", "filter: :radius=2", ":blur"] {
            assert!(
                matches!(parse_spec(bad), Err(PipelineError::InvalidStepSpec(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn parse_spec_drops_pairs_without_value() {
        let step = parse_spec("filter:blur:radius").unwrap();
        assert_eq!(step.label(), "filter:blur");

        let step = parse_spec("binary:adaptive:block_size=5,offset,c=3").unwrap();
        assert_eq!(step.label(), "binary:adaptive(block_size=5, c=3)");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn serde_round_trip() {
        let steps = vec![
            parse_spec("color:invert:intensity=0.5").unwrap(),
            parse_spec("edge:sobel:ksize=5").unwrap(),
            PipelineStep::from_tags("warp", "swirl", &ParamMap::new()),
        ];
        let json = serde_json::to_string(&steps).unwrap();
        let back: Vec<PipelineStep> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, steps);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn deserialize_without_params() {
        let step: PipelineStep =
            serde_json::from_str(r#"{"category":"binary","method":"otsu"}"#).unwrap();
        assert_eq!(
            step,
            PipelineStep::Binary {
                method: BinaryMethod::Otsu,
                params: BinaryParams::default(),
            }
        );
    }
}
